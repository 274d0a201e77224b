use reqwest::StatusCode;
use serde::Deserialize;

use crate::domain::repository::{OrderActivation, ValueStorePort, ValueStoreState};
use crate::error::ValueStoreError;

/// reqwest-backed client for the POS gift-card API.
#[derive(Clone)]
pub struct HttpGiftCardClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpGiftCardClient {
    pub fn new(http: reqwest::Client, base_url: String, access_token: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token,
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ValueStoreError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

#[derive(Deserialize)]
struct GiftCardResponse {
    id: String,
}

#[derive(Deserialize)]
struct AdjustResponse {
    balance_cents: i64,
}

#[derive(Deserialize)]
struct ActivateResponse {
    id: String,
    activation_url: Option<String>,
    pass_url: Option<String>,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    balance_cents: i64,
    state: String,
}

impl ValueStorePort for HttpGiftCardClient {
    async fn create_instance(&self, amount_cents: i64) -> Result<String, ValueStoreError> {
        let body = serde_json::json!({ "amount_cents": amount_cents });
        let card: GiftCardResponse = self.post_json("/v2/gift-cards", &body).await?;
        Ok(card.id)
    }

    async fn top_up(&self, handle: &str, amount_cents: i64) -> Result<i64, ValueStoreError> {
        let body = serde_json::json!({ "amount_cents": amount_cents });
        let adjusted: AdjustResponse = self
            .post_json(&format!("/v2/gift-cards/{handle}/adjust"), &body)
            .await?;
        Ok(adjusted.balance_cents)
    }

    async fn activate_via_order(
        &self,
        order_id: &str,
        line_item_uid: &str,
    ) -> Result<OrderActivation, ValueStoreError> {
        let body = serde_json::json!({
            "order_id": order_id,
            "line_item_uid": line_item_uid,
        });
        let activated: ActivateResponse = self.post_json("/v2/gift-cards/activate", &body).await?;
        Ok(OrderActivation {
            handle: activated.id,
            activation_url: activated.activation_url,
            pass_url: activated.pass_url,
        })
    }

    async fn retrieve(&self, handle: &str) -> Result<ValueStoreState, ValueStoreError> {
        let response = self
            .http
            .get(format!("{}/v2/gift-cards/{handle}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport_error)?;
        let retrieved: RetrieveResponse = decode(response).await?;
        Ok(ValueStoreState {
            balance_cents: retrieved.balance_cents,
            state: retrieved.state,
        })
    }
}

/// Connection / timeout problems are always worth a retry.
fn transport_error(e: reqwest::Error) -> ValueStoreError {
    ValueStoreError::Retryable(format!("gift card API transport error: {e}"))
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ValueStoreError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ValueStoreError::Permanent(format!("gift card API bad response: {e}")));
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify(status, &body))
}

/// Rate limits, timeouts, and server errors are retryable; any other
/// 4xx means the request itself is wrong and retrying cannot help.
fn classify(status: StatusCode, body: &str) -> ValueStoreError {
    let message = format!("gift card API returned {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ValueStoreError::Retryable(message)
    } else {
        ValueStoreError::Permanent(message)
    }
}
