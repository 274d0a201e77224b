use crate::domain::repository::NotificationPort;
use crate::error::NotificationError;

/// reqwest-backed client for the transactional-email API.
#[derive(Clone)]
pub struct HttpEmailClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpEmailClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }
}

impl NotificationPort for HttpEmailClient {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        variables: &serde_json::Value,
    ) -> Result<(), NotificationError> {
        let body = serde_json::json!({
            "template": template,
            "to": recipient,
            "variables": variables,
        });
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Retryable(format!("email API transport error: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.is_client_error() {
            // Provider rejected the message itself (bad template,
            // suppressed address). Retrying the same request cannot
            // succeed.
            return Err(NotificationError::Permanent(format!(
                "email API rejected {template}: {status}"
            )));
        }
        Err(NotificationError::Retryable(format!(
            "email API returned {status}"
        )))
    }
}
