use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rewards service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum RewardsServiceError {
    #[error("event missing event_id")]
    MissingEventId,
    #[error("no job found for that correlation id and stage")]
    JobNotFound,
    #[error("unknown pipeline stage: {0}")]
    UnknownStage(String),
    #[error("unknown job status: {0}")]
    UnknownStatus(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl RewardsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingEventId => "MISSING_EVENT_ID",
            Self::JobNotFound => "JOB_NOT_FOUND",
            Self::UnknownStage(_) => "UNKNOWN_STAGE",
            Self::UnknownStatus(_) => "UNKNOWN_STATUS",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for RewardsServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingEventId | Self::UnknownStage(_) | Self::UnknownStatus(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::JobNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only — tower-http TraceLayer already records method/uri/status for all
        // requests. 4xx are expected client errors; logging them here would be noise.
        // Internal errors need the anyhow chain logged so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Failure from the external value-store (gift card) API, classified so
/// the fulfillment strategy can tell "retry later" from "take the
/// fallback path".
#[derive(Debug, thiserror::Error)]
pub enum ValueStoreError {
    #[error("retryable value store failure: {0}")]
    Retryable(String),
    #[error("permanent value store failure: {0}")]
    Permanent(String),
}

impl ValueStoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Failure from the transactional-email API, classified like the value
/// store's: transport problems and server errors retry, a provider 4xx
/// (bad template, suppressed address) never heals on its own. Neither
/// rolls back monetary state.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("retryable notification failure: {0}")]
    Retryable(String),
    #[error("permanent notification failure: {0}")]
    Permanent(String),
}

/// Stage executor failure, classified for the scheduler: transient
/// failures reschedule with backoff, permanent ones go terminal.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("transient stage failure: {0}")]
    Transient(String),
    #[error("permanent stage failure: {0}")]
    Permanent(String),
}

impl From<ValueStoreError> for StageError {
    fn from(e: ValueStoreError) -> Self {
        match e {
            ValueStoreError::Retryable(msg) => Self::Transient(msg),
            ValueStoreError::Permanent(msg) => Self::Permanent(msg),
        }
    }
}

impl From<NotificationError> for StageError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::Retryable(msg) => Self::Transient(msg),
            NotificationError::Permanent(msg) => Self::Permanent(msg),
        }
    }
}

impl From<RewardsServiceError> for StageError {
    fn from(e: RewardsServiceError) -> Self {
        match e {
            // DB hiccups inside a stage are worth a retry.
            RewardsServiceError::Internal(inner) => Self::Transient(inner.to_string()),
            other => Self::Permanent(other.to_string()),
        }
    }
}
