use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use uuid::Uuid;

use patron_domain::event::WebhookEvent;

use crate::error::RewardsServiceError;
use crate::state::AppState;
use crate::usecase::ingest::{IngestEventInput, IngestEventUseCase};

// ── POST /webhooks/events ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct IngestResponse {
    pub accepted: bool,
    pub correlation_id: Uuid,
}

/// Webhook intake. Always answers 202 once the event is durably
/// recorded (or recognized as a duplicate); the provider must never be
/// told to redeliver because a downstream stage is slow.
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(body): Json<WebhookEvent>,
) -> Result<(StatusCode, Json<IngestResponse>), RewardsServiceError> {
    let usecase = IngestEventUseCase {
        events: state.event_ledger(),
        ledger: state.reward_ledger(),
    };
    let outcome = usecase.execute(IngestEventInput { event: body }).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            accepted: outcome.accepted,
            correlation_id: outcome.correlation_id,
        }),
    ))
}
