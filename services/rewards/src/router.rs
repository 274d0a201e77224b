use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use patron_core::health::{healthz, readyz};
use patron_core::middleware::request_id_layer;

use crate::handlers::{
    ops::{list_jobs, retrigger_stage, run_audit, run_tick},
    webhook::ingest_event,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Webhook intake
        .route("/webhooks/events", post(ingest_event))
        // Operations
        .route("/ops/jobs", get(list_jobs))
        .route("/ops/runs/{correlation_id}", get(run_audit))
        .route("/ops/retrigger", post(retrigger_stage))
        .route("/ops/tick", post(run_tick))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
