//! Inbound platform webhook envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event kinds consumed by the reward pipeline. Anything else is
/// recorded for audit but produces no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CustomerCreated,
    BookingCreated,
    PaymentUpdated,
    Other,
}

impl EventKind {
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "customer.created" => Self::CustomerCreated,
            "booking.created" => Self::BookingCreated,
            "payment.updated" => Self::PaymentUpdated,
            _ => Self::Other,
        }
    }
}

/// Webhook body as delivered by the platform. Signature verification
/// happens upstream; by the time this type exists the event is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event_type)
    }

    /// String field lookup in the `data` payload.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}
