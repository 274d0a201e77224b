//! Builders for platform webhook events as the POS delivers them.

use chrono::Utc;
use uuid::Uuid;

use patron_domain::event::WebhookEvent;

/// A `customer.created` event, optionally citing a referral code.
pub fn customer_created(
    customer_id: &str,
    name: &str,
    email: &str,
    referral_code: Option<&str>,
) -> WebhookEvent {
    let mut data = serde_json::json!({
        "id": customer_id,
        "given_name": name,
        "email_address": email,
    });
    if let Some(code) = referral_code {
        data["referral_code"] = serde_json::Value::String(code.to_owned());
    }
    event("customer.created", data)
}

/// A `booking.created` event for a customer, optionally citing a
/// referral code and carrying order linkage.
pub fn booking_created(
    customer_id: &str,
    booking_id: &str,
    referral_code: Option<&str>,
    order_id: Option<&str>,
) -> WebhookEvent {
    let mut data = serde_json::json!({
        "id": booking_id,
        "customer_id": customer_id,
    });
    if let Some(code) = referral_code {
        data["referral_code"] = serde_json::Value::String(code.to_owned());
    }
    if let Some(order) = order_id {
        data["order_id"] = serde_json::Value::String(order.to_owned());
        data["line_item_uid"] = serde_json::Value::String(format!("li_{order}"));
    }
    event("booking.created", data)
}

/// A `payment.updated` event with the given status (e.g. "COMPLETED").
pub fn payment_updated(customer_id: &str, payment_id: &str, status: &str) -> WebhookEvent {
    event(
        "payment.updated",
        serde_json::json!({
            "id": payment_id,
            "customer_id": customer_id,
            "status": status,
        }),
    )
}

fn event(event_type: &str, data: serde_json::Value) -> WebhookEvent {
    WebhookEvent {
        event_id: format!("evt_{}", Uuid::new_v4().simple()),
        event_type: event_type.to_owned(),
        created_at: Utc::now(),
        data,
    }
}
