use tracing::warn;

use crate::domain::repository::ValueStorePort;
use crate::domain::types::{DeliveryChannel, Fulfillment, LedgerEntry};
use crate::error::ValueStoreError;

/// Dual-path value-store fulfillment.
///
/// Decision order:
/// 1. Customer already holds a handle → incremental top-up. Never
///    create a second value store for the same customer.
/// 2. Order linkage on the ledger entry → order-based activation,
///    which yields richer metadata (hosted activation URL, possibly a
///    wallet-pass URL).
/// 3. Otherwise, or when the order path fails permanently → direct
///    creation with an immediate balance load (owner-funded).
///
/// A permanent order-path failure is a fallback trigger, not a stage
/// failure; only transient errors propagate for a retry.
pub struct FulfillmentStrategy<V: ValueStorePort> {
    pub value_store: V,
}

impl<V: ValueStorePort> FulfillmentStrategy<V> {
    pub async fn fulfill(
        &self,
        entry: &LedgerEntry,
        amount_cents: i64,
    ) -> Result<Fulfillment, ValueStoreError> {
        if let Some(handle) = &entry.value_store_handle {
            let balance = self.value_store.top_up(handle, amount_cents).await?;
            tracing::debug!(
                customer_id = %entry.customer_id,
                balance_cents = balance,
                "topped up existing value store"
            );
            return Ok(Fulfillment {
                handle: handle.clone(),
                channel: DeliveryChannel::TopUp,
                activation_url: entry.activation_url.clone(),
                pass_url: entry.pass_url.clone(),
            });
        }

        if let (Some(order_id), Some(line_item_uid)) = (&entry.order_id, &entry.line_item_uid) {
            match self
                .value_store
                .activate_via_order(order_id, line_item_uid)
                .await
            {
                Ok(activation) => {
                    return Ok(Fulfillment {
                        handle: activation.handle,
                        channel: DeliveryChannel::OrderActivation,
                        activation_url: activation.activation_url,
                        pass_url: activation.pass_url,
                    });
                }
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(
                        customer_id = %entry.customer_id,
                        order_id = %order_id,
                        error = %e,
                        "order-based activation failed, falling back to owner-funded"
                    );
                }
            }
        }

        let handle = self.value_store.create_instance(amount_cents).await?;
        Ok(Fulfillment {
            handle,
            channel: DeliveryChannel::OwnerFunded,
            activation_url: None,
            pass_url: None,
        })
    }
}
