//! Application services: load records, run domain logic, store, publish.
//!
//! Every service follows the same sequence for a state change:
//!
//! ```text
//! load record → handle command (pure) → apply → write repository → publish envelopes
//! ```
//!
//! Publication happens after the write. A publication failure is logged and
//! does not undo or fail the operation.

pub mod catalog;
pub mod messages;
pub mod orders;
pub mod profiles;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value as JsonValue;

use agromarket_core::AggregateId;
use agromarket_events::{Event, EventBus, EventEnvelope};

pub use catalog::{CatalogError, CatalogService};
pub use messages::{MessageService, MessagingError};
pub use orders::{OrderService, PlaceOrderRequest};
pub use profiles::{ProfileError, ProfileService};

use crate::repository::RepositoryError;

/// Serialises read-modify-write of stock records.
///
/// Every service writing to the same stock repository must hold a clone of
/// the same lock: wire one service with `stock_lock()` and hand it to the
/// others with `with_stock_lock`.
#[derive(Debug, Clone, Default)]
pub struct StockLock(Arc<Mutex<()>>);

impl StockLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `self` and `other` guard the same stock.
    pub fn is_shared_with(&self, other: &StockLock) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn acquire(&self) -> Result<MutexGuard<'_, ()>, RepositoryError> {
        self.0.lock().map_err(|_| RepositoryError::Poisoned)
    }
}

/// Publish `events`, emitted by an aggregate that was at `base_version`
/// before they were applied.
pub(crate) fn publish_events<B, E>(
    bus: &B,
    aggregate_id: AggregateId,
    aggregate_type: &str,
    base_version: u64,
    events: &[E],
) where
    B: EventBus<EventEnvelope<JsonValue>>,
    E: Event + Serialize,
{
    for (offset, event) in events.iter().enumerate() {
        let sequence = base_version + offset as u64 + 1;
        let envelope = match EventEnvelope::from_typed(aggregate_id, aggregate_type, sequence, event) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(
                    %aggregate_id,
                    event_type = event.event_type(),
                    %error,
                    "event payload could not be serialized; not published"
                );
                continue;
            }
        };

        if let Err(error) = bus.publish(envelope) {
            tracing::warn!(
                %aggregate_id,
                event_type = event.event_type(),
                ?error,
                "event publication failed"
            );
        }
    }
}
