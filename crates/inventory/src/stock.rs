use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agromarket_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use agromarket_events::Event;
use agromarket_products::ProductId;

/// Aggregate root: StockRecord (one per product).
///
/// Invariant: `available` never goes below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    product_id: ProductId,
    available: u64,
    version: u64,
    created: bool,
}

impl StockRecord {
    /// Create an empty, not-yet-opened record.
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            available: 0,
            version: 0,
            created: false,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn available(&self) -> u64 {
        self.available
    }

    pub fn is_open(&self) -> bool {
        self.created
    }

    pub fn can_reserve(&self, quantity: u64) -> bool {
        self.created && quantity <= self.available
    }
}

impl AggregateRoot for StockRecord {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenStock {
    pub product_id: ProductId,
    pub initial: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveStock (seller restocks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReserveStock (an order takes units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveStock {
    pub product_id: ProductId,
    pub quantity: u64,
    pub order_ref: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseStock (a cancelled order gives units back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStock {
    pub product_id: ProductId,
    pub quantity: u64,
    pub order_ref: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    OpenStock(OpenStock),
    ReceiveStock(ReceiveStock),
    ReserveStock(ReserveStock),
    ReleaseStock(ReleaseStock),
}

/// Event: StockOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOpened {
    pub product_id: ProductId,
    pub initial: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReserved {
    pub product_id: ProductId,
    pub quantity: u64,
    pub order_ref: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReleased {
    pub product_id: ProductId,
    pub quantity: u64,
    pub order_ref: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    StockOpened(StockOpened),
    StockReceived(StockReceived),
    StockReserved(StockReserved),
    StockReleased(StockReleased),
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockOpened(_) => "inventory.stock.opened",
            StockEvent::StockReceived(_) => "inventory.stock.received",
            StockEvent::StockReserved(_) => "inventory.stock.reserved",
            StockEvent::StockReleased(_) => "inventory.stock.released",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::StockOpened(e) => e.occurred_at,
            StockEvent::StockReceived(e) => e.occurred_at,
            StockEvent::StockReserved(e) => e.occurred_at,
            StockEvent::StockReleased(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockRecord {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::StockOpened(e) => {
                self.product_id = e.product_id;
                self.available = e.initial;
                self.created = true;
            }
            StockEvent::StockReceived(e) => {
                self.available = self.available.saturating_add(e.quantity);
            }
            StockEvent::StockReserved(e) => {
                self.available = self.available.saturating_sub(e.quantity);
            }
            StockEvent::StockReleased(e) => {
                self.available = self.available.saturating_add(e.quantity);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::OpenStock(cmd) => self.handle_open(cmd),
            StockCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            StockCommand::ReserveStock(cmd) => self.handle_reserve(cmd),
            StockCommand::ReleaseStock(cmd) => self.handle_release(cmd),
        }
    }
}

impl StockRecord {
    fn ensure_open(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("stock record"));
        }
        if self.product_id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_positive(quantity: u64) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    fn checked_increase(&self, quantity: u64) -> Result<u64, DomainError> {
        self.available
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invariant("stock quantity overflow"))
    }

    fn handle_open(&self, cmd: &OpenStock) -> Result<Vec<StockEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("stock record already exists"));
        }
        if self.product_id != cmd.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }

        Ok(vec![StockEvent::StockOpened(StockOpened {
            product_id: cmd.product_id,
            initial: cmd.initial,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_open(cmd.product_id)?;
        Self::ensure_positive(cmd.quantity)?;
        self.checked_increase(cmd.quantity)?;

        Ok(vec![StockEvent::StockReceived(StockReceived {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reserve(&self, cmd: &ReserveStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_open(cmd.product_id)?;
        Self::ensure_positive(cmd.quantity)?;

        if cmd.quantity > self.available {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![StockEvent::StockReserved(StockReserved {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            order_ref: cmd.order_ref,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_open(cmd.product_id)?;
        Self::ensure_positive(cmd.quantity)?;
        self.checked_increase(cmd.quantity)?;

        Ok(vec![StockEvent::StockReleased(StockReleased {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            order_ref: cmd.order_ref,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn opened(initial: u64) -> StockRecord {
        let product_id = ProductId::generate();
        let mut record = StockRecord::empty(product_id);
        record
            .execute(&StockCommand::OpenStock(OpenStock {
                product_id,
                initial,
                occurred_at: test_time(),
            }))
            .unwrap();
        record
    }

    fn reserve(record: &StockRecord, quantity: u64) -> StockCommand {
        StockCommand::ReserveStock(ReserveStock {
            product_id: record.product_id(),
            quantity,
            order_ref: AggregateId::new(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn open_sets_initial_quantity() {
        let record = opened(12);
        assert!(record.is_open());
        assert_eq!(record.available(), 12);
        assert_eq!(record.version(), 1);
    }

    #[test]
    fn reserve_then_release_restores_quantity() {
        let mut record = opened(10);
        let order_ref = AggregateId::new();

        record
            .execute(&StockCommand::ReserveStock(ReserveStock {
                product_id: record.product_id(),
                quantity: 4,
                order_ref,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(record.available(), 6);

        record
            .execute(&StockCommand::ReleaseStock(ReleaseStock {
                product_id: record.product_id(),
                quantity: 4,
                order_ref,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(record.available(), 10);
    }

    #[test]
    fn reserving_more_than_available_is_rejected_without_change() {
        let mut record = opened(3);
        let before = record.clone();

        let err = record.execute(&reserve(&before, 4)).unwrap_err();

        match err {
            DomainError::InvariantViolation(msg) if msg.contains("stock cannot go negative") => {}
            other => panic!("expected invariant violation, got {other:?}"),
        }
        assert_eq!(record, before);
    }

    #[test]
    fn zero_quantities_are_invalid() {
        let record = opened(3);
        assert!(matches!(
            record.handle(&reserve(&record, 0)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn unopened_record_is_not_found() {
        let record = StockRecord::empty(ProductId::generate());
        assert!(matches!(
            record.handle(&reserve(&record, 1)),
            Err(DomainError::NotFound(_))
        ));
        assert!(!record.can_reserve(0));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any sequence of reservations and releases keeps the
        /// available quantity equal to initial - reserved + released, and a
        /// rejected reservation never changes the record.
        #[test]
        fn available_quantity_is_conserved(
            initial in 0u64..1_000,
            ops in prop::collection::vec((any::<bool>(), 1u64..200), 0..40)
        ) {
            let mut record = opened(initial);
            let mut expected = initial;

            for (is_reserve, quantity) in ops {
                let cmd = if is_reserve {
                    reserve(&record, quantity)
                } else {
                    StockCommand::ReleaseStock(ReleaseStock {
                        product_id: record.product_id(),
                        quantity,
                        order_ref: AggregateId::new(),
                        occurred_at: test_time(),
                    })
                };

                match record.execute(&cmd) {
                    Ok(_) if is_reserve => expected -= quantity,
                    Ok(_) => expected += quantity,
                    Err(_) => prop_assert!(is_reserve && quantity > expected),
                }
                prop_assert_eq!(record.available(), expected);
            }
        }
    }
}
