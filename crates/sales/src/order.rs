use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agromarket_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, ValueObject};
use agromarket_events::Event;
use agromarket_invoicing::DocumentNumber;

use crate::error::OrderError;
use crate::pricing::{LineItem, OrderTotals, PricingPolicy, price_items};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status lifecycle.
///
/// `pending → paid → shipped → delivered`, with `cancelled` reachable only
/// from `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// The only status this one may advance to.
    pub fn successor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Paid),
            OrderStatus::Paid => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how the buyer wants the order delivered and paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub department: String,
    pub city: String,
    pub address: String,
    pub payment_method: String,
}

impl ValueObject for DeliveryDetails {}

impl DeliveryDetails {
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("department", &self.department),
            ("city", &self.city),
            ("address", &self.address),
            ("payment_method", &self.payment_method),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    buyer_id: Option<UserId>,
    items: Vec<LineItem>,
    totals: OrderTotals,
    status: OrderStatus,
    created_at: Option<DateTime<Utc>>,
    invoice_number: Option<DocumentNumber>,
    certificate_of_origin: Option<DocumentNumber>,
    delivery: Option<DeliveryDetails>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            buyer_id: None,
            items: Vec::new(),
            totals: OrderTotals::default(),
            status: OrderStatus::Pending,
            created_at: None,
            invoice_number: None,
            certificate_of_origin: None,
            delivery: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn totals(&self) -> &OrderTotals {
        &self.totals
    }

    pub fn total(&self) -> u64 {
        self.totals.total()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn invoice_number(&self) -> Option<&DocumentNumber> {
        self.invoice_number.as_ref()
    }

    pub fn certificate_of_origin(&self) -> Option<&DocumentNumber> {
        self.certificate_of_origin.as_ref()
    }

    pub fn delivery(&self) -> Option<&DeliveryDetails> {
        self.delivery.as_ref()
    }

    pub fn is_placed(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
///
/// Stock must already have been checked by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub items: Vec<LineItem>,
    pub policy: PricingPolicy,
    pub certificate_of_origin: Option<DocumentNumber>,
    pub delivery: Option<DeliveryDetails>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub order_id: OrderId,
    pub invoice_number: DocumentNumber,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ShipOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeliverOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    RecordPayment(RecordPayment),
    ShipOrder(ShipOrder),
    DeliverOrder(DeliverOrder),
    CancelOrder(CancelOrder),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub items: Vec<LineItem>,
    pub totals: OrderTotals,
    pub certificate_of_origin: Option<DocumentNumber>,
    pub delivery: Option<DeliveryDetails>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub order_id: OrderId,
    pub invoice_number: DocumentNumber,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderShipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipped {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDelivered {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    PaymentRecorded(PaymentRecorded),
    OrderShipped(OrderShipped),
    OrderDelivered(OrderDelivered),
    OrderCancelled(OrderCancelled),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "sales.order.placed",
            OrderEvent::PaymentRecorded(_) => "sales.order.paid",
            OrderEvent::OrderShipped(_) => "sales.order.shipped",
            OrderEvent::OrderDelivered(_) => "sales.order.delivered",
            OrderEvent::OrderCancelled(_) => "sales.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::PaymentRecorded(e) => e.occurred_at,
            OrderEvent::OrderShipped(e) => e.occurred_at,
            OrderEvent::OrderDelivered(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = OrderError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.buyer_id = Some(e.buyer_id);
                self.items = e.items.clone();
                self.totals = e.totals;
                self.status = OrderStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.certificate_of_origin = e.certificate_of_origin.clone();
                self.delivery = e.delivery.clone();
                self.created = true;
            }
            OrderEvent::PaymentRecorded(e) => {
                self.status = OrderStatus::Paid;
                self.invoice_number = Some(e.invoice_number.clone());
            }
            OrderEvent::OrderShipped(_) => {
                self.status = OrderStatus::Shipped;
            }
            OrderEvent::OrderDelivered(_) => {
                self.status = OrderStatus::Delivered;
            }
            OrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
            OrderCommand::ShipOrder(cmd) => {
                self.ensure_transition(cmd.order_id, OrderStatus::Shipped)?;
                Ok(vec![OrderEvent::OrderShipped(OrderShipped {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            OrderCommand::DeliverOrder(cmd) => {
                self.ensure_transition(cmd.order_id, OrderStatus::Delivered)?;
                Ok(vec![OrderEvent::OrderDelivered(OrderDelivered {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            OrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Order {
    fn ensure_placed(&self, order_id: OrderId) -> Result<(), OrderError> {
        if !self.created {
            return Err(OrderError::OrderNotFound(order_id));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch").into());
        }
        Ok(())
    }

    fn ensure_status(
        &self,
        order_id: OrderId,
        required: OrderStatus,
        operation: &'static str,
    ) -> Result<(), OrderError> {
        self.ensure_placed(order_id)?;
        if self.status != required {
            return Err(OrderError::InvalidState {
                order_id,
                status: self.status,
                operation,
            });
        }
        Ok(())
    }

    fn ensure_transition(&self, order_id: OrderId, to: OrderStatus) -> Result<(), OrderError> {
        self.ensure_placed(order_id)?;
        if self.status.successor() != Some(to) {
            return Err(OrderError::InvalidTransition {
                order_id,
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.created {
            return Err(DomainError::conflict("order already exists").into());
        }
        if self.id != cmd.order_id {
            return Err(DomainError::invariant("order_id mismatch").into());
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item").into());
        }
        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(DomainError::validation("quantity must be positive").into());
            }
            if item.unit_price == 0 {
                return Err(DomainError::validation("unit_price must be positive").into());
            }
        }
        if let Some(delivery) = &cmd.delivery {
            delivery.validate()?;
        }

        let totals = price_items(&cmd.items, &cmd.policy)?;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            buyer_id: cmd.buyer_id,
            items: cmd.items.clone(),
            totals,
            certificate_of_origin: cmd.certificate_of_origin.clone(),
            delivery: cmd.delivery.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_payment(&self, cmd: &RecordPayment) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_status(cmd.order_id, OrderStatus::Pending, "pay")?;

        Ok(vec![OrderEvent::PaymentRecorded(PaymentRecorded {
            order_id: cmd.order_id,
            invoice_number: cmd.invoice_number.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_status(cmd.order_id, OrderStatus::Pending, "cancel")?;

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
