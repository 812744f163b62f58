//! Sales domain module: pricing and the order lifecycle.
//!
//! Business rules for checkout orders, implemented purely as deterministic
//! domain logic (no IO, no storage). Stock checks and document numbers are
//! resolved by the application layer and handed in through commands.

pub mod error;
pub mod order;
pub mod pricing;
pub mod stats;

pub use error::OrderError;
pub use order::{
    CancelOrder, DeliverOrder, DeliveryDetails, Order, OrderCancelled, OrderCommand,
    OrderDelivered, OrderEvent, OrderId, OrderPlaced, OrderShipped, OrderStatus, PaymentRecorded,
    PlaceOrder, RecordPayment, ShipOrder,
};
pub use pricing::{
    DEFAULT_VAT_RATE, DEFAULT_WITHHOLDING_RATE, LineItem, OrderTotals, PricingPolicy, price_items,
};
pub use stats::OrderStats;
