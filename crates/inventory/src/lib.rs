//! Inventory domain module.
//!
//! Per-product available quantities, implemented purely as deterministic
//! domain logic (no IO, no storage).

pub mod stock;

pub use stock::{
    OpenStock, ReceiveStock, ReleaseStock, ReserveStock, StockCommand, StockEvent, StockOpened,
    StockReceived, StockRecord, StockReleased, StockReserved,
};
