//! Order lifecycle store.
//!
//! ```text
//! create:  check stock (all items) → place order → reserve stock → store → publish
//! pay:     issue invoice number → record payment → store → publish
//! cancel:  cancel order → release stock → store → publish
//! ```
//!
//! Operations that change orders or stock run under one `StockLock`, so the
//! stock check and the decrement that follows it cannot interleave with
//! another order's, or with a restock sharing the same lock.

use std::collections::HashMap;
use std::sync::MutexGuard;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use agromarket_core::{Aggregate, AggregateRoot, DomainError, UserId};
use agromarket_events::{EventBus, EventEnvelope};
use agromarket_inventory::{ReleaseStock, ReserveStock, StockCommand, StockRecord};
use agromarket_invoicing::{DocumentKind, DocumentNumberGenerator};
use agromarket_products::ProductId;
use agromarket_sales::{
    CancelOrder, DeliverOrder, DeliveryDetails, LineItem, Order, OrderCommand, OrderError,
    OrderId, OrderStats, OrderStatus, PlaceOrder, PricingPolicy, RecordPayment, ShipOrder,
};

use crate::repository::{Repository, RepositoryError};
use crate::services::{StockLock, publish_events};

const ORDER_AGGREGATE: &str = "sales.order";
const STOCK_AGGREGATE: &str = "inventory.stock";

impl From<RepositoryError> for OrderError {
    fn from(value: RepositoryError) -> Self {
        OrderError::Storage(value.to_string())
    }
}

/// Everything needed to place an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    pub buyer_id: UserId,
    pub items: Vec<LineItem>,
    pub delivery: Option<DeliveryDetails>,
}

impl PlaceOrderRequest {
    pub fn new(buyer_id: UserId, items: Vec<LineItem>) -> Self {
        Self {
            buyer_id,
            items,
            delivery: None,
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryDetails) -> Self {
        self.delivery = Some(delivery);
        self
    }
}

/// Orders, their stock reservations and their documents.
#[derive(Debug)]
pub struct OrderService<O, S, B, G> {
    orders: O,
    stock: S,
    bus: B,
    documents: G,
    policy: PricingPolicy,
    lock: StockLock,
}

impl<O, S, B, G> OrderService<O, S, B, G>
where
    O: Repository<OrderId, Order>,
    S: Repository<ProductId, StockRecord>,
    B: EventBus<EventEnvelope<JsonValue>>,
    G: DocumentNumberGenerator,
{
    pub fn new(orders: O, stock: S, bus: B, documents: G) -> Self {
        Self {
            orders,
            stock,
            bus,
            documents,
            policy: PricingPolicy::default(),
            lock: StockLock::new(),
        }
    }

    pub fn with_policy(mut self, policy: PricingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share `lock` with other services writing to the same stock.
    pub fn with_stock_lock(mut self, lock: StockLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn stock_lock(&self) -> StockLock {
        self.lock.clone()
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Place an order without delivery details.
    pub fn create_order(&self, buyer_id: UserId, items: Vec<LineItem>) -> Result<Order, OrderError> {
        self.place_order(PlaceOrderRequest::new(buyer_id, items))
    }

    /// Check stock for every item, then place the order and take the stock.
    ///
    /// Nothing changes unless every product has enough stock.
    pub fn place_order(&self, request: PlaceOrderRequest) -> Result<Order, OrderError> {
        let _guard = self.guard()?;

        if request.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item").into());
        }

        let reservations = self.check_stock(&request.items)?;

        let now = Utc::now();
        let order_id = OrderId::generate();
        let certificate = self.documents.generate(
            DocumentKind::CertificateOfOrigin,
            &request.items[0].product_id.to_string(),
            now,
        );

        let mut order = Order::empty(order_id);
        let order_events = order.execute(&OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            buyer_id: request.buyer_id,
            items: request.items,
            policy: self.policy,
            certificate_of_origin: Some(certificate),
            delivery: request.delivery,
            occurred_at: now,
        }))?;

        for (mut record, quantity) in reservations {
            let product_id = record.product_id();
            let base_version = record.version();
            let events = record.execute(&StockCommand::ReserveStock(ReserveStock {
                product_id,
                quantity,
                order_ref: order_id.0,
                occurred_at: now,
            }))?;
            self.stock.update(product_id, record)?;
            publish_events(&self.bus, product_id.0, STOCK_AGGREGATE, base_version, &events);
        }

        self.orders.insert(order_id, order.clone())?;
        publish_events(&self.bus, order_id.0, ORDER_AGGREGATE, 0, &order_events);

        tracing::info!(
            %order_id,
            buyer_id = %request.buyer_id,
            total = order.total(),
            "order placed"
        );

        Ok(order)
    }

    /// Run the payment step: issue an electronic invoice and mark the order paid.
    pub fn process_payment(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let _guard = self.guard()?;
        self.pay_locked(order_id, Utc::now())
    }

    /// Cancel a pending order and give its stock back.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let _guard = self.guard()?;

        let mut order = self.load(order_id)?;
        let now = Utc::now();
        let base_version = order.version();
        let order_events = order.execute(&OrderCommand::CancelOrder(CancelOrder {
            order_id,
            occurred_at: now,
        }))?;

        for (product_id, quantity) in demand_by_product(order.items()) {
            let Some(mut record) = self.stock.get(&product_id)? else {
                tracing::warn!(%order_id, %product_id, "stock record gone; units not restored");
                continue;
            };
            let stock_version = record.version();
            let events = record.execute(&StockCommand::ReleaseStock(ReleaseStock {
                product_id,
                quantity,
                order_ref: order_id.0,
                occurred_at: now,
            }))?;
            self.stock.update(product_id, record)?;
            publish_events(&self.bus, product_id.0, STOCK_AGGREGATE, stock_version, &events);
        }

        self.orders.update(order_id, order.clone())?;
        publish_events(&self.bus, order_id.0, ORDER_AGGREGATE, base_version, &order_events);

        tracing::info!(%order_id, "order cancelled");
        Ok(order)
    }

    /// Move an order one step forward: `pending → paid → shipped → delivered`.
    ///
    /// Advancing to `paid` runs the payment step.
    pub fn advance_status(&self, order_id: OrderId, next: OrderStatus) -> Result<Order, OrderError> {
        let _guard = self.guard()?;

        let mut order = self.load(order_id)?;
        let from = order.status();
        if from.successor() != Some(next) {
            return Err(OrderError::InvalidTransition {
                order_id,
                from,
                to: next,
            });
        }

        let now = Utc::now();
        let command = match next {
            OrderStatus::Paid => return self.pay_locked(order_id, now),
            OrderStatus::Shipped => OrderCommand::ShipOrder(ShipOrder {
                order_id,
                occurred_at: now,
            }),
            OrderStatus::Delivered => OrderCommand::DeliverOrder(DeliverOrder {
                order_id,
                occurred_at: now,
            }),
            OrderStatus::Pending | OrderStatus::Cancelled => {
                return Err(OrderError::InvalidTransition {
                    order_id,
                    from,
                    to: next,
                });
            }
        };

        let base_version = order.version();
        let events = order.execute(&command)?;
        self.orders.update(order_id, order.clone())?;
        publish_events(&self.bus, order_id.0, ORDER_AGGREGATE, base_version, &events);

        tracing::info!(%order_id, %from, to = %next, "order status advanced");
        Ok(order)
    }

    pub fn get_by_id(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.load(order_id)
    }

    /// Orders of one buyer, oldest first.
    pub fn list_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>, OrderError> {
        self.list_where(|order| order.buyer_id() == Some(buyer_id))
    }

    /// Orders in one status, oldest first.
    pub fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        self.list_where(|order| order.status() == status)
    }

    /// Figures over all orders, or over one buyer's.
    pub fn statistics(&self, buyer_id: Option<UserId>) -> Result<OrderStats, OrderError> {
        let orders = self.list_where(|order| buyer_id.is_none() || order.buyer_id() == buyer_id)?;
        OrderStats::from_orders(&orders).map_err(OrderError::from)
    }

    /// Units currently available for `product_id`.
    pub fn available_stock(&self, product_id: ProductId) -> Result<u64, OrderError> {
        self.stock
            .get(&product_id)?
            .filter(StockRecord::is_open)
            .map(|record| record.available())
            .ok_or(OrderError::UnknownProduct(product_id))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, OrderError> {
        self.lock.acquire().map_err(OrderError::from)
    }

    fn load(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .get(&order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    fn list_where<F>(&self, keep: F) -> Result<Vec<Order>, OrderError>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<Order> = self.orders.list()?.into_iter().filter(|o| keep(o)).collect();
        orders.sort_by_key(|order| (order.created_at(), order.id_typed()));
        Ok(orders)
    }

    /// Stock records that will be reserved, with the quantity to take from each.
    fn check_stock(&self, items: &[LineItem]) -> Result<Vec<(StockRecord, u64)>, OrderError> {
        let mut reservations = Vec::new();

        for (product_id, requested) in demand_by_product(items) {
            let record = self
                .stock
                .get(&product_id)?
                .filter(StockRecord::is_open)
                .ok_or(OrderError::UnknownProduct(product_id))?;

            if !record.can_reserve(requested) {
                tracing::debug!(
                    %product_id,
                    requested,
                    available = record.available(),
                    "order rejected for insufficient stock"
                );
                return Err(OrderError::InsufficientStock {
                    product_id,
                    requested,
                    available: record.available(),
                });
            }

            if requested > 0 {
                reservations.push((record, requested));
            }
        }

        Ok(reservations)
    }

    fn pay_locked(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Order, OrderError> {
        let mut order = self.load(order_id)?;
        if order.status() != OrderStatus::Pending {
            return Err(OrderError::InvalidState {
                order_id,
                status: order.status(),
                operation: "pay",
            });
        }

        let invoice_number =
            self.documents
                .generate(DocumentKind::ElectronicInvoice, &order_id.to_string(), now);

        let base_version = order.version();
        let events = order.execute(&OrderCommand::RecordPayment(RecordPayment {
            order_id,
            invoice_number,
            occurred_at: now,
        }))?;
        self.orders.update(order_id, order.clone())?;
        publish_events(&self.bus, order_id.0, ORDER_AGGREGATE, base_version, &events);

        tracing::info!(
            %order_id,
            invoice = ?order.invoice_number().map(ToString::to_string),
            "payment recorded"
        );
        Ok(order)
    }
}

/// Requested quantity per product, in order of first appearance.
fn demand_by_product(items: &[LineItem]) -> Vec<(ProductId, u64)> {
    let mut index: HashMap<ProductId, usize> = HashMap::new();
    let mut demand: Vec<(ProductId, u64)> = Vec::new();

    for item in items {
        let quantity = u64::from(item.quantity);
        match index.get(&item.product_id) {
            Some(&i) => demand[i].1 += quantity,
            None => {
                index.insert(item.product_id, demand.len());
                demand.push((item.product_id, quantity));
            }
        }
    }

    demand
}
