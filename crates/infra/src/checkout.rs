//! Checkout wizard.
//!
//! ```text
//! cart → delivery → payment → completed
//! ```
//!
//! `submit` places the order once and then runs the payment step. If payment
//! fails the order stays `pending`, and a later `submit` retries payment for
//! that same order instead of placing another one.

use serde_json::Value as JsonValue;
use thiserror::Error;

use agromarket_core::{DomainError, UserId};
use agromarket_events::{EventBus, EventEnvelope};
use agromarket_inventory::StockRecord;
use agromarket_invoicing::DocumentNumberGenerator;
use agromarket_products::ProductId;
use agromarket_sales::{
    DeliveryDetails, LineItem, Order, OrderError, OrderId, OrderTotals, price_items,
};

use crate::repository::Repository;
use crate::services::{OrderService, PlaceOrderRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Cart,
    Delivery,
    Payment,
    Completed,
}

impl core::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            CheckoutStep::Cart => "cart",
            CheckoutStep::Delivery => "delivery",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Completed => "completed",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("checkout is at step {actual}, expected {expected}")]
    WrongStep {
        expected: CheckoutStep,
        actual: CheckoutStep,
    },

    #[error("cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// One buyer's pass through the checkout wizard.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    buyer_id: UserId,
    items: Vec<LineItem>,
    delivery: Option<DeliveryDetails>,
    step: CheckoutStep,
    order_id: Option<OrderId>,
}

impl CheckoutSession {
    pub fn new(buyer_id: UserId) -> Self {
        Self {
            buyer_id,
            items: Vec::new(),
            delivery: None,
            step: CheckoutStep::Cart,
            order_id: None,
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The order placed by `submit`, once there is one.
    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn add_item(&mut self, item: LineItem) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Cart)?;
        if item.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive").into());
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove every line for `product_id`. Returns how many lines were removed.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<usize, CheckoutError> {
        self.ensure_step(CheckoutStep::Cart)?;
        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        Ok(before - self.items.len())
    }

    /// Price the current cart with the rates `orders` will charge, without
    /// placing anything.
    pub fn preview<O, S, B, G>(
        &self,
        orders: &OrderService<O, S, B, G>,
    ) -> Result<OrderTotals, CheckoutError>
    where
        O: Repository<OrderId, Order>,
        S: Repository<ProductId, StockRecord>,
        B: EventBus<EventEnvelope<JsonValue>>,
        G: DocumentNumberGenerator,
    {
        Ok(price_items(&self.items, orders.policy())?)
    }

    /// Leave the cart for the delivery step.
    pub fn proceed(&mut self) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Cart)?;
        if self.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.step = CheckoutStep::Delivery;
        Ok(())
    }

    /// Go back one step. Not possible once an order has been placed.
    pub fn back(&mut self) -> Result<(), CheckoutError> {
        let previous = match (self.step, self.order_id) {
            (CheckoutStep::Delivery, _) => CheckoutStep::Cart,
            (CheckoutStep::Payment, None) => CheckoutStep::Delivery,
            (actual, _) => {
                return Err(CheckoutError::WrongStep {
                    expected: CheckoutStep::Delivery,
                    actual,
                });
            }
        };
        self.step = previous;
        Ok(())
    }

    pub fn set_delivery(&mut self, delivery: DeliveryDetails) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Delivery)?;
        delivery.validate()?;
        self.delivery = Some(delivery);
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Place the order (first call only) and run the payment step.
    pub fn submit<O, S, B, G>(
        &mut self,
        orders: &OrderService<O, S, B, G>,
    ) -> Result<Order, CheckoutError>
    where
        O: Repository<OrderId, Order>,
        S: Repository<ProductId, StockRecord>,
        B: EventBus<EventEnvelope<JsonValue>>,
        G: DocumentNumberGenerator,
    {
        self.ensure_step(CheckoutStep::Payment)?;

        let order_id = match self.order_id {
            Some(order_id) => order_id,
            None => {
                let mut request = PlaceOrderRequest::new(self.buyer_id, self.items.clone());
                if let Some(delivery) = self.delivery.clone() {
                    request = request.with_delivery(delivery);
                }
                let order_id = orders.place_order(request)?.id_typed();
                self.order_id = Some(order_id);
                order_id
            }
        };

        let paid = orders.process_payment(order_id)?;
        self.step = CheckoutStep::Completed;
        tracing::info!(%order_id, buyer_id = %self.buyer_id, "checkout completed");
        Ok(paid)
    }

    fn ensure_step(&self, expected: CheckoutStep) -> Result<(), CheckoutError> {
        if self.step != expected {
            return Err(CheckoutError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    use agromarket_core::{Aggregate, Rate};
    use agromarket_events::InMemoryEventBus;
    use agromarket_inventory::{OpenStock, StockCommand};
    use agromarket_invoicing::SequentialDocumentGenerator;
    use agromarket_sales::PricingPolicy;

    use crate::repository::InMemoryRepository;

    type TestOrders = OrderService<
        InMemoryRepository<OrderId, Order>,
        Arc<InMemoryRepository<ProductId, StockRecord>>,
        InMemoryEventBus<EventEnvelope<JsonValue>>,
        SequentialDocumentGenerator,
    >;

    fn orders_with(policy: PricingPolicy) -> (TestOrders, Arc<InMemoryRepository<ProductId, StockRecord>>) {
        let stock = Arc::new(InMemoryRepository::new());
        let orders = OrderService::new(
            InMemoryRepository::new(),
            stock.clone(),
            InMemoryEventBus::new(),
            SequentialDocumentGenerator::new(),
        )
        .with_policy(policy);
        (orders, stock)
    }

    fn open_stock(stock: &InMemoryRepository<ProductId, StockRecord>, available: u64) -> ProductId {
        let product_id = ProductId::generate();
        let mut record = StockRecord::empty(product_id);
        record
            .execute(&StockCommand::OpenStock(OpenStock {
                product_id,
                initial: available,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        stock.insert(product_id, record).unwrap();
        product_id
    }

    fn delivery() -> DeliveryDetails {
        DeliveryDetails {
            department: "Antioquia".into(),
            city: "Medellín".into(),
            address: "Cra 43A #1-50".into(),
            payment_method: "pse".into(),
        }
    }

    fn session() -> CheckoutSession {
        CheckoutSession::new(UserId::new())
    }

    #[test]
    fn cart_is_editable_only_in_cart_step() {
        let mut checkout = session();
        let product_id = ProductId::generate();
        checkout.add_item(LineItem::new(product_id, 1_000)).unwrap();
        checkout.proceed().unwrap();

        let err = checkout.add_item(LineItem::new(product_id, 1_000)).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::WrongStep {
                expected: CheckoutStep::Cart,
                actual: CheckoutStep::Delivery,
            }
        );

        checkout.back().unwrap();
        assert_eq!(checkout.remove_item(product_id).unwrap(), 1);
        assert!(checkout.items().is_empty());
    }

    #[test]
    fn empty_cart_cannot_proceed() {
        let mut checkout = session();
        assert_eq!(checkout.proceed().unwrap_err(), CheckoutError::EmptyCart);
        assert_eq!(checkout.step(), CheckoutStep::Cart);
    }

    #[test]
    fn preview_prices_the_cart() {
        let (orders, _) = orders_with(PricingPolicy::default());
        let mut checkout = session();
        checkout
            .add_item(LineItem::new(ProductId::generate(), 25_000).with_shipping_cost(8_000))
            .unwrap();

        assert_eq!(checkout.preview(&orders).unwrap().total(), 36_750);
    }

    #[test]
    fn preview_matches_the_order_placed_under_a_custom_policy() {
        let (orders, stock) = orders_with(PricingPolicy {
            default_vat: Rate::from_percent(5),
            default_withholding: Rate::ZERO,
        });
        let product_id = open_stock(&stock, 3);

        let mut checkout = session();
        checkout
            .add_item(LineItem::new(product_id, 25_000).with_shipping_cost(8_000))
            .unwrap();
        let preview = checkout.preview(&orders).unwrap();
        assert_eq!(preview.total(), 34_250);

        checkout.proceed().unwrap();
        checkout.set_delivery(delivery()).unwrap();
        let order = checkout.submit(&orders).unwrap();

        assert_eq!(order.totals(), &preview);
        assert_eq!(order.total(), preview.total());
    }

    #[test]
    fn delivery_details_are_validated() {
        let mut checkout = session();
        checkout.add_item(LineItem::new(ProductId::generate(), 1_000)).unwrap();
        checkout.proceed().unwrap();

        let mut incomplete = delivery();
        incomplete.city = String::new();
        assert!(matches!(
            checkout.set_delivery(incomplete),
            Err(CheckoutError::Domain(DomainError::Validation(_)))
        ));
        assert_eq!(checkout.step(), CheckoutStep::Delivery);

        checkout.set_delivery(delivery()).unwrap();
        assert_eq!(checkout.step(), CheckoutStep::Payment);
    }
}
