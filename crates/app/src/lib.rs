//! Wiring for the marketplace binary.
//!
//! Builds every service on in-memory storage and runs a scripted session: a
//! seller lists products, a buyer asks about one, checks out and a second
//! order is cancelled.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use agromarket_core::{Rate, UserId};
use agromarket_events::{EventEnvelope, InMemoryEventBus};
use agromarket_infra::{
    AppConfig, CatalogService, CheckoutSession, InMemoryRepository, MessageService, OrderService,
    ProfileService, StockLock,
};
use agromarket_inventory::StockRecord;
use agromarket_invoicing::SequentialDocumentGenerator;
use agromarket_messaging::{Message, MessageId};
use agromarket_parties::{RegistryKind, StubRegistryVerifier, UserProfile, UserRole};
use agromarket_products::{Product, ProductId, ProductKind, ProductListing, ProductTaxes};
use agromarket_sales::{DeliveryDetails, LineItem, Order, OrderId, OrderStats, OrderStatus};

pub type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type StockRepository = Arc<InMemoryRepository<ProductId, StockRecord>>;

pub struct Marketplace {
    pub catalog: CatalogService<InMemoryRepository<ProductId, Product>, StockRepository, Bus>,
    pub orders: OrderService<
        InMemoryRepository<OrderId, Order>,
        StockRepository,
        Bus,
        SequentialDocumentGenerator,
    >,
    pub messages: MessageService<InMemoryRepository<MessageId, Message>>,
    pub profiles: ProfileService<InMemoryRepository<UserId, UserProfile>, StubRegistryVerifier>,
    pub bus: Bus,
}

impl Marketplace {
    pub fn new(config: &AppConfig) -> Self {
        let stock: StockRepository = Arc::new(InMemoryRepository::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let stock_lock = StockLock::new();

        Self {
            catalog: CatalogService::new(InMemoryRepository::new(), stock.clone(), bus.clone())
                .with_stock_lock(stock_lock.clone()),
            orders: OrderService::new(
                InMemoryRepository::new(),
                stock,
                bus.clone(),
                SequentialDocumentGenerator::new(),
            )
            .with_policy(config.pricing)
            .with_stock_lock(stock_lock),
            messages: MessageService::new(InMemoryRepository::new()),
            profiles: ProfileService::new(InMemoryRepository::new(), StubRegistryVerifier)
                .with_expiry_window(config.expiry_window_days),
            bus,
        }
    }
}

/// What the scripted session produced.
#[derive(Debug, Clone)]
pub struct DemoSummary {
    pub order_id: OrderId,
    pub total: u64,
    pub invoice_number: String,
    pub stats: OrderStats,
}

pub fn run_demo(marketplace: &Marketplace) -> anyhow::Result<DemoSummary> {
    let today = Utc::now().date_naive();

    let seller = marketplace.profiles.register(UserProfile::new(
        UserId::new(),
        "Finca El Mirador",
        "ventas@elmirador.co",
        "3104567890",
        UserRole::Seller,
    )?)?;
    let seller_id = seller.id_typed();
    marketplace.profiles.submit_document(
        seller_id,
        RegistryKind::Rut,
        "9012345678",
        today + Duration::days(10),
    )?;
    marketplace.profiles.submit_document(
        seller_id,
        RegistryKind::Dian,
        "901234567",
        today + Duration::days(365),
    )?;
    for (kind, doc) in marketplace.profiles.expiring_documents(seller_id, today)? {
        tracing::warn!(%seller_id, %kind, expires_on = %doc.expires_on, "registry document expiring soon");
    }
    tracing::info!(
        %seller_id,
        ready = marketplace.profiles.foreign_trade_ready(seller_id)?,
        "foreign trade readiness checked"
    );

    let coffee = marketplace.catalog.submit_product(
        seller_id,
        ProductListing::new("Café especial del Huila", ProductKind::Coffee, 25_000)
            .with_description("Lavado, tueste medio, 500 g")
            .with_shipping_cost(8_000)
            .with_taxes(ProductTaxes {
                vat: Rate::from_percent(19),
                withholding: Rate::from_percent(4),
            }),
        20,
    )?;
    let panela = marketplace.catalog.submit_product(
        seller_id,
        ProductListing::new("Panela orgánica", ProductKind::Panela, 6_000)
            .with_description("Bloque de 500 g"),
        50,
    )?;

    let buyer = marketplace.profiles.register(
        UserProfile::new(
            UserId::new(),
            "Laura Gómez",
            "laura@example.co",
            "3001112233",
            UserRole::Buyer,
        )?
        .with_address("Calle 10 #5-21, Cali"),
    )?;
    let buyer_id = buyer.id_typed();

    marketplace.messages.send(
        buyer_id,
        seller_id,
        "¿El café es de cosecha reciente?",
        Some(coffee.id_typed()),
    )?;
    marketplace
        .messages
        .send(seller_id, buyer_id, "Sí, de la cosecha de este año.", Some(coffee.id_typed()))?;

    let mut checkout = CheckoutSession::new(buyer_id);
    checkout.add_item(LineItem::for_product(&coffee, 2)?)?;
    checkout.add_item(LineItem::for_product(&panela, 3)?)?;
    let preview = checkout.preview(&marketplace.orders)?;
    tracing::info!(total = preview.total(), "cart priced");

    checkout.proceed()?;
    checkout.set_delivery(DeliveryDetails {
        department: "Valle del Cauca".into(),
        city: "Cali".into(),
        address: "Calle 10 #5-21".into(),
        payment_method: "pse".into(),
    })?;
    let order = checkout.submit(&marketplace.orders)?;
    let order_id = order.id_typed();

    marketplace.orders.advance_status(order_id, OrderStatus::Shipped)?;

    let second = marketplace
        .orders
        .create_order(buyer_id, vec![LineItem::for_product(&panela, 5)?])?;
    marketplace.orders.cancel_order(second.id_typed())?;

    let invoice_number = order
        .invoice_number()
        .map(ToString::to_string)
        .context("paid order has no invoice number")?;

    Ok(DemoSummary {
        order_id,
        total: order.total(),
        invoice_number,
        stats: marketplace.orders.statistics(Some(buyer_id))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_end_to_end() {
        let marketplace = Marketplace::new(&AppConfig::default());
        let summary = run_demo(&marketplace).unwrap();

        assert!(summary.invoice_number.starts_with("FE-"));
        assert_eq!(summary.stats.order_count, 2);
        assert_eq!(summary.stats.count_in(OrderStatus::Shipped), 1);
        assert_eq!(summary.stats.count_in(OrderStatus::Cancelled), 1);

        let order = marketplace.orders.get_by_id(summary.order_id).unwrap();
        assert_eq!(order.total(), summary.total);
    }
}
