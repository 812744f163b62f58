//! Seller product listings and their stock records.
//!
//! Restock and removal take the `StockLock`, so sharing it with the
//! `OrderService` keeps them from racing order reservations.

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;

use agromarket_core::{Aggregate, AggregateRoot, DomainError, UserId};
use agromarket_events::{EventBus, EventEnvelope};
use agromarket_inventory::{OpenStock, ReceiveStock, StockCommand, StockRecord};
use agromarket_products::{
    CatalogFilter, Product, ProductCommand, ProductId, ProductListing, ProductPatch, SubmitProduct,
    UpdateProduct,
};

use crate::repository::{Repository, RepositoryError};
use crate::services::{StockLock, publish_events};

const PRODUCT_AGGREGATE: &str = "catalog.product";
const STOCK_AGGREGATE: &str = "inventory.stock";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

#[derive(Debug)]
pub struct CatalogService<P, S, B> {
    products: P,
    stock: S,
    bus: B,
    lock: StockLock,
}

impl<P, S, B> CatalogService<P, S, B>
where
    P: Repository<ProductId, Product>,
    S: Repository<ProductId, StockRecord>,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(products: P, stock: S, bus: B) -> Self {
        Self {
            products,
            stock,
            bus,
            lock: StockLock::new(),
        }
    }

    /// Share `lock` with the order service writing to the same stock.
    pub fn with_stock_lock(mut self, lock: StockLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn stock_lock(&self) -> StockLock {
        self.lock.clone()
    }

    /// List a new product and open its stock record with `initial_stock` units.
    pub fn submit_product(
        &self,
        seller_id: UserId,
        listing: ProductListing,
        initial_stock: u64,
    ) -> Result<Product, CatalogError> {
        let now = Utc::now();
        let product_id = ProductId::generate();

        let mut product = Product::empty(product_id);
        let product_events = product.execute(&ProductCommand::SubmitProduct(SubmitProduct {
            product_id,
            seller_id,
            listing,
            occurred_at: now,
        }))?;

        let mut record = StockRecord::empty(product_id);
        let stock_events = record.execute(&StockCommand::OpenStock(OpenStock {
            product_id,
            initial: initial_stock,
            occurred_at: now,
        }))?;

        self.products.insert(product_id, product.clone())?;
        self.stock.insert(product_id, record)?;
        publish_events(&self.bus, product_id.0, PRODUCT_AGGREGATE, 0, &product_events);
        publish_events(&self.bus, product_id.0, STOCK_AGGREGATE, 0, &stock_events);

        tracing::info!(
            %product_id,
            %seller_id,
            name = product.name(),
            initial_stock,
            "product submitted"
        );
        Ok(product)
    }

    pub fn get(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get(&product_id)?
            .ok_or(CatalogError::NotFound(product_id))
    }

    pub fn update(&self, product_id: ProductId, patch: ProductPatch) -> Result<Product, CatalogError> {
        let mut product = self.get(product_id)?;
        let base_version = product.version();
        let events = product.execute(&ProductCommand::UpdateProduct(UpdateProduct {
            product_id,
            patch,
            occurred_at: Utc::now(),
        }))?;

        self.products.update(product_id, product.clone())?;
        publish_events(&self.bus, product_id.0, PRODUCT_AGGREGATE, base_version, &events);

        tracing::info!(%product_id, "product updated");
        Ok(product)
    }

    /// Delete a listing together with its stock record.
    pub fn remove(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        let _guard = self.lock.acquire()?;
        let product = self
            .products
            .remove(&product_id)?
            .ok_or(CatalogError::NotFound(product_id))?;
        self.stock.remove(&product_id)?;

        tracing::info!(%product_id, "product removed");
        Ok(product)
    }

    /// Add `quantity` units to a listing's stock. Returns the new availability.
    pub fn restock(&self, product_id: ProductId, quantity: u64) -> Result<u64, CatalogError> {
        let _guard = self.lock.acquire()?;
        let mut record = self
            .stock
            .get(&product_id)?
            .ok_or(CatalogError::NotFound(product_id))?;
        let base_version = record.version();
        let events = record.execute(&StockCommand::ReceiveStock(ReceiveStock {
            product_id,
            quantity,
            occurred_at: Utc::now(),
        }))?;

        let available = record.available();
        self.stock.update(product_id, record)?;
        publish_events(&self.bus, product_id.0, STOCK_AGGREGATE, base_version, &events);

        tracing::info!(%product_id, quantity, available, "stock received");
        Ok(available)
    }

    /// Listings matching `filter`, oldest first.
    pub fn search(&self, filter: &CatalogFilter) -> Result<Vec<Product>, CatalogError> {
        let mut found: Vec<Product> = self
            .products
            .list()?
            .into_iter()
            .filter(|product| filter.matches(product))
            .collect();
        found.sort_by_key(|product| (product.created_at(), product.id_typed()));
        Ok(found)
    }
}
