use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use agromarket_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Rate, UserId};
use agromarket_events::Event;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What is being sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Coffee,
    Panela,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Air,
    Sea,
    Land,
}

/// Certificates the seller claims to hold for this listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certifications {
    pub sanitary: bool,
    pub fiscal: bool,
    pub origin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConditions {
    pub temperature: Option<String>,
    pub humidity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    pub origin: Option<String>,
    pub variety: Option<String>,
    pub roast: Option<String>,
    pub flavor_profile: Option<String>,
    pub format: Option<String>,
    pub sweetness: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub transport_conditions: Option<TransportConditions>,
}

/// Package dimensions in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginLocation {
    pub department: String,
    pub city: String,
    pub address: String,
}

/// Per-listing tax overrides. Listings without them use the marketplace defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTaxes {
    pub vat: Rate,
    pub withholding: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logistics {
    pub weight_grams: Option<u32>,
    pub dimensions: Option<Dimensions>,
    pub transport: Option<TransportMode>,
    pub destination_country: Option<String>,
    /// Flat shipping cost per order line, in pesos.
    pub shipping_cost: Option<u64>,
    pub origin_location: Option<OriginLocation>,
    pub taxes: Option<ProductTaxes>,
}

/// Everything a seller fills in when submitting a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListing {
    pub name: String,
    pub kind: ProductKind,
    /// Unit price in pesos.
    pub price: u64,
    pub description: String,
    pub images: Vec<String>,
    pub certifications: Certifications,
    pub details: TechnicalDetails,
    pub logistics: Logistics,
    pub marketing_deadline: Option<NaiveDate>,
}

impl ProductListing {
    pub fn new(name: impl Into<String>, kind: ProductKind, price: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            price,
            description: String::new(),
            images: Vec::new(),
            certifications: Certifications::default(),
            details: TechnicalDetails::default(),
            logistics: Logistics::default(),
            marketing_deadline: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_shipping_cost(mut self, cost: u64) -> Self {
        self.logistics.shipping_cost = Some(cost);
        self
    }

    pub fn with_taxes(mut self, taxes: ProductTaxes) -> Self {
        self.logistics.taxes = Some(taxes);
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        Ok(())
    }
}

/// Partial update of a listing. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub price: Option<u64>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub available: Option<bool>,
    pub shipping_cost: Option<u64>,
    pub taxes: Option<ProductTaxes>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.description.is_none()
            && self.images.is_none()
            && self.available.is_none()
            && self.shipping_cost.is_none()
            && self.taxes.is_none()
    }
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    seller_id: Option<UserId>,
    listing: Option<ProductListing>,
    available: bool,
    created_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Product {
    /// Create an empty, not-yet-submitted aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            seller_id: None,
            listing: None,
            available: false,
            created_at: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn seller_id(&self) -> Option<UserId> {
        self.seller_id
    }

    pub fn listing(&self) -> Option<&ProductListing> {
        self.listing.as_ref()
    }

    pub fn name(&self) -> &str {
        self.listing.as_ref().map(|l| l.name.as_str()).unwrap_or_default()
    }

    pub fn kind(&self) -> Option<ProductKind> {
        self.listing.as_ref().map(|l| l.kind)
    }

    pub fn price(&self) -> u64 {
        self.listing.as_ref().map(|l| l.price).unwrap_or(0)
    }

    pub fn shipping_cost(&self) -> Option<u64> {
        self.listing.as_ref().and_then(|l| l.logistics.shipping_cost)
    }

    pub fn taxes(&self) -> Option<ProductTaxes> {
        self.listing.as_ref().and_then(|l| l.logistics.taxes)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_submitted(&self) -> bool {
        self.listing.is_some()
    }

    /// Listed and flagged available by the seller.
    pub fn is_available(&self) -> bool {
        self.is_submitted() && self.available
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProduct {
    pub product_id: ProductId,
    pub seller_id: UserId,
    pub listing: ProductListing,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub patch: ProductPatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    SubmitProduct(SubmitProduct),
    UpdateProduct(UpdateProduct),
}

/// Event: ProductSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSubmitted {
    pub product_id: ProductId,
    pub seller_id: UserId,
    pub listing: ProductListing,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub patch: ProductPatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductSubmitted(ProductSubmitted),
    ProductUpdated(ProductUpdated),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductSubmitted(_) => "catalog.product.submitted",
            ProductEvent::ProductUpdated(_) => "catalog.product.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductSubmitted(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductSubmitted(e) => {
                self.id = e.product_id;
                self.seller_id = Some(e.seller_id);
                self.listing = Some(e.listing.clone());
                self.available = true;
                self.created_at = Some(e.occurred_at);
            }
            ProductEvent::ProductUpdated(e) => {
                if let Some(listing) = self.listing.as_mut() {
                    let patch = &e.patch;
                    if let Some(price) = patch.price {
                        listing.price = price;
                    }
                    if let Some(description) = &patch.description {
                        listing.description = description.clone();
                    }
                    if let Some(images) = &patch.images {
                        listing.images = images.clone();
                    }
                    if let Some(cost) = patch.shipping_cost {
                        listing.logistics.shipping_cost = Some(cost);
                    }
                    if let Some(taxes) = patch.taxes {
                        listing.logistics.taxes = Some(taxes);
                    }
                }
                if let Some(available) = e.patch.available {
                    self.available = available;
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::SubmitProduct(cmd) => self.handle_submit(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.is_submitted() {
            return Err(DomainError::conflict("product already exists"));
        }
        self.ensure_product_id(cmd.product_id)?;
        cmd.listing.validate()?;

        Ok(vec![ProductEvent::ProductSubmitted(ProductSubmitted {
            product_id: cmd.product_id,
            seller_id: cmd.seller_id,
            listing: cmd.listing.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.is_submitted() {
            return Err(DomainError::not_found("product"));
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.patch.is_empty() {
            return Err(DomainError::validation("update must change at least one field"));
        }
        if cmd.patch.price == Some(0) {
            return Err(DomainError::validation("price must be positive"));
        }

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdated {
            product_id: cmd.product_id,
            patch: cmd.patch.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
