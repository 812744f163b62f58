//! Catalog domain module.
//!
//! Seller product submissions and listing updates, implemented purely as
//! deterministic domain logic (no IO, no storage).

pub mod filter;
pub mod product;

pub use filter::CatalogFilter;
pub use product::{
    Certifications, Dimensions, Logistics, OriginLocation, Product, ProductCommand, ProductEvent,
    ProductId, ProductKind, ProductListing, ProductPatch, ProductSubmitted, ProductTaxes,
    ProductUpdated, SubmitProduct, TechnicalDetails, TransportConditions, TransportMode,
    UpdateProduct,
};
