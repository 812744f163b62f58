//! Catalog search criteria.

use serde::{Deserialize, Serialize};

use agromarket_core::UserId;

use crate::product::{Product, ProductKind};

/// Criteria for browsing the catalog. Empty criteria match every listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub kind: Option<ProductKind>,
    pub seller: Option<UserId>,
    pub only_available: bool,
    /// Case-insensitive substring of name or description.
    pub text: Option<String>,
}

impl CatalogFilter {
    pub fn kind(mut self, kind: ProductKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn seller(mut self, seller: UserId) -> Self {
        self.seller = Some(seller);
        self
    }

    pub fn available_only(mut self) -> Self {
        self.only_available = true;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        let Some(listing) = product.listing() else {
            return false;
        };

        if self.kind.is_some_and(|kind| kind != listing.kind) {
            return false;
        }
        if self.seller.is_some() && self.seller != product.seller_id() {
            return false;
        }
        if self.only_available && !product.is_available() {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                listing.name.to_lowercase().contains(&needle)
                    || listing.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{ProductCommand, ProductId, ProductListing, ProductPatch, SubmitProduct, UpdateProduct};
    use agromarket_core::Aggregate;
    use chrono::Utc;

    fn listed(seller: UserId, listing: ProductListing) -> Product {
        let product_id = ProductId::generate();
        let mut product = Product::empty(product_id);
        product
            .execute(&ProductCommand::SubmitProduct(SubmitProduct {
                product_id,
                seller_id: seller,
                listing,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        product
    }

    #[test]
    fn filters_combine_kind_seller_and_text() {
        let seller = UserId::new();
        let coffee = listed(
            seller,
            ProductListing::new("Tolima Geisha", ProductKind::Coffee, 60_000)
                .with_description("Floral notes"),
        );
        let panela = listed(UserId::new(), ProductListing::new("Panela block", ProductKind::Panela, 4_000));

        assert!(CatalogFilter::default().matches(&coffee));
        assert!(CatalogFilter::default().kind(ProductKind::Coffee).matches(&coffee));
        assert!(!CatalogFilter::default().kind(ProductKind::Coffee).matches(&panela));
        assert!(CatalogFilter::default().seller(seller).matches(&coffee));
        assert!(!CatalogFilter::default().seller(seller).matches(&panela));
        assert!(CatalogFilter::default().text("FLORAL").matches(&coffee));
        assert!(!CatalogFilter::default().text("floral").matches(&panela));
    }

    #[test]
    fn available_only_hides_withdrawn_listings() {
        let mut product = listed(UserId::new(), ProductListing::new("Panela", ProductKind::Panela, 4_000));
        product
            .execute(&ProductCommand::UpdateProduct(UpdateProduct {
                product_id: product.id_typed(),
                patch: ProductPatch {
                    available: Some(false),
                    ..ProductPatch::default()
                },
                occurred_at: Utc::now(),
            }))
            .unwrap();

        assert!(CatalogFilter::default().matches(&product));
        assert!(!CatalogFilter::default().available_only().matches(&product));
    }
}
