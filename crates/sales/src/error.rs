//! Order failure kinds.

use thiserror::Error;

use agromarket_core::DomainError;
use agromarket_products::ProductId;

use crate::order::{OrderId, OrderStatus};

/// Failures surfaced by order placement and the order lifecycle.
///
/// Buyers see a single generic notice (`user_message`), but the variant is
/// kept so callers and tests can tell the cases apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },

    #[error("product {0} has no stock record")]
    UnknownProduct(ProductId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("cannot {operation} order {order_id} while it is {status}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
        operation: &'static str,
    },

    #[error("order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl OrderError {
    /// The notice shown to buyers, whatever went wrong.
    pub fn user_message(&self) -> &'static str {
        "We could not process your order. Please try again."
    }

    /// Whether the failure stems from the request itself rather than the backend.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, OrderError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agromarket_core::AggregateId;

    #[test]
    fn messages_name_the_offending_product_and_states() {
        let product_id = ProductId::generate();
        let err = OrderError::InsufficientStock {
            product_id,
            requested: 5,
            available: 2,
        };
        let text = err.to_string();
        assert!(text.contains(&product_id.to_string()));
        assert!(text.contains("requested 5, available 2"));

        let err = OrderError::InvalidTransition {
            order_id: OrderId::new(AggregateId::new()),
            from: OrderStatus::Paid,
            to: OrderStatus::Delivered,
        };
        assert!(err.to_string().ends_with("from paid to delivered"));
    }

    #[test]
    fn buyers_get_a_generic_notice() {
        let a = OrderError::UnknownProduct(ProductId::generate());
        let b = OrderError::Storage("lock poisoned".into());
        assert_eq!(a.user_message(), b.user_message());
        assert!(a.is_rejection());
        assert!(!b.is_rejection());
    }
}
