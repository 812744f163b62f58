//! Aggregate sales figures over a set of orders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agromarket_core::{DomainError, DomainResult};

use crate::order::{Order, OrderStatus};

/// Summary statistics for a set of orders.
///
/// Revenue covers orders in every status, cancelled ones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub order_count: u64,
    pub total_revenue: u64,
    /// `total_revenue / order_count`, rounded down; zero when there are no orders.
    pub average_order_value: u64,
    /// Every status is present, with zero for statuses no order is in.
    pub by_status: BTreeMap<OrderStatus, u64>,
}

impl OrderStats {
    /// Fails with `InvariantViolation` if revenue does not fit in a `u64`.
    pub fn from_orders<'a, I>(orders: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut by_status: BTreeMap<OrderStatus, u64> =
            OrderStatus::ALL.iter().map(|status| (*status, 0)).collect();
        let mut order_count = 0u64;
        let mut total_revenue = 0u64;

        for order in orders {
            order_count += 1;
            total_revenue = total_revenue
                .checked_add(order.total())
                .ok_or_else(|| DomainError::invariant("order revenue overflow"))?;
            *by_status.entry(order.status()).or_default() += 1;
        }

        let average_order_value = total_revenue.checked_div(order_count).unwrap_or(0);

        Ok(Self {
            order_count,
            total_revenue,
            average_order_value,
            by_status,
        })
    }

    pub fn count_in(&self, status: OrderStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
