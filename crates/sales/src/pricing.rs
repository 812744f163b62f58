//! Cart and order pricing.
//!
//! ```text
//! subtotal       = Σ unit_price × quantity
//! tax            = Σ unit_price × quantity × tax_rate          (default 19 %)
//! withholding    = Σ unit_price × quantity × withholding_rate  (default 4 %)
//! shipping_total = Σ shipping_cost                             (per line, default 0)
//! total          = subtotal + tax − withholding + shipping_total
//! ```
//!
//! Tax and withholding are accumulated exactly in peso × basis-point units and
//! rounded half-up to whole pesos once, on the aggregate. `total` is derived
//! from the rounded parts, so the identity above holds exactly.

use serde::{Deserialize, Serialize};

use agromarket_core::rate::BASIS_POINTS_PER_WHOLE;
use agromarket_core::{DomainError, DomainResult, Rate, ValueObject};
use agromarket_products::{Product, ProductId};

/// VAT applied when a line item carries no rate of its own.
pub const DEFAULT_VAT_RATE: Rate = Rate::from_percent(19);

/// Withholding at source applied when a line item carries no rate of its own.
pub const DEFAULT_WITHHOLDING_RATE: Rate = Rate::from_percent(4);

/// Rates used for line items that do not specify their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub default_vat: Rate,
    pub default_withholding: Rate,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            default_vat: DEFAULT_VAT_RATE,
            default_withholding: DEFAULT_WITHHOLDING_RATE,
        }
    }
}

impl ValueObject for PricingPolicy {}

/// One product entry in a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price in pesos.
    pub unit_price: u64,
    pub tax_rate: Option<Rate>,
    pub withholding_rate: Option<Rate>,
    /// Flat shipping cost for the whole line.
    pub shipping_cost: Option<u64>,
}

impl ValueObject for LineItem {}

impl LineItem {
    /// A single unit at `unit_price`, using the default rates and free shipping.
    pub fn new(product_id: ProductId, unit_price: u64) -> Self {
        Self {
            product_id,
            quantity: 1,
            unit_price,
            tax_rate: None,
            withholding_rate: None,
            shipping_cost: None,
        }
    }

    /// Price a catalog listing: its own price, taxes and shipping cost.
    pub fn for_product(product: &Product, quantity: u32) -> DomainResult<Self> {
        if !product.is_available() {
            return Err(DomainError::validation(format!(
                "product {} is not available for sale",
                product.id_typed()
            )));
        }
        let taxes = product.taxes();
        Ok(Self {
            product_id: product.id_typed(),
            quantity,
            unit_price: product.price(),
            tax_rate: taxes.map(|t| t.vat),
            withholding_rate: taxes.map(|t| t.withholding),
            shipping_cost: product.shipping_cost(),
        })
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = Some(rate);
        self
    }

    pub fn with_withholding_rate(mut self, rate: Rate) -> Self {
        self.withholding_rate = Some(rate);
        self
    }

    pub fn with_shipping_cost(mut self, cost: u64) -> Self {
        self.shipping_cost = Some(cost);
        self
    }

    /// `unit_price × quantity`, exact.
    pub fn amount(&self) -> u128 {
        u128::from(self.unit_price) * u128::from(self.quantity)
    }
}

/// Money breakdown of an order. `total` is always derived from the parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TotalsRepr")]
pub struct OrderTotals {
    subtotal: u64,
    tax: u64,
    withholding: u64,
    shipping_total: u64,
    total: u64,
}

impl ValueObject for OrderTotals {}

impl OrderTotals {
    pub fn from_components(
        subtotal: u64,
        tax: u64,
        withholding: u64,
        shipping_total: u64,
    ) -> DomainResult<Self> {
        let total = subtotal
            .checked_add(tax)
            .and_then(|v| v.checked_add(shipping_total))
            .and_then(|v| v.checked_sub(withholding))
            .ok_or_else(|| DomainError::invariant("order total out of range"))?;

        Ok(Self {
            subtotal,
            tax,
            withholding,
            shipping_total,
            total,
        })
    }

    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    pub fn tax(&self) -> u64 {
        self.tax
    }

    pub fn withholding(&self) -> u64 {
        self.withholding
    }

    pub fn shipping_total(&self) -> u64 {
        self.shipping_total
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[derive(Deserialize)]
struct TotalsRepr {
    subtotal: u64,
    tax: u64,
    withholding: u64,
    shipping_total: u64,
    total: u64,
}

impl TryFrom<TotalsRepr> for OrderTotals {
    type Error = DomainError;

    fn try_from(repr: TotalsRepr) -> Result<Self, Self::Error> {
        let totals =
            Self::from_components(repr.subtotal, repr.tax, repr.withholding, repr.shipping_total)?;
        if totals.total != repr.total {
            return Err(DomainError::invariant(
                "total does not equal subtotal + tax - withholding + shipping",
            ));
        }
        Ok(totals)
    }
}

/// Price a sequence of line items. An empty sequence prices to all zeros.
pub fn price_items(items: &[LineItem], policy: &PricingPolicy) -> DomainResult<OrderTotals> {
    let mut subtotal: u128 = 0;
    let mut tax_bps: u128 = 0;
    let mut withholding_bps: u128 = 0;
    let mut shipping: u128 = 0;

    for item in items {
        let amount = item.amount();
        let vat = item.tax_rate.unwrap_or(policy.default_vat);
        let withholding = item.withholding_rate.unwrap_or(policy.default_withholding);

        subtotal += amount;
        tax_bps += amount * u128::from(vat.basis_points());
        withholding_bps += amount * u128::from(withholding.basis_points());
        shipping += u128::from(item.shipping_cost.unwrap_or(0));
    }

    OrderTotals::from_components(
        to_pesos(subtotal)?,
        to_pesos(round_half_up(tax_bps))?,
        to_pesos(round_half_up(withholding_bps))?,
        to_pesos(shipping)?,
    )
}

fn round_half_up(basis_point_units: u128) -> u128 {
    let whole = u128::from(BASIS_POINTS_PER_WHOLE);
    (basis_point_units + whole / 2) / whole
}

fn to_pesos(value: u128) -> DomainResult<u64> {
    u64::try_from(value).map_err(|_| DomainError::invariant("amount overflow"))
}
