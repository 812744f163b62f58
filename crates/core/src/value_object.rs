//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: rates, money
/// breakdowns and delivery details in this workspace. Two instances with the
/// same attributes are interchangeable.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct TaxRate(u32);
///
/// impl ValueObject for TaxRate {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
