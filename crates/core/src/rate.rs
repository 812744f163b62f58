//! Percentage rates expressed in basis points.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Basis points in one whole (100 %).
pub const BASIS_POINTS_PER_WHOLE: u32 = 10_000;

/// A rate between 0 % and 100 %, stored in basis points (`1900` = 19 %).
///
/// Used for VAT and withholding-at-source rates so fractional percentages
/// such as 2.5 % stay exact.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Rate(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    /// Build a rate from whole percent (`19` = 19 %).
    ///
    /// # Panics
    ///
    /// If `percent` is above 100. In a `const` item that is a compile error.
    /// Use [`Rate::from_basis_points`] for values that come from input.
    pub const fn from_percent(percent: u32) -> Self {
        assert!(percent <= 100, "rate above 100%");
        Self(percent * 100)
    }

    pub fn from_basis_points(bps: u32) -> Result<Self, DomainError> {
        if bps > BASIS_POINTS_PER_WHOLE {
            return Err(DomainError::validation(format!(
                "rate of {bps} basis points exceeds 100%"
            )));
        }
        Ok(Self(bps))
    }

    pub const fn basis_points(self) -> u32 {
        self.0
    }
}

impl ValueObject for Rate {}

impl TryFrom<u32> for Rate {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_basis_points(value)
    }
}

impl From<Rate> for u32 {
    fn from(value: Rate) -> Self {
        value.0
    }
}

impl core::fmt::Display for Rate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let whole = self.0 / 100;
        match self.0 % 100 {
            0 => write!(f, "{whole}%"),
            frac => write!(f, "{whole}.{frac:02}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_above_one_hundred_percent_are_rejected() {
        assert!(Rate::from_basis_points(10_000).is_ok());
        assert!(matches!(
            Rate::from_basis_points(10_001),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn whole_percent_covers_zero_to_one_hundred() {
        assert_eq!(Rate::from_percent(0), Rate::ZERO);
        assert_eq!(Rate::from_percent(100).basis_points(), BASIS_POINTS_PER_WHOLE);
    }

    #[test]
    #[should_panic(expected = "rate above 100%")]
    fn whole_percent_above_one_hundred_is_rejected() {
        let _ = Rate::from_percent(250);
    }

    #[test]
    fn serialized_rates_round_trip_and_reject_out_of_range() {
        let json = serde_json::to_string(&Rate::from_percent(19)).unwrap();
        assert_eq!(json, "1900");
        assert_eq!(serde_json::from_str::<Rate>(&json).unwrap(), Rate::from_percent(19));
        assert!(serde_json::from_str::<Rate>("25000").is_err());
    }

    #[test]
    fn display_keeps_fractional_percent() {
        assert_eq!(Rate::from_percent(19).to_string(), "19%");
        assert_eq!(Rate::from_basis_points(250).unwrap().to_string(), "2.50%");
    }
}
