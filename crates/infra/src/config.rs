//! Configuration loading and representation.
//!
//! Values come from environment variables. Unset variables fall back to the
//! defaults below; set but unparsable ones are errors.

use thiserror::Error;

use agromarket_core::Rate;
use agromarket_observability::LogFormat;
use agromarket_sales::PricingPolicy;

pub const VAT_BPS_VAR: &str = "AGROMARKET_VAT_BPS";
pub const WITHHOLDING_BPS_VAR: &str = "AGROMARKET_WITHHOLDING_BPS";
pub const EXPIRY_WINDOW_DAYS_VAR: &str = "AGROMARKET_EXPIRY_WINDOW_DAYS";
pub const LOG_FORMAT_VAR: &str = "AGROMARKET_LOG_FORMAT";

/// Days ahead of expiry at which registry documents are flagged.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    pub pricing: PricingPolicy,
    pub expiry_window_days: u32,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_vat = match lookup(VAT_BPS_VAR) {
            Some(raw) => parse_rate(VAT_BPS_VAR, &raw)?,
            None => defaults.pricing.default_vat,
        };
        let default_withholding = match lookup(WITHHOLDING_BPS_VAR) {
            Some(raw) => parse_rate(WITHHOLDING_BPS_VAR, &raw)?,
            None => defaults.pricing.default_withholding,
        };
        let expiry_window_days = match lookup(EXPIRY_WINDOW_DAYS_VAR) {
            Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                invalid(EXPIRY_WINDOW_DAYS_VAR, &raw, e.to_string())
            })?,
            None => defaults.expiry_window_days,
        };
        let log_format = match lookup(LOG_FORMAT_VAR) {
            Some(raw) => raw
                .parse()
                .map_err(|e: agromarket_observability::ParseLogFormatError| {
                    invalid(LOG_FORMAT_VAR, &raw, e.to_string())
                })?,
            None => defaults.log_format,
        };

        Ok(Self {
            pricing: PricingPolicy {
                default_vat,
                default_withholding,
            },
            expiry_window_days,
            log_format,
        })
    }
}

fn parse_rate(var: &'static str, raw: &str) -> Result<Rate, ConfigError> {
    let bps: u32 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(var, raw, e.to_string()))?;
    Rate::from_basis_points(bps).map_err(|e| invalid(var, raw, e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pricing.default_vat, Rate::from_percent(19));
        assert_eq!(config.expiry_window_days, 15);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (VAT_BPS_VAR, "500"),
            (WITHHOLDING_BPS_VAR, "250"),
            (EXPIRY_WINDOW_DAYS_VAR, "30"),
            (LOG_FORMAT_VAR, "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.pricing.default_vat, Rate::from_percent(5));
        assert_eq!(config.pricing.default_withholding.basis_points(), 250);
        assert_eq!(config.expiry_window_days, 30);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        for (var, value) in [
            (VAT_BPS_VAR, "nineteen"),
            (WITHHOLDING_BPS_VAR, "10001"),
            (EXPIRY_WINDOW_DAYS_VAR, "-1"),
            (LOG_FORMAT_VAR, "xml"),
        ] {
            let err = AppConfig::from_lookup(lookup_from(&[(var, value)])).unwrap_err();
            let ConfigError::Invalid { var: reported, .. } = err;
            assert_eq!(reported, var);
        }
    }
}
