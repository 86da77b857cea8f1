//! Environment-driven storefront settings.

use thiserror::Error;

use crate::domain::value_objects::DEFAULT_CURRENCY;
use crate::domain::variants::{VariantLifecycle, VariantRules, DEFAULT_MAX_VARIANTS};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Currency of carts that hold no lines yet.
    pub currency: String,
    pub lifecycle: VariantLifecycle,
    pub max_variants: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            lifecycle: VariantLifecycle::default(),
            max_variants: DEFAULT_MAX_VARIANTS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn variant_rules(&self) -> VariantRules {
        VariantRules { lifecycle: self.lifecycle, max_variants: self.max_variants }
    }
}

/// Loads `.env` if present, then reads the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an unusable value.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    load_config_from_env()
}

/// Like [`load_config`] without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an unusable value.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    build_config(|key| std::env::var(key))
}

fn build_config<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar { var: var.to_string(), reason };
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).map(|v| v.trim().to_string()).unwrap_or_else(|_| default.to_string())
    };

    let currency = or_default("STOREFRONT_CURRENCY", DEFAULT_CURRENCY).to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("STOREFRONT_CURRENCY", format!("\"{currency}\" is not a three-letter currency code")));
    }

    let lifecycle = or_default("STOREFRONT_VARIANT_LIFECYCLE", "preserve")
        .parse::<VariantLifecycle>()
        .map_err(|e| invalid("STOREFRONT_VARIANT_LIFECYCLE", e))?;

    let max_variants = or_default("STOREFRONT_MAX_VARIANTS", &DEFAULT_MAX_VARIANTS.to_string())
        .parse::<usize>()
        .map_err(|e| invalid("STOREFRONT_MAX_VARIANTS", e.to_string()))?;
    if max_variants == 0 {
        return Err(invalid("STOREFRONT_MAX_VARIANTS", "must be at least 1".to_string()));
    }

    let log_level = or_default("STOREFRONT_LOG_LEVEL", "info");

    Ok(Config { currency, lifecycle, max_variants, log_level })
}
