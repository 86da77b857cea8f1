//! Storefront Variants
//!
//! Catalog core of a storefront: product option groups, variant generation
//! and cart/order pricing.
//!
//! ## Features
//! - Option group normalization (color maps, dropdowns, free-form metadata)
//! - Deterministic variant enumeration with derived SKUs
//! - Variant lifecycle on option edits (replace or preserve)
//! - Cart line upsert/delete and all-or-nothing order placement
//! - Versioned document store boundary with compare-and-swap updates

pub mod config;
pub mod domain;
pub mod service;
pub mod store;

pub use config::{load_config, Config, ConfigError};
pub use domain::aggregates::{Cart, Order, OrderStatus, PaymentMethod, Product, ProductDraft};
pub use domain::options::{normalize_option_groups, OptionGroup, OptionKind, OptionMap};
pub use domain::pricing::{aggregate, resolve_line, LineItem, Totals};
pub use domain::variants::{generate_variants, Variant, VariantLifecycle, VariantRules};
pub use service::Storefront;
pub use store::{StoreError, Versioned};

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Error Types
// =============================================================================

/// A validation failure local to one unit: an option group, a line, a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub unit: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { unit: unit.into(), reason: reason.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.unit, self.reason) }
}

/// One line of a rejected order and why it failed.
#[derive(Debug)]
pub struct LineFailure {
    pub sku: String,
    pub error: CatalogError,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("no product or variant with SKU \"{sku}\"")]
    NotFound { sku: String },

    #[error("variant \"{sku}\" no longer exists on product {product_id}")]
    Consistency { sku: String, product_id: Uuid },

    #[error("order rejected, {} line(s) failed: {}", .failures.len(), failed_skus(.failures))]
    OrderRejected { failures: Vec<LineFailure> },

    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("no cart for \"{0}\"")]
    CartNotFound(String),

    #[error("cannot move order from {from:?} to {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn invalid(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationError::new(unit, reason)])
    }

    /// `NotFound` and its stale-variant case `Consistency`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Consistency { .. })
    }
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(errors: validator::ValidationErrors) -> Self { Self::Validation(field_errors("", &errors)) }
}

/// Flattens `validator` field errors into [`ValidationError`]s, sorted by field.
pub(crate) fn field_errors(prefix: &str, errors: &validator::ValidationErrors) -> Vec<ValidationError> {
    let mut out: Vec<_> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let reason = e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string());
                ValidationError::new(format!("{prefix}{field}"), reason)
            })
        })
        .collect();
    out.sort_by(|a, b| a.unit.cmp(&b.unit));
    out
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

fn failed_skus(failures: &[LineFailure]) -> String {
    failures.iter().map(|f| f.sku.as_str()).collect::<Vec<_>>().join(", ")
}

pub type Result<T> = std::result::Result<T, CatalogError>;
