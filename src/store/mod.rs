//! Persistence boundary.
//!
//! Every document carries a `version` bumped on each write. Updates name the
//! version they were computed from and fail with
//! [`StoreError::VersionConflict`] when another writer got there first.

pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, Product};
use crate::domain::value_objects::Sku;
use crate::domain::variants::Variant;

/// A document together with the version it was read at.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub doc: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, doc: T) -> Self { Self { version, doc } }
    pub fn into_inner(self) -> T { self.doc }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{collection} {key} changed concurrently (expected version {expected}, found {actual})")]
    VersionConflict { collection: &'static str, key: String, expected: u64, actual: u64 },

    #[error("{collection} key {key} already exists")]
    DuplicateKey { collection: &'static str, key: String },

    #[error("{collection} {key} does not exist")]
    Missing { collection: &'static str, key: String },
}

/// Read-only catalog lookups used by line resolution.
#[allow(async_fn_in_trait)]
pub trait CatalogLookup {
    /// The product whose base SKU is `sku`.
    async fn find_product_by_sku(&self, sku: &Sku) -> Result<Option<Product>, StoreError>;
    /// The product owning the variant `sku`, with that variant.
    async fn find_product_by_variant_sku(&self, sku: &Sku) -> Result<Option<(Product, Variant)>, StoreError>;
}

#[allow(async_fn_in_trait)]
pub trait ProductStore: CatalogLookup {
    /// Stores a new product at version 1. Base and variant SKUs must be
    /// unused by every other product, and so must the name.
    async fn insert_product(&self, product: Product) -> Result<Versioned<Product>, StoreError>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Versioned<Product>>, StoreError>;
    async fn update_product(&self, product: Product, expected_version: u64) -> Result<Versioned<Product>, StoreError>;
    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[allow(async_fn_in_trait)]
pub trait CartStore {
    async fn find_cart(&self, user_identifier: &str) -> Result<Option<Versioned<Cart>>, StoreError>;
    /// `expected_version` is `None` for a cart that has never been saved; if
    /// another writer created it meanwhile the save is a `VersionConflict`
    /// against version 0.
    async fn save_cart(&self, cart: Cart, expected_version: Option<u64>) -> Result<Versioned<Cart>, StoreError>;
    async fn delete_cart(&self, user_identifier: &str) -> Result<bool, StoreError>;
}

#[allow(async_fn_in_trait)]
pub trait OrderStore {
    async fn create_order(&self, order: Order) -> Result<Versioned<Order>, StoreError>;
    async fn find_order(&self, id: Uuid) -> Result<Option<Versioned<Order>>, StoreError>;
    async fn update_order(&self, order: Order, expected_version: u64) -> Result<Versioned<Order>, StoreError>;
}
