//! In-process store backed by tokio `RwLock`ed maps.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CartStore, CatalogLookup, OrderStore, ProductStore, StoreError, Versioned};
use crate::domain::aggregates::{Cart, Order, Product};
use crate::domain::value_objects::Sku;
use crate::domain::variants::Variant;

#[derive(Default)]
struct Catalog {
    products: HashMap<Uuid, Versioned<Product>>,
    // Base and variant SKUs to the owning product.
    skus: HashMap<Sku, Uuid>,
    names: HashMap<String, Uuid>,
}

impl Catalog {
    /// Checks that `product` claims no SKU or name owned by another product.
    fn check_unique(&self, product: &Product) -> Result<(), StoreError> {
        let id = product.id();
        if let Some(sku) = product.skus().find(|sku| self.skus.get(*sku).is_some_and(|owner| *owner != id)) {
            return Err(StoreError::DuplicateKey { collection: "products", key: sku.to_string() });
        }
        if self.names.get(product.name()).is_some_and(|owner| *owner != id) {
            return Err(StoreError::DuplicateKey { collection: "products", key: product.name().to_string() });
        }
        Ok(())
    }

    fn index(&mut self, product: &Product) {
        let id = product.id();
        self.skus.extend(product.skus().map(|sku| (sku.clone(), id)));
        self.names.insert(product.name().to_string(), id);
    }

    fn unindex(&mut self, product: &Product) {
        for sku in product.skus() {
            self.skus.remove(sku);
        }
        self.names.remove(product.name());
    }
}

/// Shared handle; clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    catalog: Arc<RwLock<Catalog>>,
    carts: Arc<RwLock<HashMap<String, Versioned<Cart>>>>,
    orders: Arc<RwLock<HashMap<Uuid, Versioned<Order>>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn product_count(&self) -> usize { self.catalog.read().await.products.len() }
    pub async fn order_count(&self) -> usize { self.orders.read().await.len() }
}

fn check_version(collection: &'static str, key: impl ToString, expected: u64, actual: u64) -> Result<(), StoreError> {
    if expected != actual {
        return Err(StoreError::VersionConflict { collection, key: key.to_string(), expected, actual });
    }
    Ok(())
}

impl CatalogLookup for MemoryStore {
    async fn find_product_by_sku(&self, sku: &Sku) -> Result<Option<Product>, StoreError> {
        let catalog = self.catalog.read().await;
        let product = catalog
            .skus
            .get(sku)
            .and_then(|id| catalog.products.get(id))
            .filter(|p| p.doc.sku() == sku)
            .map(|p| p.doc.clone());
        Ok(product)
    }

    async fn find_product_by_variant_sku(&self, sku: &Sku) -> Result<Option<(Product, Variant)>, StoreError> {
        let catalog = self.catalog.read().await;
        let found = catalog
            .skus
            .get(sku)
            .and_then(|id| catalog.products.get(id))
            .and_then(|p| p.doc.variant(sku).map(|v| (p.doc.clone(), v.clone())));
        Ok(found)
    }
}

impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: Product) -> Result<Versioned<Product>, StoreError> {
        let mut catalog = self.catalog.write().await;
        if catalog.products.contains_key(&product.id()) {
            return Err(StoreError::DuplicateKey { collection: "products", key: product.id().to_string() });
        }
        catalog.check_unique(&product)?;
        catalog.index(&product);
        let stored = Versioned::new(1, product);
        catalog.products.insert(stored.doc.id(), stored.clone());
        debug!(product_id = %stored.doc.id(), "product inserted");
        Ok(stored)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Versioned<Product>>, StoreError> {
        Ok(self.catalog.read().await.products.get(&id).cloned())
    }

    async fn update_product(&self, product: Product, expected_version: u64) -> Result<Versioned<Product>, StoreError> {
        let mut catalog = self.catalog.write().await;
        let id = product.id();
        let current = catalog
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::Missing { collection: "products", key: id.to_string() })?;
        check_version("products", id, expected_version, current.version)?;
        catalog.check_unique(&product)?;

        catalog.unindex(&current.doc);
        catalog.index(&product);
        let stored = Versioned::new(current.version + 1, product);
        catalog.products.insert(id, stored.clone());
        debug!(product_id = %id, version = stored.version, "product updated");
        Ok(stored)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut catalog = self.catalog.write().await;
        let Some(removed) = catalog.products.remove(&id) else { return Ok(false) };
        catalog.unindex(&removed.doc);
        debug!(product_id = %id, "product deleted");
        Ok(true)
    }
}

impl CartStore for MemoryStore {
    async fn find_cart(&self, user_identifier: &str) -> Result<Option<Versioned<Cart>>, StoreError> {
        Ok(self.carts.read().await.get(user_identifier).cloned())
    }

    async fn save_cart(&self, cart: Cart, expected_version: Option<u64>) -> Result<Versioned<Cart>, StoreError> {
        let mut carts = self.carts.write().await;
        let key = cart.user_identifier().to_string();
        let version = match (carts.get(&key), expected_version) {
            (None, None) => 1,
            (Some(current), None) => {
                return Err(StoreError::VersionConflict { collection: "carts", key, expected: 0, actual: current.version })
            }
            (None, Some(_)) => return Err(StoreError::Missing { collection: "carts", key }),
            (Some(current), Some(expected)) => {
                check_version("carts", &key, expected, current.version)?;
                current.version + 1
            }
        };
        let stored = Versioned::new(version, cart);
        carts.insert(key, stored.clone());
        debug!(user = %stored.doc.user_identifier(), version, "cart saved");
        Ok(stored)
    }

    async fn delete_cart(&self, user_identifier: &str) -> Result<bool, StoreError> {
        Ok(self.carts.write().await.remove(user_identifier).is_some())
    }
}

impl OrderStore for MemoryStore {
    async fn create_order(&self, order: Order) -> Result<Versioned<Order>, StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateKey { collection: "orders", key: order.id().to_string() });
        }
        let stored = Versioned::new(1, order);
        orders.insert(stored.doc.id(), stored.clone());
        debug!(order_id = %stored.doc.id(), "order created");
        Ok(stored)
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Versioned<Order>>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update_order(&self, order: Order, expected_version: u64) -> Result<Versioned<Order>, StoreError> {
        let mut orders = self.orders.write().await;
        let id = order.id();
        let current = orders.get(&id).ok_or_else(|| StoreError::Missing { collection: "orders", key: id.to_string() })?;
        check_version("orders", id, expected_version, current.version)?;
        let stored = Versioned::new(current.version + 1, order);
        orders.insert(id, stored.clone());
        debug!(order_id = %id, version = stored.version, "order updated");
        Ok(stored)
    }
}
