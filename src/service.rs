//! Storefront flows over a store.
//!
//! Every operation reads what it needs, computes with the pure domain code and
//! writes back with the version it read. A lost race surfaces as
//! `StoreError::VersionConflict`; nothing here retries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::domain::aggregates::{Address, Cart, Order, OrderStatus, PaymentMethod, Product, ProductDraft};
use crate::domain::events::log_events;
use crate::domain::pricing::{resolve_line, LineItem};
use crate::domain::value_objects::{Quantity, Sku};
use crate::domain::variants::VariantChanges;
use crate::store::{CartStore, OrderStore, ProductStore, Versioned};
use crate::{field_errors, CatalogError, LineFailure, ValidationError};

/// One requested line of an order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineRequest {
    pub sku: String,
    pub quantity: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct PlaceOrder {
    #[validate(length(min = 1, message = "an order needs at least one line"))]
    pub items: Vec<LineRequest>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
}

impl PlaceOrder {
    fn check(&self) -> crate::Result<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.validate() { errors.extend(field_errors("", &e)); }
        if let Err(e) = self.shipping_address.validate() { errors.extend(field_errors("shipping_address.", &e)); }
        if let Err(e) = self.billing_address.validate() { errors.extend(field_errors("billing_address.", &e)); }
        if errors.is_empty() { Ok(()) } else { Err(CatalogError::Validation(errors)) }
    }

    /// Sums the quantities of repeated SKUs, keeping first-seen order.
    fn merged_items(&self) -> (Vec<(String, Quantity)>, Vec<LineFailure>) {
        let mut merged: Vec<(String, Quantity)> = Vec::with_capacity(self.items.len());
        let mut failures = Vec::new();
        for item in &self.items {
            let sku = item.sku.trim();
            let quantity = match Quantity::new(item.quantity) {
                Ok(q) => q,
                Err(e) => {
                    failures.push(LineFailure { sku: sku.to_string(), error: CatalogError::invalid("quantity", e.to_string()) });
                    continue;
                }
            };
            match merged.iter_mut().find(|(s, _)| s == sku) {
                Some((_, total)) => *total = total.saturating_add(quantity),
                None => merged.push((sku.to_string(), quantity)),
            }
        }
        (merged, failures)
    }
}

/// A refreshed cart and the lines that could no longer be priced.
#[derive(Debug)]
pub struct CartRefresh {
    pub cart: Versioned<Cart>,
    /// Lines kept at their previous price because their SKU vanished.
    pub stale: Vec<LineFailure>,
}

pub struct Storefront<S> {
    store: S,
    config: Config,
}

impl<S> Storefront<S>
where
    S: ProductStore + CartStore + OrderStore,
{
    pub fn new(store: S, config: Config) -> Self { Self { store, config } }

    pub fn store(&self) -> &S { &self.store }
    pub fn config(&self) -> &Config { &self.config }

    // ---------------------------------------------------------------------
    // Products
    // ---------------------------------------------------------------------

    #[instrument(skip(self, draft), fields(sku = %draft.sku))]
    pub async fn create_product(&self, draft: ProductDraft) -> crate::Result<Versioned<Product>> {
        let mut product = Product::create(draft, &self.config.variant_rules())?;
        let events = product.take_events();
        let stored = self.store.insert_product(product).await?;
        log_events(&events);
        Ok(stored)
    }

    pub async fn get_product(&self, id: Uuid) -> crate::Result<Versioned<Product>> {
        self.store.find_product(id).await?.ok_or(CatalogError::ProductNotFound(id))
    }

    /// Applies an edit and regenerates variants under the configured lifecycle.
    #[instrument(skip(self, draft))]
    pub async fn update_product(
        &self,
        id: Uuid,
        draft: ProductDraft,
        expected_version: u64,
    ) -> crate::Result<(Versioned<Product>, VariantChanges)> {
        let Versioned { doc: mut product, .. } = self.get_product(id).await?;
        let changes = product.apply_edit(draft, &self.config.variant_rules())?;
        let events = product.take_events();
        let stored = self.store.update_product(product, expected_version).await?;
        log_events(&events);
        if !changes.removed.is_empty() {
            info!(product_id = %id, removed = ?changes.removed, "variants removed; carts holding them go stale");
        }
        Ok((stored, changes))
    }

    #[instrument(skip(self))]
    pub async fn update_variant(
        &self,
        id: Uuid,
        sku: &str,
        stock: Option<u32>,
        price_adjustment: Option<Decimal>,
        expected_version: u64,
    ) -> crate::Result<Versioned<Product>> {
        let sku = parse_sku(sku)?;
        let Versioned { doc: mut product, .. } = self.get_product(id).await?;
        product.update_variant(&sku, stock, price_adjustment)?;
        Ok(self.store.update_product(product, expected_version).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> crate::Result<()> {
        if !self.store.delete_product(id).await? {
            return Err(CatalogError::ProductNotFound(id));
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Carts
    // ---------------------------------------------------------------------

    /// Sets the quantity of one cart line; zero or less removes it.
    ///
    /// The cart is created on its first upsert; removing from a user without a
    /// cart is `CartNotFound` and writes nothing. A failure leaves the stored
    /// cart untouched.
    #[instrument(skip(self))]
    pub async fn upsert_cart_line(&self, user_identifier: &str, sku: &str, quantity: i64) -> crate::Result<Versioned<Cart>> {
        let quantity = Quantity::for_cart(quantity).map_err(|e| CatalogError::invalid("quantity", e.to_string()))?;
        let (mut cart, version) = match self.store.find_cart(user_identifier).await? {
            Some(found) => (found.doc, Some(found.version)),
            None => (Cart::new(user_identifier, &self.config.currency), None),
        };

        match quantity {
            None => {
                let sku = parse_sku(sku)?;
                if !cart.remove_line(&sku)? {
                    let version = version.ok_or_else(|| CatalogError::CartNotFound(user_identifier.to_string()))?;
                    return Ok(Versioned::new(version, cart));
                }
            }
            Some(quantity) => {
                let line = match resolve_line(sku, quantity, &self.store).await {
                    Ok(line) => line,
                    Err(e) => return Err(stale_or(&cart, sku, e)),
                };
                cart.upsert_line(line)?;
            }
        }

        let events = cart.take_events();
        let stored = self.store.save_cart(cart, version).await?;
        log_events(&events);
        Ok(stored)
    }

    pub async fn get_cart(&self, user_identifier: &str) -> crate::Result<Versioned<Cart>> {
        self.store
            .find_cart(user_identifier)
            .await?
            .ok_or_else(|| CatalogError::CartNotFound(user_identifier.to_string()))
    }

    /// Re-resolves every line at current prices.
    ///
    /// Lines whose SKU vanished are kept as they were and reported in
    /// [`CartRefresh::stale`].
    #[instrument(skip(self))]
    pub async fn refresh_cart(&self, user_identifier: &str) -> crate::Result<CartRefresh> {
        let Versioned { version, doc: mut cart } = self.get_cart(user_identifier).await?;
        let mut fresh = Vec::with_capacity(cart.item_count());
        let mut stale = Vec::new();

        for line in cart.lines().values() {
            match resolve_line(line.sku.as_str(), line.quantity, &self.store).await {
                Ok(resolved) => fresh.push(resolved),
                Err(e) if e.is_not_found() => stale.push(LineFailure {
                    sku: line.sku.to_string(),
                    error: CatalogError::Consistency { sku: line.sku.to_string(), product_id: line.product_id },
                }),
                Err(e) => return Err(e),
            }
        }
        if !stale.is_empty() {
            warn!(user = %user_identifier, stale = stale.len(), "cart holds lines that no longer resolve");
        }

        cart.reprice(fresh)?;
        let events = cart.take_events();
        let stored = self.store.save_cart(cart, Some(version)).await?;
        log_events(&events);
        Ok(CartRefresh { cart: stored, stale })
    }

    /// Drops the cart; returns whether there was one.
    pub async fn clear_cart(&self, user_identifier: &str) -> crate::Result<bool> {
        Ok(self.store.delete_cart(user_identifier).await?)
    }

    // ---------------------------------------------------------------------
    // Orders
    // ---------------------------------------------------------------------

    /// Places an order only if every line resolves.
    ///
    /// Otherwise nothing is persisted and [`CatalogError::OrderRejected`]
    /// lists every failing SKU.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> crate::Result<Versioned<Order>> {
        request.check()?;
        let (items, mut failures) = request.merged_items();

        let mut lines: Vec<LineItem> = Vec::with_capacity(items.len());
        for (sku, quantity) in items {
            match resolve_line(&sku, quantity, &self.store).await {
                Ok(line) => lines.push(line),
                Err(error) => failures.push(LineFailure { sku, error }),
            }
        }
        if !failures.is_empty() {
            let skus: Vec<_> = failures.iter().map(|f| f.sku.as_str()).collect();
            warn!(?skus, "order rejected");
            return Err(CatalogError::OrderRejected { failures });
        }

        let PlaceOrder { shipping_address, billing_address, payment_method, .. } = request;
        let mut order = Order::place(lines, shipping_address, billing_address, payment_method, &self.config.currency)?;
        let events = order.take_events();
        let stored = self.store.create_order(order).await?;
        log_events(&events);
        Ok(stored)
    }

    pub async fn get_order(&self, id: Uuid) -> crate::Result<Versioned<Order>> {
        self.store.find_order(id).await?.ok_or(CatalogError::OrderNotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> crate::Result<Versioned<Order>> {
        let Versioned { version, doc: mut order } = self.get_order(id).await?;
        if order.status() == status {
            return Ok(Versioned::new(version, order));
        }
        order.set_status(status)?;
        let events = order.take_events();
        let stored = self.store.update_order(order, version).await?;
        log_events(&events);
        Ok(stored)
    }
}

fn parse_sku(sku: &str) -> crate::Result<Sku> {
    Sku::new(sku).map_err(|e| CatalogError::Validation(vec![ValidationError::new("sku", format!("{e}: \"{sku}\""))]))
}

/// A SKU already in the cart that no longer resolves means its variant was
/// removed, which is reported as a consistency error instead of `NotFound`.
fn stale_or(cart: &Cart, sku: &str, error: CatalogError) -> CatalogError {
    let existing = Sku::new(sku).ok().and_then(|sku| cart.line(&sku).map(|line| (sku, line.product_id)));
    match (error, existing) {
        (CatalogError::NotFound { .. }, Some((sku, product_id))) => CatalogError::Consistency { sku: sku.to_string(), product_id },
        (error, _) => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::options::OptionGroup;
    use crate::domain::value_objects::PriceData;
    use crate::store::memory::MemoryStore;
    use crate::StoreError;

    fn storefront() -> Storefront<MemoryStore> { Storefront::new(MemoryStore::new(), Config::default()) }

    fn shirt_draft(sizes: &[&str]) -> ProductDraft {
        ProductDraft {
            option_groups: vec![OptionGroup::colors("Color", [("Red", "#f00"), ("Blue", "#00f")]), OptionGroup::dropdown("Size", sizes.iter().copied())],
            ..ProductDraft::new("Shirt", "SHIRT", 10, PriceData::new(Decimal::new(100, 0), "MAD").with_discount(Decimal::new(80, 0)))
        }
    }

    fn address() -> Address {
        Address { name: "Test Customer".into(), street1: "12 Rue Atlas".into(), city: "Rabat".into(), country: "MA".into(), ..Default::default() }
    }

    fn order_of(items: &[(&str, i64)]) -> PlaceOrder {
        PlaceOrder {
            items: items.iter().map(|(sku, quantity)| LineRequest { sku: sku.to_string(), quantity: *quantity }).collect(),
            shipping_address: address(),
            billing_address: address(),
            payment_method: PaymentMethod::CreditCard,
        }
    }

    #[tokio::test]
    async fn create_product_generates_variants() {
        let shop = storefront();
        let stored = shop.create_product(shirt_draft(&["S", "M"])).await.unwrap();
        assert_eq!(stored.version, 1);
        let skus: Vec<_> = stored.doc.variants().iter().map(|v| v.sku.as_str()).collect();
        assert_eq!(skus, ["SHIRT-RED-S", "SHIRT-RED-M", "SHIRT-BLUE-S", "SHIRT-BLUE-M"]);
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let shop = storefront();
        let stored = shop.create_product(shirt_draft(&["S"])).await.unwrap();
        shop.update_product(stored.doc.id(), shirt_draft(&["S", "M"]), stored.version).await.unwrap();

        let err = shop.update_product(stored.doc.id(), shirt_draft(&["L"]), stored.version).await.unwrap_err();
        assert!(matches!(err, CatalogError::Store(StoreError::VersionConflict { expected: 1, actual: 2, .. })));
    }

    #[tokio::test]
    async fn cart_line_upsert_and_delete_by_zero() {
        let shop = storefront();
        shop.create_product(shirt_draft(&["S", "M"])).await.unwrap();

        let cart = shop.upsert_cart_line("user_1", "SHIRT-RED-S", 3).await.unwrap();
        assert_eq!(cart.version, 1);
        assert_eq!(cart.doc.total_amount().amount(), Decimal::new(240, 0));

        let cart = shop.upsert_cart_line("user_1", "SHIRT-RED-S", 0).await.unwrap();
        assert!(cart.doc.is_empty());
        assert!(cart.doc.total_amount().amount().is_zero());
        assert!(cart.doc.product_ids().is_empty());
    }

    #[tokio::test]
    async fn removing_from_a_missing_cart_writes_nothing() {
        let shop = storefront();
        let err = shop.upsert_cart_line("ghost", "ANY", 0).await.unwrap_err();
        assert!(matches!(err, CatalogError::CartNotFound(ref user) if user == "ghost"));
        assert!(shop.get_cart("ghost").await.is_err());
    }

    #[tokio::test]
    async fn out_of_range_line_total_is_rejected() {
        let shop = storefront();
        let price = PriceData::new(Decimal::from_i128_with_scale(10_i128.pow(20), 0), "MAD");
        shop.create_product(ProductDraft::new("Gold Bar", "GOLD", 1, price)).await.unwrap();

        let err = shop.upsert_cart_line("user_1", "GOLD", 4_000_000_000).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref errors) if errors[0].unit == "GOLD"));
        assert!(shop.get_cart("user_1").await.is_err());

        let Err(CatalogError::Validation(_)) = shop.place_order(order_of(&[("GOLD", 4_000_000_000)])).await else {
            panic!("expected validation failure")
        };
        assert_eq!(shop.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn failed_cart_line_leaves_cart_alone() {
        let shop = storefront();
        shop.create_product(shirt_draft(&["S"])).await.unwrap();
        shop.upsert_cart_line("user_1", "SHIRT-RED-S", 1).await.unwrap();

        assert!(shop.upsert_cart_line("user_1", "SHIRT-GREEN-S", 1).await.unwrap_err().is_not_found());
        let cart = shop.get_cart("user_1").await.unwrap();
        assert_eq!(cart.version, 1);
        assert_eq!(cart.doc.item_count(), 1);
    }

    #[tokio::test]
    async fn vanished_variant_in_cart_is_a_consistency_error() {
        let shop = storefront();
        let product = shop.create_product(shirt_draft(&["S", "M"])).await.unwrap();
        shop.upsert_cart_line("user_1", "SHIRT-RED-M", 1).await.unwrap();
        shop.update_product(product.doc.id(), shirt_draft(&["S"]), product.version).await.unwrap();

        let err = shop.upsert_cart_line("user_1", "SHIRT-RED-M", 2).await.unwrap_err();
        assert!(matches!(err, CatalogError::Consistency { ref sku, product_id } if sku == "SHIRT-RED-M" && product_id == product.doc.id()));

        let refresh = shop.refresh_cart("user_1").await.unwrap();
        assert_eq!(refresh.stale.len(), 1);
        assert!(matches!(refresh.stale[0].error, CatalogError::Consistency { .. }));
        assert_eq!(refresh.cart.doc.item_count(), 1);
    }

    #[tokio::test]
    async fn order_with_unknown_sku_is_rejected_whole() {
        let shop = storefront();
        shop.create_product(shirt_draft(&["S", "M"])).await.unwrap();

        let err = shop
            .place_order(order_of(&[("SHIRT-RED-S", 1), ("SHIRT-RED-M", 1), ("SHIRT-BLUE-S", 1), ("SHIRT-PINK-XL", 1)]))
            .await
            .unwrap_err();
        match err {
            CatalogError::OrderRejected { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].sku, "SHIRT-PINK-XL");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(shop.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_order_lines_are_merged() {
        let shop = storefront();
        shop.create_product(shirt_draft(&["S"])).await.unwrap();
        let order = shop.place_order(order_of(&[("SHIRT-RED-S", 1), ("SHIRT-BLUE-S", 1), ("SHIRT-RED-S", 2)])).await.unwrap();
        assert_eq!(order.doc.lines().len(), 2);
        assert_eq!(order.doc.lines()[&Sku::new("SHIRT-RED-S").unwrap()].quantity.value(), 3);
        assert_eq!(order.doc.total_amount().amount(), Decimal::new(320, 0));
    }

    #[tokio::test]
    async fn order_requires_addresses_and_items() {
        let shop = storefront();
        let mut request = order_of(&[]);
        request.billing_address.city.clear();
        match shop.place_order(request).await.unwrap_err() {
            CatalogError::Validation(errors) => {
                let units: Vec<_> = errors.iter().map(|e| e.unit.as_str()).collect();
                assert_eq!(units, ["items", "billing_address.city"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn order_status_updates() {
        let shop = storefront();
        shop.create_product(shirt_draft(&["S"])).await.unwrap();
        let order = shop.place_order(order_of(&[("SHIRT-RED-S", 1)])).await.unwrap();

        let shipped = shop.update_order_status(order.doc.id(), OrderStatus::Shipped).await.unwrap();
        assert_eq!(shipped.version, 2);
        let cancelled = shop.update_order_status(order.doc.id(), OrderStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.doc.status(), OrderStatus::Cancelled);
        assert!(matches!(
            shop.update_order_status(order.doc.id(), OrderStatus::Processing).await,
            Err(CatalogError::InvalidStatusTransition { .. })
        ));
    }
}
