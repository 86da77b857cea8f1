//! Line resolution and totals for carts and orders.
//!
//! Lines are always priced at the owning product's effective price at the
//! moment of resolution. Orders persist the resolved lines at placement, carts
//! re-resolve on every mutation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, MoneyError, Quantity, Sku};
use crate::domain::variants::{OptionSelection, Variant};
use crate::store::CatalogLookup;
use crate::{CatalogError, ValidationError};

/// A `(sku, quantity)` pair resolved against the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: Sku,
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub image_url: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    #[serde(default)]
    pub variant_options: Vec<OptionSelection>,
}

impl LineItem {
    /// Prices `quantity` of `variant` (or of the product itself when it has no
    /// variants) at the product's current effective price.
    pub fn price(product: &Product, variant: Option<&Variant>, sku: Sku, quantity: Quantity) -> Self {
        Self {
            sku,
            product_id: product.id(),
            product_name: product.name().to_string(),
            image_url: product.primary_image().unwrap_or_default().to_string(),
            unit_price: product.price().effective_price(),
            quantity,
            variant_options: variant.map(|v| v.options.clone()).unwrap_or_default(),
        }
    }

    pub fn line_total(&self) -> Result<Money, MoneyError> { self.unit_price.multiply(self.quantity) }
}

/// Resolves one line against the catalog.
///
/// Variant SKUs are looked up first, then base SKUs. A base SKU only stands for
/// a product that has no variants; otherwise a concrete variant is required.
pub async fn resolve_line<C: CatalogLookup>(sku: &str, quantity: Quantity, catalog: &C) -> crate::Result<LineItem> {
    let sku = Sku::new(sku).map_err(|e| CatalogError::invalid("sku", format!("{e}: \"{sku}\"")))?;

    if let Some((product, variant)) = catalog.find_product_by_variant_sku(&sku).await? {
        return Ok(LineItem::price(&product, Some(&variant), sku, quantity));
    }

    match catalog.find_product_by_sku(&sku).await? {
        Some(product) if product.variants().is_empty() => Ok(LineItem::price(&product, None, sku, quantity)),
        _ => Err(CatalogError::NotFound { sku: sku.to_string() }),
    }
}

/// Total and referenced products of a set of lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_amount: Money,
    /// Distinct owning products, in first-seen order.
    pub product_ids: Vec<Uuid>,
}

/// Sums `unit_price * quantity` over `lines`.
///
/// All lines must share a currency; an empty set totals zero in `currency`.
pub fn aggregate<'a, I>(lines: I, currency: &str) -> crate::Result<Totals>
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut lines = lines.into_iter().peekable();
    let currency = lines.peek().map(|l| l.unit_price.currency().to_string()).unwrap_or_else(|| currency.to_string());
    let mut total = Money::zero(&currency);
    let mut product_ids = Vec::new();
    let mut errors = Vec::new();

    for line in lines {
        match line.line_total().and_then(|line_total| total.add(&line_total)) {
            Ok(sum) => total = sum,
            Err(e) => errors.push(ValidationError::new(line.sku.as_str(), e.to_string())),
        }
        if !product_ids.contains(&line.product_id) {
            product_ids.push(line.product_id);
        }
    }

    if !errors.is_empty() {
        return Err(CatalogError::Validation(errors));
    }
    Ok(Totals { total_amount: total, product_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductDraft;
    use crate::domain::options::OptionGroup;
    use crate::domain::value_objects::PriceData;
    use crate::domain::variants::VariantRules;
    use crate::store::memory::MemoryStore;
    use crate::store::ProductStore;
    use rust_decimal::Decimal;

    fn shirt(discount: Option<i64>) -> Product {
        let mut price = PriceData::new(Decimal::new(100, 0), "MAD");
        price.discounted_price = discount.map(|d| Decimal::new(d, 0));
        let draft = ProductDraft {
            option_groups: vec![OptionGroup::colors("Color", [("Red", "#f00"), ("Blue", "#00f")]), OptionGroup::dropdown("Size", ["S", "M"])],
            media_urls: vec!["https://cdn.example.com/shirt.png".into()],
            ..ProductDraft::new("Shirt", "SHIRT", 10, price)
        };
        Product::create(draft, &VariantRules::default()).unwrap()
    }

    fn qty(n: i64) -> Quantity { Quantity::new(n).unwrap() }

    #[tokio::test]
    async fn discounted_price_wins() {
        let store = MemoryStore::new();
        store.insert_product(shirt(Some(80))).await.unwrap();

        let line = resolve_line("SHIRT-RED-S", qty(3), &store).await.unwrap();
        assert_eq!(line.unit_price.amount(), Decimal::new(80, 0));
        assert_eq!(line.line_total().unwrap().amount(), Decimal::new(240, 0));
        assert_eq!(line.variant_options[0].value, "Red");
        assert_eq!(line.image_url, "https://cdn.example.com/shirt.png");
    }

    #[tokio::test]
    async fn base_price_without_discount() {
        let store = MemoryStore::new();
        store.insert_product(shirt(None)).await.unwrap();

        let line = resolve_line("SHIRT-BLUE-M", qty(3), &store).await.unwrap();
        assert_eq!(line.unit_price.amount(), Decimal::new(100, 0));
        assert_eq!(line.line_total().unwrap().amount(), Decimal::new(300, 0));
    }

    #[tokio::test]
    async fn base_sku_requires_product_without_variants() {
        let store = MemoryStore::new();
        store.insert_product(shirt(None)).await.unwrap();
        let mug = Product::create(ProductDraft::new("Mug", "MUG", 4, PriceData::new(Decimal::new(45, 0), "MAD")), &VariantRules::default()).unwrap();
        store.insert_product(mug).await.unwrap();

        let line = resolve_line("MUG", qty(2), &store).await.unwrap();
        assert!(line.variant_options.is_empty());
        assert_eq!(line.line_total().unwrap().amount(), Decimal::new(90, 0));

        let err = resolve_line("SHIRT", qty(1), &store).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { ref sku } if sku == "SHIRT"));
    }

    #[tokio::test]
    async fn unknown_and_blank_skus_fail() {
        let store = MemoryStore::new();
        assert!(resolve_line("NOPE", qty(1), &store).await.unwrap_err().is_not_found());
        assert!(matches!(resolve_line("  ", qty(1), &store).await, Err(CatalogError::Validation(_))));
    }

    #[test]
    fn aggregate_sums_and_dedups_products() {
        let product = shirt(Some(80));
        let variants = product.variants();
        let lines = [
            LineItem::price(&product, Some(&variants[0]), variants[0].sku.clone(), qty(1)),
            LineItem::price(&product, Some(&variants[1]), variants[1].sku.clone(), qty(2)),
        ];
        let totals = aggregate(&lines, "MAD").unwrap();
        assert_eq!(totals.total_amount.amount(), Decimal::new(240, 0));
        assert_eq!(totals.product_ids, [product.id()]);
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        let none: [LineItem; 0] = [];
        let totals = aggregate(&none, "USD").unwrap();
        assert_eq!(totals.total_amount, Money::zero("USD"));
        assert!(totals.product_ids.is_empty());
    }

    #[test]
    fn aggregate_reports_out_of_range_totals() {
        let product = shirt(None);
        let mut gold = LineItem::price(&product, None, Sku::new("GOLD").unwrap(), qty(4_000_000_000));
        gold.unit_price = Money::new(Decimal::from_i128_with_scale(10_i128.pow(20), 0), "MAD");
        let err = aggregate([&gold], "MAD").unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref errors) if errors[0].unit == "GOLD"));
    }

    #[test]
    fn aggregate_rejects_mixed_currencies() {
        let product = shirt(None);
        let mut euro = LineItem::price(&product, None, Sku::new("OTHER").unwrap(), qty(1));
        euro.unit_price = Money::new(Decimal::ONE, "EUR");
        let lines = [LineItem::price(&product, None, Sku::new("SHIRT").unwrap(), qty(1)), euro];
        let err = aggregate(&lines, "MAD").unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref errors) if errors[0].unit == "OTHER"));
    }
}
