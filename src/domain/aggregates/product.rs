//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::options::{normalize_option_groups, OptionGroup};
use crate::domain::value_objects::{slugify, PriceData, Sku};
use crate::domain::variants::{Variant, VariantChanges, VariantRules};
use crate::{field_errors, CatalogError, ValidationError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductKind { Digital, #[default] Physical }

/// A product as submitted by the admin form, used for creation and full edits.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ProductDraft {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    pub short_description: Option<String>,
    pub sku: String,
    #[serde(default)]
    pub stock: u32,
    #[validate(custom = "valid_price")]
    pub price: PriceData,
    #[serde(default)]
    pub kind: ProductKind,
    #[serde(default)]
    pub option_groups: Vec<OptionGroup>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub categories: Vec<Uuid>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool { true }

impl ProductDraft {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, stock: u32, price: PriceData) -> Self {
        Self {
            name: name.into(), short_description: None, sku: sku.into(), stock, price,
            kind: ProductKind::default(), option_groups: vec![], media_urls: vec![],
            categories: vec![], tags: vec![], published: true,
        }
    }
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn valid_price(price: &PriceData) -> Result<(), validator::ValidationError> {
    let negative = price.price < Decimal::ZERO
        || price.discounted_price.is_some_and(|d| d < Decimal::ZERO)
        || price.price_per_unit.is_some_and(|p| p < Decimal::ZERO);
    let bad_currency = price.currency.len() != 3 || !price.currency.chars().all(|c| c.is_ascii_uppercase());
    let message = match (negative, bad_currency) {
        (true, _) => "amounts must not be negative",
        (_, true) => "currency must be a three-letter ISO code",
        _ => return Ok(()),
    };
    let mut err = validator::ValidationError::new("price");
    err.message = Some(message.into());
    Err(err)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: Uuid,
    name: String,
    slug: String,
    short_description: Option<String>,
    sku: Sku,
    stock: u32,
    price: PriceData,
    kind: ProductKind,
    option_groups: Vec<OptionGroup>,
    variants: Vec<Variant>,
    media_urls: Vec<String>,
    categories: Vec<Uuid>,
    tags: Vec<Uuid>,
    published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Product {
    pub fn create(draft: ProductDraft, rules: &VariantRules) -> crate::Result<Self> {
        let (sku, variants) = check_draft(&draft, rules)?;
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), name: draft.name.trim().to_string(), slug: slugify(&draft.name),
            short_description: draft.short_description, sku, stock: draft.stock, price: draft.price,
            kind: draft.kind, option_groups: draft.option_groups, variants, media_urls: draft.media_urls,
            categories: draft.categories, tags: draft.tags, published: draft.published,
            created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created {
            product_id: product.id, sku: product.sku.clone(), variant_count: product.variants.len(),
        }));
        Ok(product)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn slug(&self) -> &str { &self.slug }
    pub fn short_description(&self) -> Option<&str> { self.short_description.as_deref() }
    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn stock(&self) -> u32 { self.stock }
    pub fn price(&self) -> &PriceData { &self.price }
    pub fn kind(&self) -> ProductKind { self.kind }
    pub fn option_groups(&self) -> &[OptionGroup] { &self.option_groups }
    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn media_urls(&self) -> &[String] { &self.media_urls }
    pub fn primary_image(&self) -> Option<&str> { self.media_urls.first().map(String::as_str) }
    pub fn categories(&self) -> &[Uuid] { &self.categories }
    pub fn tags(&self) -> &[Uuid] { &self.tags }
    pub fn is_published(&self) -> bool { self.published }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn variant(&self, sku: &Sku) -> Option<&Variant> { self.variants.iter().find(|v| &v.sku == sku) }

    /// Base SKU followed by every variant SKU.
    pub fn skus(&self) -> impl Iterator<Item = &Sku> {
        std::iter::once(&self.sku).chain(self.variants.iter().map(|v| &v.sku))
    }

    /// Replaces the editable fields and regenerates variants under `rules.lifecycle`.
    pub fn apply_edit(&mut self, draft: ProductDraft, rules: &VariantRules) -> crate::Result<VariantChanges> {
        let (sku, generated) = check_draft(&draft, rules)?;
        let reconciled = rules.lifecycle.apply(&self.variants, generated);

        self.name = draft.name.trim().to_string();
        self.slug = slugify(&draft.name);
        self.short_description = draft.short_description;
        self.sku = sku;
        self.stock = draft.stock;
        self.price = draft.price;
        self.kind = draft.kind;
        self.option_groups = draft.option_groups;
        self.variants = reconciled.variants;
        self.media_urls = draft.media_urls;
        self.categories = draft.categories;
        self.tags = draft.tags;
        self.published = draft.published;
        self.touch();

        let changes = reconciled.changes;
        self.raise_event(DomainEvent::Product(ProductEvent::Edited { product_id: self.id, sku: self.sku.clone() }));
        self.raise_event(DomainEvent::Product(ProductEvent::VariantsRegenerated {
            product_id: self.id,
            lifecycle: rules.lifecycle,
            added: changes.added.len(),
            removed: changes.removed.len(),
            preserved: changes.preserved,
        }));
        Ok(changes)
    }

    /// Per-variant edits made after generation.
    pub fn update_variant(&mut self, sku: &Sku, stock: Option<u32>, price_adjustment: Option<Decimal>) -> crate::Result<()> {
        let variant = self
            .variants
            .iter_mut()
            .find(|v| &v.sku == sku)
            .ok_or_else(|| CatalogError::NotFound { sku: sku.to_string() })?;
        if let Some(stock) = stock { variant.stock = stock; }
        if let Some(adjustment) = price_adjustment { variant.price_adjustment = adjustment; }
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Validates every part of a draft, reporting all problems at once.
fn check_draft(draft: &ProductDraft, rules: &VariantRules) -> crate::Result<(Sku, Vec<Variant>)> {
    let mut errors = match draft.validate() {
        Ok(()) => vec![],
        Err(e) => field_errors("", &e),
    };

    let sku = match Sku::new(draft.sku.as_str()) {
        Ok(sku) => Some(sku),
        Err(e) => {
            errors.push(ValidationError::new("sku", e.to_string()));
            None
        }
    };

    let variants = match &sku {
        Some(sku) => match rules.build(&draft.option_groups, sku, draft.stock) {
            Ok(variants) => Some(variants),
            Err(e) => {
                errors.extend(e);
                None
            }
        },
        None => {
            if let Err(e) = normalize_option_groups(&draft.option_groups) { errors.extend(e); }
            None
        }
    };

    match (sku, variants) {
        (Some(sku), Some(variants)) if errors.is_empty() => Ok((sku, variants)),
        _ => Err(CatalogError::Validation(errors)),
    }
}
