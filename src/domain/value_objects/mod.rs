//! Value Objects for the catalog

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CURRENCY: &str = "MAD";

/// SKU (Stock Keeping Unit) value object
///
/// Base SKUs are kept as authored (only trimmed); variant SKUs are derived
/// from them by [`crate::domain::variants::variant_sku`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.chars().any(char::is_whitespace) { return Err(SkuError::Whitespace); }
        Ok(Self(value.to_string()))
    }
    pub fn as_str(&self) -> &str { &self.0 }

    // Built from an already valid base plus whitespace-free tokens.
    pub(crate) fn derived(value: String) -> Self { Self(value) }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SkuError { Empty, Whitespace }
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "SKU empty"), Self::Whitespace => write!(f, "SKU contains whitespace") }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        let amount = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }
    pub fn multiply(&self, qty: Quantity) -> Result<Money, MoneyError> {
        let amount = self.amount.checked_mul(Decimal::from(qty.value())).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch { left: String, right: String }, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrencyMismatch { left, right } => write!(f, "Currency mismatch: {left} vs {right}"),
            Self::Overflow => write!(f, "amount out of range"),
        }
    }
}

/// A strictly positive line quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 { return Err(QuantityError::NotPositive(value)); }
        u32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge(value))
    }

    /// Interprets a cart request quantity: anything at or below zero means
    /// "remove the line".
    pub fn for_cart(value: i64) -> Result<Option<Self>, QuantityError> {
        if value <= 0 { Ok(None) } else { Self::new(value).map(Some) }
    }

    pub fn value(&self) -> u32 { self.0 }

    pub fn saturating_add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotPositive(i64), TooLarge(i64) }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive(v) => write!(f, "quantity must be positive, got {v}"),
            Self::TooLarge(v) => write!(f, "quantity {v} is too large"),
        }
    }
}

/// Price record of a product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    #[serde(default = "default_currency")]
    pub currency: String,
    pub price: Decimal,
    #[serde(default)]
    pub discounted_price: Option<Decimal>,
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
}

fn default_currency() -> String { DEFAULT_CURRENCY.to_string() }

impl PriceData {
    pub fn new(price: Decimal, currency: &str) -> Self {
        Self { currency: currency.to_string(), price, discounted_price: None, price_per_unit: None }
    }

    pub fn with_discount(mut self, discounted: Decimal) -> Self {
        self.discounted_price = Some(discounted);
        self
    }

    /// The discounted price when present and above zero, the base price otherwise.
    pub fn effective_price(&self) -> Money {
        let amount = match self.discounted_price {
            Some(d) if d > Decimal::ZERO => d,
            _ => self.price,
        };
        Money::new(amount, &self.currency)
    }

    pub fn is_discounted(&self) -> bool {
        matches!(self.discounted_price, Some(d) if d > Decimal::ZERO)
    }
}

/// URL slug for a display name: lowercase alphanumerics separated by single
/// hyphens, no leading or trailing hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() { slug.push('-'); }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku() {
        let sku = Sku::new("  shirt-001 ").unwrap();
        assert_eq!(sku.as_str(), "shirt-001");
        assert_eq!(Sku::new("   "), Err(SkuError::Empty));
        assert_eq!(Sku::new("A B"), Err(SkuError::Whitespace));
    }

    #[test]
    fn test_money_add() {
        let a = Money::new(Decimal::new(100, 0), "MAD");
        let b = Money::new(Decimal::new(50, 0), "MAD");
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::new(Decimal::ONE, "USD")).is_err());
        assert_eq!(Money::new(Decimal::MAX, "MAD").add(&b), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_money_multiply() {
        let price = Money::new(Decimal::new(80, 0), "MAD");
        assert_eq!(price.multiply(Quantity::new(3).unwrap()).unwrap().amount(), Decimal::new(240, 0));
        let gold = Money::new(Decimal::from_i128_with_scale(10_i128.pow(20), 0), "MAD");
        assert_eq!(gold.multiply(Quantity::new(4_000_000_000).unwrap()), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::new(3).unwrap().value(), 3);
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive(0)));
        assert_eq!(Quantity::for_cart(-2).unwrap(), None);
        assert_eq!(Quantity::for_cart(2).unwrap(), Some(Quantity::new(2).unwrap()));
        assert!(Quantity::new(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn effective_price_prefers_positive_discount() {
        let base = PriceData::new(Decimal::new(100, 0), "MAD");
        assert_eq!(base.effective_price().amount(), Decimal::new(100, 0));
        let discounted = base.clone().with_discount(Decimal::new(80, 0));
        assert_eq!(discounted.effective_price().amount(), Decimal::new(80, 0));
        assert!(discounted.is_discounted());
        let zero = base.with_discount(Decimal::ZERO);
        assert_eq!(zero.effective_price().amount(), Decimal::new(100, 0));
    }

    #[test]
    fn price_data_defaults_currency() {
        let p: PriceData = serde_json::from_str(r#"{"price":"19.90"}"#).unwrap();
        assert_eq!(p.currency, "MAD");
        assert_eq!(p.discounted_price, None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Summer T-Shirt  (Blue)"), "summer-t-shirt-blue");
        assert_eq!(slugify("  New Arrival "), "new-arrival");
        assert_eq!(slugify("Écharpe Rouge"), "écharpe-rouge");
        assert_eq!(slugify("---"), "");
    }
}
