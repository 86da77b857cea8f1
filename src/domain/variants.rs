//! Variant generation
//!
//! A variant is one concrete combination of option values. Its SKU is derived
//! from the product's base SKU and the selected values, never chosen freely.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::options::{normalize_option_groups, OptionAxis, OptionGroup, OptionMap};
use crate::domain::value_objects::Sku;
use crate::ValidationError;

/// The value picked for one option group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionSelection {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub sku: Sku,
    /// One selection per contributing group, in group-declaration order.
    pub options: Vec<OptionSelection>,
    #[serde(default)]
    pub price_adjustment: Decimal,
    #[serde(default)]
    pub stock: u32,
}

impl Variant {
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.iter().find(|o| o.name == name).map(|o| o.value.as_str())
    }

    /// Identity of the combination regardless of group order.
    pub fn combination_key(&self) -> Vec<(String, String)> {
        let mut key: Vec<_> = self.options.iter().map(|o| (o.name.clone(), o.value.clone())).collect();
        key.sort_unstable();
        key
    }
}

/// Enumerates every combination of option values as a variant.
///
/// Combinations come out depth-first: the first declared group is the outer
/// loop and values keep their declared order at every level. An empty map
/// yields no variants; the product is then sold under its own SKU.
pub fn generate_variants(options: &OptionMap, base_sku: &Sku, base_stock: u32) -> Vec<Variant> {
    if options.is_empty() {
        return Vec::new();
    }

    let mut combinations = Vec::with_capacity(options.combination_count().unwrap_or(0));
    let mut current = Vec::with_capacity(options.len());
    expand(options.axes(), &mut current, &mut combinations);

    combinations
        .into_iter()
        .map(|options| Variant {
            sku: variant_sku(base_sku, &options),
            options,
            price_adjustment: Decimal::ZERO,
            stock: base_stock,
        })
        .collect()
}

fn expand(axes: &[OptionAxis], current: &mut Vec<OptionSelection>, out: &mut Vec<Vec<OptionSelection>>) {
    let Some((axis, rest)) = axes.split_first() else {
        out.push(current.clone());
        return;
    };
    for value in &axis.values {
        current.push(OptionSelection { name: axis.name.clone(), value: value.clone() });
        expand(rest, current, out);
        current.pop();
    }
}

/// `{base}-{suffix}` where the suffix joins one token per selection.
pub fn variant_sku(base: &Sku, selections: &[OptionSelection]) -> Sku {
    let suffix = selections.iter().map(|s| sku_token(&s.value)).collect::<Vec<_>>().join("-");
    Sku::derived(format!("{base}-{suffix}"))
}

/// Uppercases a value and collapses each whitespace run into one hyphen.
pub fn sku_token(value: &str) -> String {
    let mut token = String::with_capacity(value.len());
    let mut in_space = false;
    for c in value.chars() {
        if c.is_whitespace() {
            if !in_space { token.push('-'); }
            in_space = true;
        } else {
            in_space = false;
            token.extend(c.to_uppercase());
        }
    }
    token
}

/// Reports SKUs shared by more than one combination, e.g. `"Navy Blue"` and
/// `"navy  blue"` in the same group.
pub fn ensure_unique_skus(variants: &[Variant]) -> Result<(), Vec<ValidationError>> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let errors: Vec<_> = variants
        .iter()
        .filter(|v| !seen.insert(&v.sku) && reported.insert(&v.sku))
        .map(|v| ValidationError::new(v.sku.as_str(), "SKU generated by more than one option combination"))
        .collect();
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// What happens to existing variants when a product's options are edited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantLifecycle {
    /// Discard the old list; every variant restarts from base stock.
    Replace,
    /// Keep stock and price adjustment for combinations that survive the edit.
    #[default]
    Preserve,
}

impl FromStr for VariantLifecycle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "preserve" => Ok(Self::Preserve),
            other => Err(format!("unknown variant lifecycle \"{other}\"")),
        }
    }
}

impl fmt::Display for VariantLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Replace => write!(f, "replace"), Self::Preserve => write!(f, "preserve") }
    }
}

pub const DEFAULT_MAX_VARIANTS: usize = 1000;

/// Limits and lifecycle applied whenever a product's options are (re)submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariantRules {
    pub lifecycle: VariantLifecycle,
    pub max_variants: usize,
}

impl Default for VariantRules {
    fn default() -> Self { Self { lifecycle: VariantLifecycle::default(), max_variants: DEFAULT_MAX_VARIANTS } }
}

impl VariantRules {
    /// Normalizes `groups` and generates the full variant list for them.
    pub fn build(&self, groups: &[OptionGroup], base_sku: &Sku, base_stock: u32) -> Result<Vec<Variant>, Vec<ValidationError>> {
        let options = normalize_option_groups(groups)?;
        match options.combination_count() {
            Some(n) if n <= self.max_variants => {}
            count => {
                let reason = match count {
                    Some(n) => format!("{n} combinations exceed the limit of {}", self.max_variants),
                    None => format!("combinations exceed the limit of {}", self.max_variants),
                };
                return Err(vec![ValidationError::new("option_groups", reason)]);
            }
        }
        let variants = generate_variants(&options, base_sku, base_stock);
        ensure_unique_skus(&variants)?;
        Ok(variants)
    }
}

/// Outcome of applying a lifecycle to a freshly generated list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciled {
    pub variants: Vec<Variant>,
    pub changes: VariantChanges,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantChanges {
    /// SKUs of combinations that did not exist before.
    pub added: Vec<Sku>,
    /// SKUs of combinations that no longer exist.
    pub removed: Vec<Sku>,
    /// Variants whose stock and price adjustment were carried over.
    pub preserved: usize,
}

impl VariantLifecycle {
    pub fn apply(self, existing: &[Variant], generated: Vec<Variant>) -> Reconciled {
        reconcile_variants(existing, generated, self)
    }
}

/// Diffs `generated` against `existing` by option combination.
///
/// The result is always in generator order. Under [`VariantLifecycle::Preserve`]
/// surviving combinations keep their stock and price adjustment.
pub fn reconcile_variants(existing: &[Variant], generated: Vec<Variant>, lifecycle: VariantLifecycle) -> Reconciled {
    let previous: HashMap<_, _> = existing.iter().map(|v| (v.combination_key(), v)).collect();
    let mut matched = HashSet::new();
    let mut added = Vec::new();
    let mut preserved = 0;

    let variants = generated
        .into_iter()
        .map(|mut variant| {
            match previous.get(&variant.combination_key()) {
                Some(old) => {
                    matched.insert(old.sku.clone());
                    if lifecycle == VariantLifecycle::Preserve {
                        variant.stock = old.stock;
                        variant.price_adjustment = old.price_adjustment;
                        preserved += 1;
                    }
                }
                None => added.push(variant.sku.clone()),
            }
            variant
        })
        .collect();

    let removed = existing.iter().filter(|v| !matched.contains(&v.sku)).map(|v| v.sku.clone()).collect();

    Reconciled { variants, changes: VariantChanges { added, removed, preserved } }
}
