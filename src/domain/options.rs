//! Option groups and their normalization into enumerable axes.
//!
//! Authors declare option groups in several shapes: a color map
//! (`{"Red": "#FF0000"}`), a dropdown list (`["S", "M"]`), free-form JSON, or
//! nothing at all. Only color maps and dropdowns identify a variant; the
//! normalizer turns those into an ordered [`OptionMap`] and carries the rest
//! as metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::ValidationError;

/// How an option group's `choices` payload is shaped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "drop_down")]
    Dropdown,
    #[serde(rename = "color")]
    ColorMap,
    #[serde(rename = "json")]
    FreeformJson,
}

impl OptionKind {
    /// Whether groups of this kind take part in variant enumeration.
    pub fn contributes_to_variants(self) -> bool {
        matches!(self, Self::Dropdown | Self::ColorMap)
    }
}

/// An option group as authored on a product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub name: String,
    #[serde(rename = "option_type", default)]
    pub kind: OptionKind,
    #[serde(default)]
    pub choices: Value,
}

impl OptionGroup {
    pub fn dropdown<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|v| Value::String(v.into())).collect();
        Self { name: name.into(), kind: OptionKind::Dropdown, choices: Value::Array(values) }
    }

    /// Color group from `(name, code)` pairs, kept in the given order.
    pub fn colors<I, K, C>(name: impl Into<String>, colors: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: Into<String>,
    {
        let map = colors.into_iter().map(|(k, c)| (k.into(), Value::String(c.into()))).collect();
        Self { name: name.into(), kind: OptionKind::ColorMap, choices: Value::Object(map) }
    }

    pub fn freeform(name: impl Into<String>, choices: Value) -> Self {
        Self { name: name.into(), kind: OptionKind::FreeformJson, choices }
    }

    pub fn none(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: OptionKind::None, choices: Value::Object(Default::default()) }
    }
}

/// One enumerable axis: a group name with its ordered values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionAxis {
    pub name: String,
    pub values: Vec<String>,
}

/// Group name to ordered values, in group-declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionMap(Vec<OptionAxis>);

impl OptionMap {
    pub fn new() -> Self { Self::default() }

    /// Appends an axis. Replaces the values of an existing axis of the same name
    /// in place, keeping its position.
    pub fn insert<I, S>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        match self.0.iter_mut().find(|a| a.name == name) {
            Some(axis) => axis.values = values,
            None => self.0.push(OptionAxis { name, values }),
        }
    }

    pub fn axes(&self) -> &[OptionAxis] { &self.0 }
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.iter().find(|a| a.name == name).map(|a| a.values.as_slice())
    }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Number of value combinations, `None` on overflow. An empty map has no
    /// combinations.
    pub fn combination_count(&self) -> Option<usize> {
        if self.0.is_empty() {
            return Some(0);
        }
        self.0.iter().try_fold(1usize, |acc, axis| acc.checked_mul(axis.values.len()))
    }
}

/// Normalizes authored option groups into an [`OptionMap`].
///
/// Every group is checked on its own and all failures are returned together;
/// a bad group never hides problems in the others.
pub fn normalize_option_groups(groups: &[OptionGroup]) -> Result<OptionMap, Vec<ValidationError>> {
    let mut map = OptionMap::new();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (idx, group) in groups.iter().enumerate() {
        let name = group.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::new(format!("option group #{}", idx + 1), "name must not be blank"));
            continue;
        }
        if !seen.insert(name) {
            errors.push(ValidationError::new(name, "duplicate option group name"));
            continue;
        }
        match contributed_values(group.kind, &group.choices) {
            Ok(Some(values)) => map.insert(name, values),
            Ok(None) => {}
            Err(reason) => errors.push(ValidationError::new(name, reason)),
        }
    }

    if errors.is_empty() { Ok(map) } else { Err(errors) }
}

fn contributed_values(kind: OptionKind, choices: &Value) -> Result<Option<Vec<String>>, String> {
    let values: Vec<String> = match (kind, choices) {
        (OptionKind::None, _) => return Ok(None),
        (OptionKind::FreeformJson, Value::String(raw)) => {
            serde_json::from_str::<Value>(raw).map_err(|e| format!("malformed JSON payload: {e}"))?;
            return Ok(None);
        }
        (OptionKind::FreeformJson, _) => return Ok(None),
        (OptionKind::ColorMap, Value::Object(colors)) => colors.keys().cloned().collect(),
        (OptionKind::ColorMap, Value::Null) => Vec::new(),
        (OptionKind::ColorMap, _) => return Err("color choices must map color names to codes".into()),
        (OptionKind::Dropdown, Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| "dropdown choices must be strings".to_string())?,
        (OptionKind::Dropdown, Value::Null) => Vec::new(),
        (OptionKind::Dropdown, _) => return Err("dropdown choices must be a list".into()),
    };

    if values.is_empty() {
        return Err("at least one value is required".into());
    }
    let mut distinct = HashSet::new();
    for value in &values {
        if value.trim().is_empty() {
            return Err("values must not be blank".into());
        }
        if !distinct.insert(value.as_str()) {
            return Err(format!("duplicate value \"{value}\""));
        }
    }
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn color_map_contributes_names_in_declared_order() {
        let groups = vec![OptionGroup::colors("Color", [("Red", "#FF0000"), ("Blue", "#0000FF"), ("Amber", "#FFBF00")])];
        let map = normalize_option_groups(&groups).unwrap();
        assert_eq!(map.get("Color").unwrap(), ["Red", "Blue", "Amber"]);
    }

    #[test]
    fn color_map_order_survives_json_round_trip() {
        let group: OptionGroup = serde_json::from_value(json!({
            "name": "Color",
            "option_type": "color",
            "choices": { "Zinc": "#71717a", "Amber": "#f59e0b" }
        }))
        .unwrap();
        let map = normalize_option_groups(&[group]).unwrap();
        assert_eq!(map.get("Color").unwrap(), ["Zinc", "Amber"]);
    }

    #[test]
    fn dropdown_values_are_kept_verbatim() {
        let groups = vec![OptionGroup::dropdown("Size", ["Small", "Extra Large", "Any"])];
        let map = normalize_option_groups(&groups).unwrap();
        assert_eq!(map.get("Size").unwrap(), ["Small", "Extra Large", "Any"]);
    }

    #[test]
    fn freeform_and_none_groups_are_skipped() {
        let groups = vec![
            OptionGroup::freeform("Engraving", json!({"fonts": ["Serif", "Mono"], "max": 20})),
            OptionGroup::freeform("Extras", json!(["gift wrap", "card"])),
            OptionGroup::none("Notes"),
            OptionGroup::dropdown("Size", ["S"]),
        ];
        let map = normalize_option_groups(&groups).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.get("Engraving").is_none());
        assert!(map.get("Extras").is_none());
    }

    #[test]
    fn blank_name_is_reported_per_group() {
        let groups = vec![
            OptionGroup::dropdown("Size", ["S", "M"]),
            OptionGroup::dropdown("   ", ["x"]),
            OptionGroup::dropdown("Fit", Vec::<String>::new()),
        ];
        let errors = normalize_option_groups(&groups).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].unit, "option group #2");
        assert_eq!(errors[1].unit, "Fit");
    }

    #[test]
    fn names_are_trimmed_and_must_be_unique() {
        let groups = vec![OptionGroup::dropdown(" Size ", ["S"]), OptionGroup::dropdown("Size", ["M"])];
        let errors = normalize_option_groups(&groups).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, "duplicate option group name");
    }

    #[test]
    fn malformed_choices_are_rejected() {
        let groups = vec![
            OptionGroup { name: "Color".into(), kind: OptionKind::ColorMap, choices: json!(["Red"]) },
            OptionGroup { name: "Size".into(), kind: OptionKind::Dropdown, choices: json!(["S", 4]) },
            OptionGroup { name: "Dupes".into(), kind: OptionKind::Dropdown, choices: json!(["S", "S"]) },
            OptionGroup { name: "Blank".into(), kind: OptionKind::Dropdown, choices: json!(["S", " "]) },
            OptionGroup { name: "Details".into(), kind: OptionKind::FreeformJson, choices: json!("{not json") },
        ];
        let errors = normalize_option_groups(&groups).unwrap_err();
        let units: Vec<_> = errors.iter().map(|e| e.unit.as_str()).collect();
        assert_eq!(units, ["Color", "Size", "Dupes", "Blank", "Details"]);
        assert!(errors[4].reason.starts_with("malformed JSON payload"));
    }

    #[test]
    fn freeform_json_text_that_parses_is_accepted() {
        let groups = vec![OptionGroup::freeform("Details", json!(r#"{"material":"cotton"}"#))];
        assert!(normalize_option_groups(&groups).unwrap().is_empty());
    }

    #[test]
    fn kind_tags_match_stored_documents() {
        let kinds: Vec<OptionKind> = serde_json::from_value(json!(["none", "drop_down", "color", "json"])).unwrap();
        assert_eq!(kinds, [OptionKind::None, OptionKind::Dropdown, OptionKind::ColorMap, OptionKind::FreeformJson]);
        assert!(!OptionKind::FreeformJson.contributes_to_variants());
    }

    #[test]
    fn combination_count_multiplies_axes() {
        let mut map = OptionMap::new();
        assert_eq!(map.combination_count(), Some(0));
        map.insert("Color", ["Red", "Blue", "Green"]);
        map.insert("Size", ["S", "M"]);
        assert_eq!(map.combination_count(), Some(6));
        map.insert("Color", ["Red"]);
        assert_eq!(map.combination_count(), Some(2));
        assert_eq!(map.axes()[0].name, "Color");
    }
}
