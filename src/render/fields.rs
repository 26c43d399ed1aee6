//! Field-presentation table
//!
//! Per product category: which fields to show and in what order, label
//! overrides, and value formatters. The table is swappable; an empty table
//! still renders, with title-cased labels and identity formatting.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Placeholder replaced by the raw value inside a formatter template
const VALUE_PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldPresentation {
    /// Fields shown in the detail view, in order
    pub detail_fields: Vec<String>,
    /// Fields shown as badges on cards
    pub badge_fields: Vec<String>,
    /// Fields shown as comparison rows, in order
    pub comparison_fields: Vec<String>,
    /// Label overrides
    pub labels: HashMap<String, String>,
    /// Formatter templates, e.g. `"{} GB RAM"`
    pub formatters: HashMap<String, String>,
    /// Fields never shown generically
    pub hidden_fields: Vec<String>,
}

impl FieldPresentation {
    /// Built-in table for a product category; unknown categories get the
    /// empty table.
    pub fn for_product_type(product_type: &str) -> Self {
        match product_type {
            "laptops" => Self::laptops(),
            _ => Self::default(),
        }
    }

    /// Load a table from a JSON file
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
        serde_json::from_str(&raw).map_err(|e| format!("Invalid field table {}: {e}", path.display()))
    }

    fn laptops() -> Self {
        let specs = [
            "name",
            "brand",
            "price",
            "cpu_family",
            "ram_gb",
            "storage_gb",
            "storage_type",
            "screen_size_inches",
            "screen_resolution",
            "screen_type",
            "graphics_card",
            "battery_life_hours",
            "weight_kg",
        ];
        let owned = |fields: &[&str]| fields.iter().map(|f| (*f).to_string()).collect::<Vec<_>>();
        let pairs = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>()
        };

        Self {
            detail_fields: owned(&specs),
            badge_fields: owned(&["ram_gb", "storage_gb", "screen_size_inches", "battery_life_hours"]),
            comparison_fields: owned(&specs),
            labels: pairs(&[
                ("cpu_family", "Processor"),
                ("ram_gb", "Memory"),
                ("storage_gb", "Storage"),
                ("screen_size_inches", "Screen Size"),
                ("screen_resolution", "Resolution"),
                ("screen_type", "Display Type"),
                ("graphics_card", "Graphics"),
                ("battery_life_hours", "Battery Life"),
                ("weight_kg", "Weight"),
            ]),
            formatters: pairs(&[
                ("ram_gb", "{} GB RAM"),
                ("storage_gb", "{} GB"),
                ("screen_size_inches", "{}\""),
                ("battery_life_hours", "{}"),
                ("weight_kg", "{} kg"),
            ]),
            hidden_fields: owned(&[
                "product_id",
                "marketing_link",
                "datasheet_link",
                "has_image",
                "image_url",
            ]),
        }
    }

    /// Display label for a field
    pub fn label(&self, key: &str) -> String {
        self.labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| title_case(key))
    }

    /// Display string for a field value
    pub fn format(&self, key: &str, value: &Value) -> String {
        let raw = value_to_string(value);
        match self.formatters.get(key) {
            Some(template) => template.replace(VALUE_PLACEHOLDER, &raw),
            None => raw,
        }
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden_fields.iter().any(|f| f == key)
    }
}

/// `snake_case` to Title Case
fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut at_word_start = true;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Identity formatting for opaque record values
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
