//! Building view models from opaque product records
//!
//! Records are JSON objects whose fields are read defensively: any field may
//! be missing, null, or of an unexpected type.

use super::artifact::{
    CarouselView, ComparisonRow, ComparisonView, FieldRow, ProductCard, ProductDetailView, TilesView,
};
use super::fields::{value_to_string, FieldPresentation};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Fields shown in the card header rather than as rows
const HEADER_FIELDS: [&str; 3] = ["name", "brand", "price"];

/// Tool annotations that are never product fields
const ANNOTATION_FIELDS: [&str; 5] = ["description", "marketing_content", "has_image", "image_url", "error"];

pub const DEFAULT_TILES_TITLE: &str = "Recommended Products";
pub const DEFAULT_CAROUSEL_TITLE: &str = "Featured Products";
pub const DEFAULT_CAROUSEL_DESCRIPTION: &str = "Browse our selection of products";

/// Non-empty string form of a field
fn text(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value_to_string(value)).filter(|s| !s.is_empty()),
    }
}

fn present(record: &Map<String, Value>, key: &str) -> bool {
    !matches!(record.get(key), None | Some(Value::Null))
}

fn object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// Fields a view should list: the table's list, or every visible record
/// field when the table names none.
fn listed_fields<'a>(
    configured: &'a [String],
    records: &[&'a Map<String, Value>],
    fields: &FieldPresentation,
) -> Vec<&'a str> {
    if !configured.is_empty() {
        return configured.iter().map(String::as_str).collect();
    }
    let mut keys: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            let key = key.as_str();
            if !ANNOTATION_FIELDS.contains(&key) && !fields.is_hidden(key) && !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

pub fn card(record: &Value, fields: &FieldPresentation) -> ProductCard {
    let Some(record) = object(record) else {
        return ProductCard::default();
    };

    let has_image = record.get("has_image").and_then(Value::as_bool).unwrap_or(true);
    let badges = fields
        .badge_fields
        .iter()
        .filter(|key| present(record, key))
        .map(|key| fields.format(key, &record[key.as_str()]))
        .collect();

    ProductCard {
        id: text(record, "product_id"),
        name: text(record, "name"),
        brand: text(record, "brand"),
        price: text(record, "price"),
        image_url: text(record, "image_url").filter(|_| has_image),
        marketing_link: text(record, "marketing_link"),
        badges,
    }
}

pub fn detail(record: &Value, fields: &FieldPresentation) -> ProductDetailView {
    let empty = Map::new();
    let map = object(record).unwrap_or(&empty);

    let rows = listed_fields(&fields.detail_fields, &[map], fields)
        .into_iter()
        .filter(|key| !HEADER_FIELDS.contains(key) && !fields.is_hidden(key) && present(map, key))
        .map(|key| FieldRow {
            key: key.to_string(),
            label: fields.label(key),
            value: fields.format(key, &map[key]),
        })
        .collect();

    ProductDetailView {
        product: card(record, fields),
        fields: rows,
        description: text(map, "description"),
        marketing_content: text(map, "marketing_content"),
    }
}

pub fn comparison(result: &Value, fields: &FieldPresentation) -> ComparisonView {
    let empty = Map::new();
    let first = result.get("product1").and_then(object).unwrap_or(&empty);
    let second = result.get("product2").and_then(object).unwrap_or(&empty);

    let rows = listed_fields(&fields.comparison_fields, &[first, second], fields)
        .into_iter()
        .filter(|key| !fields.is_hidden(key) && (present(first, key) || present(second, key)))
        .map(|key| ComparisonRow {
            key: key.to_string(),
            label: fields.label(key),
            first: first.get(key).filter(|v| !v.is_null()).map(|v| fields.format(key, v)),
            second: second.get(key).filter(|v| !v.is_null()).map(|v| fields.format(key, v)),
        })
        .collect();

    let highlights: BTreeMap<String, f64> = result
        .get("comparison")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default();

    ComparisonView {
        first: card(result.get("product1").unwrap_or(&Value::Null), fields),
        second: card(result.get("product2").unwrap_or(&Value::Null), fields),
        rows,
        highlights,
        description: result.as_object().and_then(|m| text(m, "description")),
    }
}

fn cards(result: &Value, fields: &FieldPresentation) -> Vec<ProductCard> {
    result
        .get("products")
        .and_then(Value::as_array)
        .map(|products| products.iter().map(|p| card(p, fields)).collect())
        .unwrap_or_default()
}

pub fn tiles(result: &Value, fields: &FieldPresentation) -> TilesView {
    let map = object(result);
    TilesView {
        title: map
            .and_then(|m| text(m, "title"))
            .unwrap_or_else(|| DEFAULT_TILES_TITLE.to_string()),
        description: map.and_then(|m| text(m, "description")),
        products: cards(result, fields),
        warning: map.and_then(|m| text(m, "warning")),
    }
}

pub fn carousel(result: &Value, fields: &FieldPresentation) -> CarouselView {
    let map = object(result);
    CarouselView {
        title: map
            .and_then(|m| text(m, "title"))
            .unwrap_or_else(|| DEFAULT_CAROUSEL_TITLE.to_string()),
        description: Some(
            map.and_then(|m| text(m, "description"))
                .unwrap_or_else(|| DEFAULT_CAROUSEL_DESCRIPTION.to_string()),
        ),
        products: cards(result, fields),
    }
}
