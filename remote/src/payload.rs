//! Nested JSON payloads of the remote entity API.
//!
//! An entity travels as one object keyed by field id, every value a list of
//! items:
//!
//! ```json
//! {
//!   "bundle": [{"target_id": "object", "target_type": "wisski_bundle"}],
//!   "wisski_uri": [{"value": "http://example.org/u1"}],
//!   "title": [{"value": "A"}, {"value": "B"}],
//!   "production": [{"entity": {"bundle": [{"target_id": "production"}], "...": []}}]
//! }
//! ```
//!
//! Nested entities are always embedded whole, never referenced by uri.

use serde_json::{Map, Value as JsonValue, json};
use wisski_core::{Entity, MergedSchema, Value};

use crate::error::PayloadError;

const BUNDLE_KEY: &str = "bundle";
const URI_KEY: &str = "wisski_uri";
const WISSKI_BUNDLE: &str = "wisski_bundle";
const WISSKI_INDIVIDUAL: &str = "wisski_individual";

/// Serializes an entity tree into a nested payload.
///
/// Leaf items are shaped by the field type the schema records:
/// `entity_reference` fields send `target_uri`, `text_long` fields add a
/// `basic_html` format, `image` fields send the file id as `target_id`, all
/// others send a plain `value`. Nested entities that
/// are unsaved and hold no values are left out.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wisski_core::{Entity, Path, merge};
///
/// let schema = merge([vec![
///     Path::leaf("title", "object"),
///     Path::leaf("owner", "object").with_field_type("entity_reference"),
/// ]])
/// .unwrap();
/// let object = Entity::new("object")
///     .with("title", ["A"])
///     .with("owner", ["http://example.org/p1"]);
///
/// let payload = wisski_remote::to_payload(&object, &schema);
/// assert_eq!(payload["title"], json!([{"value": "A"}]));
/// assert_eq!(
///     payload["owner"],
///     json!([{"target_uri": "http://example.org/p1", "target_type": "wisski_individual"}])
/// );
/// assert!(payload.get("wisski_uri").is_none());
/// ```
pub fn to_payload(entity: &Entity, schema: &MergedSchema) -> JsonValue {
    let mut payload = Map::new();
    payload.insert(
        BUNDLE_KEY.to_string(),
        json!([{"target_id": entity.bundle_id(), "target_type": WISSKI_BUNDLE}]),
    );
    if let Some(uri) = entity.uri() {
        payload.insert(URI_KEY.to_string(), json!([{ "value": uri }]));
    }

    for (field_id, values) in entity.fields() {
        let field_type = schema
            .node(field_id)
            .and_then(|node| node.field_type.as_deref());
        let items: Vec<JsonValue> = values
            .iter()
            .filter_map(|value| match value {
                Value::Literal(literal) => Some(leaf_item(field_type, literal)),
                Value::Entity(child) if child.is_new() && child.is_empty() => None,
                Value::Entity(child) => Some(json!({ "entity": to_payload(child, schema) })),
            })
            .collect();
        if !items.is_empty() {
            payload.insert(field_id.to_string(), JsonValue::Array(items));
        }
    }

    JsonValue::Object(payload)
}

fn leaf_item(field_type: Option<&str>, value: &str) -> JsonValue {
    match field_type {
        Some("entity_reference") => json!({
            "target_uri": value,
            "target_type": WISSKI_INDIVIDUAL,
        }),
        Some("text_long") => json!({
            "value": value,
            "format": "basic_html",
        }),
        Some("image") => json!({
            "target_id": value,
            "target_type": "file",
        }),
        _ => json!({ "value": value }),
    }
}

/// Reads a nested payload back into an entity tree.
///
/// Items contribute their `value`, `target_uri` or `target_id` as a
/// literal, or their `entity` as a nested entity; other items are ignored. Fields left without
/// any value are dropped. The result is not validated.
///
/// # Errors
///
/// Returns [`PayloadError`] if the payload or one of its fields does not have
/// the expected shape.
pub fn from_payload(payload: &JsonValue) -> Result<Entity, PayloadError> {
    let object = payload.as_object().ok_or(PayloadError::NotAnObject)?;

    let bundle_id = object
        .get(BUNDLE_KEY)
        .and_then(|items| items.get(0))
        .and_then(|item| item.get("target_id"))
        .and_then(JsonValue::as_str)
        .ok_or(PayloadError::MissingBundle)?;
    let mut entity = Entity::new(bundle_id);

    if let Some(items) = object.get(URI_KEY) {
        let uri = items
            .get(0)
            .and_then(|item| item.get("value"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| PayloadError::MalformedField {
                field_id: URI_KEY.to_string(),
                details: "expected [{\"value\": <uri>}]".to_string(),
            })?;
        entity.set_uri(Some(uri.to_string()));
    }

    for (field_id, items) in object {
        if field_id == BUNDLE_KEY || field_id == URI_KEY {
            continue;
        }
        let items = items
            .as_array()
            .ok_or_else(|| PayloadError::MalformedField {
                field_id: field_id.clone(),
                details: "expected a list of items".to_string(),
            })?;

        let mut values = Vec::with_capacity(items.len());
        for item in items {
            if let Some(nested) = item.get("entity") {
                values.push(Value::Entity(from_payload(nested)?));
            } else if let Some(literal) = item_literal(item) {
                values.push(Value::Literal(literal));
            }
        }
        entity.set(field_id, values);
    }

    Ok(entity)
}

fn item_literal(item: &JsonValue) -> Option<String> {
    ["value", "target_uri", "target_id"]
        .into_iter()
        .find_map(|key| item.get(key))
        .and_then(literal_text)
}

fn literal_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
