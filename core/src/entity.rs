//! Entity trees: bundle instances holding literal and nested values.
//!
//! An [`Entity`] maps field ids to ordered value lists. A [`Value`] is either
//! a literal string or a nested entity owned by exactly that field slot; the
//! same URI may appear in several places of a tree, but each occurrence is a
//! separate node.
//!
//! Two validated constructors exist:
//!
//! - [`Entity::build`] takes one flat dictionary covering the bundle and
//!   everything below it and builds at most one sub-entity per bundle field.
//! - [`Entity::from_fields`] takes pre-built values and therefore supports
//!   several sibling sub-entities under one field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{MergedSchema, ValidationError, validate_entity};

/// One value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// A literal, legal under leaf fields only.
    Literal(String),
    /// A nested entity, legal under bundle fields only.
    Entity(Entity),
}

impl Value {
    /// Returns the literal, if this is one.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::Literal(s) => Some(s),
            Value::Entity(_) => None,
        }
    }

    /// Returns the nested entity, if this is one.
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(e) => Some(e),
            Value::Literal(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Literal(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Literal(s)
    }
}

impl From<Entity> for Value {
    fn from(e: Entity) -> Self {
        Value::Entity(e)
    }
}

/// One instance of a bundle.
///
/// `uri` is `None` until the entity has been saved remotely. Fields never
/// hold an empty list: assigning one removes the field.
///
/// # Examples
///
/// ```
/// use wisski_core::Entity;
///
/// let production = Entity::new("production").with("date", ["2020"]);
/// let object = Entity::new("object")
///     .with_uri("http://example.org/u1")
///     .with("title", ["A", "B"])
///     .with("production", [production]);
///
/// assert!(!object.is_new());
/// assert_eq!(object.literals("title").collect::<Vec<_>>(), ["A", "B"]);
/// assert_eq!(object.entities("production").count(), 1);
/// assert!(!object.all_persisted());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    bundle_id: String,
    #[serde(default)]
    fields: IndexMap<String, Vec<Value>>,
}

impl Entity {
    /// Creates a new, unsaved entity without values.
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            uri: None,
            bundle_id: bundle_id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Sets the URI.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Appends values to a field.
    pub fn with<I, V>(mut self, field_id: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for value in values {
            self.push(field_id, value);
        }
        self
    }

    /// Builds an entity from one flat dictionary.
    ///
    /// Keys may name fields of `bundle_id` or of any bundle nested below it.
    /// Values supplied for a field are used as given. For a bundle field
    /// without supplied values, one sub-entity is built from the same
    /// dictionary, and kept only if it received any value. This path can
    /// therefore never produce sibling sub-entities; use
    /// [`from_fields`](Entity::from_fields) for that.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownBundle`] for an unknown bundle,
    /// [`ValidationError::UnknownField`] for keys outside the bundle's
    /// subtree, and any error [`validate_entity`] reports for the result.
    ///
    /// # Examples
    ///
    /// ```
    /// use indexmap::IndexMap;
    /// use wisski_core::*;
    ///
    /// let schema = merge([vec![
    ///     Path::leaf("title", "object"),
    ///     Path::bundle("production", "object", "production").single(),
    ///     Path::leaf("date", "production").single(),
    /// ]])
    /// .unwrap();
    ///
    /// let mut flat = IndexMap::new();
    /// flat.insert("title".to_string(), vec![Value::from("A")]);
    /// flat.insert("date".to_string(), vec![Value::from("2020")]);
    ///
    /// let object = Entity::build("object", &flat, &schema).unwrap();
    /// let production = object.entities("production").next().unwrap();
    /// assert_eq!(production.literals("date").collect::<Vec<_>>(), ["2020"]);
    /// ```
    pub fn build(
        bundle_id: &str,
        flat_values: &IndexMap<String, Vec<Value>>,
        schema: &MergedSchema,
    ) -> Result<Self, ValidationError> {
        if !schema.contains_bundle(bundle_id) {
            return Err(ValidationError::UnknownBundle(bundle_id.to_string()));
        }
        for field_id in flat_values.keys() {
            if !schema.is_field_in_subtree(bundle_id, field_id) {
                return Err(ValidationError::UnknownField {
                    bundle_id: bundle_id.to_string(),
                    field_id: field_id.clone(),
                });
            }
        }

        let entity = Self::build_node(bundle_id, flat_values, schema);
        validate_entity(&entity, schema)?;
        Ok(entity)
    }

    fn build_node(
        bundle_id: &str,
        flat_values: &IndexMap<String, Vec<Value>>,
        schema: &MergedSchema,
    ) -> Self {
        let mut entity = Self::new(bundle_id);
        for node in schema.fields_of(bundle_id) {
            let supplied = flat_values.get(&node.id).filter(|values| !values.is_empty());
            match (supplied, node.target_bundle()) {
                (Some(values), _) => entity.set(&node.id, values.clone()),
                (None, Some(target)) => {
                    let child = Self::build_node(target, flat_values, schema);
                    if !child.fields.is_empty() {
                        entity.push(&node.id, child);
                    }
                }
                (None, None) => {}
            }
        }
        entity
    }

    /// Creates a validated entity from pre-built field values.
    ///
    /// # Errors
    ///
    /// Returns any error [`validate_entity`] reports.
    pub fn from_fields(
        bundle_id: &str,
        uri: Option<String>,
        fields: IndexMap<String, Vec<Value>>,
        schema: &MergedSchema,
    ) -> Result<Self, ValidationError> {
        let mut entity = Self::new(bundle_id);
        entity.uri = uri;
        for (field_id, values) in fields {
            entity.set(&field_id, values);
        }
        validate_entity(&entity, schema)?;
        Ok(entity)
    }

    /// Returns the URI, `None` for unsaved entities.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Replaces the URI.
    pub fn set_uri(&mut self, uri: Option<String>) {
        self.uri = uri;
    }

    /// Returns `true` if the entity has not been saved yet.
    pub fn is_new(&self) -> bool {
        self.uri.is_none()
    }

    /// Returns the bundle id.
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Returns the values of a field; empty if the field is unset.
    pub fn values(&self, field_id: &str) -> &[Value] {
        self.fields
            .get(field_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the literal values of a field.
    pub fn literals<'a>(&'a self, field_id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.values(field_id).iter().filter_map(Value::as_literal)
    }

    /// Returns the nested entities of a field.
    pub fn entities<'a>(&'a self, field_id: &str) -> impl Iterator<Item = &'a Entity> + use<'a> {
        self.values(field_id).iter().filter_map(Value::as_entity)
    }

    /// Iterates over set fields in assignment order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.fields
            .iter()
            .map(|(field_id, values)| (field_id.as_str(), values.as_slice()))
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replaces the values of a field. An empty list removes the field.
    pub fn set(&mut self, field_id: &str, values: Vec<Value>) {
        if values.is_empty() {
            self.fields.shift_remove(field_id);
        } else {
            self.fields.insert(field_id.to_string(), values);
        }
    }

    /// Appends one value to a field.
    pub fn push(&mut self, field_id: &str, value: impl Into<Value>) {
        self.fields
            .entry(field_id.to_string())
            .or_default()
            .push(value.into());
    }

    /// Removes a field, returning its values.
    pub fn remove(&mut self, field_id: &str) -> Option<Vec<Value>> {
        self.fields.shift_remove(field_id)
    }

    /// Iterates over the directly nested entities of all fields.
    pub fn sub_entities(&self) -> impl Iterator<Item = &Entity> {
        self.fields
            .values()
            .flatten()
            .filter_map(Value::as_entity)
    }

    /// Returns `true` if this entity and every nested one carry a URI.
    pub fn all_persisted(&self) -> bool {
        self.uri.is_some() && self.sub_entities().all(Entity::all_persisted)
    }

    /// Flattens literals of the whole subtree into one dictionary.
    ///
    /// Intended for inspection; values of repeated sub-entities are
    /// appended in tree order.
    pub fn to_flat(&self) -> IndexMap<String, Vec<String>> {
        let mut flat = IndexMap::new();
        self.flatten_into(&mut flat);
        flat
    }

    fn flatten_into(&self, flat: &mut IndexMap<String, Vec<String>>) {
        for (field_id, values) in &self.fields {
            for value in values {
                match value {
                    Value::Literal(literal) => flat
                        .entry(field_id.clone())
                        .or_insert_with(Vec::new)
                        .push(literal.clone()),
                    Value::Entity(entity) => entity.flatten_into(flat),
                }
            }
        }
    }
}
