//! Integration tests for the wisski-remote crate.

use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};
use wisski_core::{Entity, Path, SchemaError, SchemaTree, ValidationError};
use wisski_remote::{RemoteError, RemoteMapper, Transport, TransportError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Keeps pathbuilders and entity payloads in memory and assigns uris to
/// payloads that arrive without one.
#[derive(Debug, Default)]
struct MemoryTransport {
    pathbuilders: Vec<SchemaTree>,
    entities: HashMap<String, JsonValue>,
    sent: Vec<String>,
    next_id: usize,
    fail_bundle: Option<String>,
    omit_uri: bool,
    /// Field and value the remote adds to every stored payload.
    added_field: Option<(String, String)>,
}

impl MemoryTransport {
    fn with_pathbuilders(pathbuilders: Vec<SchemaTree>) -> Self {
        Self {
            pathbuilders,
            ..Self::default()
        }
    }
}

impl Transport for MemoryTransport {
    fn list_pathbuilders(&mut self) -> Result<Vec<String>, TransportError> {
        Ok(self
            .pathbuilders
            .iter()
            .map(|tree| tree.id().to_string())
            .collect())
    }

    fn fetch_paths(&mut self, pathbuilder_id: &str) -> Result<SchemaTree, TransportError> {
        self.pathbuilders
            .iter()
            .find(|tree| tree.id() == pathbuilder_id)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                code: 404,
                body: format!("no pathbuilder {pathbuilder_id}"),
            })
    }

    fn fetch_entity(&mut self, uri: &str) -> Result<JsonValue, TransportError> {
        self.entities
            .get(uri)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                code: 404,
                body: format!("no entity {uri}"),
            })
    }

    fn create_or_update_entity(
        &mut self,
        bundle_id: &str,
        payload: &JsonValue,
    ) -> Result<JsonValue, TransportError> {
        self.sent.push(bundle_id.to_string());
        if self.fail_bundle.as_deref() == Some(bundle_id) {
            return Err(TransportError::Status {
                code: 500,
                body: "internal error".to_string(),
            });
        }

        let mut stored = payload.clone();
        if let Some((field_id, value)) = &self.added_field {
            stored[field_id.as_str()] = json!([{ "value": value }]);
        }
        if self.omit_uri {
            return Ok(stored);
        }
        let existing = stored["wisski_uri"][0]["value"].as_str().map(String::from);
        let uri = match existing {
            Some(uri) => uri,
            None => {
                self.next_id += 1;
                let uri = format!("http://example.org/{bundle_id}/{}", self.next_id);
                stored["wisski_uri"] = json!([{ "value": uri }]);
                uri
            }
        };
        self.entities.insert(uri, stored.clone());
        Ok(stored)
    }
}

fn objects_pathbuilder() -> SchemaTree {
    SchemaTree::new(
        "objects",
        vec![
            Path::leaf("title", "object").with_field_type("string"),
            Path::leaf("owner", "object").with_field_type("entity_reference"),
            Path::bundle("production", "object", "production"),
        ],
    )
}

fn events_pathbuilder() -> JsonValue {
    json!({
        "id": "events",
        "paths": {
            "p_production": {
                "id": "p_production", "field": "b_production", "bundle": "production",
                "parent": "0", "is_group": "1", "enabled": "1",
                "children": {
                    "p_date": {
                        "id": "p_date", "field": "date", "bundle": "production",
                        "is_group": "0", "enabled": "1", "fieldtype": "string",
                        "cardinality": "1", "children": []
                    },
                    "p_note": {
                        "id": "p_note", "field": "note", "bundle": "production",
                        "is_group": "0", "enabled": "1", "fieldtype": "text_long",
                        "cardinality": "-1", "children": []
                    }
                }
            }
        }
    })
}

fn transport() -> MemoryTransport {
    let events = SchemaTree::from_pathbuilder_json(&events_pathbuilder()).unwrap();
    MemoryTransport::with_pathbuilders(vec![objects_pathbuilder(), events])
}

fn new_object() -> Entity {
    Entity::new("object")
        .with("title", ["A", "B"])
        .with("owner", ["http://example.org/person/7"])
        .with(
            "production",
            [
                Entity::new("production").with("date", ["2020"]),
                Entity::new("production")
                    .with("date", ["2021"])
                    .with("note", ["<p>restored</p>"]),
            ],
        )
}

// ---------------------------------------------------------------------------
// Connecting
// ---------------------------------------------------------------------------

#[test]
fn test_connect_merges_pathbuilders() {
    let mapper = RemoteMapper::connect(transport(), ["objects", "events"]).unwrap();
    let schema = mapper.schema();
    assert_eq!(schema.bundle_fields("object"), ["title", "owner", "production"]);
    assert_eq!(schema.bundle_fields("production"), ["date", "note"]);
    assert_eq!(schema.parent_of("production"), Some("object"));
}

#[test]
fn test_connect_all_uses_listed_pathbuilders() {
    let mapper = RemoteMapper::connect_all(transport()).unwrap();
    assert_eq!(mapper.schema().len(), 5);
}

#[test]
fn test_connect_reports_missing_pathbuilder() {
    let err = RemoteMapper::connect(transport(), ["objects", "people"]).unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Transport(TransportError::Status { code: 404, .. })
    ));
}

#[test]
fn test_connect_rejects_conflicting_pathbuilders() {
    let clash = SchemaTree::new("clash", vec![Path::leaf("title", "person")]);
    let transport = MemoryTransport::with_pathbuilders(vec![objects_pathbuilder(), clash]);
    let err = RemoteMapper::connect_all(transport).unwrap_err();
    assert!(matches!(err, RemoteError::Schema(SchemaError::Conflict { .. })));
}

// ---------------------------------------------------------------------------
// Saving and loading
// ---------------------------------------------------------------------------

#[test]
fn test_save_assigns_uri_to_every_node() {
    let mut mapper = RemoteMapper::connect_all(transport()).unwrap();
    let object = new_object();

    let saved = mapper.save(&object).unwrap();
    assert!(saved.all_persisted());
    assert_eq!(saved.literals("title").collect::<Vec<_>>(), ["A", "B"]);
    assert_eq!(saved.to_flat(), object.to_flat());

    let productions: Vec<&Entity> = saved.entities("production").collect();
    assert_eq!(productions.len(), 2);
    assert_eq!(productions[0].literals("date").collect::<Vec<_>>(), ["2020"]);
    assert_eq!(productions[1].literals("note").collect::<Vec<_>>(), ["<p>restored</p>"]);

    // Children are sent before their parent.
    assert_eq!(
        mapper.transport().sent,
        ["production", "production", "object"]
    );
}

#[test]
fn test_save_embeds_saved_children() {
    let mut mapper = RemoteMapper::connect_all(transport()).unwrap();
    let saved = mapper.save(&new_object()).unwrap();

    let stored = &mapper.transport().entities[saved.uri().unwrap()];
    let nested = &stored["production"][0]["entity"];
    assert_eq!(
        nested["wisski_uri"][0]["value"].as_str(),
        saved.entities("production").next().unwrap().uri()
    );
    assert_eq!(
        stored["owner"],
        json!([{"target_uri": "http://example.org/person/7", "target_type": "wisski_individual"}])
    );
    assert_eq!(nested.get("note"), None, "first production has no note");
}

#[test]
fn test_save_then_load_round_trip() {
    let mut mapper = RemoteMapper::connect_all(transport()).unwrap();
    let saved = mapper.save(&new_object()).unwrap();

    let loaded = mapper.load(saved.uri().unwrap()).unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn test_save_keeps_existing_uris() {
    let mut mapper = RemoteMapper::connect_all(transport()).unwrap();
    let object = Entity::new("object")
        .with_uri("http://example.org/object/known")
        .with("title", ["A"]);

    let saved = mapper.save(&object).unwrap();
    assert_eq!(saved, object);
    assert!(
        mapper
            .transport()
            .entities
            .contains_key("http://example.org/object/known")
    );
}

#[test]
fn test_save_ignores_fields_the_remote_adds() {
    let mut transport = transport();
    transport.added_field = Some(("owner".to_string(), "http://example.org/person/1".to_string()));
    let mut mapper = RemoteMapper::connect_all(transport).unwrap();
    let object = Entity::new("object").with("title", ["A"]);

    let saved = mapper.save(&object).unwrap();
    assert_eq!(saved.fields().map(|(id, _)| id).collect::<Vec<_>>(), ["title"]);
    assert_eq!(saved.to_flat(), object.to_flat());

    let stored = &mapper.transport().entities[saved.uri().unwrap()];
    assert!(stored.get("owner").is_some());
}

#[test]
fn test_failed_descendant_stops_ancestors() {
    let mut transport = transport();
    transport.fail_bundle = Some("production".to_string());
    let mut mapper = RemoteMapper::connect_all(transport).unwrap();

    let err = mapper.save(&new_object()).unwrap_err();
    match &err {
        RemoteError::Save { bundle_id, uri, .. } => {
            assert_eq!(bundle_id, "production");
            assert_eq!(uri, "new");
        }
        other => panic!("expected save error, got {other:?}"),
    }
    assert!(matches!(
        err.root_cause(),
        RemoteError::Transport(TransportError::Status { code: 500, .. })
    ));
    assert_eq!(mapper.transport().sent, ["production"]);
    assert!(mapper.transport().entities.is_empty());
}

#[test]
fn test_missing_uri_in_response() {
    let mut transport = transport();
    transport.omit_uri = true;
    let mut mapper = RemoteMapper::connect_all(transport).unwrap();

    let err = mapper
        .save(&Entity::new("object").with("title", ["A"]))
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        RemoteError::MissingUri { bundle_id } if bundle_id == "object"
    ));
}

#[test]
fn test_invalid_tree_is_not_sent() {
    let mut mapper = RemoteMapper::connect_all(transport()).unwrap();
    let object = Entity::new("object").with(
        "production",
        [Entity::new("production").with("date", ["2020", "2021"])],
    );

    let err = mapper.save(&object).unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Validation(ValidationError::Cardinality { .. })
    ));
    assert!(mapper.transport().sent.is_empty());
}

#[test]
fn test_save_all_reports_each_entity() {
    let mut mapper = RemoteMapper::connect_all(transport()).unwrap();
    let good = Entity::new("object").with("title", ["A"]);
    let bad = Entity::new("object").with("date", ["2020"]);
    let other = Entity::new("production").with("date", ["2022"]);

    let results = mapper.save_all([&good, &bad, &other]);
    assert_eq!(results.len(), 3);
    assert!(results[0].as_ref().unwrap().uri().is_some());
    assert!(matches!(results[1], Err(RemoteError::Validation(_))));
    assert!(results[2].as_ref().unwrap().uri().is_some());
}

#[test]
fn test_load_unknown_uri() {
    let mut mapper = RemoteMapper::connect_all(transport()).unwrap();
    let err = mapper.load("http://example.org/missing").unwrap_err();
    assert!(matches!(err, RemoteError::Transport(ref e) if !e.is_retryable()));
}

#[test]
fn test_set_schema_replaces_schema() {
    let mut mapper = RemoteMapper::connect(transport(), ["objects"]).unwrap();
    assert!(!mapper.schema().contains_bundle("person"));

    let schema = wisski_core::merge([vec![Path::leaf("name", "person")]]).unwrap();
    mapper.set_schema(schema);
    assert!(mapper.schema().contains_bundle("person"));

    let transport = mapper.into_transport();
    assert!(transport.sent.is_empty());
}
