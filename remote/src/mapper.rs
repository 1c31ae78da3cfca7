//! Loading and saving entity trees through a [`Transport`].

use tracing::{debug, info, warn};
use wisski_core::{Entity, MergedSchema, SchemaTree, Value, merge_trees, validate_entity};

use crate::error::{RemoteError, Result};
use crate::payload::{from_payload, to_payload};
use crate::transport::Transport;

/// Maps entity trees to and from a remote WissKI instance.
///
/// The mapper holds the merged schema of the pathbuilders it was connected
/// with. Replacing that schema with [`set_schema`](Self::set_schema) does not
/// touch entities loaded earlier; keeping them consistent is up to the
/// caller.
#[derive(Debug)]
pub struct RemoteMapper<T> {
    transport: T,
    schema: MergedSchema,
}

impl<T: Transport> RemoteMapper<T> {
    /// Creates a mapper with an already merged schema.
    pub fn new(transport: T, schema: MergedSchema) -> Self {
        Self { transport, schema }
    }

    /// Fetches the given pathbuilders and merges them into the mapper's
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] if a pathbuilder cannot be fetched
    /// and [`RemoteError::Schema`] if the pathbuilders do not merge.
    pub fn connect<I, S>(mut transport: T, pathbuilder_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trees = pathbuilder_ids
            .into_iter()
            .map(|id| transport.fetch_paths(id.as_ref()))
            .collect::<std::result::Result<Vec<SchemaTree>, _>>()?;
        let schema = merge_trees(&trees)?;
        info!(
            pathbuilders = trees.len(),
            fields = schema.len(),
            "Connected to remote"
        );
        Ok(Self { transport, schema })
    }

    /// Like [`connect`](Self::connect), over every pathbuilder the remote
    /// lists.
    pub fn connect_all(mut transport: T) -> Result<Self> {
        let ids = transport.list_pathbuilders()?;
        debug!(pathbuilders = ?ids, "Listed remote pathbuilders");
        Self::connect(transport, ids)
    }

    /// Loads one entity tree.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`], [`RemoteError::Payload`] for an
    /// unreadable response and [`RemoteError::Validation`] if the entity
    /// does not fit the schema.
    pub fn load(&mut self, uri: &str) -> Result<Entity> {
        let payload = self.transport.fetch_entity(uri)?;
        let entity = from_payload(&payload)?;
        validate_entity(&entity, &self.schema)?;
        debug!(uri = %uri, bundle = %entity.bundle_id(), "Loaded entity");
        Ok(entity)
    }

    /// Saves an entity tree, children before parents.
    ///
    /// Every nested entity is saved first; its parent is then sent with the
    /// saved children embedded. The returned tree has the same shape and
    /// field ids as the input, with the uris and literal values the remote
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Validation`] before anything is sent if the tree
    /// does not fit the schema. Otherwise the first failing node stops the
    /// traversal with [`RemoteError::Save`]; nodes saved before it are not
    /// rolled back.
    pub fn save(&mut self, entity: &Entity) -> Result<Entity> {
        validate_entity(entity, &self.schema)?;
        self.save_node(entity)
    }

    /// Saves several entity trees independently, returning one result per
    /// tree in input order.
    pub fn save_all<'e, I>(&mut self, entities: I) -> Vec<Result<Entity>>
    where
        I: IntoIterator<Item = &'e Entity>,
    {
        let results: Vec<_> = entities
            .into_iter()
            .map(|entity| self.save(entity))
            .collect();
        info!(
            saved = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Saved entities"
        );
        results
    }

    /// Returns the merged schema.
    pub fn schema(&self) -> &MergedSchema {
        &self.schema
    }

    /// Replaces the merged schema.
    pub fn set_schema(&mut self, schema: MergedSchema) {
        self.schema = schema;
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the mapper, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn save_node(&mut self, entity: &Entity) -> Result<Entity> {
        let mut saved = Entity::new(entity.bundle_id());
        saved.set_uri(entity.uri().map(String::from));
        for (field_id, values) in entity.fields() {
            let mut saved_values = Vec::with_capacity(values.len());
            for value in values {
                saved_values.push(match value {
                    Value::Entity(child) => Value::Entity(self.save_node(child)?),
                    Value::Literal(_) => value.clone(),
                });
            }
            saved.set(field_id, saved_values);
        }

        self.store(&mut saved).map_err(|source| {
            let uri = entity.uri().unwrap_or("new").to_string();
            warn!(
                bundle = %entity.bundle_id(),
                uri = %uri,
                error = %source,
                "Failed to save entity"
            );
            RemoteError::Save {
                bundle_id: entity.bundle_id().to_string(),
                uri,
                source: Box::new(source),
            }
        })?;
        Ok(saved)
    }

    /// Sends one node whose children are already saved, then takes the uri
    /// from the response along with the values of the leaf fields the node
    /// already held.
    fn store(&mut self, node: &mut Entity) -> Result<()> {
        let bundle_id = node.bundle_id().to_string();
        let payload = to_payload(node, &self.schema);
        debug!(bundle = %bundle_id, uri = ?node.uri(), "Sending entity");

        let response = self.transport.create_or_update_entity(&bundle_id, &payload)?;
        let stored = from_payload(&response)?;
        let uri = stored
            .uri()
            .ok_or_else(|| RemoteError::MissingUri {
                bundle_id: bundle_id.clone(),
            })?
            .to_string();

        for field in self.schema.fields_of(&bundle_id) {
            if field.is_bundle_field() || node.values(&field.id).is_empty() {
                continue;
            }
            let values: Vec<Value> = stored.literals(&field.id).map(Value::from).collect();
            if !values.is_empty() {
                node.set(&field.id, values);
            }
        }
        node.set_uri(Some(uri));
        debug!(bundle = %bundle_id, uri = ?node.uri(), "Saved entity");
        Ok(())
    }
}
