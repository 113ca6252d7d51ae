use std::rc::Rc;

use tracing::{debug, warn};

use super::{count_to_usize, GraphStore};
use crate::error::{GraphError, Result};
use crate::schema::Schema;
use crate::storage::ddl;
use crate::types::{validate_schema_id, SchemaKind};

impl GraphStore {
    /// Registers `schema` under `id` and creates its attribute table.
    ///
    /// Any stale attribute table left under the same name is dropped first.
    /// Ids are compared case-insensitively, as table names are.
    pub fn add_schema(&self, id: &str, schema: Schema) -> Result<()> {
        validate_schema_id(id)?;
        schema.validate()?;
        self.backing()?;
        let taken = self
            .schemas
            .borrow()
            .keys()
            .any(|existing| existing.eq_ignore_ascii_case(id));
        if taken {
            return Err(GraphError::DuplicateSchema(id.to_owned()));
        }
        self.install_schema(id, &schema)?;
        debug!(schema = id, kind = %schema.kind(), features = schema.num_features(), "schema added");
        self.schemas
            .borrow_mut()
            .insert(id.to_owned(), Rc::new(schema));
        Ok(())
    }

    /// Definition registered under `id`.
    pub fn get_schema(&self, id: &str) -> Result<Schema> {
        self.schema(id).map(|schema| schema.as_ref().clone())
    }

    /// Whether `id` is registered under exactly this spelling.
    ///
    /// Lookups match case-sensitively, like `get_schema`. `add_schema` still
    /// refuses an id differing from a registered one only by ASCII case, so
    /// `has_schema("Person")` may be false while adding `"Person"` fails.
    pub fn has_schema(&self, id: &str) -> Result<bool> {
        self.backing()?;
        Ok(self.schemas.borrow().contains_key(id))
    }

    /// Item kind of the schema registered under `id`.
    pub fn schema_kind(&self, id: &str) -> Result<SchemaKind> {
        self.schema(id).map(|schema| schema.kind())
    }

    /// Registered schema ids, sorted.
    pub fn schema_ids(&self) -> Result<Vec<String>> {
        self.backing()?;
        let mut ids: Vec<String> = self.schemas.borrow().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Registered schema ids of one item kind, sorted.
    pub fn schema_ids_of(&self, kind: SchemaKind) -> Result<Vec<String>> {
        self.backing()?;
        let mut ids: Vec<String> = self
            .schemas
            .borrow()
            .iter()
            .filter(|(_, schema)| schema.kind() == kind)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Swaps the definition of `id` for `schema`.
    ///
    /// Stored values of every feature that was removed, or whose definition
    /// changed, are deleted before the new definition takes effect. The item
    /// kind cannot change.
    pub fn replace_schema(&self, id: &str, schema: Schema) -> Result<()> {
        let current = self.schema(id)?;
        if current.kind() != schema.kind() {
            return Err(GraphError::TypeMismatch(format!(
                "schema {id} is a {} schema, not {}",
                current.kind(),
                schema.kind()
            )));
        }
        schema.validate()?;
        let stale: Vec<&str> = current
            .features()
            .filter(|(feature, def)| schema.feature(feature) != Some(*def))
            .map(|(feature, _)| feature)
            .collect();
        let backing = self.backing()?;
        let definition = serde_json::to_string(&schema)?;
        backing.savepoint("replace_schema", || {
            let delete = ddl::delete_feature_everywhere(id);
            for feature in &stale {
                backing.execute(&delete, [feature])?;
            }
            backing.execute(ddl::SAVE_SCHEMA, (id, schema.kind().as_str(), &definition))?;
            Ok(())
        })?;
        debug!(schema = id, purged = ?stale, "schema replaced");
        self.schemas
            .borrow_mut()
            .insert(id.to_owned(), Rc::new(schema));
        Ok(())
    }

    /// Edits a copy of the definition of `id` with `edit`, then applies it as
    /// [`replace_schema`](Self::replace_schema) does.
    pub fn update_schema<F>(&self, id: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Schema) -> Result<()>,
    {
        let mut schema = self.get_schema(id)?;
        edit(&mut schema)?;
        self.replace_schema(id, schema)
    }

    /// Drops the attribute table of `id` and forgets the schema.
    ///
    /// Nodes and edges of the schema are left in place; their feature values
    /// become unreadable until a schema of the same id is registered again.
    pub fn remove_schema(&self, id: &str) -> Result<()> {
        if id == self.graph_id.schema_id() {
            return Err(GraphError::InvalidOperation(format!(
                "schema {id} belongs to the store's graph item"
            )));
        }
        self.schema(id)?;
        let backing = self.backing()?;
        let orphans = count_to_usize(self.scalar(ddl::COUNT_SCHEMA_ITEMS, [id])?);
        if orphans > 0 {
            warn!(schema = id, items = orphans, "removing schema that still has items");
        }
        backing.flush_statement_cache();
        backing.savepoint("remove_schema", || {
            backing.execute_batch(&ddl::drop_attribute_table(id))?;
            backing.execute(ddl::DELETE_SCHEMA, [id])?;
            Ok(())
        })?;
        self.schemas.borrow_mut().remove(id);
        debug!(schema = id, "schema removed");
        Ok(())
    }

    pub(crate) fn schema(&self, id: &str) -> Result<Rc<Schema>> {
        self.backing()?;
        self.schemas
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::UndefinedSchema(id.to_owned()))
    }

    /// Creates the attribute table and persists the definition.
    ///
    /// Runs against the raw backing so it can be used during initialization.
    pub(super) fn install_schema(&self, id: &str, schema: &Schema) -> Result<()> {
        let backing = &self.backing;
        let definition = serde_json::to_string(schema)?;
        backing.flush_statement_cache();
        backing.savepoint("add_schema", || {
            backing.execute_batch(&ddl::create_attribute_table(id, schema.kind()))?;
            backing.execute(ddl::SAVE_SCHEMA, (id, schema.kind().as_str(), &definition))?;
            Ok(())
        })
    }
}
