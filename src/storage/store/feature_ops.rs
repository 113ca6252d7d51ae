use rusqlite::params_from_iter;
use rusqlite::types::Value;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::{count_to_usize, GraphStore};
use crate::error::{GraphError, Result};
use crate::schema::Schema;
use crate::storage::ddl;
use crate::storage::events::{FeatureOwner, GraphEvent};
use crate::types::{Rid, SchemaKind};
use crate::value::{codec, FeatureDef, FeatureValue, StoredValue};

impl GraphStore {
    /// Number of attribute rows persisted for `schema_id`.
    ///
    /// Unknown values and closed defaults are never stored, so writing either
    /// leaves this count unchanged.
    pub fn num_feature_values_stored(&self, schema_id: &str) -> Result<usize> {
        self.schema(schema_id)?;
        let count = self.scalar(&ddl::count_attribute_rows(schema_id), [])?;
        Ok(count_to_usize(count))
    }

    pub(crate) fn read_feature(
        &self,
        schema_id: &str,
        rid: Rid,
        feature_id: &str,
    ) -> Result<FeatureValue> {
        let schema = self.schema(schema_id)?;
        let def = feature_def(&schema, schema_id, feature_id)?;
        let stored = self.backing()?.query_row(
            &ddl::select_feature(schema_id),
            (rid.0, feature_id),
            |row| {
                Ok(StoredValue {
                    value: row.get(0)?,
                    probability: row.get(1)?,
                })
            },
        )?;
        codec::decode(feature_id, def, stored.as_ref())
    }

    pub(crate) fn write_feature(
        &self,
        owner: FeatureOwner,
        schema_id: &str,
        rid: Rid,
        feature_id: &str,
        value: FeatureValue,
    ) -> Result<()> {
        let schema = self.schema(schema_id)?;
        let def = feature_def(&schema, schema_id, feature_id)?;
        self.check_present(&schema, schema_id, rid)?;
        let backing = self.backing()?;
        match codec::encode(feature_id, def, &value)? {
            Some(stored) => {
                backing.execute(
                    &ddl::upsert_feature(schema_id),
                    (rid.0, feature_id, &stored.value, &stored.probability),
                )?;
                self.metrics.feature_rows_written(1);
            }
            None => {
                backing.execute(&ddl::delete_feature(schema_id), (rid.0, feature_id))?;
                self.metrics.feature_rows_suppressed(1);
            }
        }
        trace!(schema = schema_id, rid = rid.0, feature = feature_id, "feature written");
        self.fire(GraphEvent::FeatureSet {
            owner,
            feature_id: feature_id.to_owned(),
            value,
        })
    }

    /// Reads `feature_ids` of one item with a single query.
    pub(crate) fn read_features(
        &self,
        schema_id: &str,
        rid: Rid,
        feature_ids: &[&str],
    ) -> Result<Vec<FeatureValue>> {
        let schema = self.schema(schema_id)?;
        let defs = feature_ids
            .iter()
            .map(|feature_id| feature_def(&schema, schema_id, feature_id))
            .collect::<Result<Vec<_>>>()?;
        let rows = self.item_rows(schema_id, rid)?;
        feature_ids
            .iter()
            .zip(defs)
            .map(|(feature_id, def)| codec::decode(feature_id, def, rows.get(*feature_id)))
            .collect()
    }

    /// Every feature of the item's schema with its value, in declaration order.
    pub(crate) fn read_all_features(
        &self,
        schema_id: &str,
        rid: Rid,
    ) -> Result<Vec<(String, FeatureValue)>> {
        let schema = self.schema(schema_id)?;
        let rows = self.item_rows(schema_id, rid)?;
        schema
            .features()
            .map(|(feature_id, def)| {
                let value = codec::decode(feature_id, def, rows.get(feature_id))?;
                Ok((feature_id.to_owned(), value))
            })
            .collect()
    }

    /// Rejects writes through the handle of a removed node or edge.
    fn check_present(&self, schema: &Schema, schema_id: &str, rid: Rid) -> Result<()> {
        let sql = match schema.kind() {
            SchemaKind::Graph => return Ok(()),
            SchemaKind::Node => ddl::NODE_EXISTS,
            SchemaKind::DirectedEdge | SchemaKind::UndirectedEdge => ddl::EDGE_EXISTS,
        };
        if self.scalar(sql, [rid.0])? == 0 {
            return Err(GraphError::InvalidState(format!(
                "{schema_id} item {rid} has been removed"
            )));
        }
        Ok(())
    }

    /// Writes `values` to `feature_ids` of one item.
    ///
    /// Every value is encoded before anything is written; the rows are then
    /// replaced with one `DELETE` and at most one `INSERT`.
    pub(crate) fn write_features(
        &self,
        owner: FeatureOwner,
        schema_id: &str,
        rid: Rid,
        feature_ids: &[&str],
        values: Vec<FeatureValue>,
    ) -> Result<()> {
        if feature_ids.len() != values.len() {
            return Err(GraphError::InvalidOperation(format!(
                "{} feature ids given for {} values",
                feature_ids.len(),
                values.len()
            )));
        }
        let mut seen = FxHashSet::default();
        if let Some(duplicate) = feature_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(GraphError::InvalidOperation(format!(
                "feature {duplicate} is listed twice"
            )));
        }
        if feature_ids.is_empty() {
            return Ok(());
        }
        let schema = self.schema(schema_id)?;
        self.check_present(&schema, schema_id, rid)?;
        let mut inserts: Vec<Value> = Vec::new();
        for (feature_id, value) in feature_ids.iter().zip(&values) {
            let def = feature_def(&schema, schema_id, feature_id)?;
            if let Some(stored) = codec::encode(feature_id, def, value)? {
                inserts.push(Value::Integer(rid.0));
                inserts.push(Value::Text((*feature_id).to_owned()));
                inserts.push(Value::Text(stored.value));
                inserts.push(stored.probability.map_or(Value::Null, Value::Text));
            }
        }
        let written = inserts.len() / 4;

        let mut deletes: Vec<Value> = Vec::with_capacity(feature_ids.len() + 1);
        deletes.push(Value::Integer(rid.0));
        deletes.extend(feature_ids.iter().map(|id| Value::Text((*id).to_owned())));

        let backing = self.backing()?;
        backing.savepoint("write_features", || {
            backing.execute(
                &ddl::delete_features(schema_id, feature_ids.len()),
                params_from_iter(deletes.iter()),
            )?;
            if written > 0 {
                backing.execute(
                    &ddl::insert_features(schema_id, written),
                    params_from_iter(inserts.iter()),
                )?;
            }
            Ok(())
        })?;
        self.metrics.feature_rows_written(written);
        self.metrics
            .feature_rows_suppressed(feature_ids.len() - written);
        trace!(schema = schema_id, rid = rid.0, written, "features written");

        self.fire_all(
            feature_ids
                .iter()
                .zip(values)
                .map(|(feature_id, value)| GraphEvent::FeatureSet {
                    owner: owner.clone(),
                    feature_id: (*feature_id).to_owned(),
                    value,
                }),
        )
    }

    fn item_rows(&self, schema_id: &str, rid: Rid) -> Result<FxHashMap<String, StoredValue>> {
        let rows = self.backing()?.query(
            &ddl::select_item_features(schema_id),
            [rid.0],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StoredValue {
                        value: row.get(1)?,
                        probability: row.get(2)?,
                    },
                ))
            },
        )?;
        Ok(rows.into_iter().collect())
    }
}

fn feature_def<'s>(
    schema: &'s Schema,
    schema_id: &str,
    feature_id: &str,
) -> Result<&'s FeatureDef> {
    schema
        .feature(feature_id)
        .ok_or_else(|| GraphError::UndefinedFeature {
            schema: schema_id.to_owned(),
            feature: feature_id.to_owned(),
        })
}
