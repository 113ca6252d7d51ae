use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::types::SchemaKind;
use crate::value::{codec, FeatureDef, FeatureValue};

/// One named feature of a schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    /// Feature id, unique within the schema.
    pub id: String,
    /// Definition.
    pub def: FeatureDef,
}

/// A typed, ordered set of feature definitions for one item kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    kind: SchemaKind,
    features: Vec<FeatureEntry>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            features: Vec::new(),
        }
    }

    /// Builder form of [`Schema::set_feature`].
    pub fn with_feature(mut self, id: impl Into<String>, def: FeatureDef) -> Self {
        self.set_feature(id, def);
        self
    }

    /// Item kind described by the schema.
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Adds a feature; fails if the id is already defined.
    pub fn add_feature(&mut self, id: impl Into<String>, def: FeatureDef) -> Result<()> {
        let id = id.into();
        if self.has_feature(&id) {
            return Err(GraphError::InvalidOperation(format!(
                "feature {id} is already defined"
            )));
        }
        self.features.push(FeatureEntry { id, def });
        Ok(())
    }

    /// Adds a feature or replaces the definition of an existing one in place.
    pub fn set_feature(&mut self, id: impl Into<String>, def: FeatureDef) {
        let id = id.into();
        match self.features.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.def = def,
            None => self.features.push(FeatureEntry { id, def }),
        }
    }

    /// Removes a feature, returning its definition.
    pub fn remove_feature(&mut self, id: &str) -> Option<FeatureDef> {
        let pos = self.features.iter().position(|entry| entry.id == id)?;
        Some(self.features.remove(pos).def)
    }

    /// Definition of `id`, if defined.
    pub fn feature(&self, id: &str) -> Option<&FeatureDef> {
        self.features
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.def)
    }

    /// Whether `id` is defined.
    pub fn has_feature(&self, id: &str) -> bool {
        self.feature(id).is_some()
    }

    /// Feature ids in declaration order.
    pub fn feature_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.features.iter().map(|entry| entry.id.as_str())
    }

    /// Features in declaration order.
    pub fn features(&self) -> impl Iterator<Item = (&str, &FeatureDef)> + '_ {
        self.features
            .iter()
            .map(|entry| (entry.id.as_str(), &entry.def))
    }

    /// Number of features.
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Checks feature ids and closed defaults.
    pub(crate) fn validate(&self) -> Result<()> {
        for entry in &self.features {
            if entry.id.is_empty() {
                return Err(GraphError::InvalidIdentifier(entry.id.clone()));
            }
            if let Some(default) = &entry.def.closed_default {
                if matches!(default, FeatureValue::Unknown) {
                    return Err(GraphError::InvalidValue(format!(
                        "closed feature {} cannot default to unknown",
                        entry.id
                    )));
                }
                codec::validate(&entry.id, &entry.def, default)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FeatureKind;

    #[test]
    fn features_keep_declaration_order() -> Result<()> {
        let mut schema = Schema::new(SchemaKind::Node)
            .with_feature("name", FeatureDef::open(FeatureKind::String))
            .with_feature("age", FeatureDef::open(FeatureKind::Numeric));
        schema.add_feature("tags", FeatureDef::open(FeatureKind::MultiId))?;
        assert!(schema
            .add_feature("age", FeatureDef::open(FeatureKind::Numeric))
            .is_err());
        assert_eq!(
            schema.feature_ids().collect::<Vec<_>>(),
            ["name", "age", "tags"]
        );
        assert!(schema.remove_feature("age").is_some());
        assert_eq!(schema.num_features(), 2);
        Ok(())
    }

    #[test]
    fn closed_defaults_must_fit_their_kind() {
        let schema = Schema::new(SchemaKind::Node).with_feature(
            "status",
            FeatureDef::closed(
                FeatureKind::Categorical(vec!["on".into(), "off".into()]),
                FeatureValue::categorical("maybe"),
            ),
        );
        assert!(matches!(schema.validate(), Err(GraphError::InvalidValue(_))));

        let schema = Schema::new(SchemaKind::Node).with_feature(
            "age",
            FeatureDef::closed(FeatureKind::Numeric, FeatureValue::string("zero")),
        );
        assert!(matches!(schema.validate(), Err(GraphError::TypeMismatch(_))));
    }
}
