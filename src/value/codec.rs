//! Conversion between [`FeatureValue`]s and attribute table rows.
//!
//! A row is `(value, probability)`. Unknown values and closed defaults are
//! never stored; `encode` returns `None` for both and `decode` turns a
//! missing row back into the closed default or [`FeatureValue::Unknown`].

use std::collections::BTreeSet;

use crate::error::{GraphError, Result};
use crate::types::ItemId;

use super::{CategValue, FeatureDef, FeatureKind, FeatureValue, MultiCategValue};

/// Text columns of one attribute row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredValue {
    /// `value` column.
    pub value: String,
    /// `probability` column.
    pub probability: Option<String>,
}

/// Converts `value` into the row to persist, or `None` if the row must be deleted.
pub(crate) fn encode(
    feature_id: &str,
    def: &FeatureDef,
    value: &FeatureValue,
) -> Result<Option<StoredValue>> {
    if value.is_unknown() {
        return Ok(None);
    }
    let value = normalize(feature_id, &def.kind, value)?;
    if let Some(default) = &def.closed_default {
        if normalize(feature_id, &def.kind, default)? == value {
            return Ok(None);
        }
    }
    let stored = match &value {
        FeatureValue::Unknown => return Ok(None),
        FeatureValue::Numeric(v) => StoredValue {
            value: v.to_string(),
            probability: None,
        },
        FeatureValue::String(v) => StoredValue {
            value: v.clone(),
            probability: None,
        },
        FeatureValue::Categorical(v) => StoredValue {
            value: v.category.clone(),
            probability: v.probs.as_deref().map(encode_probs).transpose()?,
        },
        FeatureValue::MultiCategorical(v) => StoredValue {
            value: serde_json::to_string(&v.categories)?,
            probability: v.probs.as_deref().map(encode_probs).transpose()?,
        },
        FeatureValue::MultiId(ids) => {
            let tokens: Vec<String> = ids.iter().map(ToString::to_string).collect();
            StoredValue {
                value: serde_json::to_string(&tokens)?,
                probability: None,
            }
        }
    };
    Ok(Some(stored))
}

/// Rebuilds a value from its row; a missing row yields the default or unknown.
pub(crate) fn decode(
    feature_id: &str,
    def: &FeatureDef,
    stored: Option<&StoredValue>,
) -> Result<FeatureValue> {
    let Some(stored) = stored else {
        return Ok(def
            .closed_default
            .clone()
            .unwrap_or(FeatureValue::Unknown));
    };
    let malformed = |what: &str| {
        GraphError::InvalidValue(format!(
            "stored {what} for feature {feature_id} is malformed: {:?}",
            stored.value
        ))
    };
    let value = match &def.kind {
        FeatureKind::Numeric => {
            FeatureValue::Numeric(stored.value.parse().map_err(|_| malformed("number"))?)
        }
        FeatureKind::String => FeatureValue::String(stored.value.clone()),
        FeatureKind::Categorical(categories) => {
            let probs = match &stored.probability {
                Some(text) => Some(decode_probs(feature_id, text)?),
                None => None,
            };
            let value = FeatureValue::Categorical(CategValue {
                category: stored.value.clone(),
                probs,
            });
            check_categories(feature_id, categories, &value)?;
            value
        }
        FeatureKind::MultiCategorical(categories) => {
            let members: BTreeSet<String> =
                serde_json::from_str(&stored.value).map_err(|_| malformed("category list"))?;
            let probs = match &stored.probability {
                Some(text) => Some(decode_probs(feature_id, text)?),
                None => None,
            };
            let value = FeatureValue::MultiCategorical(MultiCategValue {
                categories: members,
                probs,
            });
            check_categories(feature_id, categories, &value)?;
            value
        }
        FeatureKind::MultiId => {
            let tokens: Vec<String> =
                serde_json::from_str(&stored.value).map_err(|_| malformed("id list"))?;
            let ids = tokens
                .iter()
                .map(|token| token.parse::<ItemId>())
                .collect::<Result<BTreeSet<_>>>()?;
            FeatureValue::MultiId(ids)
        }
    };
    Ok(value)
}

/// Checks that `value` fits `def`, without regard to closed defaults.
pub(crate) fn validate(feature_id: &str, def: &FeatureDef, value: &FeatureValue) -> Result<()> {
    if value.is_unknown() {
        return Ok(());
    }
    normalize(feature_id, &def.kind, value).map(|_| ())
}

/// Validates `value` against `kind` and fills in the one-hot vector of a
/// categorical value that carries none.
fn normalize(feature_id: &str, kind: &FeatureKind, value: &FeatureValue) -> Result<FeatureValue> {
    let fits = matches!(
        (kind, value),
        (_, FeatureValue::Unknown)
            | (FeatureKind::Numeric, FeatureValue::Numeric(_))
            | (FeatureKind::String, FeatureValue::String(_))
            | (FeatureKind::Categorical(_), FeatureValue::Categorical(_))
            | (FeatureKind::MultiCategorical(_), FeatureValue::MultiCategorical(_))
            | (FeatureKind::MultiId, FeatureValue::MultiId(_))
    );
    if !fits {
        return Err(GraphError::TypeMismatch(format!(
            "feature {feature_id} is {} but value {value:?} is not",
            kind.name()
        )));
    }
    if let Some(categories) = kind.categories() {
        check_categories(feature_id, categories, value)?;
    }
    match (kind, value) {
        (FeatureKind::Categorical(categories), FeatureValue::Categorical(v)) if v.probs.is_none() => {
            let probs = categories
                .iter()
                .map(|c| if *c == v.category { 1.0 } else { 0.0 })
                .collect();
            Ok(FeatureValue::Categorical(CategValue {
                category: v.category.clone(),
                probs: Some(probs),
            }))
        }
        _ => Ok(value.clone()),
    }
}

fn check_categories(feature_id: &str, categories: &[String], value: &FeatureValue) -> Result<()> {
    let (members, probs): (Vec<&String>, Option<&Vec<f64>>) = match value {
        FeatureValue::Categorical(v) => (vec![&v.category], v.probs.as_ref()),
        FeatureValue::MultiCategorical(v) => (v.categories.iter().collect(), v.probs.as_ref()),
        _ => return Ok(()),
    };
    if let Some(unknown) = members.iter().find(|m| !categories.contains(m)) {
        return Err(GraphError::InvalidValue(format!(
            "{unknown:?} is not a category of feature {feature_id}"
        )));
    }
    if let Some(probs) = probs {
        if probs.len() != categories.len() {
            return Err(GraphError::InvalidValue(format!(
                "feature {feature_id} has {} categories but {} probabilities were given",
                categories.len(),
                probs.len()
            )));
        }
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(GraphError::InvalidValue(format!(
                "feature {feature_id} probabilities must be finite"
            )));
        }
    }
    Ok(())
}

fn encode_probs(probs: &[f64]) -> Result<String> {
    Ok(serde_json::to_string(probs)?)
}

fn decode_probs(feature_id: &str, text: &str) -> Result<Vec<f64>> {
    serde_json::from_str(text).map_err(|_| {
        GraphError::InvalidValue(format!(
            "stored probabilities for feature {feature_id} are malformed: {text:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GraphId;

    fn status() -> FeatureKind {
        FeatureKind::Categorical(vec!["active".into(), "idle".into(), "banned".into()])
    }

    #[test]
    fn unknown_is_never_stored() -> Result<()> {
        let def = FeatureDef::open(FeatureKind::Numeric);
        assert_eq!(encode("age", &def, &FeatureValue::Unknown)?, None);
        assert_eq!(decode("age", &def, None)?, FeatureValue::Unknown);
        Ok(())
    }

    #[test]
    fn closed_default_is_suppressed_and_restored() -> Result<()> {
        let def = FeatureDef::closed(FeatureKind::Numeric, FeatureValue::numeric(0.0));
        assert_eq!(encode("score", &def, &FeatureValue::numeric(0.0))?, None);
        assert_eq!(decode("score", &def, None)?, FeatureValue::numeric(0.0));
        let stored = encode("score", &def, &FeatureValue::numeric(2.5))?;
        assert_eq!(
            stored,
            Some(StoredValue {
                value: "2.5".into(),
                probability: None
            })
        );
        Ok(())
    }

    #[test]
    fn categorical_gets_one_hot_probabilities() -> Result<()> {
        let def = FeatureDef::open(status());
        let stored = encode("status", &def, &FeatureValue::categorical("idle"))?
            .expect("categorical value is stored");
        assert_eq!(stored.value, "idle");
        assert_eq!(stored.probability.as_deref(), Some("[0.0,1.0,0.0]"));
        let decoded = decode("status", &def, Some(&stored))?;
        assert_eq!(
            decoded,
            FeatureValue::categorical_with_probs("idle", vec![0.0, 1.0, 0.0])
        );
        Ok(())
    }

    #[test]
    fn closed_categorical_default_matches_with_or_without_probs() -> Result<()> {
        let def = FeatureDef::closed(status(), FeatureValue::categorical("active"));
        let explicit = FeatureValue::categorical_with_probs("active", vec![1.0, 0.0, 0.0]);
        assert_eq!(encode("status", &def, &explicit)?, None);
        let soft = FeatureValue::categorical_with_probs("active", vec![0.6, 0.4, 0.0]);
        assert!(encode("status", &def, &soft)?.is_some());
        Ok(())
    }

    #[test]
    fn categorical_values_are_checked() {
        let def = FeatureDef::open(status());
        assert!(matches!(
            encode("status", &def, &FeatureValue::categorical("gone")),
            Err(GraphError::InvalidValue(_))
        ));
        assert!(matches!(
            encode(
                "status",
                &def,
                &FeatureValue::categorical_with_probs("idle", vec![1.0])
            ),
            Err(GraphError::InvalidValue(_))
        ));
        assert!(matches!(
            encode("status", &def, &FeatureValue::numeric(1.0)),
            Err(GraphError::TypeMismatch(_))
        ));
    }

    #[test]
    fn multi_valued_kinds_use_delimited_lists() -> Result<()> {
        let tags = FeatureDef::open(FeatureKind::MultiCategorical(vec![
            "a".into(),
            "b".into(),
            "c".into(),
        ]));
        let value = FeatureValue::MultiCategorical(MultiCategValue {
            categories: ["c".to_string(), "a".to_string()].into_iter().collect(),
            probs: Some(vec![0.5, 0.0, 0.5]),
        });
        let stored = encode("tags", &tags, &value)?.expect("stored");
        assert_eq!(stored.value, r#"["a","c"]"#);
        assert_eq!(decode("tags", &tags, Some(&stored))?, value);

        let graph = GraphId::new("social", "g1")?;
        let refs = FeatureDef::open(FeatureKind::MultiId);
        let ids = FeatureValue::multi_id([
            ItemId::new(graph.clone(), "person", "p1")?,
            ItemId::new(graph, "person", "p,2")?,
        ]);
        let stored = encode("refs", &refs, &ids)?.expect("stored");
        assert_eq!(decode("refs", &refs, Some(&stored))?, ids);
        Ok(())
    }

    #[test]
    fn malformed_rows_are_reported() {
        let def = FeatureDef::open(FeatureKind::Numeric);
        let stored = StoredValue {
            value: "twelve".into(),
            probability: None,
        };
        assert!(matches!(
            decode("age", &def, Some(&stored)),
            Err(GraphError::InvalidValue(_))
        ));
    }
}
