//! Feature definitions and values attached to graph items.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ItemId;

pub(crate) mod codec;

pub use codec::StoredValue;

/// Primitive kind of a feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "categories", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Floating point number.
    Numeric,
    /// Free text.
    String,
    /// One category out of a fixed list.
    Categorical(Vec<String>),
    /// A subset of a fixed category list.
    MultiCategorical(Vec<String>),
    /// A set of item identifiers.
    MultiId,
}

impl FeatureKind {
    /// Stable lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Numeric => "numeric",
            FeatureKind::String => "string",
            FeatureKind::Categorical(_) => "categorical",
            FeatureKind::MultiCategorical(_) => "multi_categorical",
            FeatureKind::MultiId => "multi_id",
        }
    }

    /// Declared categories, for the categorical kinds.
    pub fn categories(&self) -> Option<&[String]> {
        match self {
            FeatureKind::Categorical(categories) | FeatureKind::MultiCategorical(categories) => {
                Some(categories)
            }
            _ => None,
        }
    }
}

/// Definition of one feature within a schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Primitive kind.
    pub kind: FeatureKind,
    /// Default reported when no value is stored. `Some` makes the feature closed.
    pub closed_default: Option<FeatureValue>,
}

impl FeatureDef {
    /// An open feature: a missing value reads back as unknown.
    pub fn open(kind: FeatureKind) -> Self {
        Self {
            kind,
            closed_default: None,
        }
    }

    /// A closed feature: a missing value reads back as `default`.
    pub fn closed(kind: FeatureKind, default: FeatureValue) -> Self {
        Self {
            kind,
            closed_default: Some(default),
        }
    }

    /// Whether the feature has a declared default.
    pub fn is_closed(&self) -> bool {
        self.closed_default.is_some()
    }
}

/// A categorical value with its probability vector over the declared categories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategValue {
    /// Chosen category.
    pub category: String,
    /// Probability per declared category, in declaration order.
    pub probs: Option<Vec<f64>>,
}

/// A set of categories with an optional probability vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiCategValue {
    /// Chosen categories.
    pub categories: BTreeSet<String>,
    /// Probability per declared category, in declaration order.
    pub probs: Option<Vec<f64>>,
}

/// A typed feature value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    /// No value is known.
    Unknown,
    /// Numeric value.
    Numeric(f64),
    /// String value.
    String(String),
    /// Categorical value.
    Categorical(CategValue),
    /// Multi-categorical value.
    MultiCategorical(MultiCategValue),
    /// Set of item identifiers.
    MultiId(BTreeSet<ItemId>),
}

impl FeatureValue {
    /// Numeric value.
    pub fn numeric(value: f64) -> Self {
        FeatureValue::Numeric(value)
    }

    /// String value.
    pub fn string(value: impl Into<String>) -> Self {
        FeatureValue::String(value.into())
    }

    /// Categorical value without an explicit probability vector.
    pub fn categorical(category: impl Into<String>) -> Self {
        FeatureValue::Categorical(CategValue {
            category: category.into(),
            probs: None,
        })
    }

    /// Categorical value with an explicit probability vector.
    pub fn categorical_with_probs(category: impl Into<String>, probs: Vec<f64>) -> Self {
        FeatureValue::Categorical(CategValue {
            category: category.into(),
            probs: Some(probs),
        })
    }

    /// Multi-categorical value without a probability vector.
    pub fn multi_categorical<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FeatureValue::MultiCategorical(MultiCategValue {
            categories: categories.into_iter().map(Into::into).collect(),
            probs: None,
        })
    }

    /// Multi-id value.
    pub fn multi_id(ids: impl IntoIterator<Item = ItemId>) -> Self {
        FeatureValue::MultiId(ids.into_iter().collect())
    }

    /// Whether this is [`FeatureValue::Unknown`].
    pub fn is_unknown(&self) -> bool {
        matches!(self, FeatureValue::Unknown)
    }

    /// The numeric payload, if any.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// The string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// The categorical payload, if any.
    pub fn as_categorical(&self) -> Option<&CategValue> {
        match self {
            FeatureValue::Categorical(v) => Some(v),
            _ => None,
        }
    }

    /// The multi-categorical payload, if any.
    pub fn as_multi_categorical(&self) -> Option<&MultiCategValue> {
        match self {
            FeatureValue::MultiCategorical(v) => Some(v),
            _ => None,
        }
    }

    /// The multi-id payload, if any.
    pub fn as_multi_id(&self) -> Option<&BTreeSet<ItemId>> {
        match self {
            FeatureValue::MultiId(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Unknown => f.write_str("?"),
            FeatureValue::Numeric(v) => write!(f, "{v}"),
            FeatureValue::String(v) => f.write_str(v),
            FeatureValue::Categorical(v) => f.write_str(&v.category),
            FeatureValue::MultiCategorical(v) => {
                let joined: Vec<&str> = v.categories.iter().map(String::as_str).collect();
                f.write_str(&joined.join(","))
            }
            FeatureValue::MultiId(ids) => {
                let joined: Vec<String> = ids.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(","))
            }
        }
    }
}
