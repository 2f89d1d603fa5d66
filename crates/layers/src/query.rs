use formats::{Feature, FeatureCollection};
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyOp {
    Eq,
    Contains,
}

/// Keeps features whose `key` property matches any of `values` under `op`.
///
/// Numbers and booleans are compared by their text form. A feature without
/// the key never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PropertyFilter {
    pub key: String,
    pub op: PropertyOp,
    pub values: Vec<String>,
}

impl PropertyFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: PropertyOp::Eq,
            values: vec![value.into()],
        }
    }

    pub fn one_of<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            op: PropertyOp::Eq,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains_any<I, S>(key: impl Into<String>, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            op: PropertyOp::Contains,
            values: needles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        let Some(text) = feature.property_text(&self.key) else {
            return false;
        };
        self.values.iter().any(|v| match self.op {
            PropertyOp::Eq => text == v.as_str(),
            PropertyOp::Contains => text.contains(v.as_str()),
        })
    }
}

/// Indices of the features of `collection` that pass `filter`, in source order.
pub fn filter_indices(collection: &FeatureCollection, filter: Option<&PropertyFilter>) -> Vec<usize> {
    match filter {
        None => (0..collection.len()).collect(),
        Some(f) => collection
            .features
            .iter()
            .enumerate()
            .filter(|(_, feature)| f.matches(feature))
            .map(|(i, _)| i)
            .collect(),
    }
}
