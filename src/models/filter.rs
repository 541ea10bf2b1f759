use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// Catalog discovery parameters, keyed by TMDB filter name
///
/// Keys are kept sorted so the rendered query string is stable regardless
/// of the order the entries were inserted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoveryFilter(BTreeMap<String, String>);

impl DiscoveryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Builds a filter from a JSON object.
    ///
    /// Strings are kept verbatim, numbers and booleans are stringified and
    /// arrays of scalars are joined with `,` (TMDB's AND separator). `null`
    /// means "no constraint" and drops the key. Nested objects are rejected.
    pub fn from_json_object(object: &Map<String, Value>) -> AppResult<Self> {
        let mut filter = Self::new();

        for (key, value) in object {
            match value {
                Value::Null => {
                    tracing::debug!(key = %key, "Skipping null filter value");
                }
                Value::Array(items) => {
                    let parts = items
                        .iter()
                        .map(|item| scalar_to_string(key, item))
                        .collect::<AppResult<Vec<_>>>()?;
                    filter.insert(key.as_str(), parts.join(","));
                }
                other => {
                    filter.insert(key.as_str(), scalar_to_string(key, other)?);
                }
            }
        }

        Ok(filter)
    }

    /// Renders the filter as a query string.
    ///
    /// One `key=value` term per entry, joined by `&`. Spaces become `+` and
    /// every other reserved character is percent-encoded, so values holding
    /// `&`, `=` or `+` cannot break out of their term.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DiscoveryFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn scalar_to_string(key: &str, value: &Value) -> AppResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(AppError::InvalidFilter(format!(
            "unsupported value for '{}': {}",
            key, value
        ))),
    }
}

fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw).replace("%20", "+")
}
