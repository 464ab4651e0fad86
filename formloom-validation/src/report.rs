//! The validation report: per-field errors plus the echoed request.
//!
//! The report round-trips through the short-lived cache on a failed
//! submission, so it is fully serializable. Errors are keyed by scope,
//! then field path, then instance index; the request side records the
//! resolved value of every field so the re-rendered form can refill.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use formloom_fields::Scope;

/// Accumulated validation failures and submitted values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    /// scope -> field path -> instance index -> message
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub errors: IndexMap<Scope, IndexMap<String, BTreeMap<usize, String>>>,
    /// scope -> field path -> resolved submitted value
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub request: IndexMap<Scope, IndexMap<String, Value>>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for one instance of a field. The first message
    /// recorded for an instance wins.
    pub fn add_error(
        &mut self,
        scope: &Scope,
        field: &str,
        index: usize,
        message: impl Into<String>,
    ) {
        self.errors
            .entry(scope.clone())
            .or_default()
            .entry(field.to_string())
            .or_default()
            .entry(index)
            .or_insert_with(|| message.into());
    }

    /// Record the resolved submitted value for a field.
    pub fn record_request(&mut self, scope: &Scope, field: &str, value: Value) {
        self.request
            .entry(scope.clone())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// The error message for one instance of a field, if any.
    pub fn error(&self, scope: &Scope, field: &str, index: usize) -> Option<&str> {
        self.errors
            .get(scope)?
            .get(field)?
            .get(&index)
            .map(String::as_str)
    }

    /// The submitted value echoed back for a field, if recorded.
    pub fn previous_value(&self, scope: &Scope, field: &str) -> Option<&Value> {
        self.request.get(scope)?.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total failed instances across all fields.
    pub fn total_errors(&self) -> usize {
        self.errors
            .values()
            .flat_map(|fields| fields.values())
            .map(BTreeMap::len)
            .sum()
    }
}
