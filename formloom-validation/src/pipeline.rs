//! The submission pipeline: resolve, sanitize, validate, aggregate.
//!
//! Runs against the descriptor snapshot taken at render time, never
//! against anything the client sent. Each field resolves to zero or
//! more value instances; every instance is sanitized then validated
//! independently, and failures are accumulated — the pipeline never
//! stops at the first bad field.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use formloom_fields::{FieldDescriptor, FieldKind, Scope, ValidateSpec};
use formloom_path::enumerate_rows;

use crate::report::ValidationReport;
use crate::rules::{RuleOutcome, RuleRegistry};
use crate::transpose::transpose_columns;
use crate::{GENERIC_MESSAGE, REQUIRED_MESSAGE};

/// One field's resolved, sanitized value ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub descriptor: FieldDescriptor,
    /// The sanitized value: an array of row values for grouped-multi
    /// fields, a single value otherwise.
    pub value: Value,
}

/// Everything that survived validation, keyed by scope then field path,
/// in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBag {
    pub scopes: IndexMap<Scope, IndexMap<String, ResolvedField>>,
    /// Association ids the submitter asked to detach, keyed by
    /// association kind.
    pub removals: IndexMap<String, Vec<u64>>,
}

impl FieldBag {
    pub fn field(&self, scope: &Scope, field: &str) -> Option<&ResolvedField> {
        self.scopes.get(scope)?.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Scope, &ResolvedField)> {
        self.scopes
            .iter()
            .flat_map(|(scope, fields)| fields.values().map(move |f| (scope, f)))
    }
}

/// The pipeline's verdict on a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Valid(FieldBag),
    Invalid(ValidationReport),
}

/// Run the full pipeline over `payload` for every descriptor in `fields`.
///
/// The payload is the decoded submission body: one member per scope slug,
/// each holding values nested by field path. It is taken mutably because
/// row enumeration normalizes placeholder slots in place.
pub fn validate_submission(
    fields: &IndexMap<Scope, IndexMap<String, FieldDescriptor>>,
    payload: &mut Value,
    registry: &RuleRegistry,
) -> SubmissionOutcome {
    let mut report = ValidationReport::new();
    let mut bag = FieldBag::default();

    for (scope, descriptors) in fields {
        let slug = scope.slug();
        for descriptor in descriptors.values() {
            if descriptor.display || matches!(descriptor.kind, FieldKind::Html { .. }) {
                continue;
            }
            let Ok(path) = descriptor.path() else {
                warn!(field = %descriptor.field, "unparseable field path, skipping");
                continue;
            };

            let mut instances = match payload.get_mut(&slug) {
                Some(scoped) => enumerate_rows(scoped, &path),
                None => Vec::new(),
            };
            let mut splayed = false;
            if matches!(descriptor.kind, FieldKind::Group { .. }) && instances.len() == 1 {
                // A composite group arrives either row-oriented (one
                // object per row) or column-oriented (one array per
                // member); both become one instance per row.
                instances = match instances.remove(0) {
                    Value::Array(rows) => rows,
                    other => transpose_columns(&other).unwrap_or_else(|| vec![other]),
                };
            } else if descriptor.multiple && !descriptor.is_grouped_multi() && instances.len() == 1 {
                // A simple multi-value field submits one array; each
                // element is validated on its own.
                match instances.remove(0) {
                    Value::Array(elements) => {
                        instances = elements;
                        splayed = true;
                    }
                    other => instances.push(other),
                }
            }

            for instance in &mut instances {
                for spec in &descriptor.sanitize {
                    let value = std::mem::take(instance);
                    *instance = registry.sanitize(&spec.rule, value, descriptor, &spec.options);
                }
            }

            if descriptor.required && instances.iter().all(is_blank) {
                report.add_error(scope, &descriptor.field, 0, REQUIRED_MESSAGE);
            }

            for (index, instance) in instances.iter().enumerate() {
                if is_blank(instance) {
                    if descriptor.required {
                        report.add_error(scope, &descriptor.field, index, REQUIRED_MESSAGE);
                    }
                    // Blank optional instances are not validated.
                    continue;
                }
                if let Some(message) = first_failure(instance, descriptor, registry) {
                    report.add_error(scope, &descriptor.field, index, message);
                }
            }

            let resolved = if descriptor.is_grouped_multi() || splayed {
                Value::Array(instances)
            } else {
                instances.into_iter().next().unwrap_or(Value::Null)
            };
            report.record_request(scope, &descriptor.field, resolved.clone());

            if let Some(kind) = descriptor.attributes.get("removes") {
                bag.removals
                    .entry(kind.clone())
                    .or_default()
                    .extend(collect_ids(&resolved));
                continue;
            }

            bag.scopes
                .entry(scope.clone())
                .or_default()
                .insert(descriptor.field.clone(), ResolvedField {
                    descriptor: descriptor.clone(),
                    value: resolved,
                });
        }
    }

    if report.is_empty() {
        SubmissionOutcome::Valid(bag)
    } else {
        debug!(errors = report.total_errors(), "submission rejected");
        SubmissionOutcome::Invalid(report)
    }
}

/// Run a field's validate specs against one instance; the first failure
/// wins and its message is returned.
fn first_failure(
    value: &Value,
    descriptor: &FieldDescriptor,
    registry: &RuleRegistry,
) -> Option<String> {
    for spec in &descriptor.validate {
        match spec {
            ValidateSpec::Pattern { pattern, message } => {
                let regex = match Regex::new(pattern) {
                    Ok(regex) => regex,
                    Err(err) => {
                        warn!(field = %descriptor.field, %err, "bad validate pattern");
                        return Some(message.clone().unwrap_or_else(|| GENERIC_MESSAGE.into()));
                    }
                };
                let matched = match value {
                    Value::String(s) => regex.is_match(s),
                    other => regex.is_match(&other.to_string()),
                };
                if !matched {
                    return Some(message.clone().unwrap_or_else(|| GENERIC_MESSAGE.into()));
                }
            }
            ValidateSpec::Rule { rule, options } => {
                if let RuleOutcome::Fail(message) =
                    registry.validate(rule, value, descriptor, options)
                {
                    return Some(message.unwrap_or_else(|| GENERIC_MESSAGE.into()));
                }
            }
        }
    }
    None
}

/// A value that counts as "nothing was entered".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_blank),
        _ => false,
    }
}

fn collect_ids(value: &Value) -> Vec<u64> {
    match value {
        Value::Array(items) => items.iter().flat_map(collect_ids).collect(),
        Value::Number(n) => n.as_u64().into_iter().collect(),
        Value::String(s) => s.parse::<u64>().ok().into_iter().collect(),
        _ => Vec::new(),
    }
}
