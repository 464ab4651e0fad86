//! Core descriptor types for the form engine.
//!
//! All types serialize to/from JSON via serde: descriptor snapshots are
//! content-hashed and cached across the render/submit round trip, so the
//! serialized form is part of the contract. Optional fields use
//! `skip_serializing_if` to keep snapshots minimal and stable.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use formloom_path::Path;

use crate::error::{FieldsError, Result};

/// The persistence domain a field's value belongs to.
///
/// Canonical string form: `entity`, `record:<kind>`, `assoc:<kind>`,
/// `ephemeral`. Serialized as that string so scopes can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope {
    /// The owning entity's own attributes.
    Entity,
    /// A repeatable key-value record attached to an entity.
    Record { kind: String },
    /// A many-to-many tag/category association.
    Association { kind: String },
    /// Not persisted at all.
    Ephemeral,
}

impl Scope {
    /// Shorthand for a record scope of the given kind.
    pub fn record(kind: impl Into<String>) -> Self {
        Scope::Record { kind: kind.into() }
    }

    /// Shorthand for an association scope of the given kind.
    pub fn association(kind: impl Into<String>) -> Self {
        Scope::Association { kind: kind.into() }
    }

    /// Identifier-safe form of the canonical string (`record_profile`).
    pub fn slug(&self) -> String {
        self.to_string().replace(':', "_")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Entity => f.write_str("entity"),
            Scope::Record { kind } => write!(f, "record:{kind}"),
            Scope::Association { kind } => write!(f, "assoc:{kind}"),
            Scope::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

impl FromStr for Scope {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "entity" {
            return Ok(Scope::Entity);
        }
        if s == "ephemeral" {
            return Ok(Scope::Ephemeral);
        }
        if let Some(kind) = s.strip_prefix("record:") {
            if !kind.is_empty() {
                return Ok(Scope::record(kind));
            }
        }
        if let Some(kind) = s.strip_prefix("assoc:") {
            if !kind.is_empty() {
                return Ok(Scope::association(kind));
            }
        }
        Err(FieldsError::UnrecognizedScope { raw: s.to_string() })
    }
}

impl TryFrom<String> for Scope {
    type Error = FieldsError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> String {
        scope.to_string()
    }
}

/// The type of a field — determines what shape the submitted value takes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Textarea,
    Hidden,
    /// An unlabeled literal — rendered verbatim, never submitted.
    Html { content: String },
    Checkbox,
    Radio,
    Select {
        #[serde(default)]
        multiple: bool,
    },
    File,
    /// A composite field whose sub-fields repeat together as rows.
    Group { fields: Vec<FieldSeed> },
}

impl FieldKind {
    /// Whether this kind always submits a list of values.
    pub fn is_inherently_multi(&self) -> bool {
        matches!(
            self,
            FieldKind::Checkbox | FieldKind::File | FieldKind::Select { multiple: true }
        )
    }
}

/// A single option in a choice-bearing field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Choice {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    pub fn labeled(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: Some(label.into()),
        }
    }
}

/// Comparison applied by a conditional-visibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    #[default]
    Equals,
    NotEquals,
    Contains,
}

/// A conditional-visibility rule: show this field only when a sibling
/// field's value compares as specified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    /// Path of the sibling field the condition watches.
    pub field: String,
    /// Scope of the sibling; defaults to the host field's scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub compare: Comparison,
    /// The operand to compare the sibling's value against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Resolved wrapper id / input name of the sibling. Filled during
    /// normalization; client code never supplies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A named sanitize rule with rule-specific options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SanitizeSpec {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl SanitizeSpec {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            options: Value::Null,
        }
    }
}

/// A validate rule: either a regular-expression test or a named callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValidateSpec {
    Pattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Rule {
        rule: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        options: Value,
    },
}

impl ValidateSpec {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        ValidateSpec::Pattern {
            pattern: pattern.into(),
            message: None,
        }
    }

    pub fn rule(rule: impl Into<String>) -> Self {
        ValidateSpec::Rule {
            rule: rule.into(),
            options: Value::Null,
        }
    }
}

/// Viewer gating for a field. Any unmet requirement suppresses the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Access {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default)]
    pub login_required: bool,
}

/// The partial field description a caller supplies.
///
/// Only the fields the caller cares to override are set; the normalizer
/// merges the rest from fixed defaults ("caller value wins, else default").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldSeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_more: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Vec<ValidateSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<Vec<SanitizeSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_field: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belongs_to: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
}

impl FieldSeed {
    /// Start a seed for the given field path.
    pub fn named(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Default::default()
        }
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn validate(mut self, validate: Vec<ValidateSpec>) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn sanitize(mut self, sanitize: Vec<SanitizeSpec>) -> Self {
        self.sanitize = Some(sanitize);
        self
    }

    pub fn add_more(mut self, add_more: bool) -> Self {
        self.add_more = Some(add_more);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }
}

/// The fully-populated field descriptor: the central value object of the
/// engine. `field` plus `scope` plus `index` uniquely identifies one
/// rendered occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub add_more: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validate: Vec<ValidateSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sanitize: Vec<SanitizeSpec>,
    pub template: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default)]
    pub group_field: bool,
    #[serde(default)]
    pub required: bool,
    /// Read-only render mode: shown, never editable, never saved.
    #[serde(default)]
    pub display: bool,
    /// Marks the value as an id of another entity this submission
    /// belongs to.
    #[serde(default)]
    pub belongs_to: bool,
    pub wrapper_id: String,
}

impl FieldDescriptor {
    /// The parsed field path.
    pub fn path(&self) -> Result<Path> {
        Ok(self.field.parse()?)
    }

    /// The submitted input name: scope slug joined to the field path.
    pub fn input_name(&self) -> String {
        format!("{}:{}", self.scope.slug(), self.field)
    }

    /// Whether the value is an ordered list of rows persisted as grouped
    /// repeatable records (as opposed to a simple multi-select).
    pub fn is_grouped_multi(&self) -> bool {
        self.add_more || matches!(self.kind, FieldKind::Group { .. })
    }

    /// Label falling back to the field path.
    pub fn effective_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }
}
