//! Typed rule registry for sanitize and validate callbacks.
//!
//! Descriptors carry rule *names*; the registry maps names to trait
//! objects at pipeline time. Unknown names are skipped for sanitizers
//! (the value passes through) and fail closed for validators.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use formloom_fields::FieldDescriptor;

/// Result of a single validate rule on a single value instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    /// Failure, optionally with a rule-specific message.
    Fail(Option<String>),
}

impl RuleOutcome {
    pub fn fail(message: impl Into<String>) -> Self {
        RuleOutcome::Fail(Some(message.into()))
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, RuleOutcome::Pass)
    }
}

/// A sanitize rule transforms a value; it can never fail.
pub trait SanitizeRule: Send + Sync {
    fn apply(&self, value: Value, field: &FieldDescriptor, options: &Value) -> Value;
}

impl<F> SanitizeRule for F
where
    F: Fn(Value, &FieldDescriptor, &Value) -> Value + Send + Sync,
{
    fn apply(&self, value: Value, field: &FieldDescriptor, options: &Value) -> Value {
        self(value, field, options)
    }
}

/// A validate rule judges a value instance.
pub trait ValidateRule: Send + Sync {
    fn apply(&self, value: &Value, field: &FieldDescriptor, options: &Value) -> RuleOutcome;
}

impl<F> ValidateRule for F
where
    F: Fn(&Value, &FieldDescriptor, &Value) -> RuleOutcome + Send + Sync,
{
    fn apply(&self, value: &Value, field: &FieldDescriptor, options: &Value) -> RuleOutcome {
        self(value, field, options)
    }
}

/// Name-keyed registry of sanitize and validate rules.
pub struct RuleRegistry {
    sanitizers: HashMap<String, Box<dyn SanitizeRule>>,
    validators: HashMap<String, Box<dyn ValidateRule>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl RuleRegistry {
    /// An empty registry with no rules at all.
    pub fn empty() -> Self {
        Self {
            sanitizers: HashMap::new(),
            validators: HashMap::new(),
        }
    }

    /// A registry pre-loaded with the stock rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_sanitizer("trim", sanitize_trim);
        registry.register_sanitizer("lowercase", sanitize_lowercase);
        registry.register_sanitizer("strip-tags", sanitize_strip_tags);
        registry.register_validator("email", validate_email);
        registry.register_validator("url", validate_url);
        registry.register_validator("numeric", validate_numeric);
        registry.register_validator("min-length", validate_min_length);
        registry.register_validator("max-length", validate_max_length);
        registry
    }

    pub fn register_sanitizer(
        &mut self,
        name: impl Into<String>,
        rule: impl SanitizeRule + 'static,
    ) {
        self.sanitizers.insert(name.into(), Box::new(rule));
    }

    pub fn register_validator(
        &mut self,
        name: impl Into<String>,
        rule: impl ValidateRule + 'static,
    ) {
        self.validators.insert(name.into(), Box::new(rule));
    }

    /// Run the named sanitizer; an unknown name passes the value through.
    pub fn sanitize(
        &self,
        name: &str,
        value: Value,
        field: &FieldDescriptor,
        options: &Value,
    ) -> Value {
        match self.sanitizers.get(name) {
            Some(rule) => rule.apply(value, field, options),
            None => {
                warn!(rule = name, field = %field.field, "unknown sanitize rule, skipping");
                value
            }
        }
    }

    /// Run the named validator; an unknown name fails closed.
    pub fn validate(
        &self,
        name: &str,
        value: &Value,
        field: &FieldDescriptor,
        options: &Value,
    ) -> RuleOutcome {
        match self.validators.get(name) {
            Some(rule) => rule.apply(value, field, options),
            None => {
                warn!(rule = name, field = %field.field, "unknown validate rule, rejecting");
                RuleOutcome::Fail(None)
            }
        }
    }
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

fn sanitize_trim(value: Value, _field: &FieldDescriptor, _options: &Value) -> Value {
    map_str(value, |s| s.trim().to_string())
}

fn sanitize_lowercase(value: Value, _field: &FieldDescriptor, _options: &Value) -> Value {
    map_str(value, |s| s.to_lowercase())
}

fn sanitize_strip_tags(value: Value, _field: &FieldDescriptor, _options: &Value) -> Value {
    map_str(value, |s| {
        let mut out = String::with_capacity(s.len());
        let mut in_tag = false;
        for ch in s.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                c if !in_tag => out.push(c),
                _ => {}
            }
        }
        out
    })
}

fn as_text(value: &Value) -> Option<&str> {
    value.as_str()
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn validate_email(value: &Value, _field: &FieldDescriptor, _options: &Value) -> RuleOutcome {
    let Some(text) = as_text(value) else {
        return RuleOutcome::Fail(None);
    };
    if email_re().is_match(text) {
        RuleOutcome::Pass
    } else {
        RuleOutcome::fail("is not a valid email address")
    }
}

fn validate_url(value: &Value, _field: &FieldDescriptor, _options: &Value) -> RuleOutcome {
    let Some(text) = as_text(value) else {
        return RuleOutcome::Fail(None);
    };
    if text.starts_with("http://") || text.starts_with("https://") {
        RuleOutcome::Pass
    } else {
        RuleOutcome::fail("is not a valid url")
    }
}

fn validate_numeric(value: &Value, _field: &FieldDescriptor, _options: &Value) -> RuleOutcome {
    if value.is_number() {
        return RuleOutcome::Pass;
    }
    match as_text(value) {
        Some(text) if text.parse::<f64>().is_ok() => RuleOutcome::Pass,
        _ => RuleOutcome::fail("must be a number"),
    }
}

fn option_length(options: &Value) -> Option<usize> {
    options
        .get("length")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
}

fn validate_min_length(value: &Value, _field: &FieldDescriptor, options: &Value) -> RuleOutcome {
    let Some(min) = option_length(options) else {
        return RuleOutcome::Pass;
    };
    let Some(text) = as_text(value) else {
        return RuleOutcome::Fail(None);
    };
    if text.chars().count() >= min {
        RuleOutcome::Pass
    } else {
        RuleOutcome::fail(format!("must be at least {min} characters"))
    }
}

fn validate_max_length(value: &Value, _field: &FieldDescriptor, options: &Value) -> RuleOutcome {
    let Some(max) = option_length(options) else {
        return RuleOutcome::Pass;
    };
    let Some(text) = as_text(value) else {
        return RuleOutcome::Fail(None);
    };
    if text.chars().count() <= max {
        RuleOutcome::Pass
    } else {
        RuleOutcome::fail(format!("must be at most {max} characters"))
    }
}
