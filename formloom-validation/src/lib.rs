//! Validation & sanitization pipeline
//!
//! Given the authoritative descriptor snapshot taken at render time and
//! the raw submitted payload, the pipeline resolves each field's value
//! through the path grammar, transposes column-oriented group
//! submissions to rows, applies sanitize rules then validate rules per
//! instance, and either yields a fully resolved [`FieldBag`] or an
//! accumulated [`ValidationReport`]. Rule lists come from the snapshot,
//! never from client input.

pub mod pipeline;
pub mod report;
pub mod rules;
pub mod transpose;

pub use pipeline::{validate_submission, FieldBag, ResolvedField, SubmissionOutcome};
pub use report::ValidationReport;
pub use rules::{RuleOutcome, RuleRegistry, SanitizeRule, ValidateRule};
pub use transpose::{transpose_columns, transpose_rows};

/// Message recorded for an empty required instance.
pub const REQUIRED_MESSAGE: &str = "is a required field";

/// Fallback message for a failed validate rule with no custom message.
pub const GENERIC_MESSAGE: &str = "is not valid input";
