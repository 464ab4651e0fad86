//! Redirect round-trip for failed submissions.
//!
//! A rejected submission stashes its validation report in the cache
//! under a short token derived from the envelope's fields id, then
//! redirects back to the form with the token in the query string. The
//! re-render claims the report — a single-use read that deletes the
//! entry, so a stale token can never resurrect old errors.

use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use formloom_fields::Scope;
use formloom_validation::ValidationReport;

use crate::error::Result;
use crate::sinks::ShortLivedCache;

/// Query parameter carrying the report token.
pub const QUERY_PARAM: &str = "ff";

/// How long a stashed report survives unclaimed.
pub const DEFAULT_REPORT_TTL: Duration = Duration::from_secs(15 * 60);

const CACHE_PREFIX: &str = "report:";

/// Short stable token for a fields id. Derived, not random, so the same
/// envelope always round-trips through the same cache slot.
pub fn token_for(fields_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields_id.as_bytes());
    hasher.update(b":report");
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// A claimed (or about-to-be-stashed) validation report, exposed to the
/// renderer as per-field error and previous-value lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    report: ValidationReport,
}

impl RoundTrip {
    pub fn new(report: ValidationReport) -> Self {
        Self { report }
    }

    /// Stash the report and return the token to append to the redirect.
    pub fn stash(
        report: &ValidationReport,
        fields_id: &str,
        cache: &mut dyn ShortLivedCache,
        ttl: Duration,
    ) -> Result<String> {
        let token = token_for(fields_id);
        cache.put(
            &format!("{CACHE_PREFIX}{token}"),
            serde_json::to_value(report)?,
            ttl,
        );
        debug!(%token, errors = report.total_errors(), "validation report stashed");
        Ok(token)
    }

    /// Load and immediately delete the report for a token. The second
    /// claim of the same token yields `None`.
    pub fn claim(cache: &mut dyn ShortLivedCache, token: &str) -> Option<RoundTrip> {
        let key = format!("{CACHE_PREFIX}{token}");
        let raw: Value = cache.get(&key)?;
        cache.delete(&key);
        let report = serde_json::from_value(raw).ok()?;
        Some(RoundTrip { report })
    }

    /// `base` with the token appended to its query string.
    pub fn redirect_url(base: &str, token: &str) -> String {
        let joiner = if base.contains('?') { '&' } else { '?' };
        format!("{base}{joiner}{QUERY_PARAM}={token}")
    }

    /// The error message for one instance of a field, if any.
    pub fn error(&self, scope: &Scope, field: &str, index: usize) -> Option<&str> {
        self.report.error(scope, field, index)
    }

    /// What the user originally submitted for a field.
    pub fn previous_value(&self, scope: &Scope, field: &str) -> Option<&Value> {
        self.report.previous_value(scope, field)
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }
}
