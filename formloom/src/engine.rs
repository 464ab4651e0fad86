//! Engine orchestration: render / submit as one round trip.
//!
//! Render normalizes the caller's seeds, freezes the resulting
//! descriptor set into a cached envelope and composes markup per field.
//! Submit loads that envelope back, validates the payload against it
//! and either routes the field bag to the sinks or stashes the report
//! and answers with a redirect carrying the round-trip token.

use serde_json::Value;
use tracing::{debug, warn};

use formloom_fields::{normalize, FieldSeed, RenderContext};
use formloom_store::{
    save, EntityId, Envelope, RoundTrip, SaveOutcome, ShortLivedCache, Sinks,
    DEFAULT_ENVELOPE_TTL, DEFAULT_REPORT_TTL,
};
use formloom_templating::Layouts;
use formloom_validation::{validate_submission, RuleRegistry, SubmissionOutcome};

use crate::error::Result;
use crate::render::{esc, FieldRenderer, RenderedField};

/// Name of the hidden input carrying the envelope's fields id back on
/// submit.
pub const FIELDS_ID_INPUT: &str = "fields_id";

/// The form engine: a rule registry plus a layout registry.
pub struct Engine {
    rules: RuleRegistry,
    layouts: Layouts,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the stock rules and built-in layouts.
    pub fn new() -> Self {
        Self {
            rules: RuleRegistry::with_builtins(),
            layouts: Layouts::new(),
        }
    }

    /// Replace the rule registry wholesale.
    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    /// Register (or replace) a layout.
    pub fn with_layout(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.layouts.insert(name, template);
        self
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn layouts(&self) -> &Layouts {
        &self.layouts
    }

    /// Claim the round-trip state named by the request's query token.
    /// Claiming deletes it; a replayed token yields `None`.
    pub fn restore(&self, cache: &mut dyn ShortLivedCache, token: Option<&str>) -> Option<RoundTrip> {
        RoundTrip::claim(cache, token?)
    }

    /// Normalize `seeds`, freeze the envelope and compose field markup.
    ///
    /// Suppressed fields (viewer gating) simply do not appear. The
    /// envelope is parked in `cache` under its content-derived fields id.
    pub fn render(
        &self,
        seeds: Vec<FieldSeed>,
        ctx: &mut RenderContext,
        restored: Option<&RoundTrip>,
        cache: &mut dyn ShortLivedCache,
    ) -> Result<RenderedForm> {
        let mut descriptors = Vec::new();
        for seed in seeds {
            if let Some(descriptor) = normalize(seed, ctx) {
                descriptors.push(descriptor);
            }
        }

        let envelope = Envelope::from_context(ctx);
        let fields_id = envelope.store(cache, DEFAULT_ENVELOPE_TTL)?;
        debug!(%fields_id, fields = descriptors.len(), "form rendered");

        let renderer = FieldRenderer::new(&self.layouts, ctx, restored);
        let fields = descriptors
            .into_iter()
            .map(|descriptor| {
                let markup = renderer.render(&descriptor);
                RenderedField { descriptor, markup }
            })
            .collect();
        Ok(RenderedForm { fields, fields_id })
    }

    /// Validate a submitted payload against its envelope and act on the
    /// verdict.
    ///
    /// `payload` is the decoded body, one member per scope slug. On
    /// validation failure the report is stashed and the returned redirect
    /// URL carries the token; no sink is touched. On success the bag is
    /// routed through `sinks`.
    pub fn submit(
        &self,
        fields_id: &str,
        payload: &mut Value,
        known_entity_id: Option<EntityId>,
        sinks: &mut Sinks<'_>,
        cache: &mut dyn ShortLivedCache,
        redirect_base: &str,
    ) -> Result<SubmitResult> {
        let envelope = Envelope::load(cache, fields_id)?;
        match validate_submission(&envelope.fields, payload, &self.rules) {
            SubmissionOutcome::Invalid(report) => {
                let token = RoundTrip::stash(&report, fields_id, cache, DEFAULT_REPORT_TTL)?;
                let url = RoundTrip::redirect_url(redirect_base, &token);
                debug!(%token, errors = report.total_errors(), "submission bounced");
                Ok(SubmitResult::Redirect { url, token })
            }
            SubmissionOutcome::Valid(bag) => {
                let outcome = save(&bag, known_entity_id, sinks);
                if !outcome.succeeded() {
                    warn!(failures = outcome.failures.len(), "save finished with sink failures");
                }
                Ok(SubmitResult::Saved(outcome))
            }
        }
    }
}

/// What `render` hands back: per-field markup plus the envelope id.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedForm {
    pub fields: Vec<RenderedField>,
    pub fields_id: String,
}

impl RenderedForm {
    /// All field markup concatenated, followed by the hidden envelope
    /// input the submit handler reads the fields id from.
    pub fn markup(&self) -> String {
        let mut out = String::new();
        for field in &self.fields {
            out.push_str(&field.markup);
        }
        out.push_str(&format!(
            "<input type=\"hidden\" name=\"{FIELDS_ID_INPUT}\" value=\"{}\">",
            esc(&self.fields_id)
        ));
        out
    }

    pub fn field(&self, field: &str) -> Option<&RenderedField> {
        self.fields.iter().find(|f| f.descriptor.field == field)
    }
}

/// Outcome of a submit: saved, or bounced back to the form.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    Saved(SaveOutcome),
    Redirect { url: String, token: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use formloom_fields::{Scope, Viewer};
    use formloom_store::MemoryCache;

    #[test]
    fn test_render_stores_envelope_under_fields_id() {
        let engine = Engine::new();
        let mut cache = MemoryCache::new();
        let mut ctx = RenderContext::new().with_viewer(Viewer::logged_in());
        let form = engine
            .render(
                vec![FieldSeed::named("email").scope(Scope::Entity)],
                &mut ctx,
                None,
                &mut cache,
            )
            .unwrap();
        assert_eq!(form.fields.len(), 1);
        assert!(Envelope::load(&cache, &form.fields_id).is_ok());
        assert!(form.markup().contains(FIELDS_ID_INPUT));
    }

    #[test]
    fn test_submit_against_expired_envelope_errors() {
        let engine = Engine::new();
        let mut cache = MemoryCache::new();
        let mut payload = serde_json::json!({});
        let mut entities = NullEntities;
        let mut records = NullRecords;
        let mut associations = NullAssociations;
        let mut media = NullMedia;
        let mut sinks = Sinks {
            entity: &mut entities,
            records: &mut records,
            associations: &mut associations,
            media: &mut media,
        };
        let result = engine.submit("gone", &mut payload, None, &mut sinks, &mut cache, "/f");
        assert!(result.is_err());
    }

    struct NullEntities;
    impl formloom_store::EntitySink for NullEntities {
        fn create(
            &mut self,
            _: &std::collections::HashMap<String, Value>,
        ) -> std::result::Result<EntityId, formloom_store::SinkError> {
            Ok(1)
        }
        fn update(
            &mut self,
            id: EntityId,
            _: &std::collections::HashMap<String, Value>,
        ) -> std::result::Result<EntityId, formloom_store::SinkError> {
            Ok(id)
        }
    }

    struct NullRecords;
    impl formloom_store::RecordSink for NullRecords {
        fn add_row(
            &mut self,
            _: EntityId,
            _: &str,
            _: &Value,
        ) -> std::result::Result<formloom_store::RowId, formloom_store::SinkError> {
            Ok(1)
        }
        fn delete_rows(&mut self, _: EntityId, _: &str) {}
        fn list_row_ids(&self, _: EntityId, _: &str) -> Vec<formloom_store::RowId> {
            Vec::new()
        }
    }

    struct NullAssociations;
    impl formloom_store::AssociationSink for NullAssociations {
        fn set_associations(&mut self, _: EntityId, _: &str, _: &[formloom_store::AssocId]) {}
        fn remove_association(&mut self, _: EntityId, _: &str, _: formloom_store::AssocId) {}
    }

    struct NullMedia;
    impl formloom_store::MediaResolver for NullMedia {
        fn store(
            &mut self,
            _: &formloom_store::UploadDescriptor,
        ) -> std::result::Result<formloom_store::MediaRef, formloom_store::SinkError> {
            Err(formloom_store::SinkError::new("no media"))
        }
    }
}
