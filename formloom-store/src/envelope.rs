//! The submission envelope: the authoritative descriptor snapshot.
//!
//! Rendering a form freezes every normalized descriptor into an
//! envelope, content-addressed by a hash of its canonical JSON form and
//! parked in the short-lived cache. Submission loads the envelope by id
//! and validates against *it*, so nothing the client posts can widen
//! what gets saved.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use formloom_fields::{FieldDescriptor, RenderContext, Scope};

use crate::error::{Result, StoreError};
use crate::sinks::ShortLivedCache;

/// How long an envelope survives between render and submit.
pub const DEFAULT_ENVELOPE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const CACHE_PREFIX: &str = "envelope:";

/// Frozen descriptor set for one rendered form, keyed by scope then
/// field path in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub fields: IndexMap<Scope, IndexMap<String, FieldDescriptor>>,
}

impl Envelope {
    /// Snapshot every descriptor registered during a render pass.
    pub fn from_context(ctx: &RenderContext) -> Self {
        let mut fields: IndexMap<Scope, IndexMap<String, FieldDescriptor>> = IndexMap::new();
        for descriptor in ctx.registered() {
            fields
                .entry(descriptor.scope.clone())
                .or_default()
                .insert(descriptor.field.clone(), descriptor.clone());
        }
        Self { fields }
    }

    /// Content hash of the canonical serialized form.
    ///
    /// Serialization goes through `serde_json::Value`, whose object keys
    /// are ordered, so the same logical descriptor set hashes identically
    /// regardless of declaration order or process.
    pub fn fields_id(&self) -> Result<String> {
        let canonical = serde_json::to_value(&self.fields)?;
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_string(&canonical)?.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Park the envelope in the cache; returns its fields id.
    pub fn store(&self, cache: &mut dyn ShortLivedCache, ttl: Duration) -> Result<String> {
        let fields_id = self.fields_id()?;
        cache.put(
            &format!("{CACHE_PREFIX}{fields_id}"),
            serde_json::to_value(self)?,
            ttl,
        );
        debug!(%fields_id, scopes = self.fields.len(), "envelope stored");
        Ok(fields_id)
    }

    /// Load a previously stored envelope. The envelope stays cached —
    /// unlike the validation report it may be read many times while the
    /// user retries a failing submission.
    pub fn load(cache: &dyn ShortLivedCache, fields_id: &str) -> Result<Self> {
        let raw: Value = cache
            .get(&format!("{CACHE_PREFIX}{fields_id}"))
            .ok_or_else(|| StoreError::EnvelopeExpired {
                fields_id: fields_id.to_string(),
            })?;
        Ok(serde_json::from_value(raw)?)
    }
}
