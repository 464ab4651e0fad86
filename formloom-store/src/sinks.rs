//! Collaborator traits the submission router writes through.
//!
//! Every sink is an abstract contract; the engine owns no storage of
//! its own. Implementations live in the host application. All traits
//! are synchronous — a submission is one request/response cycle.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::error::SinkError;

/// Id of a saved entity.
pub type EntityId = u64;
/// Id of a repeatable record row.
pub type RowId = u64;
/// Id of an associated term/tag.
pub type AssocId = u64;

/// Create-or-update store for an entity's own attributes.
pub trait EntitySink {
    fn create(&mut self, attributes: &HashMap<String, Value>) -> Result<EntityId, SinkError>;
    fn update(
        &mut self,
        id: EntityId,
        attributes: &HashMap<String, Value>,
    ) -> Result<EntityId, SinkError>;
}

/// Per-owner, per-key repeatable record rows.
pub trait RecordSink {
    fn add_row(&mut self, owner: EntityId, key: &str, value: &Value) -> Result<RowId, SinkError>;
    fn delete_rows(&mut self, owner: EntityId, key: &str);
    fn list_row_ids(&self, owner: EntityId, key: &str) -> Vec<RowId>;
}

/// Many-to-many associations, replaced wholesale per kind.
pub trait AssociationSink {
    fn set_associations(&mut self, owner: EntityId, kind: &str, ids: &[AssocId]);
    fn remove_association(&mut self, owner: EntityId, kind: &str, id: AssocId);
}

/// A file upload as decoded from the request, before media handling.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadDescriptor {
    pub filename: String,
    pub content_type: String,
    pub tmp_path: String,
    pub size: u64,
    /// Decoder-reported error code; non-zero means the upload is broken
    /// and must not be stored.
    pub error_code: u32,
}

impl UploadDescriptor {
    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }
}

/// Reference to a stored media item, written in place of the upload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaRef {
    pub id: u64,
    pub url: String,
}

/// Turns uploads into durable references.
pub trait MediaResolver {
    fn store(&mut self, upload: &UploadDescriptor) -> Result<MediaRef, SinkError>;
}

/// Keyed cache with per-entry expiry, used for envelopes and validation
/// reports.
pub trait ShortLivedCache {
    fn put(&mut self, key: &str, value: Value, ttl: Duration);
    fn get(&self, key: &str) -> Option<Value>;
    fn delete(&mut self, key: &str);
}
