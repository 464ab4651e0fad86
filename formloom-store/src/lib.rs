//! Persistence layer of the form engine.
//!
//! Owns no storage: everything writes through abstract collaborator
//! traits ([`sinks`]) supplied by the host. What it does own is the
//! routing logic — which scope goes to which sink, in what order, and
//! what happens when a sink fails — plus the content-addressed
//! [`Envelope`] and the redirect [`transport`] for failed submissions.

pub mod cache;
pub mod envelope;
pub mod error;
pub mod router;
pub mod sinks;
pub mod transport;

pub use cache::MemoryCache;
pub use envelope::{Envelope, DEFAULT_ENVELOPE_TTL};
pub use error::{Result, SinkError, StoreError};
pub use router::{save, SaveOutcome, Sinks, GROUP_INDEX_PREFIX, RELATION_KEY};
pub use sinks::{
    AssocId, AssociationSink, EntityId, EntitySink, MediaRef, MediaResolver, RecordSink, RowId,
    ShortLivedCache, UploadDescriptor,
};
pub use transport::{token_for, RoundTrip, DEFAULT_REPORT_TTL, QUERY_PARAM};
