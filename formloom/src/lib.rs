//! Declarative form engine.
//!
//! A form is described as a list of partial field seeds; the engine
//! normalizes them into full descriptors, composes structural markup,
//! freezes the descriptor set into a content-addressed envelope, and on
//! submit validates the payload against that envelope before routing
//! values to the host's persistence sinks. Failed submissions bounce
//! back to the form through a single-use redirect token carrying the
//! validation report.
//!
//! This crate is the facade; the work lives in the focused sub-crates
//! re-exported below:
//!
//! - [`formloom_path`] — the `:`-separated path grammar and value
//!   resolution, including repeated-group row enumeration.
//! - [`formloom_fields`] — descriptor types, normalization and the
//!   render context.
//! - [`formloom_templating`] — layout composition and `[field=x]`
//!   interpolation.
//! - [`formloom_validation`] — the sanitize/validate pipeline.
//! - [`formloom_store`] — sink traits, the submission router, envelope
//!   and round-trip transport.
//!
//! ```
//! use formloom::{Engine, FieldSeed, MemoryCache, RenderContext, Scope, Viewer};
//!
//! let engine = Engine::new();
//! let mut cache = MemoryCache::new();
//! let mut ctx = RenderContext::new().with_viewer(Viewer::logged_in());
//! let form = engine
//!     .render(
//!         vec![FieldSeed::named("email").scope(Scope::Entity).required(true)],
//!         &mut ctx,
//!         None,
//!         &mut cache,
//!     )
//!     .unwrap();
//! assert!(form.markup().contains("entity:email"));
//! ```

pub mod engine;
pub mod error;
pub mod render;

pub use engine::{Engine, RenderedForm, SubmitResult, FIELDS_ID_INPUT};
pub use error::{EngineError, Result};
pub use render::{esc, FieldRenderer, RenderedField, MAX_INTERPOLATION_DEPTH};

pub use formloom_fields::{
    normalize, Access, Choice, Comparison, Condition, FieldDescriptor, FieldKind, FieldSeed,
    RenderContext, SanitizeSpec, Scope, ValidateSpec, Viewer,
};
pub use formloom_path::{Path, Segment};
pub use formloom_store::{
    save, AssociationSink, EntityId, EntitySink, Envelope, MediaRef, MediaResolver, MemoryCache,
    RecordSink, RoundTrip, RowId, SaveOutcome, ShortLivedCache, SinkError, Sinks,
    UploadDescriptor, QUERY_PARAM,
};
pub use formloom_templating::{LayoutSource, Layouts};
pub use formloom_validation::{
    validate_submission, FieldBag, RuleOutcome, RuleRegistry, SubmissionOutcome, ValidationReport,
};
