//! Field descriptor model, normalizer and render context
//!
//! `formloom-fields` owns the central value object of the form engine: the
//! field descriptor. Callers hand the normalizer a partial [`FieldSeed`]
//! (only what they care to override); it comes back as a fully-populated
//! [`FieldDescriptor`] routed to a persistence [`Scope`], or is suppressed
//! entirely when the acting viewer may not see it.
//!
//! # Architecture
//!
//! - **Descriptor-only**: knows field shapes and scopes, not field values
//! - **Explicit render state**: [`RenderContext`] replaces process-wide
//!   registries so nested renders cannot corrupt each other
//! - **Render/save agreement**: every normalized descriptor is registered
//!   under (scope, field) for the save stage to read back

pub mod context;
pub mod error;
pub mod normalize;
pub mod types;

pub use context::{RenderContext, Viewer};
pub use error::{FieldsError, Result};
pub use normalize::normalize;
pub use types::{
    Access, Choice, Comparison, Condition, FieldDescriptor, FieldKind, FieldSeed, SanitizeSpec,
    Scope, ValidateSpec,
};
