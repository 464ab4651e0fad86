//! Layout template composer
//!
//! Layout templates are plain strings carrying named placeholder tokens
//! (`{label}`, `{field}`, `{description}`) and paired block markers
//! (`{wrap}` … `{/wrap}`). The composer expands tokens in a single pass,
//! extracts start/end fragments around a block so repeated siblings can
//! share one wrapper, and substitutes `[field=name]` references inside
//! descriptive text with a bounded-depth guard.

pub mod compose;
pub mod interpolate;
pub mod layouts;

pub use compose::{apply_position, expand, extract, normalize, Fragment, Position};
pub use interpolate::interpolate;
pub use layouts::{LayoutSource, Layouts, DEFAULT_LAYOUT};
