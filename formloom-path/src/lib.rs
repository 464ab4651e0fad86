//! Segment-delimited path addressing for nested submission payloads
//!
//! `formloom-path` knows how to address a value inside the nested,
//! variable-length structures that a flat form submission decodes into.
//! Paths are `:`-separated (`item:0:qty`); segments are literal keys or
//! numeric indices. Lookups return `None` for absent segments rather than
//! erroring, writes create intermediate containers, and
//! [`enumerate_rows`] discovers how many dynamically-added rows a
//! submission contains by probing contiguous indices.

pub mod error;
pub mod path;
pub mod resolve;

pub use error::{PathError, Result};
pub use path::{Path, Segment, SEPARATOR};
pub use resolve::{enumerate_rows, get, get_mut, set};
