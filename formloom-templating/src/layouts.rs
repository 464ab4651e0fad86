//! Layout registry.
//!
//! Consumers may implement [`LayoutSource`] to supply layouts from their
//! own storage; [`Layouts`] is the in-memory implementation with the
//! built-in defaults.

use indexmap::IndexMap;
use tracing::trace;

/// The built-in default layout. `{wrap}` delimits the per-instance body
/// so repeated siblings can share the outer chrome.
pub const DEFAULT_LAYOUT: &str = "<div class=\"fl-row\" id=\"{wrapper_id}\">{wrap}<label for=\"{wrapper_id}\">{label}</label>{field}{error}<span class=\"fl-description\">{description}</span>{/wrap}</div>";

/// A bare layout: the field body and nothing else.
pub const BARE_LAYOUT: &str = "{field}{error}";

/// Trait for types that can provide layout templates by key.
pub trait LayoutSource {
    /// Get the layout template for a given key.
    fn layout(&self, name: &str) -> Option<String>;

    /// List all available layout keys.
    fn names(&self) -> Vec<String>;
}

/// In-memory layout registry, seeded with the built-ins.
#[derive(Debug, Clone)]
pub struct Layouts {
    templates: IndexMap<String, String>,
}

impl Layouts {
    pub fn new() -> Self {
        let mut templates = IndexMap::new();
        templates.insert("default".to_string(), DEFAULT_LAYOUT.to_string());
        templates.insert("bare".to_string(), BARE_LAYOUT.to_string());
        Self { templates }
    }

    /// Register (or replace) a layout under a key.
    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(name.into(), template.into());
    }

    /// Look up a layout, falling back to the default for unknown keys.
    pub fn get(&self, name: &str) -> &str {
        match self.templates.get(name) {
            Some(template) => template,
            None => {
                trace!(layout = %name, "unknown layout, using default");
                DEFAULT_LAYOUT
            }
        }
    }
}

impl Default for Layouts {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutSource for Layouts {
    fn layout(&self, name: &str) -> Option<String> {
        self.templates.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_present() {
        let layouts = Layouts::new();
        assert_eq!(layouts.get("default"), DEFAULT_LAYOUT);
        assert_eq!(layouts.get("bare"), BARE_LAYOUT);
        assert!(layouts.names().contains(&"default".to_string()));
    }

    #[test]
    fn unknown_key_falls_back_to_default() {
        let layouts = Layouts::new();
        assert_eq!(layouts.get("no-such-layout"), DEFAULT_LAYOUT);
        assert_eq!(layouts.layout("no-such-layout"), None);
    }

    #[test]
    fn insert_overrides() {
        let mut layouts = Layouts::new();
        layouts.insert("default", "{field}");
        assert_eq!(layouts.get("default"), "{field}");
    }
}
