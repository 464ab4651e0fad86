//! RenderContext — explicit per-pass render state.
//!
//! The original engine kept the rendered-field registry, the allocated
//! wrapper-id set and the active persistence scope in process-wide state.
//! Here they live on a context object threaded through every call, so a
//! form rendered inside a preview of another form cannot corrupt either
//! pass.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::types::{FieldDescriptor, Scope};

/// The acting user a render pass is performed for. Used by the normalizer
/// to suppress fields the viewer may not see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewer {
    pub logged_in: bool,
    pub capabilities: HashSet<String>,
    pub roles: HashSet<String>,
}

impl Viewer {
    /// An anonymous viewer with no capabilities or roles.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A logged-in viewer.
    pub fn logged_in() -> Self {
        Self {
            logged_in: true,
            ..Self::default()
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn has_any_role(&self, roles: &[String]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }
}

/// Per-render-pass state: the viewer, the ambient default scope, the set
/// of allocated wrapper ids and the (scope, field) descriptor registry.
///
/// The registry is the render/save agreement point: the envelope snapshot
/// taken at render time is built from exactly the descriptors registered
/// here, so the save stage validates against the shapes that were
/// actually rendered.
#[derive(Debug, Default)]
pub struct RenderContext {
    viewer: Viewer,
    default_scope: Option<Scope>,
    allocated_ids: HashSet<String>,
    registry: IndexMap<(Scope, String), FieldDescriptor>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acting viewer.
    pub fn with_viewer(mut self, viewer: Viewer) -> Self {
        self.viewer = viewer;
        self
    }

    /// Set the ambient scope fields default to when the caller sets none.
    /// Unset means unscoped fields stay ephemeral.
    pub fn with_default_scope(mut self, scope: Scope) -> Self {
        self.default_scope = Some(scope);
        self
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn default_scope(&self) -> Option<&Scope> {
        self.default_scope.as_ref()
    }

    /// Allocate a wrapper id unique for the life of this render pass.
    ///
    /// On collision an incrementing numeric suffix is appended, so two
    /// same-named fields rendered twice (e.g. inside a repeated group)
    /// get distinguishable DOM identities.
    pub fn allocate_wrapper_id(&mut self, scope: &Scope, field: &str) -> String {
        let base = format!("{}_{}", scope.slug(), field.replace(':', "_"));
        let mut candidate = base.clone();
        let mut suffix = 2usize;
        while self.allocated_ids.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.allocated_ids.insert(candidate.clone());
        candidate
    }

    /// Register a finished descriptor for the save stage.
    pub fn register(&mut self, descriptor: FieldDescriptor) {
        debug!(
            scope = %descriptor.scope,
            field = %descriptor.field,
            wrapper_id = %descriptor.wrapper_id,
            "registered field"
        );
        self.registry.insert(
            (descriptor.scope.clone(), descriptor.field.clone()),
            descriptor,
        );
    }

    /// Look up the registered descriptor for (scope, field).
    pub fn descriptor(&self, scope: &Scope, field: &str) -> Option<&FieldDescriptor> {
        self.registry.get(&(scope.clone(), field.to_string()))
    }

    /// All registered descriptors in registration order.
    pub fn registered(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.registry.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldKind, Scope};
    use indexmap::IndexMap;

    fn descriptor(scope: Scope, field: &str) -> FieldDescriptor {
        FieldDescriptor {
            field: field.into(),
            kind: FieldKind::Text,
            scope,
            label: None,
            description: None,
            default: None,
            multiple: false,
            add_more: false,
            sortable: false,
            choices: vec![],
            conditions: vec![],
            validate: vec![],
            sanitize: vec![],
            template: "default".into(),
            attributes: IndexMap::new(),
            index: None,
            group_field: false,
            required: false,
            display: false,
            belongs_to: false,
            wrapper_id: "x".into(),
        }
    }

    #[test]
    fn wrapper_ids_unique_within_pass() {
        let mut ctx = RenderContext::new();
        let scope = Scope::record("profile");
        let first = ctx.allocate_wrapper_id(&scope, "bio");
        let second = ctx.allocate_wrapper_id(&scope, "bio");
        let third = ctx.allocate_wrapper_id(&scope, "bio");
        assert_eq!(first, "record_profile_bio");
        assert_eq!(second, "record_profile_bio_2");
        assert_eq!(third, "record_profile_bio_3");
    }

    #[test]
    fn wrapper_id_replaces_path_separators() {
        let mut ctx = RenderContext::new();
        let id = ctx.allocate_wrapper_id(&Scope::Entity, "item:0:qty");
        assert_eq!(id, "entity_item_0_qty");
    }

    #[test]
    fn registry_keyed_by_scope_and_field() {
        let mut ctx = RenderContext::new();
        ctx.register(descriptor(Scope::Entity, "title"));
        ctx.register(descriptor(Scope::record("profile"), "title"));

        assert!(ctx.descriptor(&Scope::Entity, "title").is_some());
        assert!(ctx.descriptor(&Scope::record("profile"), "title").is_some());
        assert!(ctx.descriptor(&Scope::Ephemeral, "title").is_none());
        assert_eq!(ctx.registered().count(), 2);
    }

    #[test]
    fn reregistering_replaces_not_duplicates() {
        let mut ctx = RenderContext::new();
        ctx.register(descriptor(Scope::Entity, "title"));
        let mut updated = descriptor(Scope::Entity, "title");
        updated.required = true;
        ctx.register(updated);

        assert_eq!(ctx.registered().count(), 1);
        assert!(ctx.descriptor(&Scope::Entity, "title").unwrap().required);
    }

    #[test]
    fn viewer_capability_and_role_checks() {
        let viewer = Viewer::logged_in()
            .with_capability("edit_fields")
            .with_role("editor");
        assert!(viewer.can("edit_fields"));
        assert!(!viewer.can("manage_site"));
        assert!(viewer.has_any_role(&["editor".into(), "admin".into()]));
        assert!(!viewer.has_any_role(&["admin".into()]));
    }
}
