//! Field descriptor normalization.
//!
//! Merges a partial seed with fixed defaults, computes derived flags,
//! resolves the ambient persistence scope and allocates the wrapper id.
//! Returns `None` when the field is suppressed for the acting viewer —
//! suppression is not an error, the field simply does not render.

use tracing::debug;

use crate::context::RenderContext;
use crate::types::{FieldDescriptor, FieldKind, FieldSeed, Scope};

/// Normalize a partial seed into a fully-populated descriptor, or `None`
/// if the field is suppressed.
///
/// Merge rule: caller value wins, else default. The finished descriptor
/// is registered in the context so the save stage reads the same shape
/// the render stage produced.
pub fn normalize(seed: FieldSeed, ctx: &mut RenderContext) -> Option<FieldDescriptor> {
    if let Some(access) = &seed.access {
        if let Some(capability) = &access.capability {
            if !ctx.viewer().can(capability) {
                debug!(capability = %capability, "field suppressed: missing capability");
                return None;
            }
        }
        if access.login_required && !ctx.viewer().logged_in {
            debug!("field suppressed: viewer not logged in");
            return None;
        }
        if !access.roles.is_empty() && !ctx.viewer().has_any_role(&access.roles) {
            debug!("field suppressed: role mismatch");
            return None;
        }
    }

    let kind = seed.kind.unwrap_or(FieldKind::Text);

    // A field with no path has nowhere to submit to; only an unlabeled
    // literal may omit it.
    let field = match seed.field {
        Some(field) => field,
        None if matches!(kind, FieldKind::Html { .. }) => String::new(),
        None => {
            debug!("field suppressed: no field path and not an html literal");
            return None;
        }
    };

    let scope = seed
        .scope
        .or_else(|| ctx.default_scope().cloned())
        .unwrap_or(Scope::Ephemeral);

    let attributes = seed.attributes.unwrap_or_default();
    let multiple = kind.is_inherently_multi() || attributes.contains_key("multiple");

    let id_stem = if field.is_empty() { "html" } else { field.as_str() };
    let wrapper_id = ctx.allocate_wrapper_id(&scope, id_stem);

    let mut conditions = seed.conditions.unwrap_or_default();
    for condition in &mut conditions {
        let condition_scope = condition.scope.get_or_insert_with(|| scope.clone()).clone();
        // Prefer the sibling's allocated wrapper id; fall back to the
        // deterministic input name when the sibling renders later.
        condition.target = Some(
            ctx.descriptor(&condition_scope, &condition.field)
                .map(|sibling| sibling.wrapper_id.clone())
                .unwrap_or_else(|| format!("{}:{}", condition_scope.slug(), condition.field)),
        );
    }

    let descriptor = FieldDescriptor {
        field,
        kind,
        scope,
        label: seed.label,
        description: seed.description,
        default: seed.default,
        multiple,
        add_more: seed.add_more.unwrap_or(false),
        sortable: seed.sortable.unwrap_or(false),
        choices: seed.choices.unwrap_or_default(),
        conditions,
        validate: seed.validate.unwrap_or_default(),
        sanitize: seed.sanitize.unwrap_or_default(),
        template: seed.template.unwrap_or_else(|| "default".to_string()),
        attributes,
        index: seed.index,
        group_field: seed.group_field.unwrap_or(false),
        required: seed.required.unwrap_or(false),
        display: seed.display.unwrap_or(false),
        belongs_to: seed.belongs_to.unwrap_or(false),
        wrapper_id,
    };

    ctx.register(descriptor.clone());
    Some(descriptor)
}
