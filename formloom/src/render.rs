//! Structural field markup renderer.
//!
//! Produces plain, unstyled markup: enough structure for a host theme
//! to target (wrapper ids, input names following the path grammar,
//! condition data, error and description slots) and nothing more.
//! Refill values and error messages come from a claimed round-trip
//! state when one is present.

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use formloom_fields::{FieldDescriptor, FieldKind, FieldSeed, RenderContext};
use formloom_store::RoundTrip;
use formloom_templating::{apply_position, expand, extract, interpolate, Fragment, Layouts, Position};

/// Depth guard for `[field=x]` references inside labels and descriptions.
pub const MAX_INTERPOLATION_DEPTH: usize = 4;

/// Structural chrome for a repeating group; `{rows}` delimits the
/// prototype row that client code clones.
const GROUP_TEMPLATE: &str = "<div class=\"fl-group\">{rows}<div class=\"fl-group-row\">{row}</div>{/rows}<button type=\"button\" class=\"fl-add-row\">add row</button></div>";

/// One rendered field: its descriptor plus the composed markup.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField {
    pub descriptor: FieldDescriptor,
    pub markup: String,
}

/// Minimal HTML escaping for text and attribute positions.
pub fn esc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Refill value: the round-trip echo of the user's input wins over the
/// descriptor default.
fn current_value<'a>(
    descriptor: &'a FieldDescriptor,
    restored: Option<&'a RoundTrip>,
) -> Option<&'a Value> {
    restored
        .and_then(|trip| trip.previous_value(&descriptor.scope, &descriptor.field))
        .or(descriptor.default.as_ref())
}

fn is_selected(current: Option<&Value>, choice: &str) -> bool {
    match current {
        Some(Value::Array(items)) => items.iter().any(|item| value_text(item) == choice),
        Some(single) => value_text(single) == choice,
        None => false,
    }
}

fn extra_attrs(descriptor: &FieldDescriptor) -> String {
    let mut out = String::new();
    for (key, value) in &descriptor.attributes {
        out.push_str(&format!(" {}=\"{}\"", esc(key), esc(value)));
    }
    if descriptor.required {
        out.push_str(" required");
    }
    if !descriptor.conditions.is_empty() {
        let raw = serde_json::to_string(&descriptor.conditions).unwrap_or_default();
        out.push_str(&format!(" data-conditions=\"{}\"", esc(&raw)));
    }
    out
}

/// Renders one descriptor at a time against a layout registry, a render
/// context (for `[field=x]` lookups against sibling fields) and an
/// optional claimed round-trip state.
pub struct FieldRenderer<'a> {
    layouts: &'a Layouts,
    ctx: &'a RenderContext,
    restored: Option<&'a RoundTrip>,
}

impl<'a> FieldRenderer<'a> {
    pub fn new(layouts: &'a Layouts, ctx: &'a RenderContext, restored: Option<&'a RoundTrip>) -> Self {
        Self {
            layouts,
            ctx,
            restored,
        }
    }

    /// Compose the full markup for one field.
    pub fn render(&self, descriptor: &FieldDescriptor) -> String {
        // Literals and hidden inputs carry no chrome at all.
        match &descriptor.kind {
            FieldKind::Html { content } => return content.clone(),
            FieldKind::Hidden => return self.control(descriptor),
            _ => {}
        }

        let error = self
            .restored
            .and_then(|trip| trip.error(&descriptor.scope, &descriptor.field, 0));
        let body = if descriptor.display {
            self.display(descriptor)
        } else {
            self.control(descriptor)
        };
        let body = if descriptor.add_more && !matches!(descriptor.kind, FieldKind::Group { .. }) {
            apply_position(GROUP_TEMPLATE, "rows", &body, Position::Wrap)
        } else {
            body
        };

        let mut tokens = HashMap::new();
        tokens.insert("wrapper_id".to_string(), esc(&descriptor.wrapper_id));
        tokens.insert("label".to_string(), self.text(descriptor.effective_label()));
        tokens.insert("field".to_string(), body);
        tokens.insert(
            "error".to_string(),
            match error {
                Some(message) => format!("<span class=\"fl-error\">{}</span>", esc(message)),
                None => String::new(),
            },
        );
        if let Some(description) = &descriptor.description {
            tokens.insert("description".to_string(), self.text(description));
        }

        let layout = self.layouts.get(&descriptor.template);
        trace!(field = %descriptor.field, layout = %descriptor.template, "composing field");
        expand(layout, &tokens)
    }

    /// Interpolate `[field=x]` references, then escape.
    fn text(&self, raw: &str) -> String {
        let resolver = |name: &str| self.resolve_reference(name);
        esc(&interpolate(raw, &resolver, MAX_INTERPOLATION_DEPTH))
    }

    /// A reference names a sibling by input name or bare field path and
    /// resolves to its current value.
    fn resolve_reference(&self, name: &str) -> Option<String> {
        self.ctx
            .registered()
            .find(|descriptor| descriptor.input_name() == name || descriptor.field == name)
            .map(|descriptor| {
                current_value(descriptor, self.restored)
                    .map(value_text)
                    .unwrap_or_default()
            })
    }

    fn display(&self, descriptor: &FieldDescriptor) -> String {
        let value = current_value(descriptor, self.restored)
            .map(value_text)
            .unwrap_or_default();
        format!("<span class=\"fl-display\">{}</span>", esc(&value))
    }

    fn control(&self, descriptor: &FieldDescriptor) -> String {
        let name = esc(&descriptor.input_name());
        let id = esc(&descriptor.wrapper_id);
        let current = current_value(descriptor, self.restored);
        let attrs = extra_attrs(descriptor);
        match &descriptor.kind {
            FieldKind::Text => {
                let value = esc(&current.map(value_text).unwrap_or_default());
                format!("<input type=\"text\" id=\"{id}\" name=\"{name}\" value=\"{value}\"{attrs}>")
            }
            FieldKind::Hidden => {
                let value = esc(&current.map(value_text).unwrap_or_default());
                format!("<input type=\"hidden\" id=\"{id}\" name=\"{name}\" value=\"{value}\"{attrs}>")
            }
            FieldKind::Textarea => {
                let value = esc(&current.map(value_text).unwrap_or_default());
                format!("<textarea id=\"{id}\" name=\"{name}\"{attrs}>{value}</textarea>")
            }
            FieldKind::Checkbox => self.choice_inputs(descriptor, "checkbox", &name, current, &attrs),
            FieldKind::Radio => self.choice_inputs(descriptor, "radio", &name, current, &attrs),
            FieldKind::Select { multiple } => {
                let multi = if *multiple { " multiple" } else { "" };
                let mut out = format!("<select id=\"{id}\" name=\"{name}\"{multi}{attrs}>");
                for choice in &descriptor.choices {
                    let selected = if is_selected(current, &choice.value) {
                        " selected"
                    } else {
                        ""
                    };
                    let label = choice.label.as_deref().unwrap_or(&choice.value);
                    out.push_str(&format!(
                        "<option value=\"{}\"{selected}>{}</option>",
                        esc(&choice.value),
                        self.text(label)
                    ));
                }
                out.push_str("</select>");
                out
            }
            FieldKind::File => {
                let multi = if descriptor.multiple { " multiple" } else { "" };
                format!("<input type=\"file\" id=\"{id}\" name=\"{name}\"{multi}{attrs}>")
            }
            FieldKind::Group { fields } => self.group(descriptor, fields),
            FieldKind::Html { content } => content.clone(),
        }
    }

    fn choice_inputs(
        &self,
        descriptor: &FieldDescriptor,
        input_type: &str,
        name: &str,
        current: Option<&Value>,
        attrs: &str,
    ) -> String {
        let mut out = String::new();
        for choice in &descriptor.choices {
            let checked = if is_selected(current, &choice.value) {
                " checked"
            } else {
                ""
            };
            let label = choice.label.as_deref().unwrap_or(&choice.value);
            out.push_str(&format!(
                "<label class=\"fl-choice\"><input type=\"{input_type}\" name=\"{name}\" value=\"{}\"{checked}{attrs}> {}</label>",
                esc(&choice.value),
                self.text(label)
            ));
        }
        out
    }

    /// Rows for a composite group. With no echoed submission this is a
    /// single empty prototype row; after a bounced submission it is one
    /// filled row per row the user sent. Row inputs are named through
    /// the path grammar; client code clones a row and bumps the index.
    fn group(&self, descriptor: &FieldDescriptor, fields: &[FieldSeed]) -> String {
        let echoed: &[Value] = match current_value(descriptor, self.restored) {
            Some(Value::Array(rows)) if !rows.is_empty() => rows.as_slice(),
            _ => &[],
        };
        let prototype = extract(GROUP_TEMPLATE, "rows", Fragment::Whole).unwrap_or_default();
        let mut body = String::new();
        if echoed.is_empty() {
            let mut tokens = HashMap::new();
            tokens.insert("row".to_string(), self.group_row(descriptor, fields, 0, None));
            body = expand(&prototype, &tokens);
        } else {
            for (index, row) in echoed.iter().enumerate() {
                let mut tokens = HashMap::new();
                tokens.insert(
                    "row".to_string(),
                    self.group_row(descriptor, fields, index, Some(row)),
                );
                body.push_str(&expand(&prototype, &tokens));
            }
        }
        apply_position(GROUP_TEMPLATE, "rows", &body, Position::Wrap)
    }

    fn group_row(
        &self,
        descriptor: &FieldDescriptor,
        fields: &[FieldSeed],
        index: usize,
        row: Option<&Value>,
    ) -> String {
        let mut out = String::new();
        for seed in fields {
            let Some(sub) = seed.field.as_deref() else {
                continue;
            };
            let sub_name = format!(
                "{}:{}:{}:{}",
                descriptor.scope.slug(),
                descriptor.field,
                index,
                sub
            );
            let placeholder = seed.label.as_deref().unwrap_or(sub);
            let value = row.and_then(|r| r.get(sub)).map(value_text).unwrap_or_default();
            out.push_str(&format!(
                "<input type=\"text\" name=\"{}\" placeholder=\"{}\" value=\"{}\">",
                esc(&sub_name),
                esc(placeholder),
                esc(&value)
            ));
        }
        out
    }
}
