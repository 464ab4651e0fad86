//! `[field=name]` substitution inside description and choice text.
//!
//! A description may reference another field's current value. The
//! substitution is a small recursive-descent pass with an explicit depth
//! guard: a self-referencing description terminates instead of looping.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[field=([A-Za-z0-9_:-]+)\]").unwrap())
}

/// Substitute `[field=name]` references in `text` using `resolver`.
///
/// Substituted content is itself interpolated, up to `max_depth` levels.
/// At depth zero remaining references are left verbatim. Unresolvable
/// references are also left verbatim.
pub fn interpolate(text: &str, resolver: &dyn Fn(&str) -> Option<String>, max_depth: usize) -> String {
    if max_depth == 0 {
        if reference_re().is_match(text) {
            warn!("field interpolation depth exhausted");
        }
        return text.to_string();
    }
    reference_re()
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            match resolver(name) {
                Some(content) => interpolate(&content, resolver, max_depth - 1),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_reference() {
        let resolver = |name: &str| (name == "city").then(|| "Lisbon".to_string());
        assert_eq!(
            interpolate("You chose [field=city].", &resolver, 4),
            "You chose Lisbon."
        );
    }

    #[test]
    fn unresolvable_reference_left_verbatim() {
        let resolver = |_: &str| None;
        assert_eq!(
            interpolate("See [field=missing].", &resolver, 4),
            "See [field=missing]."
        );
    }

    #[test]
    fn nested_references_resolve() {
        let resolver = |name: &str| match name {
            "outer" => Some("via [field=inner]".to_string()),
            "inner" => Some("deep".to_string()),
            _ => None,
        };
        assert_eq!(interpolate("[field=outer]", &resolver, 4), "via deep");
    }

    #[test]
    fn self_reference_terminates() {
        let resolver = |name: &str| (name == "loop").then(|| "x[field=loop]".to_string());
        let out = interpolate("[field=loop]", &resolver, 3);
        // Three expansions then the guard leaves the reference verbatim.
        assert_eq!(out, "xxx[field=loop]");
    }

    #[test]
    fn depth_zero_is_identity() {
        let resolver = |_: &str| Some("never".to_string());
        assert_eq!(interpolate("[field=a]", &resolver, 0), "[field=a]");
    }
}
