//! Token expansion, fragment extraction and wrapper positioning.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Which part of a block token to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    /// The content between the opening and closing markers.
    Whole,
    /// The markup preceding the opening marker.
    Start,
    /// The markup following the closing marker.
    End,
}

/// How a rendered field's own wrapper fragment is placed around the
/// composed field body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Prefix the wrapper's opening chrome.
    Start,
    /// Suffix the wrapper's closing chrome.
    End,
    /// Both.
    Wrap,
    /// Body only.
    #[default]
    None,
}

fn is_token_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap())
}

fn continuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\\r?\n\s*").unwrap())
}

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap())
}

/// Normalize a composed template before expansion: strip comment markers
/// and line-continuation artifacts, collapse runs of spaces. Incidental
/// formatting must not break the token grammar.
pub fn normalize(template: &str) -> String {
    let stripped = comment_re().replace_all(template, "");
    let joined = continuation_re().replace_all(&stripped, "");
    spaces_re().replace_all(&joined, " ").into_owned()
}

/// Replace every `{token}` placeholder with its resolved content in a
/// single pass. Unresolved tokens and block markers render as empty.
/// Brace sequences that are not valid token names pass through verbatim.
pub fn expand(template: &str, tokens: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let Some(open) = rest.find('{') else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        let ident = name.strip_prefix('/').unwrap_or(name);
        if is_token_name(ident) {
            // Closing markers and unresolved tokens vanish.
            if !name.starts_with('/') {
                if let Some(content) = tokens.get(ident) {
                    out.push_str(content);
                }
            }
        } else {
            out.push('{');
            out.push_str(name);
            out.push('}');
        }
        rest = &after[close + 1..];
    }
}

/// Extract part of a block token from a template.
///
/// Returns `None` when the block's markers are absent.
pub fn extract(template: &str, token: &str, fragment: Fragment) -> Option<String> {
    let open = format!("{{{token}}}");
    let close = format!("{{/{token}}}");
    let open_at = template.find(&open)?;
    let close_at = template.find(&close)?;
    if close_at < open_at {
        return None;
    }
    let piece = match fragment {
        Fragment::Whole => &template[open_at + open.len()..close_at],
        Fragment::Start => &template[..open_at],
        Fragment::End => &template[close_at + close.len()..],
    };
    Some(piece.to_string())
}

/// Place the wrapper fragments of `template`'s `token` block around an
/// already-composed field body. Used when a single field instance must
/// visually open or close a multi-field layout row.
pub fn apply_position(template: &str, token: &str, body: &str, position: Position) -> String {
    let start = || extract(template, token, Fragment::Start).unwrap_or_default();
    let end = || extract(template, token, Fragment::End).unwrap_or_default();
    match position {
        Position::Start => format!("{}{}", start(), body),
        Position::End => format!("{}{}", body, end()),
        Position::Wrap => format!("{}{}{}", start(), body, end()),
        Position::None => body.to_string(),
    }
}
