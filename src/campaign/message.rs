//! Connection-note rendering.

use super::models::Executive;

/// Hard limit the target platform puts on connection notes.
pub const MAX_MESSAGE_CHARS: usize = 300;

const ELLIPSIS: &str = "...";

/// Render `template` for `executive`.
///
/// Placeholders: `{name}` (first name), `{company}`, `{title}` and
/// `{job_title}` (empty when unknown). Substitution is single-pass, so
/// braces inside substituted values are never expanded again. Unknown
/// placeholders are left as written. The result is at most
/// [`MAX_MESSAGE_CHARS`] characters.
pub fn render_message(template: &str, executive: &Executive) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        let Some(close) = after.find('}') else {
            out.push_str(after);
            rest = "";
            break;
        };
        let key = &after[1..close];
        match placeholder(key, executive) {
            Some(value) => out.push_str(value),
            None => out.push_str(&after[..=close]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    truncate(out)
}

fn placeholder<'a>(key: &str, executive: &'a Executive) -> Option<&'a str> {
    match key {
        "name" => Some(executive.first_name()),
        "company" => Some(&executive.company),
        "title" => Some(&executive.title),
        "job_title" => Some(executive.hiring_for.as_deref().unwrap_or("")),
        _ => None,
    }
}

fn truncate(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message;
    }
    let keep = MAX_MESSAGE_CHARS - ELLIPSIS.len();
    let mut cut: String = message.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}
