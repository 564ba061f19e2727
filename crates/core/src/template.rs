//! Commit message templates with `{{name}}` placeholders.

use std::collections::HashMap;

/// Substitute `{{name}}` placeholders from `values`.
///
/// The template is scanned once: substituted values are never re-scanned,
/// and placeholders without a value are left as written.
#[must_use]
pub fn render<S: std::hash::BuildHasher>(template: &str, values: &HashMap<&str, String, S>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let name = &after[..close];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
