//! Formula field rewriting.
//!
//! Formulas are edited as text, one `key "value"` field at a time, so
//! everything around the quoted value (indentation, `:` or `=>` separators,
//! quote style, comments) survives the edit untouched.

use crate::error::{Error, Result};
use crate::version;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::cmp::Ordering;
use std::sync::LazyLock;
use tracing::debug;

/// Ordered mapping of field name to new value.
pub type Replacements = IndexMap<String, String>;

#[allow(clippy::expect_used)]
static REVISION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*revision[ \t]+\d+[ \t]*(?:\r?\n|$)")
        .expect("revision line pattern is valid")
});

/// A located field occurrence in formula text.
struct FieldMatch {
    pattern: Regex,
    current: String,
}

fn field_pattern(field: &str) -> Result<Regex> {
    let source = format!(
        r#"(?m)^(?P<lead>[ \t]*)(?P<key>{})(?P<sep>:|[ \t]*=>)?(?P<gap>[ \t]*)(?:"(?P<dq>(?:[^"\\\n]|\\.)*)"|'(?P<sq>(?:[^'\\\n]|\\.)*)')"#,
        regex::escape(field)
    );
    Regex::new(&source).map_err(|e| {
        Error::config(
            format!("cannot build pattern for field '{field}': {e}"),
            "Field names must be plain identifiers",
        )
    })
}

fn find_field(text: &str, field: &str) -> Result<Option<FieldMatch>> {
    let pattern = field_pattern(field)?;
    let current = pattern.captures(text).map(|caps| {
        caps.name("dq")
            .or_else(|| caps.name("sq"))
            .map_or_else(String::new, |m| unescape(m.as_str()))
    });
    Ok(current.map(|current| FieldMatch { pattern, current }))
}

/// Refuse replacements that would move the formula to an older release.
fn check_downgrade(field: &str, current: &str, proposed: &str) -> Result<()> {
    match field {
        "version" => {
            if version::compare(proposed, current) == Ordering::Less {
                return Err(Error::upgrade(field, current, proposed));
            }
        }
        "url" if !proposed.ends_with(".git") => {
            let current = version::from_url(current);
            let proposed = version::from_url(proposed);
            if version::compare(&proposed, &current) == Ordering::Less {
                return Err(Error::upgrade(field, current, proposed));
            }
        }
        _ => {}
    }
    Ok(())
}

fn escape(value: &str, quote: char) -> String {
    value
        .replace('\\', "\\\\")
        .replace(quote, &format!("\\{quote}"))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

/// Replace the quoted values of the given fields.
///
/// Each field's first occurrence is rewritten; fields missing from the text
/// are skipped. Downgrade checks for `version` and `url` run against the
/// original text before anything is substituted, so a rejected set leaves
/// nothing half-applied.
///
/// # Errors
///
/// Returns [`Error::Upgrade`] when a `version` or `url` replacement would be
/// a downgrade.
pub fn replace_fields(text: &str, replacements: &Replacements) -> Result<String> {
    let mut located = Vec::with_capacity(replacements.len());
    for (field, value) in replacements {
        match find_field(text, field)? {
            Some(found) => {
                check_downgrade(field, &found.current, value)?;
                located.push((found.pattern, value));
            }
            None => debug!(field = %field, "Field not present, skipping"),
        }
    }

    let mut content = text.to_string();
    for (pattern, value) in located {
        content = pattern
            .replace(&content, |caps: &Captures| {
                let quote = if caps.name("dq").is_some() { '"' } else { '\'' };
                format!(
                    "{}{}{}{}{quote}{}{quote}",
                    &caps["lead"],
                    &caps["key"],
                    caps.name("sep").map_or("", |m| m.as_str()),
                    &caps["gap"],
                    escape(value, quote),
                )
            })
            .into_owned();
    }
    Ok(content)
}

/// Remove standalone `revision N` lines.
#[must_use]
pub fn remove_revision_line(text: &str) -> String {
    REVISION_LINE.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacements(pairs: &[(&str, &str)]) -> Replacements {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_replace_preserves_separators_and_quotes() {
        let input = "
  url \"https://github.com/old/url.git\",
    tag: 'v0.9.0',
    revision => \"OLDREV\"
";
        let expected = "
  url \"https://github.com/cli/cli.git\",
    tag: 'v0.11.1',
    revision => \"NEWREV\"
";
        let out = replace_fields(
            input,
            &replacements(&[
                ("url", "https://github.com/cli/cli.git"),
                ("tag", "v0.11.1"),
                ("revision", "NEWREV"),
            ]),
        )
        .unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_replace_url_with_newer_version() {
        let input = "\n  url \"https://github.com/me/myproject/releases/download/v1.2.3/file.tgz\"\n";
        let expected = "\n  url \"https://github.com/me/myproject/releases/download/v1.2.4/file.tgz\"\n";
        let out = replace_fields(
            input,
            &replacements(&[(
                "url",
                "https://github.com/me/myproject/releases/download/v1.2.4/file.tgz",
            )]),
        )
        .unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_only_one_line_changes() {
        let input = "class Foo < Formula\n  url \"https://example.com/archive/v1.0.0.tar.gz\"\n  sha256 \"abc\"\nend\n";
        let out = replace_fields(
            input,
            &replacements(&[("url", "https://example.com/archive/v1.1.0.tar.gz")]),
        )
        .unwrap();
        let changed: Vec<_> = input
            .lines()
            .zip(out.lines())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(
            changed,
            vec![(
                "  url \"https://example.com/archive/v1.0.0.tar.gz\"",
                "  url \"https://example.com/archive/v1.1.0.tar.gz\""
            )]
        );
    }

    #[test]
    fn test_missing_field_is_skipped() {
        let input = "  url \"https://example.com/v1.0.0.tar.gz\"\n";
        let out = replace_fields(input, &replacements(&[("revision", "abc")])).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_field_name_is_not_a_prefix_match() {
        let input = "  urls \"a\"\n  url \"b\"\n";
        let out = replace_fields(input, &replacements(&[("url", "c")])).unwrap();
        assert_eq!(out, "  urls \"a\"\n  url \"c\"\n");
    }

    #[test]
    fn test_only_first_occurrence_replaced() {
        let input = "  sha256 \"one\"\n  sha256 \"two\"\n";
        let out = replace_fields(input, &replacements(&[("sha256", "new")])).unwrap();
        assert_eq!(out, "  sha256 \"new\"\n  sha256 \"two\"\n");
    }

    #[test]
    fn test_version_downgrade_rejected() {
        let input = "  version \"1.2.0\"\n  sha256 \"old\"\n";
        let err = replace_fields(
            input,
            &replacements(&[("sha256", "new"), ("version", "1.1.9")]),
        )
        .unwrap_err();
        match err {
            Error::Upgrade {
                field,
                current,
                proposed,
            } => {
                assert_eq!(field, "version");
                assert_eq!(current, "1.2.0");
                assert_eq!(proposed, "1.1.9");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_url_downgrade_rejected() {
        let input = "  url \"https://github.com/o/r/archive/v2.0.0.tar.gz\"\n";
        let err = replace_fields(
            input,
            &replacements(&[("url", "https://github.com/o/r/archive/v1.9.0.tar.gz")]),
        )
        .unwrap_err();
        assert!(err.is_upgrade());
    }

    #[test]
    fn test_git_url_skips_guard() {
        let input = "  url \"https://github.com/o/zzz.git\",\n    tag: \"v2.0.0\"\n";
        let out = replace_fields(
            input,
            &replacements(&[("url", "https://github.com/o/aaa.git")]),
        )
        .unwrap();
        assert!(out.contains("aaa.git"));
    }

    #[test]
    fn test_same_version_allowed() {
        let input = "  version \"1.2.0\"\n";
        let out = replace_fields(input, &replacements(&[("version", "v1.2.0")])).unwrap();
        assert_eq!(out, "  version \"v1.2.0\"\n");
    }

    #[test]
    fn test_escapes_destination_quote() {
        let input = "  desc 'old'\n  homepage \"x\"\n";
        let out = replace_fields(
            input,
            &replacements(&[("desc", "it's"), ("homepage", "say \"hi\"")]),
        )
        .unwrap();
        assert_eq!(out, "  desc 'it\\'s'\n  homepage \"say \\\"hi\\\"\"\n");
    }

    #[test]
    fn test_rewrites_previously_escaped_value() {
        let input = "  desc \"say \\\"hi\\\" there\"\n  homepage \"x\"\n";
        let out = replace_fields(input, &replacements(&[("desc", "plain")])).unwrap();
        assert_eq!(out, "  desc \"plain\"\n  homepage \"x\"\n");
    }

    #[test]
    fn test_escaped_value_survives_second_rewrite() {
        let first = replace_fields(
            "  desc \"old\"\n",
            &replacements(&[("desc", r#"a \ "b""#)]),
        )
        .unwrap();
        assert_eq!(first, "  desc \"a \\\\ \\\"b\\\"\"\n");

        let second = replace_fields(&first, &replacements(&[("desc", "new")])).unwrap();
        assert_eq!(second, "  desc \"new\"\n");
    }

    #[test]
    fn test_guard_reads_unescaped_version() {
        let input = "  version 'v2.0.0\\'s'\n";
        assert_eq!(unescape("v2.0.0\\'s"), "v2.0.0's");
        let err = replace_fields(input, &replacements(&[("version", "v1.0.0")])).unwrap_err();
        assert!(err.is_upgrade());
    }

    #[test]
    fn test_remove_revision_line() {
        let input = "  url \"x\"\n  revision 12\n  head \"git://example.com/repo.git\",\n    revision: \"GITSHA\"\n";
        let out = remove_revision_line(input);
        assert_eq!(
            out,
            "  url \"x\"\n  head \"git://example.com/repo.git\",\n    revision: \"GITSHA\"\n"
        );
    }

    #[test]
    fn test_remove_revision_line_absent() {
        let input = "  url \"x\"\n";
        assert_eq!(remove_revision_line(input), input);
    }
}
