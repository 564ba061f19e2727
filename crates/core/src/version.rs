//! Version identification and ordering.
//!
//! Release tags come in every shape imaginable (`v1.2.3`, `gping-v1.14.0`,
//! `@scope/pkg@1.7.0-rc2`), so versions here are not semver. A version is
//! the sequence of digit runs and letter runs found in the string, and two
//! versions are ordered token by token:
//!
//! - numbers compare by value (`v01 == v1`),
//! - words compare lexicographically,
//! - a word sorts before a number, so `1.0.0-beta.1 < 1.0.0`,
//! - a position missing from the shorter version counts as the number `0`.

use crate::error::{Error, Result};
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static RELEASE_DOWNLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/[^/]+/[^/]+/releases/download/(.+)/[^/]+$")
        .expect("release download pattern is valid")
});

const ARCHIVE_SUFFIXES: [&str; 3] = [".tar.gz", ".tgz", ".zip"];

/// A single comparable piece of a version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of ASCII digits, stored without leading zeros.
    Number(String),
    /// A run of ASCII letters.
    Word(String),
}

impl Token {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Self::Number(if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        })
    }

    fn zero() -> Self {
        Self::Number("0".to_string())
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Normalized digit strings: longer means larger.
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Word(a), Self::Word(b)) => a.cmp(b),
            (Self::Word(_), Self::Number(_)) => Ordering::Less,
            (Self::Number(_), Self::Word(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(n),
            Self::Word(w) => f.write_str(w),
        }
    }
}

/// A tokenized version string.
///
/// Equality follows ordering, so `1.0` and `1.0.0` are equal versions even
/// though their token lists differ in length.
#[derive(Debug, Clone, Default)]
pub struct Version {
    tokens: Vec<Token>,
}

impl Version {
    /// Tokenize a tag or version string.
    ///
    /// Input without any digits or letters yields an empty version, which
    /// compares as all zeros.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = input.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            let digit = c.is_ascii_digit();
            if !digit && !c.is_ascii_alphabetic() {
                continue;
            }
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                let same_kind = if digit {
                    next.is_ascii_digit()
                } else {
                    next.is_ascii_alphabetic()
                };
                if !same_kind {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            let run = &input[start..end];
            tokens.push(if digit {
                Token::number(run)
            } else {
                Token::Word(run.to_string())
            });
        }

        if matches!(tokens.first(), Some(Token::Word(w)) if w == "v") {
            tokens.remove(0);
        }

        Self { tokens }
    }

    /// The tokens making up this version.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Whether no tokens were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = Token::zero();
        let len = self.tokens.len().max(other.tokens.len());
        for i in 0..len {
            let a = self.tokens.get(i).unwrap_or(&zero);
            let b = other.tokens.get(i).unwrap_or(&zero);
            match a.cmp(b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.tokens.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Compare two version strings.
#[must_use]
pub fn compare(v1: &str, v2: &str) -> Ordering {
    Version::parse(v1).cmp(&Version::parse(v2))
}

/// Extract the version-bearing part of a download URL.
///
/// GitHub release asset URLs yield their (percent-decoded) tag, which may
/// itself be composite like `@scope/pkg@1.2.3`. Any other URL yields its
/// last path segment without an archive suffix.
#[must_use]
pub fn from_url(url: &str) -> String {
    if let Some(caps) = RELEASE_DOWNLOAD.captures(url) {
        let tag = &caps[1];
        return urlencoding::decode(tag).map_or_else(|_| tag.to_string(), Cow::into_owned);
    }

    let base = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix))
        .unwrap_or(base)
        .to_string()
}

/// Prefix pattern removed from tags to obtain a bare version.
#[derive(Debug, Clone)]
pub struct TagPrefix {
    pattern: Regex,
}

impl TagPrefix {
    /// Compile a prefix pattern. The pattern is anchored at the start of the tag.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
            Error::config(
                format!("invalid tag prefix pattern '{pattern}': {e}"),
                "The tag prefix is a regular expression matched at the start of the tag",
            )
        })?;
        Ok(Self { pattern })
    }

    /// Remove the prefix from `tag` when it is directly followed by a digit.
    ///
    /// A tag the prefix does not match is returned unchanged.
    #[must_use]
    pub fn strip<'a>(&self, tag: &'a str) -> &'a str {
        self.pattern
            .find(tag)
            .map(|m| &tag[m.end()..])
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .unwrap_or(tag)
    }
}

impl Default for TagPrefix {
    fn default() -> Self {
        #[allow(clippy::expect_used)]
        Self::new("v").expect("default tag prefix is valid")
    }
}

/// Strip `prefix` from `tag`.
#[must_use]
pub fn strip_prefix<'a>(tag: &'a str, prefix: &TagPrefix) -> &'a str {
    prefix.strip(tag)
}
