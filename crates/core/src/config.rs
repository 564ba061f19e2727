//! Run configuration.
//!
//! Every input of a run is collected into one [`BumpConfig`] at the process
//! boundary and handed to the core by reference. Nothing below this module
//! reads the environment.

use crate::error::{Error, Result};
use crate::version::TagPrefix;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Default commit message template.
pub const DEFAULT_COMMIT_MESSAGE: &str = "{{formulaName}} {{version}}";

/// A repository identity in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl RepoId {
    /// Creates a new repository identity.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Case-insensitive comparison, matching how GitHub resolves names.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.repo.eq_ignore_ascii_case(&other.repo)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(Error::config(
                format!("invalid repository '{s}'"),
                "Expected 'owner/repo'",
            )),
        }
    }
}

/// Inputs for one formula bump.
#[derive(Debug, Clone)]
pub struct BumpConfig {
    /// Repository the release happened in
    pub source_repo: RepoId,
    /// Ref that triggered the run (e.g. `refs/tags/v1.2.3`)
    pub git_ref: String,
    /// Commit the triggering ref points at
    pub git_sha: String,
    /// Repository holding the formula
    pub tap: RepoId,
    /// Formula name; defaults to the lowercased source repository name
    pub formula_name: Option<String>,
    /// Formula path; defaults to `Formula/<name>.rb`
    pub formula_path: Option<String>,
    /// Branch to update; `None` means the tap's default branch
    pub base_branch: Option<String>,
    /// Push to this repository instead of the tap (or a fork of it)
    pub push_to: Option<RepoId>,
    /// Explicit download URL
    pub download_url: Option<String>,
    /// Explicit SHA-256 checksum of the download
    pub download_sha256: Option<String>,
    /// Explicit tag name; otherwise derived from `git_ref`
    pub tag_name: Option<String>,
    /// Prefix stripped from the tag to obtain the version
    pub tag_prefix: TagPrefix,
    /// Regex whose first capture group extracts the version from the tag
    pub version_pattern: Option<Regex>,
    /// `Some(true)` forces a pull request, `Some(false)` suppresses it
    pub create_pullrequest: Option<bool>,
    /// Always commit to a new branch
    pub create_branch: bool,
    /// Commit message template
    pub commit_message: String,
}

impl BumpConfig {
    /// Creates a configuration with defaults for everything optional.
    #[must_use]
    pub fn new(source_repo: RepoId, git_ref: impl Into<String>, tap: RepoId) -> Self {
        Self {
            source_repo,
            git_ref: git_ref.into(),
            git_sha: String::new(),
            tap,
            formula_name: None,
            formula_path: None,
            base_branch: None,
            push_to: None,
            download_url: None,
            download_sha256: None,
            tag_name: None,
            tag_prefix: TagPrefix::default(),
            version_pattern: None,
            create_pullrequest: None,
            create_branch: false,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    /// Sets the triggering commit SHA.
    #[must_use]
    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.git_sha = sha.into();
        self
    }

    /// Sets the commit message template.
    #[must_use]
    pub fn with_commit_message(mut self, template: impl Into<String>) -> Self {
        self.commit_message = template.into();
        self
    }

    /// Sets the download URL.
    #[must_use]
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    /// Sets the download checksum.
    #[must_use]
    pub fn with_download_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.download_sha256 = Some(sha256.into());
        self
    }

    /// Sets the tag name.
    #[must_use]
    pub fn with_tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = Some(tag.into());
        self
    }

    /// Resolved formula name.
    #[must_use]
    pub fn formula_name(&self) -> String {
        self.formula_name
            .clone()
            .unwrap_or_else(|| self.source_repo.repo.to_lowercase())
    }

    /// Resolved formula path.
    #[must_use]
    pub fn formula_path(&self) -> String {
        self.formula_path
            .clone()
            .unwrap_or_else(|| format!("Formula/{}.rb", self.formula_name()))
    }

    /// Resolved tag name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no tag name was given and the
    /// triggering ref is not a tag.
    pub fn tag_name(&self) -> Result<String> {
        if let Some(tag) = &self.tag_name {
            return Ok(tag.clone());
        }
        self.git_ref
            .strip_prefix("refs/tags/")
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::config(
                    format!("invalid ref: {}", self.git_ref),
                    "Run on a tag push or pass --tag-name",
                )
            })
    }

    /// Version derived from `tag`.
    #[must_use]
    pub fn version_for(&self, tag: &str) -> String {
        if let Some(version) = self
            .version_pattern
            .as_ref()
            .and_then(|re| re.captures(tag))
            .and_then(|caps| caps.get(1))
        {
            return version.as_str().to_string();
        }
        self.tag_prefix.strip(tag).to_string()
    }
}
