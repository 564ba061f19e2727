//! Hosting API abstraction.
//!
//! The publish flow and checksum resolution only talk to GitHub through the
//! [`RepoHost`] trait, so they can run against [`crate::GitHubHost`] in
//! production and an in-memory fake in tests.

use async_trait::async_trait;
use brewbump_core::{RepoId, Result};
use serde::{Deserialize, Serialize};

/// Repository metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Name of the default branch
    pub default_branch: String,
    /// Permissions of the authenticated actor; absent for anonymous access
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

impl Repository {
    /// Whether the authenticated actor can push to the repository.
    #[must_use]
    pub fn can_push(&self) -> bool {
        self.permissions.as_ref().is_some_and(|p| p.push)
    }
}

/// Actor permissions on a repository.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Permissions {
    /// Push access
    #[serde(default)]
    pub push: bool,
}

/// Branch metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    /// Tip commit
    pub commit: BranchCommit,
    /// Whether branch protection is enabled
    #[serde(default)]
    pub protected: bool,
}

/// Commit a branch points at.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchCommit {
    /// Commit SHA
    pub sha: String,
}

/// Result of reading a path from a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentResponse {
    /// A single file.
    File {
        /// Base64 file content as returned by the API (may contain newlines)
        content: String,
        /// Blob SHA, required to update the file
        sha: String,
    },
    /// The path is a directory.
    Directory,
}

/// A file write keyed by the prior blob SHA.
#[derive(Debug, Clone)]
pub struct FileUpdate {
    /// Commit message
    pub message: String,
    /// New file content
    pub content: String,
    /// Blob SHA of the content being replaced
    pub sha: String,
    /// Branch to commit to
    pub branch: String,
}

/// A release and its assets.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Tag the release was created from
    pub tag_name: String,
    /// Uploaded assets
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A release asset.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// File name
    pub name: String,
    /// API URL of the asset (not the browser download URL)
    pub url: String,
}

/// Response to a request made with redirect-following disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectResponse {
    /// HTTP status code
    pub status: u16,
    /// `Location` header, if the response carried one
    pub location: Option<String>,
}

/// Source archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.tar.gz`
    Tarball,
    /// `.zip`
    Zipball,
}

impl ArchiveFormat {
    /// Name of the API endpoint for this format.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Tarball => "tarball",
            Self::Zipball => "zipball",
        }
    }

    /// File extension, including the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Tarball => ".tar.gz",
            Self::Zipball => ".zip",
        }
    }
}

/// A pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    /// Title
    pub title: String,
    /// Body
    pub body: String,
    /// Head in `owner:branch` form
    pub head: String,
    /// Base branch
    pub base: String,
}

/// Operations needed from the code hosting API.
///
/// Errors from the API are reported as [`brewbump_core::Error::Api`] carrying
/// the HTTP status when there was one.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Fetch repository metadata.
    async fn get_repository(&self, repo: &RepoId) -> Result<Repository>;

    /// Fetch branch metadata.
    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<Branch>;

    /// Fork `repo` into the authenticated actor's account.
    async fn create_fork(&self, repo: &RepoId) -> Result<()>;

    /// Login of the authenticated actor.
    async fn authenticated_login(&self) -> Result<String>;

    /// Create a git ref (e.g. `refs/heads/topic`) pointing at `sha`.
    async fn create_ref(&self, repo: &RepoId, git_ref: &str, sha: &str) -> Result<()>;

    /// Sync a fork branch with its upstream. Responds 409 on conflicts.
    async fn merge_upstream(&self, repo: &RepoId, branch: &str) -> Result<()>;

    /// Read a path at a ref.
    async fn get_content(&self, repo: &RepoId, path: &str, git_ref: &str)
    -> Result<ContentResponse>;

    /// Create or update a file; returns the commit's web URL.
    async fn update_file(&self, repo: &RepoId, path: &str, update: &FileUpdate) -> Result<String>;

    /// Fetch a release by tag name.
    async fn get_release_by_tag(&self, repo: &RepoId, tag: &str) -> Result<Release>;

    /// Commit SHA a tag points at.
    async fn get_tag_sha(&self, repo: &RepoId, tag: &str) -> Result<String>;

    /// Open a pull request against `repo`; returns its web URL.
    async fn create_pull_request(&self, repo: &RepoId, pr: &NewPullRequest) -> Result<String>;

    /// API URL that redirects to a source archive of `git_ref`.
    fn archive_link(&self, repo: &RepoId, format: ArchiveFormat, git_ref: &str) -> String;

    /// Make an authenticated request to `url` without following redirects.
    async fn resolve_redirect(&self, url: &str, accept: Option<&str>) -> Result<RedirectResponse>;
}
