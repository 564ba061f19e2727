//! Recognizing GitHub download URLs.

use crate::api::ArchiveFormat;
use brewbump_core::RepoId;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

#[allow(clippy::expect_used)]
static ARCHIVE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([^/]+)/([^/]+)/archive/(.+)(\.tar\.gz|\.zip)$")
        .expect("archive path pattern is valid")
});

#[allow(clippy::expect_used)]
static RELEASE_ASSET_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([^/]+)/([^/]+)/releases/download/(.+)/([^/]+)$")
        .expect("release asset path pattern is valid")
});

/// A source archive URL: `https://github.com/{owner}/{repo}/archive/{ref}.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReference {
    /// Repository the archive belongs to
    pub repo: RepoId,
    /// Git ref, possibly containing slashes (e.g. `refs/tags/v1.0`)
    pub git_ref: String,
    /// Archive format
    pub format: ArchiveFormat,
}

impl ArchiveReference {
    /// Parse an archive URL. Returns `None` for anything else.
    #[must_use]
    pub fn parse(url: &Url) -> Option<Self> {
        if !is_github(url) {
            return None;
        }
        let caps = ARCHIVE_PATH.captures(url.path())?;
        let format = match &caps[4] {
            ".zip" => ArchiveFormat::Zipball,
            _ => ArchiveFormat::Tarball,
        };
        Some(Self {
            repo: RepoId::new(&caps[1], &caps[2]),
            git_ref: caps[3].to_string(),
            format,
        })
    }
}

/// A release asset URL:
/// `https://github.com/{owner}/{repo}/releases/download/{tag}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAssetReference {
    /// Repository the release belongs to
    pub repo: RepoId,
    /// Percent-decoded tag name
    pub tag: String,
    /// Asset file name
    pub name: String,
}

impl ReleaseAssetReference {
    /// Parse a release asset URL. Returns `None` for anything else.
    #[must_use]
    pub fn parse(url: &Url) -> Option<Self> {
        if !is_github(url) {
            return None;
        }
        let caps = RELEASE_ASSET_PATH.captures(url.path())?;
        let tag = urlencoding::decode(&caps[3]).map_or_else(|_| caps[3].to_string(), |t| t.into_owned());
        let name = urlencoding::decode(&caps[4]).map_or_else(|_| caps[4].to_string(), |n| n.into_owned());
        Some(Self {
            repo: RepoId::new(&caps[1], &caps[2]),
            tag,
            name,
        })
    }
}

fn is_github(url: &Url) -> bool {
    url.scheme() == "https" && url.host_str() == Some("github.com")
}
