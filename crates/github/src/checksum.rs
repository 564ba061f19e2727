//! Streaming checksums of release downloads.
//!
//! GitHub download URLs are first resolved to the storage URL they redirect
//! to, using the authenticated API so private repositories work. The bytes are
//! then fetched anonymously and hashed as they arrive.

use crate::api::{RedirectResponse, RepoHost};
use crate::download::{ArchiveReference, ReleaseAssetReference};
use brewbump_core::{Error, Result};
use reqwest::header::{ACCEPT, LOCATION};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// Default limit on redirects followed while streaming.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

const OCTET_STREAM: &str = "application/octet-stream";

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// SHA-256, what Homebrew formulas record
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(Error::config(
                format!("unsupported checksum algorithm '{other}'"),
                "Use sha256 or sha512",
            )),
        }
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            ChecksumAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Computes checksums of downloads.
pub struct ChecksumResolver<'a> {
    host: &'a dyn RepoHost,
    client: reqwest::Client,
    max_redirects: usize,
}

impl<'a> ChecksumResolver<'a> {
    /// Creates a resolver that resolves GitHub URLs through `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: &'a dyn RepoHost) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("brewbump")
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::http(e.to_string()))?;
        Ok(Self {
            host,
            client,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        })
    }

    /// Sets the redirect limit.
    #[must_use]
    pub const fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Hex digest of the content at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when a release asset does not exist,
    /// [`Error::Transport`] on a 4xx/5xx response, [`Error::MissingLocation`]
    /// on a redirect without a target and [`Error::TooManyRedirects`] when
    /// the hop limit is exceeded.
    pub async fn checksum(&self, url: &str, algorithm: ChecksumAlgorithm) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;
        let download = self.resolve_download(parsed).await?;
        let mut hasher = Hasher::new(algorithm);
        self.stream(download, &mut hasher).await?;
        Ok(hasher.finalize_hex())
    }

    /// Rewrites a GitHub download URL to the storage URL it redirects to.
    ///
    /// Other URLs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error when a GitHub API lookup fails.
    pub async fn resolve_download(&self, url: Url) -> Result<Url> {
        if let Some(archive) = ArchiveReference::parse(&url) {
            let api_url = self
                .host
                .archive_link(&archive.repo, archive.format, &archive.git_ref);
            let response = self.host.resolve_redirect(&api_url, None).await?;
            let location = redirect_target(&api_url, response)?.replace("/legacy.", "/");
            return parse_location(&api_url, &location);
        }

        if let Some(asset) = ReleaseAssetReference::parse(&url) {
            let release = self.host.get_release_by_tag(&asset.repo, &asset.tag).await?;
            let found = release
                .assets
                .iter()
                .find(|a| a.name == asset.name)
                .ok_or_else(|| {
                    Error::not_found(format!(
                        "could not find asset {} in {} release",
                        asset.name, asset.tag
                    ))
                })?;
            let response = self
                .host
                .resolve_redirect(&found.url, Some(OCTET_STREAM))
                .await?;
            let location = redirect_target(&found.url, response)?;
            return parse_location(&found.url, &location);
        }

        Ok(url)
    }

    async fn stream(&self, url: Url, hasher: &mut Hasher) -> Result<()> {
        let mut current = url;
        for _ in 0..=self.max_redirects {
            debug!("GET {}", redact_url(&current));
            let mut response = self
                .client
                .get(current.clone())
                .header(ACCEPT, OCTET_STREAM)
                .send()
                .await
                .map_err(|e| Error::http(e.to_string()))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| Error::MissingLocation {
                        status: status.as_u16(),
                        url: redact_url(&current),
                    })?;
                current = current
                    .join(location)
                    .map_err(|e| Error::invalid_url(location, e.to_string()))?;
                continue;
            }

            if !status.is_success() {
                return Err(Error::Transport {
                    status: status.as_u16(),
                    url: redact_url(&current),
                });
            }

            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| Error::http(e.to_string()))?
            {
                hasher.update(&chunk);
            }
            return Ok(());
        }

        Err(Error::TooManyRedirects {
            limit: self.max_redirects,
            url: redact_url(&current),
        })
    }
}

fn redirect_target(url: &str, response: RedirectResponse) -> Result<String> {
    if response.status >= 400 {
        return Err(Error::Transport {
            status: response.status,
            url: redact(url),
        });
    }
    response.location.ok_or_else(|| Error::MissingLocation {
        status: response.status,
        url: redact(url),
    })
}

fn parse_location(base: &str, location: &str) -> Result<Url> {
    let base = Url::parse(base).map_err(|e| Error::invalid_url(base, e.to_string()))?;
    base.join(location)
        .map_err(|e| Error::invalid_url(location, e.to_string()))
}

fn redact(url: &str) -> String {
    Url::parse(url).map_or_else(|_| "<invalid url>".to_string(), |u| redact_url(&u))
}

/// Loggable form of a URL: scheme, host, path and query parameter names.
///
/// Signed storage URLs carry credentials in their query values, so only the
/// keys are kept.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    let query = if keys.is_empty() {
        String::new()
    } else {
        format!("?{}", keys.join(","))
    };
    format!("{}://{host}{port}{}{query}", url.scheme(), url.path())
}
