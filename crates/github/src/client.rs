//! [`RepoHost`] implementation backed by the GitHub REST API.

use crate::api::{
    ArchiveFormat, Branch, ContentResponse, FileUpdate, NewPullRequest, RedirectResponse, Release,
    ReleaseAsset, RepoHost, Repository,
};
use async_trait::async_trait;
use brewbump_core::{Error, RepoId, Result};
use octocrab::Octocrab;
use octocrab::models::repos::{Content, Object};
use octocrab::params::repos::Reference;
use reqwest::header::{ACCEPT, AUTHORIZATION, LOCATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Serialize)]
struct MergeUpstream<'a> {
    branch: &'a str,
}

/// GitHub API client.
///
/// JSON endpoints go through octocrab. Redirect probes are HEAD requests on
/// a plain reqwest client with redirects disabled so the `Location` header
/// can be read.
pub struct GitHubHost {
    octocrab: Octocrab,
    http: reqwest::Client,
    token: SecretString,
    api_url: String,
}

impl GitHubHost {
    /// Creates a client for the public GitHub API.
    ///
    /// An empty token makes anonymous requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP clients cannot be built.
    pub fn new(token: SecretString) -> Result<Self> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Creates a client for a GitHub-compatible API at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is invalid or the HTTP clients cannot
    /// be built.
    pub fn with_api_url(token: SecretString, api_url: &str) -> Result<Self> {
        let api_url = api_url.trim_end_matches('/').to_string();

        let mut builder = Octocrab::builder()
            .base_uri(api_url.as_str())
            .map_err(|e| Error::invalid_url(&api_url, e.to_string()))?;
        if !token.expose_secret().is_empty() {
            builder = builder.personal_token(token.expose_secret().to_string());
        }
        let octocrab = builder
            .build()
            .map_err(|e| Error::http(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent("brewbump")
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::http(e.to_string()))?;

        Ok(Self {
            octocrab,
            http,
            token,
            api_url,
        })
    }

    fn route(repo: &RepoId, rest: &str) -> String {
        format!("/repos/{}/{}{rest}", repo.owner, repo.repo)
    }

    fn repos(&self, repo: &RepoId) -> octocrab::repos::RepoHandler<'_> {
        self.octocrab.repos(&repo.owner, &repo.repo)
    }
}

fn api_error(operation: &str, err: &octocrab::Error) -> Error {
    match err {
        octocrab::Error::GitHub { source, .. } => Error::api(
            operation,
            Some(source.status_code.as_u16()),
            source.message.clone(),
        ),
        other => Error::api(operation, None, other.to_string()),
    }
}

/// A ref name as octocrab's branch/tag reference.
fn reference(git_ref: &str) -> Reference {
    match git_ref.strip_prefix("refs/tags/") {
        Some(tag) => Reference::Tag(tag.to_string()),
        None => Reference::Branch(
            git_ref
                .strip_prefix("refs/heads/")
                .unwrap_or(git_ref)
                .to_string(),
        ),
    }
}

/// The contents API lists a directory and returns a single entry for a file.
fn content_response(mut items: Vec<Content>, path: &str) -> ContentResponse {
    match items.as_mut_slice() {
        [item] if item.r#type == "file" && item.path == path => ContentResponse::File {
            content: item.content.take().unwrap_or_default(),
            sha: std::mem::take(&mut item.sha),
        },
        _ => ContentResponse::Directory,
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl RepoHost for GitHubHost {
    async fn get_repository(&self, repo: &RepoId) -> Result<Repository> {
        self.octocrab
            .get(Self::route(repo, ""), None::<&()>)
            .await
            .map_err(|e| api_error("get repository", &e))
    }

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<Branch> {
        let route = Self::route(repo, &format!("/branches/{}", urlencoding::encode(branch)));
        self.octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| api_error("get branch", &e))
    }

    async fn create_fork(&self, repo: &RepoId) -> Result<()> {
        debug!(repo = %repo, "Creating fork");
        self.repos(repo)
            .create_fork()
            .send()
            .await
            .map_err(|e| api_error("create fork", &e))?;
        Ok(())
    }

    async fn authenticated_login(&self) -> Result<String> {
        let user = self
            .octocrab
            .current()
            .user()
            .await
            .map_err(|e| api_error("get authenticated user", &e))?;
        Ok(user.login)
    }

    async fn create_ref(&self, repo: &RepoId, git_ref: &str, sha: &str) -> Result<()> {
        self.repos(repo)
            .create_ref(&reference(git_ref), sha)
            .await
            .map_err(|e| api_error("create ref", &e))?;
        Ok(())
    }

    async fn merge_upstream(&self, repo: &RepoId, branch: &str) -> Result<()> {
        let _: serde_json::Value = self
            .octocrab
            .post(
                Self::route(repo, "/merge-upstream"),
                Some(&MergeUpstream { branch }),
            )
            .await
            .map_err(|e| api_error("merge upstream", &e))?;
        Ok(())
    }

    async fn get_content(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: &str,
    ) -> Result<ContentResponse> {
        let items = self
            .repos(repo)
            .get_content()
            .path(encode_path(path))
            .r#ref(git_ref)
            .send()
            .await
            .map_err(|e| api_error("get content", &e))?
            .items;
        Ok(content_response(items, path))
    }

    async fn update_file(&self, repo: &RepoId, path: &str, update: &FileUpdate) -> Result<String> {
        let result = self
            .repos(repo)
            .update_file(
                encode_path(path),
                &update.message,
                update.content.as_bytes(),
                &update.sha,
            )
            .branch(&update.branch)
            .send()
            .await
            .map_err(|e| api_error("update file", &e))?;
        result
            .commit
            .html_url
            .ok_or_else(|| Error::api("update file", None, "response has no commit URL"))
    }

    async fn get_release_by_tag(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        let release = self
            .repos(repo)
            .releases()
            .get_by_tag(&urlencoding::encode(tag))
            .await
            .map_err(|e| api_error("get release", &e))?;
        Ok(Release {
            tag_name: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|asset| ReleaseAsset {
                    name: asset.name,
                    url: asset.url.to_string(),
                })
                .collect(),
        })
    }

    async fn get_tag_sha(&self, repo: &RepoId, tag: &str) -> Result<String> {
        let git_ref = self
            .repos(repo)
            .get_ref(&Reference::Tag(encode_path(tag)))
            .await
            .map_err(|e| api_error("get tag", &e))?;
        match git_ref.object {
            Object::Commit { sha, .. } | Object::Tag { sha, .. } => Ok(sha),
            _ => Err(Error::api("get tag", None, format!("unexpected object for tag {tag}"))),
        }
    }

    async fn create_pull_request(&self, repo: &RepoId, pr: &NewPullRequest) -> Result<String> {
        let created = self
            .octocrab
            .pulls(&repo.owner, &repo.repo)
            .create(&pr.title, &pr.head, &pr.base)
            .body(pr.body.clone())
            .send()
            .await
            .map_err(|e| api_error("create pull request", &e))?;
        created
            .html_url
            .map(|url| url.to_string())
            .ok_or_else(|| Error::api("create pull request", None, "response has no URL"))
    }

    fn archive_link(&self, repo: &RepoId, format: ArchiveFormat, git_ref: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}/{git_ref}",
            self.api_url,
            repo.owner,
            repo.repo,
            format.endpoint()
        )
    }

    async fn resolve_redirect(&self, url: &str, accept: Option<&str>) -> Result<RedirectResponse> {
        let mut request = self.http.head(url);
        if !self.token.expose_secret().is_empty() {
            request = request.header(
                AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            );
        }
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let response = request.send().await.map_err(|e| Error::http(e.to_string()))?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        Ok(RedirectResponse {
            status: response.status().as_u16(),
            location,
        })
    }
}
