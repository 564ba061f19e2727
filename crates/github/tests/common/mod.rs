//! In-memory `RepoHost` that records every call.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use brewbump_core::{Error, RepoId, Result};
use brewbump_github::api::{
    ArchiveFormat, Branch, BranchCommit, ContentResponse, FileUpdate, NewPullRequest, Permissions,
    RedirectResponse, Release, RepoHost, Repository,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetRepository(String),
    GetBranch(String, String),
    CreateFork(String),
    AuthenticatedLogin,
    CreateRef {
        repo: String,
        git_ref: String,
        sha: String,
    },
    MergeUpstream {
        repo: String,
        branch: String,
    },
    GetContent {
        repo: String,
        path: String,
        git_ref: String,
    },
    UpdateFile {
        repo: String,
        path: String,
        message: String,
        content: String,
        sha: String,
        branch: String,
    },
    GetRelease {
        repo: String,
        tag: String,
    },
    GetTagSha {
        repo: String,
        tag: String,
    },
    CreatePullRequest {
        repo: String,
        pr: NewPullRequest,
    },
    ResolveRedirect {
        url: String,
        accept: Option<String>,
    },
}

pub struct FakeHost {
    pub permissions: Option<Permissions>,
    pub default_branch: String,
    pub protected: bool,
    pub branch_sha: String,
    pub login: String,
    pub file: Option<String>,
    pub merge_upstream_status: Option<u16>,
    pub create_ref_failures: Mutex<u32>,
    pub releases: HashMap<String, Release>,
    pub redirects: HashMap<String, RedirectResponse>,
    pub tag_shas: HashMap<String, String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeHost {
    /// A repository the actor can push to, with `old content` at every path.
    pub fn new() -> Self {
        Self {
            permissions: Some(Permissions { push: true }),
            default_branch: "main".to_string(),
            protected: false,
            branch_sha: "COMMITSHA".to_string(),
            login: "FORKOWNER".to_string(),
            file: Some("old content".to_string()),
            merge_upstream_status: None,
            create_ref_failures: Mutex::new(0),
            releases: HashMap::new(),
            redirects: HashMap::new(),
            tag_shas: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_push(mut self) -> Self {
        self.permissions = Some(Permissions { push: false });
        self
    }

    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn with_file(mut self, content: impl Into<String>) -> Self {
        self.file = Some(content.into());
        self
    }

    pub fn with_directory(mut self) -> Self {
        self.file = None;
        self
    }

    pub fn with_merge_upstream_status(mut self, status: u16) -> Self {
        self.merge_upstream_status = Some(status);
        self
    }

    pub fn with_create_ref_failures(self, failures: u32) -> Self {
        *self.create_ref_failures.lock().unwrap() = failures;
        self
    }

    pub fn with_release(mut self, release: Release) -> Self {
        self.releases.insert(release.tag_name.clone(), release);
        self
    }

    pub fn with_redirect(mut self, url: impl Into<String>, status: u16, location: Option<&str>) -> Self {
        self.redirects.insert(
            url.into(),
            RedirectResponse {
                status,
                location: location.map(ToString::to_string),
            },
        );
        self
    }

    pub fn with_tag_sha(mut self, tag: impl Into<String>, sha: impl Into<String>) -> Self {
        self.tag_shas.insert(tag.into(), sha.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RepoHost for FakeHost {
    async fn get_repository(&self, repo: &RepoId) -> Result<Repository> {
        self.record(Call::GetRepository(repo.to_string()));
        Ok(Repository {
            default_branch: self.default_branch.clone(),
            permissions: self.permissions.clone(),
        })
    }

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<Branch> {
        self.record(Call::GetBranch(repo.to_string(), branch.to_string()));
        Ok(Branch {
            commit: BranchCommit {
                sha: self.branch_sha.clone(),
            },
            protected: self.protected,
        })
    }

    async fn create_fork(&self, repo: &RepoId) -> Result<()> {
        self.record(Call::CreateFork(repo.to_string()));
        Ok(())
    }

    async fn authenticated_login(&self) -> Result<String> {
        self.record(Call::AuthenticatedLogin);
        Ok(self.login.clone())
    }

    async fn create_ref(&self, repo: &RepoId, git_ref: &str, sha: &str) -> Result<()> {
        self.record(Call::CreateRef {
            repo: repo.to_string(),
            git_ref: git_ref.to_string(),
            sha: sha.to_string(),
        });
        let mut failures = self.create_ref_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(Error::api("create ref", Some(404), "Not Found"));
        }
        Ok(())
    }

    async fn merge_upstream(&self, repo: &RepoId, branch: &str) -> Result<()> {
        self.record(Call::MergeUpstream {
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        match self.merge_upstream_status {
            Some(status) => Err(Error::api("merge upstream", Some(status), "merge failed")),
            None => Ok(()),
        }
    }

    async fn get_content(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: &str,
    ) -> Result<ContentResponse> {
        self.record(Call::GetContent {
            repo: repo.to_string(),
            path: path.to_string(),
            git_ref: git_ref.to_string(),
        });
        Ok(match &self.file {
            Some(content) => {
                // GitHub wraps base64 content at 60 columns
                let encoded = STANDARD.encode(content);
                let wrapped = encoded
                    .as_bytes()
                    .chunks(60)
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect::<Vec<_>>()
                    .join("\n");
                ContentResponse::File {
                    content: wrapped,
                    sha: "BLOBSHA".to_string(),
                }
            }
            None => ContentResponse::Directory,
        })
    }

    async fn update_file(&self, repo: &RepoId, path: &str, update: &FileUpdate) -> Result<String> {
        let content = update.content.clone();
        self.record(Call::UpdateFile {
            repo: repo.to_string(),
            path: path.to_string(),
            message: update.message.clone(),
            content,
            sha: update.sha.clone(),
            branch: update.branch.clone(),
        });
        Ok(format!("https://github.com/{repo}/commit/NEWSHA"))
    }

    async fn get_release_by_tag(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        self.record(Call::GetRelease {
            repo: repo.to_string(),
            tag: tag.to_string(),
        });
        self.releases
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::api("get release", Some(404), "Not Found"))
    }

    async fn get_tag_sha(&self, repo: &RepoId, tag: &str) -> Result<String> {
        self.record(Call::GetTagSha {
            repo: repo.to_string(),
            tag: tag.to_string(),
        });
        self.tag_shas
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::api("get tag", Some(404), "Not Found"))
    }

    async fn create_pull_request(&self, repo: &RepoId, pr: &NewPullRequest) -> Result<String> {
        self.record(Call::CreatePullRequest {
            repo: repo.to_string(),
            pr: pr.clone(),
        });
        Ok(format!("https://github.com/{repo}/pull/123"))
    }

    fn archive_link(&self, repo: &RepoId, format: ArchiveFormat, git_ref: &str) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/{}/{git_ref}",
            repo.owner,
            repo.repo,
            format.endpoint()
        )
    }

    async fn resolve_redirect(&self, url: &str, accept: Option<&str>) -> Result<RedirectResponse> {
        self.record(Call::ResolveRedirect {
            url: url.to_string(),
            accept: accept.map(ToString::to_string),
        });
        self.redirects
            .get(url)
            .cloned()
            .ok_or_else(|| Error::api("resolve redirect", Some(404), format!("no redirect for {url}")))
    }
}
