//! Committing a file change, directly or through a fork and pull request.
//!
//! [`Publisher::edit`] decides where the change goes based on the actor's
//! permissions and the branch protection of the target:
//!
//! - push access and an unprotected branch: commit straight to the branch
//! - protected branch, or a pull request was requested: commit to a new
//!   branch and open a pull request
//! - no push access: fork, sync the fork, commit to a new branch in the fork
//!   and open a pull request from it

use crate::api::{ContentResponse, FileUpdate, NewPullRequest, RepoHost};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use brewbump_core::retry::{RetryPolicy, retry};
use brewbump_core::{Error, RepoId, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Rewrites old file content into new file content.
pub type Rewrite<'a> = dyn Fn(&str) -> Result<String> + Send + Sync + 'a;

/// What to edit and how to publish it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Repository that owns the file
    pub repo: RepoId,
    /// Path of the file inside the repository
    pub file_path: String,
    /// Branch to change; `None` means the default branch
    pub branch: Option<String>,
    /// Push to this repository instead of `repo` or a fork of it
    pub push_to: Option<RepoId>,
    /// `Some(true)` forces a branch and pull request, `Some(false)` never opens one
    pub make_pr: Option<bool>,
    /// Always commit to a new branch
    pub force_branch: bool,
    /// Commit message; defaults to `Update <file_path>`
    pub commit_message: Option<String>,
}

impl EditRequest {
    /// Creates a request to edit `file_path` in `repo`.
    #[must_use]
    pub fn new(repo: RepoId, file_path: impl Into<String>) -> Self {
        Self {
            repo,
            file_path: file_path.into(),
            branch: None,
            push_to: None,
            make_pr: None,
            force_branch: false,
            commit_message: None,
        }
    }

    /// Sets the branch to change.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Sets the repository to push to.
    #[must_use]
    pub fn with_push_to(mut self, repo: RepoId) -> Self {
        self.push_to = Some(repo);
        self
    }

    /// Sets the pull request preference.
    #[must_use]
    pub const fn with_make_pr(mut self, make_pr: bool) -> Self {
        self.make_pr = Some(make_pr);
        self
    }

    /// Forces a new branch.
    #[must_use]
    pub const fn with_force_branch(mut self, force: bool) -> Self {
        self.force_branch = force;
        self
    }

    /// Sets the commit message.
    #[must_use]
    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    /// Commit message to use.
    #[must_use]
    pub fn commit_message(&self) -> String {
        self.commit_message
            .clone()
            .unwrap_or_else(|| format!("Update {}", self.file_path))
    }
}

/// Where a change will be committed, decided once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    /// Repository the pull request targets
    pub base_repo: RepoId,
    /// Repository the commit is pushed to
    pub head_repo: RepoId,
    /// Branch the pull request targets
    pub base_branch: String,
    /// Branch the commit is pushed to
    pub head_branch: String,
    /// Tip of the base branch
    pub base_sha: String,
    /// A fork was created for this run
    pub needs_fork: bool,
    /// The commit goes to a new branch
    pub needs_branch: bool,
    /// A pull request is opened after the commit
    pub needs_pull_request: bool,
    /// The head repository differs from the base repository
    pub in_fork: bool,
}

/// Publishes file edits through a [`RepoHost`].
pub struct Publisher<'a> {
    host: &'a dyn RepoHost,
    fork_retry: RetryPolicy,
    cancel: CancellationToken,
}

impl<'a> Publisher<'a> {
    /// Creates a publisher with the default post-fork retry policy.
    #[must_use]
    pub fn new(host: &'a dyn RepoHost) -> Self {
        Self {
            host,
            fork_retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the policy for creating the branch in a freshly created fork.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.fork_retry = policy;
        self
    }

    /// Sets the token that interrupts retry waits.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply `rewrite` to the file and publish the result.
    ///
    /// Returns the pull request URL when one was opened, otherwise the
    /// commit URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] if the path is a directory, [`Error::NoOp`]
    /// if the rewrite changed nothing, any error from `rewrite` (including
    /// [`Error::Upgrade`]) and any hosting API failure.
    pub async fn edit(&self, request: &EditRequest, rewrite: &Rewrite<'_>) -> Result<String> {
        let target = self.prepare_target(request).await?;

        let (old_content, blob_sha) = self.read_file(&target, &request.file_path).await?;
        let new_content = rewrite(&old_content)?;
        if new_content == old_content {
            return Err(Error::no_op(&request.file_path));
        }

        let message = request.commit_message();
        let update = FileUpdate {
            message: message.clone(),
            content: new_content,
            sha: blob_sha,
            branch: target.head_branch.clone(),
        };
        let commit_url = self
            .host
            .update_file(&target.head_repo, &request.file_path, &update)
            .await?;
        info!(
            repo = %target.head_repo,
            branch = %target.head_branch,
            path = %request.file_path,
            "Committed file update"
        );

        if !target.needs_pull_request {
            return Ok(commit_url);
        }

        let (title, body) = split_commit_message(&message);
        let pull_request = NewPullRequest {
            title,
            body,
            head: format!("{}:{}", target.head_repo.owner, target.head_branch),
            base: target.base_branch.clone(),
        };
        let pr_url = self
            .host
            .create_pull_request(&target.base_repo, &pull_request)
            .await?;
        info!(url = %pr_url, "Opened pull request");
        Ok(pr_url)
    }

    /// Work out where to commit, creating the fork and branch if needed.
    ///
    /// # Errors
    ///
    /// Returns any hosting API failure other than a 409 from syncing a fork.
    pub async fn prepare_target(&self, request: &EditRequest) -> Result<EditTarget> {
        let base_repo = request.repo.clone();
        let repository = self.host.get_repository(&base_repo).await?;

        let needs_fork = request.push_to.is_none() && !repository.can_push();
        let mut head_repo = request.push_to.clone().unwrap_or_else(|| base_repo.clone());
        let in_fork = needs_fork || !head_repo.same_as(&base_repo);

        let base_branch = request
            .branch
            .clone()
            .unwrap_or_else(|| repository.default_branch.clone());
        let branch = self.host.get_branch(&base_repo, &base_branch).await?;

        let needs_branch = in_fork
            || branch.protected
            || request.make_pr == Some(true)
            || request.force_branch;
        let needs_pull_request = needs_branch && request.make_pr != Some(false);

        debug!(
            base = %base_repo,
            head = %head_repo,
            branch = %base_branch,
            needs_fork,
            in_fork,
            needs_branch,
            "Resolved edit target"
        );

        if needs_fork {
            let ((), login) = tokio::try_join!(
                self.host.create_fork(&base_repo),
                self.host.authenticated_login()
            )?;
            head_repo = RepoId::new(login, base_repo.repo.clone());
            info!(fork = %head_repo, "Forked repository");
        }

        let mut head_branch = base_branch.clone();
        if needs_branch {
            head_branch = format!(
                "update-{}-{}",
                basename(&request.file_path),
                chrono::Utc::now().timestamp()
            );

            if in_fork {
                match self
                    .host
                    .merge_upstream(&head_repo, &repository.default_branch)
                    .await
                {
                    Ok(()) => {}
                    Err(e) if e.status() == Some(409) => {
                        debug!(fork = %head_repo, "Fork has diverged from upstream, not syncing");
                    }
                    Err(e) => return Err(e),
                }
            }

            let policy = if needs_fork {
                self.fork_retry.clone()
            } else {
                RetryPolicy::none()
            };
            let git_ref = format!("refs/heads/{head_branch}");
            retry(&policy, &self.cancel, || {
                self.host
                    .create_ref(&head_repo, &git_ref, &branch.commit.sha)
            })
            .await?;
            debug!(repo = %head_repo, branch = %head_branch, "Created branch");
        }

        Ok(EditTarget {
            base_repo,
            head_repo,
            base_branch,
            head_branch,
            base_sha: branch.commit.sha,
            needs_fork,
            needs_branch,
            needs_pull_request,
            in_fork,
        })
    }

    async fn read_file(&self, target: &EditTarget, path: &str) -> Result<(String, String)> {
        match self
            .host
            .get_content(&target.head_repo, path, &target.head_branch)
            .await?
        {
            ContentResponse::File { content, sha } => {
                Ok((decode_content(&content)?, sha))
            }
            ContentResponse::Directory => Err(Error::shape(path)),
        }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn decode_content(content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| Error::decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::decode(e.to_string()))
}

/// Title is the first paragraph, body is the rest.
fn split_commit_message(message: &str) -> (String, String) {
    match message.split_once("\n\n") {
        Some((title, body)) => (title.to_string(), body.to_string()),
        None => (message.to_string(), String::new()),
    }
}
