//! Turning a release into a formula edit.

use crate::api::RepoHost;
use crate::checksum::{ChecksumAlgorithm, ChecksumResolver};
use crate::publish::EditRequest;
use brewbump_core::template;
use brewbump_core::{BumpConfig, Replacements, Result, remove_revision_line, replace_fields};
use std::collections::HashMap;
use tracing::{debug, info};

/// Everything needed to publish a formula bump.
#[derive(Debug, Clone)]
pub struct PreparedEdit {
    /// The edit to publish
    pub request: EditRequest,
    /// Field values to write, in order
    pub replacements: Replacements,
    /// Release tag
    pub tag_name: String,
    /// Version derived from the tag
    pub version: String,
    /// Formula name
    pub formula_name: String,
}

impl PreparedEdit {
    /// Rewrite formula text with the new field values.
    ///
    /// A `revision` line is dropped since the formula now points at a new
    /// release.
    ///
    /// # Errors
    ///
    /// Returns [`brewbump_core::Error::Upgrade`] when the formula already
    /// records a newer release.
    pub fn rewrite(&self, old_content: &str) -> Result<String> {
        let replaced = replace_fields(old_content, &self.replacements)?;
        Ok(remove_revision_line(&replaced))
    }
}

fn tarball_for_release(config: &BumpConfig, tag: &str) -> String {
    format!(
        "https://github.com/{}/{}/archive/{tag}.tar.gz",
        config.source_repo.owner, config.source_repo.repo
    )
}

/// Build the edit for the release described by `config`.
///
/// `source` is used for lookups in the source repository: resolving the
/// tag's commit and checksumming the download.
///
/// # Errors
///
/// Returns a configuration error when no tag can be determined, and any
/// error from looking up the tag or computing the checksum.
pub async fn prepare_edit(config: &BumpConfig, source: &dyn RepoHost) -> Result<PreparedEdit> {
    let tag_name = config.tag_name()?;
    let version = config.version_for(&tag_name);
    let formula_name = config.formula_name();
    let download_url = config
        .download_url
        .clone()
        .unwrap_or_else(|| tarball_for_release(config, &tag_name));

    debug!(tag = %tag_name, version = %version, url = %download_url, "Preparing formula update");

    let mut replacements = Replacements::new();
    replacements.insert("version".to_string(), version.clone());
    replacements.insert("url".to_string(), download_url.clone());

    if download_url.ends_with(".git") {
        let revision = if config.git_ref == format!("refs/tags/{tag_name}") {
            config.git_sha.clone()
        } else {
            source.get_tag_sha(&config.source_repo, &tag_name).await?
        };
        replacements.insert("tag".to_string(), tag_name.clone());
        replacements.insert("revision".to_string(), revision);
    } else {
        let sha256 = match &config.download_sha256 {
            Some(sha256) => sha256.clone(),
            None => {
                let sha256 = ChecksumResolver::new(source)?
                    .checksum(&download_url, ChecksumAlgorithm::Sha256)
                    .await?;
                info!(sha256 = %sha256, "Computed download checksum");
                sha256
            }
        };
        replacements.insert("sha256".to_string(), sha256);
    }

    let values = HashMap::from([
        ("formulaName", formula_name.clone()),
        ("version", version.clone()),
    ]);
    let message = template::render(&config.commit_message, &values);

    let mut request = EditRequest::new(config.tap.clone(), config.formula_path())
        .with_commit_message(message)
        .with_force_branch(config.create_branch);
    request.branch = config.base_branch.clone();
    request.push_to = config.push_to.clone();
    request.make_pr = config.create_pullrequest;

    Ok(PreparedEdit {
        request,
        replacements,
        tag_name,
        version,
        formula_name,
    })
}
