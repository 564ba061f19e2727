//! GitHub side of brewbump.
//!
//! - [`api`] - the [`RepoHost`] trait and response types
//! - [`client`] - [`GitHubHost`], the REST implementation
//! - [`download`] - recognizing archive and release asset URLs
//! - [`checksum`] - resolving and hashing downloads
//! - [`publish`] - committing the change, forking and opening pull requests
//! - [`prepare`] - building the formula edit for a release

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod api;
pub mod checksum;
pub mod client;
pub mod download;
pub mod prepare;
pub mod publish;

pub use api::{ContentResponse, RedirectResponse, RepoHost};
pub use checksum::{ChecksumAlgorithm, ChecksumResolver};
pub use client::GitHubHost;
pub use prepare::{PreparedEdit, prepare_edit};
pub use publish::{EditRequest, EditTarget, Publisher};
