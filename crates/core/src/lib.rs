//! Core building blocks for brewbump.
//!
//! This crate holds everything that does not talk to the network:
//!
//! - [`version`] - tag/URL version extraction and ordering
//! - [`fields`] - formula field rewriting with the downgrade guard
//! - [`template`] - `{{name}}` commit message templates
//! - [`retry`] - cancellable retry with backoff
//! - [`config`] - the run configuration
//!
//! # Example
//!
//! ```rust
//! use brewbump_core::fields::{Replacements, replace_fields};
//!
//! let mut replacements = Replacements::new();
//! replacements.insert("version".to_string(), "1.3.0".to_string());
//!
//! let formula = "  version \"1.2.0\"\n";
//! let updated = replace_fields(formula, &replacements).unwrap();
//! assert_eq!(updated, "  version \"1.3.0\"\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod fields;
pub mod retry;
pub mod template;
pub mod version;

pub use config::{BumpConfig, RepoId};
pub use error::{Error, Result};
pub use fields::{Replacements, remove_revision_line, replace_fields};
pub use version::{TagPrefix, Version};
