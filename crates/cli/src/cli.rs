//! Command line and action input parsing.
//!
//! Every flag can also be supplied through the environment variable GitHub
//! Actions sets for the matching action input. Actions passes unset inputs
//! as empty strings, so blank values are treated as absent.

use brewbump_core::config::DEFAULT_COMMIT_MESSAGE;
use brewbump_core::{BumpConfig, Error, RepoId, Result, TagPrefix};
use clap::Parser;
use regex::Regex;
use secrecy::SecretString;

use crate::tracing::{LogLevel, TracingConfig, TracingFormat};

#[derive(Parser, Debug)]
#[command(name = "brewbump")]
#[command(about = "Bump a Homebrew formula to the release that triggered the run")]
#[command(version)]
pub struct Cli {
    /// Tap repository holding the formula, as owner/repo
    #[arg(long, env = "INPUT_HOMEBREW-TAP")]
    pub homebrew_tap: Option<String>,

    /// Formula name (defaults to the source repository name, lowercased)
    #[arg(long, env = "INPUT_FORMULA-NAME")]
    pub formula_name: Option<String>,

    /// Path of the formula file inside the tap
    #[arg(long, env = "INPUT_FORMULA-PATH")]
    pub formula_path: Option<String>,

    /// Branch to update (defaults to the tap's default branch)
    #[arg(long, env = "INPUT_BASE-BRANCH")]
    pub base_branch: Option<String>,

    /// Repository to push the change to, as owner/repo
    #[arg(long, env = "INPUT_PUSH-TO")]
    pub push_to: Option<String>,

    /// Release download URL
    #[arg(long, env = "INPUT_DOWNLOAD-URL")]
    pub download_url: Option<String>,

    /// SHA-256 of the download, skipping the checksum computation
    #[arg(long, env = "INPUT_DOWNLOAD-SHA256")]
    pub download_sha256: Option<String>,

    /// Release tag (defaults to the tag in --ref)
    #[arg(long, env = "INPUT_TAG-NAME")]
    pub tag_name: Option<String>,

    /// Pattern stripped from the start of the tag to get the version
    #[arg(long, env = "INPUT_TAG-PREFIX")]
    pub tag_prefix: Option<String>,

    /// Regex whose first capture group extracts the version from the tag
    #[arg(long, env = "INPUT_VERSION-PATTERN")]
    pub version_pattern: Option<String>,

    /// Open a pull request: true, false, or empty to decide automatically
    #[arg(long, env = "INPUT_CREATE-PULLREQUEST")]
    pub create_pullrequest: Option<String>,

    /// Always commit to a new branch: true or false
    #[arg(long, env = "INPUT_CREATE-BRANCH")]
    pub create_branch: Option<String>,

    /// Commit message template; {{formulaName}} and {{version}} are replaced
    #[arg(long, env = "INPUT_COMMIT-MESSAGE")]
    pub commit_message: Option<String>,

    /// Source repository, as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Ref that triggered the run
    #[arg(long = "ref", env = "GITHUB_REF")]
    pub git_ref: Option<String>,

    /// Commit that triggered the run
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// Log level
    #[arg(short = 'L', long, env = "BREWBUMP_LOG", default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "BREWBUMP_LOG_FORMAT", default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn required(value: Option<&str>, name: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| {
        Error::config(
            format!("missing required input '{name}'"),
            format!("Pass --{name} or set the matching environment variable"),
        )
    })
}

/// Parse an action boolean input. Blank means unset.
fn parse_bool_input(value: Option<&str>, name: &str) -> Result<Option<bool>> {
    match non_blank(value).as_deref() {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(Error::config(
            format!("invalid value '{other}' for '{name}'"),
            "Expected 'true' or 'false'",
        )),
    }
}

impl Cli {
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.log_level.into(),
            filter: None,
        }
    }

    /// Build the bump configuration from the parsed inputs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing tap or source repository,
    /// a malformed `owner/repo`, an invalid pattern, or a boolean input that
    /// is neither `true` nor `false`.
    pub fn to_config(&self) -> Result<BumpConfig> {
        let tap: RepoId = required(self.homebrew_tap.as_deref(), "homebrew-tap")?.parse()?;
        let source: RepoId = required(self.repository.as_deref(), "repository")?.parse()?;
        let git_ref = non_blank(self.git_ref.as_deref()).unwrap_or_default();

        let mut config = BumpConfig::new(source, git_ref, tap)
            .with_sha(non_blank(self.sha.as_deref()).unwrap_or_default());

        config.formula_name = non_blank(self.formula_name.as_deref());
        config.formula_path = non_blank(self.formula_path.as_deref());
        config.base_branch = non_blank(self.base_branch.as_deref());
        config.push_to = non_blank(self.push_to.as_deref())
            .map(|repo| repo.parse())
            .transpose()?;
        config.download_url = non_blank(self.download_url.as_deref());
        config.download_sha256 = non_blank(self.download_sha256.as_deref());
        config.tag_name = non_blank(self.tag_name.as_deref());

        if let Some(prefix) = non_blank(self.tag_prefix.as_deref()) {
            config.tag_prefix = TagPrefix::new(&prefix)?;
        }
        config.version_pattern = non_blank(self.version_pattern.as_deref())
            .map(|pattern| {
                Regex::new(&pattern).map_err(|e| {
                    Error::config(
                        format!("invalid version pattern '{pattern}': {e}"),
                        "The first capture group of the pattern is used as the version",
                    )
                })
            })
            .transpose()?;

        config.create_pullrequest =
            parse_bool_input(self.create_pullrequest.as_deref(), "create-pullrequest")?;
        config.create_branch =
            parse_bool_input(self.create_branch.as_deref(), "create-branch")?.unwrap_or(false);
        config.commit_message = non_blank(self.commit_message.as_deref())
            .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string());

        Ok(config)
    }
}

/// Tokens for the two repositories a run talks to.
///
/// The source repository is read with `GITHUB_TOKEN`, falling back to
/// `COMMITTER_TOKEN`. The tap is always written with `COMMITTER_TOKEN`.
/// A missing token means anonymous access.
pub struct Credentials {
    pub source: SecretString,
    pub target: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn from_env() -> Self {
        let committer = env_token("COMMITTER_TOKEN");
        let source = env_token("GITHUB_TOKEN")
            .or_else(|| committer.clone())
            .unwrap_or_default();
        Self {
            source: SecretString::from(source),
            target: SecretString::from(committer.unwrap_or_default()),
        }
    }
}

fn env_token(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| non_blank(Some(&v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const INPUT_VARS: &[&str] = &[
        "INPUT_HOMEBREW-TAP",
        "INPUT_FORMULA-NAME",
        "INPUT_FORMULA-PATH",
        "INPUT_BASE-BRANCH",
        "INPUT_PUSH-TO",
        "INPUT_DOWNLOAD-URL",
        "INPUT_DOWNLOAD-SHA256",
        "INPUT_TAG-NAME",
        "INPUT_TAG-PREFIX",
        "INPUT_VERSION-PATTERN",
        "INPUT_CREATE-PULLREQUEST",
        "INPUT_CREATE-BRANCH",
        "INPUT_COMMIT-MESSAGE",
        "GITHUB_REPOSITORY",
        "GITHUB_REF",
        "GITHUB_SHA",
        "GITHUB_TOKEN",
        "COMMITTER_TOKEN",
        "BREWBUMP_LOG",
        "BREWBUMP_LOG_FORMAT",
    ];

    /// Run `f` with every input variable cleared except `vars`.
    fn with_inputs<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let mut env: Vec<(String, Option<String>)> = INPUT_VARS
            .iter()
            .map(|name| ((*name).to_string(), None))
            .collect();
        for (name, value) in vars {
            env.retain(|(n, _)| n != name);
            env.push(((*name).to_string(), Some((*value).to_string())));
        }
        temp_env::with_vars(env, f)
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("brewbump").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_build_config() {
        let config = with_inputs(&[], || {
            parse(&[
                "--homebrew-tap",
                "Homebrew/homebrew-core",
                "--repository",
                "cli/cli",
                "--ref",
                "refs/tags/v2.0.0",
                "--sha",
                "abc123",
                "--push-to",
                "me/homebrew-core",
                "--create-pullrequest",
                "false",
                "--create-branch",
                "true",
            ])
            .to_config()
            .unwrap()
        });

        assert_eq!(config.tap, RepoId::new("Homebrew", "homebrew-core"));
        assert_eq!(config.source_repo, RepoId::new("cli", "cli"));
        assert_eq!(config.git_ref, "refs/tags/v2.0.0");
        assert_eq!(config.git_sha, "abc123");
        assert_eq!(config.push_to, Some(RepoId::new("me", "homebrew-core")));
        assert_eq!(config.create_pullrequest, Some(false));
        assert!(config.create_branch);
        assert_eq!(config.commit_message, DEFAULT_COMMIT_MESSAGE);
        assert_eq!(config.formula_path(), "Formula/cli.rb");
    }

    #[test]
    fn test_action_environment_builds_config() {
        let config = with_inputs(
            &[
                ("INPUT_HOMEBREW-TAP", "owner/homebrew-tap"),
                ("INPUT_FORMULA-NAME", "my-tool"),
                ("INPUT_BASE-BRANCH", ""),
                ("INPUT_CREATE-PULLREQUEST", ""),
                ("INPUT_COMMIT-MESSAGE", "{{formulaName}} {{version}} (automated)"),
                ("GITHUB_REPOSITORY", "owner/tool"),
                ("GITHUB_REF", "refs/tags/v1.2.3"),
                ("GITHUB_SHA", "deadbeef"),
            ],
            || parse(&[]).to_config().unwrap(),
        );

        assert_eq!(config.tap, RepoId::new("owner", "homebrew-tap"));
        assert_eq!(config.formula_name(), "my-tool");
        assert_eq!(config.base_branch, None);
        assert_eq!(config.create_pullrequest, None);
        assert!(!config.create_branch);
        assert_eq!(config.commit_message, "{{formulaName}} {{version}} (automated)");
        assert_eq!(config.tag_name().unwrap(), "v1.2.3");
    }

    #[test]
    fn test_flag_overrides_environment() {
        let cli = with_inputs(&[("INPUT_TAG-NAME", "v1.0.0")], || {
            parse(&["--tag-name", "v2.0.0"])
        });
        assert_eq!(cli.tag_name.as_deref(), Some("v2.0.0"));
    }

    #[test]
    fn test_missing_tap_is_config_error() {
        let err = with_inputs(&[("GITHUB_REPOSITORY", "owner/tool")], || {
            parse(&[]).to_config().unwrap_err()
        });
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("homebrew-tap"));
    }

    #[test]
    fn test_malformed_repository_is_config_error() {
        let err = with_inputs(&[], || {
            parse(&["--homebrew-tap", "just-a-name", "--repository", "owner/tool"])
                .to_config()
                .unwrap_err()
        });
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_invalid_boolean_input() {
        let err = with_inputs(&[], || {
            parse(&[
                "--homebrew-tap",
                "owner/tap",
                "--repository",
                "owner/tool",
                "--create-pullrequest",
                "yes",
            ])
            .to_config()
            .unwrap_err()
        });
        assert!(err.to_string().contains("create-pullrequest"));
    }

    #[test]
    fn test_version_pattern_and_prefix() {
        let config = with_inputs(&[], || {
            parse(&[
                "--homebrew-tap",
                "owner/tap",
                "--repository",
                "owner/tool",
                "--tag-prefix",
                "release-",
            ])
            .to_config()
            .unwrap()
        });
        assert_eq!(config.version_for("release-1.4.0"), "1.4.0");

        let err = with_inputs(&[], || {
            parse(&[
                "--homebrew-tap",
                "owner/tap",
                "--repository",
                "owner/tool",
                "--version-pattern",
                "(unclosed",
            ])
            .to_config()
            .unwrap_err()
        });
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_log_level_defaults_to_warn() {
        let cli = with_inputs(&[], || parse(&[]));
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Compact);

        let cli = with_inputs(&[("BREWBUMP_LOG", "debug")], || parse(&[]));
        assert_eq!(cli.log_level, LogLevel::Debug);

        let cli = with_inputs(&[], || parse(&["-L", "info", "--log-format", "json"]));
        assert_eq!(cli.tracing_config().level, crate::tracing::Level::INFO);
        assert_eq!(cli.tracing_config().format, TracingFormat::Json);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let result = with_inputs(&[], || {
            Cli::try_parse_from(["brewbump", "--log-level", "loud"])
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_source_token_falls_back_to_committer() {
        let credentials = with_inputs(&[("COMMITTER_TOKEN", "committer")], Credentials::from_env);
        assert_eq!(credentials.source.expose_secret(), "committer");
        assert_eq!(credentials.target.expose_secret(), "committer");

        let credentials = with_inputs(
            &[("GITHUB_TOKEN", "actions"), ("COMMITTER_TOKEN", "committer")],
            Credentials::from_env,
        );
        assert_eq!(credentials.source.expose_secret(), "actions");
        assert_eq!(credentials.target.expose_secret(), "committer");
    }

    #[test]
    fn test_missing_tokens_are_anonymous() {
        let credentials = with_inputs(&[], Credentials::from_env);
        assert!(credentials.source.expose_secret().is_empty());
        assert!(credentials.target.expose_secret().is_empty());
    }
}
