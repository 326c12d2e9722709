//! Configuration for dockpatrol
//!
//! All functional configuration is environment-driven; there are no config
//! files and no CLI flags beyond verbosity. Settings are read once at startup
//! into an explicit struct and passed by reference into each component.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PatrolError, PatrolResult};

/// Default age key file used by the secret decryption tool
const DEFAULT_AGE_KEY_FILE: &str = "/app/key.txt";

/// Runtime settings derived from the process environment
#[derive(Clone)]
pub struct Settings {
    /// Auth token embedded in the clone/fetch URL
    pub github_token: String,
    /// Repository owner (user or organization)
    pub github_owner: String,
    /// Repository name
    pub github_repo: String,
    /// Branch tracked by the local mirror
    pub branch: String,
    /// Subtree of the mirror scanned for compose manifests
    pub stacks_dir: PathBuf,
    /// Filesystem location of the working copy
    pub local_repo_path: PathBuf,
    /// Sleep period between cycles; zero means run once and exit
    pub interval: Duration,
    /// Key file handed to the secret decryption tool
    pub age_key_file: PathBuf,
    /// Full remote URL override (used by tests to track a local repository)
    pub remote_override: Option<String>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> PatrolResult<Self> {
        let remote_override = optional_var("GITHUB_REMOTE_URL");

        // Owner/repo/token only matter when the remote URL is computed.
        let (github_token, github_owner, github_repo) = if remote_override.is_some() {
            (
                optional_var("GITHUB_TOKEN").unwrap_or_default(),
                optional_var("GITHUB_OWNER").unwrap_or_default(),
                optional_var("GITHUB_REPO").unwrap_or_default(),
            )
        } else {
            (
                required_var("GITHUB_TOKEN")?,
                required_var("GITHUB_OWNER")?,
                required_var("GITHUB_REPO")?,
            )
        };

        let branch = required_var("GITHUB_BRANCH")?;
        let stacks_dir = PathBuf::from(required_var("GITHUB_STACKS_DIR")?);
        let local_repo_path = PathBuf::from(required_var("LOCAL_REPO_PATH")?);

        let interval_raw = required_var("INTERVAL")?;
        let interval_secs: u64 =
            interval_raw
                .trim()
                .parse()
                .map_err(|_| PatrolError::InvalidEnv {
                    key: "INTERVAL",
                    reason: format!("expected a non-negative number of seconds, got '{interval_raw}'"),
                })?;

        let age_key_file = optional_var("SOPS_AGE_KEY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AGE_KEY_FILE));

        Ok(Self {
            github_token,
            github_owner,
            github_repo,
            branch,
            stacks_dir,
            local_repo_path,
            interval: Duration::from_secs(interval_secs),
            age_key_file,
            remote_override,
        })
    }

    /// URL used for clone and fetch, with the token embedded for HTTPS auth.
    pub fn remote_url(&self) -> String {
        match &self.remote_override {
            Some(url) => url.clone(),
            None => format!(
                "https://{}@github.com/{}/{}.git",
                self.github_token, self.github_owner, self.github_repo
            ),
        }
    }

    /// Root directory scanned for compose manifests.
    pub fn stacks_root(&self) -> PathBuf {
        self.local_repo_path.join(&self.stacks_dir)
    }

    /// True when the scheduler should perform a single cycle and exit.
    pub fn run_once(&self) -> bool {
        self.interval.is_zero()
    }
}

// The token must never leak into logs, so Debug is written by hand.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("github_token", &"<redacted>")
            .field("github_owner", &self.github_owner)
            .field("github_repo", &self.github_repo)
            .field("branch", &self.branch)
            .field("stacks_dir", &self.stacks_dir)
            .field("local_repo_path", &self.local_repo_path)
            .field("interval", &self.interval)
            .field("age_key_file", &self.age_key_file)
            .field("remote_override", &self.remote_override.is_some())
            .finish()
    }
}

fn required_var(key: &'static str) -> PatrolResult<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PatrolError::MissingEnv { key }),
    }
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
