//! Source fetcher
//!
//! Maintains a local working copy bound to one remote branch. After a
//! successful sync the tree contains exactly the tracked files of that branch
//! at its tip: untracked and ignored leftovers are removed, local edits are
//! discarded.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{PatrolError, PatrolResult};
use crate::process::{CommandRunner, Invocation};

/// Local mirror of one remote branch
pub struct GitMirror<'a> {
    remote_url: String,
    branch: String,
    local_path: PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> GitMirror<'a> {
    pub fn new(settings: &Settings, runner: &'a dyn CommandRunner) -> Self {
        Self {
            remote_url: settings.remote_url(),
            branch: settings.branch.clone(),
            local_path: settings.local_repo_path.clone(),
            runner,
        }
    }

    /// Bring the working copy to the tip of the configured branch.
    ///
    /// An existing valid working copy is fetched, hard-reset and cleaned; a
    /// missing or corrupt one is removed and cloned fresh.
    pub fn sync(&self) -> PatrolResult<()> {
        if self.is_working_copy() {
            info!(path = %self.local_path.display(), "updating repository mirror");
            self.git("fetch", &["fetch", "--all"])?;
            let target = format!("origin/{}", self.branch);
            self.git("reset", &["reset", "--hard", target.as_str()])?;
            self.git("clean", &["clean", "-xdf"])?;
        } else {
            if self.local_path.exists() {
                // Not a working copy: a corrupt or half-cloned leftover.
                debug!(path = %self.local_path.display(), "removing invalid working copy");
                fs::remove_dir_all(&self.local_path)?;
            }
            info!(
                branch = %self.branch,
                path = %self.local_path.display(),
                "cloning repository"
            );
            self.clone_fresh()?;
        }

        info!("repository mirror is up to date");
        Ok(())
    }

    fn is_working_copy(&self) -> bool {
        self.local_path.join(".git").is_dir()
    }

    fn git(&self, op: &'static str, args: &[&str]) -> PatrolResult<()> {
        let inv = Invocation::new("git", args).in_dir(&self.local_path);
        let out = self.runner.run(&inv)?;
        if !out.success {
            return Err(PatrolError::Transport {
                op,
                detail: out.detail(),
            });
        }
        Ok(())
    }

    fn clone_fresh(&self) -> PatrolResult<()> {
        let local = self.local_path.to_string_lossy().into_owned();
        let inv = Invocation::new(
            "git",
            &[
                "clone",
                "--branch",
                self.branch.as_str(),
                self.remote_url.as_str(),
                local.as_str(),
            ],
        );
        let out = self.runner.run(&inv)?;
        if !out.success {
            return Err(PatrolError::Transport {
                op: "clone",
                detail: out.detail(),
            });
        }
        Ok(())
    }
}
