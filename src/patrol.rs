//! Reconciliation scheduler
//!
//! Runs the cycle {fetch → launch → enforce → prune} either once or forever
//! at a fixed sleep interval. Every step is best-effort: a failure is logged,
//! recorded in the [`CycleReport`] and the cycle moves on, so the next cycle
//! can retry everything from scratch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::config::Settings;
use crate::engine::ContainerEngine;
use crate::enforcer::enforce;
use crate::error::PatrolResult;
use crate::expect::expected_containers;
use crate::launcher::launch_stacks;
use crate::mirror::GitMirror;
use crate::process::CommandRunner;
use crate::scanner::discover_manifests;
use crate::secrets::SecretDecryptor;

/// How often the interval sleep re-checks the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

/// Per-step failure record for one cycle
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetch_failed: bool,
    pub launch_failures: usize,
    pub enforce_failures: usize,
    pub prune_failed: bool,
}

impl CycleReport {
    /// True when no step of the cycle recorded a failure.
    pub fn clean(&self) -> bool {
        !self.fetch_failed
            && self.launch_failures == 0
            && self.enforce_failures == 0
            && !self.prune_failed
    }
}

/// The reconciliation agent: all collaborators wired once at startup
pub struct Patrol<'a> {
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    engine: &'a dyn ContainerEngine,
    decryptor: &'a dyn SecretDecryptor,
}

impl<'a> Patrol<'a> {
    pub fn new(
        settings: &'a Settings,
        runner: &'a dyn CommandRunner,
        engine: &'a dyn ContainerEngine,
        decryptor: &'a dyn SecretDecryptor,
    ) -> Self {
        Self {
            settings,
            runner,
            engine,
            decryptor,
        }
    }

    /// Run one full reconciliation cycle.
    pub fn run_cycle(&self) -> CycleReport {
        info!("syncing repository and reconciling running services");
        let mut report = CycleReport::default();

        // Fetch. A failed sync is non-fatal: the cycle continues against
        // whatever tree currently exists on disk.
        let mirror = GitMirror::new(self.settings, self.runner);
        report.fetch_failed = attempt("fetch", mirror.sync()).is_none();

        let manifests = discover_manifests(&self.settings.stacks_root());

        // Launch.
        report.launch_failures = launch_stacks(&manifests, self.decryptor, self.engine);

        // Enforce. The expected set is rebuilt from the manifest tree the
        // launcher just converged on.
        let expected = expected_containers(&manifests, self.engine);
        let outcome = enforce(&expected, self.engine);
        report.enforce_failures = outcome.failures;
        info!(
            kept_by_manifest = outcome.kept_by_manifest,
            kept_by_label = outcome.kept_by_label,
            stopped = outcome.stopped,
            "enforcement pass complete"
        );

        // Prune.
        report.prune_failed = attempt("prune", self.engine.prune()).is_none();

        report
    }

    /// Run once or loop at the configured interval until `running` clears.
    ///
    /// Returns the report of the last completed cycle.
    pub fn run(&self, running: &AtomicBool) -> CycleReport {
        if self.settings.run_once() {
            info!("interval is zero, running a single cycle");
            return self.run_cycle();
        }

        let mut last = CycleReport::default();
        while running.load(Ordering::SeqCst) {
            last = self.run_cycle();
            info!(
                seconds = self.settings.interval.as_secs(),
                "waiting before the next cycle"
            );
            self.pause(running);
        }

        info!("shutdown requested, stopping");
        last
    }

    // Sleep for the configured interval in short slices so a shutdown signal
    // interrupts the wait promptly.
    fn pause(&self, running: &AtomicBool) {
        let deadline = Instant::now() + self.settings.interval;
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SHUTDOWN_POLL.min(deadline - now));
        }
    }
}

/// Uniform attempt-log-continue wrapper for best-effort steps.
fn attempt<T>(step: &str, result: PatrolResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, step, "step failed, continuing");
            None
        }
    }
}
