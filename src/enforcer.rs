//! Drift enforcer
//!
//! Compares every container on the host against the expected set and the
//! exemption label, and stops the ones that match neither. Stop only, never
//! delete; a partial pass is corrected on the next cycle.

use std::collections::BTreeSet;

use tracing::{error, info, warn};

use crate::engine::{ContainerEngine, ContainerSummary};

/// Label consulted before stopping an undeclared container
pub const EXEMPTION_LABEL: &str = "dockpatrol_prune";

/// Label values that mark a container exempt, compared case-insensitively
const KEEP_VALUES: [&str; 4] = ["false", "off", "0", "no"];

/// Outcome of one enforcement pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnforceOutcome {
    pub kept_by_manifest: usize,
    pub kept_by_label: usize,
    pub stopped: usize,
    pub failures: usize,
}

/// True when the container's exemption label carries a recognized keep value.
pub fn is_exempt(container: &ContainerSummary) -> bool {
    container
        .labels
        .get(EXEMPTION_LABEL)
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            KEEP_VALUES.iter().any(|keep| *keep == v)
        })
        .unwrap_or(false)
}

/// Stop every host container that is neither expected nor exempt.
///
/// Per-container failures are logged and do not abort the pass; every other
/// container is still evaluated. A failure to list containers skips the whole
/// step (reported as one failure).
pub fn enforce(expected: &BTreeSet<String>, engine: &dyn ContainerEngine) -> EnforceOutcome {
    let containers = match engine.list_containers() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to list host containers, skipping enforcement");
            return EnforceOutcome {
                failures: 1,
                ..EnforceOutcome::default()
            };
        }
    };

    let mut outcome = EnforceOutcome::default();

    for container in &containers {
        if expected.contains(&container.name) {
            info!(container = %container.name, "keeping container declared by a manifest");
            outcome.kept_by_manifest += 1;
        } else if is_exempt(container) {
            info!(
                container = %container.name,
                label = EXEMPTION_LABEL,
                "keeping container due to exemption label"
            );
            outcome.kept_by_label += 1;
        } else {
            info!(container = %container.name, "stopping unexpected container");
            match engine.stop_container(&container.id) {
                Ok(()) => outcome.stopped += 1,
                Err(e) => {
                    // Container may have vanished between listing and stop.
                    warn!(error = %e, container = %container.name, "failed to stop container");
                    outcome.failures += 1;
                }
            }
        }
    }

    outcome
}
