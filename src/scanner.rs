//! Manifest scanner
//!
//! Discovers docker-compose manifests under the stacks subtree of the mirror.
//! The mirror is re-scanned every cycle; manifests are derived state, never
//! persisted.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

/// File names recognized as compose manifests
const MANIFEST_NAMES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// Recursively find every compose manifest under `root`.
///
/// Results are sorted for deterministic processing order. A missing root or
/// an empty tree yields an empty list, which is a valid state (nothing to
/// launch, nothing expected).
pub fn discover_manifests(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        debug!(root = %root.display(), "stacks directory does not exist, no manifests");
        return Vec::new();
    }

    let mut manifests = Vec::new();
    // Standard filters would honor .gitignore files inside the mirror; every
    // tracked file must be visible here, so they are disabled.
    let walk = WalkBuilder::new(root).standard_filters(false).build();

    for entry in walk {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry during manifest scan");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if MANIFEST_NAMES.iter().any(|m| *m == name) {
            manifests.push(entry.into_path());
        }
    }

    manifests.sort();
    debug!(count = manifests.len(), root = %root.display(), "discovered compose manifests");
    manifests
}
