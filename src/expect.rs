//! Expectation resolver
//!
//! Derives the set of container names that should exist on the host: the
//! union, across all manifests, of the service names each compose project
//! declares. The set is recomputed every cycle and never persisted.
//!
//! Service names are assumed to equal runtime container names (single-instance
//! services without `container_name:` overrides); see DESIGN.md.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, error};

use crate::engine::ContainerEngine;

/// Union of declared service names across all manifests.
///
/// A per-manifest query failure contributes nothing and is logged; the
/// remaining manifests are still consulted.
pub fn expected_containers(
    manifests: &[PathBuf],
    engine: &dyn ContainerEngine,
) -> BTreeSet<String> {
    let mut expected = BTreeSet::new();

    for manifest in manifests {
        let Some(dir) = manifest.parent() else {
            continue;
        };
        match engine.compose_services(dir) {
            Ok(services) => expected.extend(services),
            Err(e) => {
                error!(error = %e, manifest = %manifest.display(), "failed to list declared services");
            }
        }
    }

    debug!(expected = ?expected, "resolved expected containers");
    expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;
    use std::path::Path;

    fn manifest(dir: &str) -> PathBuf {
        Path::new(dir).join("docker-compose.yml")
    }

    #[test]
    fn test_union_across_manifests() {
        let engine = MockEngine::new();
        engine.declare_services(Path::new("/stacks/app"), &["web", "db"]);
        engine.declare_services(Path::new("/stacks/mail"), &["smtp"]);

        let expected = expected_containers(
            &[manifest("/stacks/app"), manifest("/stacks/mail")],
            &engine,
        );
        let names: Vec<&str> = expected.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["db", "smtp", "web"]);
    }

    #[test]
    fn test_order_independent() {
        let engine = MockEngine::new();
        engine.declare_services(Path::new("/stacks/a"), &["a"]);
        engine.declare_services(Path::new("/stacks/b"), &["b", "c"]);

        let forward = expected_containers(&[manifest("/stacks/a"), manifest("/stacks/b")], &engine);
        let reverse = expected_containers(&[manifest("/stacks/b"), manifest("/stacks/a")], &engine);
        assert_eq!(forward, reverse);
        assert_eq!(forward.len(), 3);
    }

    #[test]
    fn test_duplicate_services_collapse() {
        let engine = MockEngine::new();
        engine.declare_services(Path::new("/stacks/a"), &["shared", "a"]);
        engine.declare_services(Path::new("/stacks/b"), &["shared", "b"]);

        let expected = expected_containers(&[manifest("/stacks/a"), manifest("/stacks/b")], &engine);
        assert_eq!(expected.len(), 3);
    }

    #[test]
    fn test_no_manifests_is_empty() {
        let engine = MockEngine::new();
        assert!(expected_containers(&[], &engine).is_empty());
    }

    #[test]
    fn test_unknown_project_contributes_nothing() {
        let engine = MockEngine::new();
        engine.declare_services(Path::new("/stacks/known"), &["web"]);

        let expected = expected_containers(
            &[manifest("/stacks/known"), manifest("/stacks/unknown")],
            &engine,
        );
        assert_eq!(expected.len(), 1);
    }
}
