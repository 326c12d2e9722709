//! Container engine interface
//!
//! Narrow seam over the docker CLI: convergent compose starts, declared
//! service listing, host container listing, stop, prune. Implemented by
//! [`DockerCli`]; tests substitute a mock.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{PatrolError, PatrolResult};
use crate::process::{CommandRunner, Invocation};

/// One container present on the host, running or stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
}

/// Operations this system needs from the container runtime
pub trait ContainerEngine {
    /// Convergent start: create missing services, update changed ones, leave
    /// the rest untouched. Safe to call every cycle.
    fn compose_up(&self, project_dir: &Path, env_file: Option<&Path>) -> PatrolResult<()>;

    /// Service names declared by the manifest in `project_dir`.
    fn compose_services(&self, project_dir: &Path) -> PatrolResult<Vec<String>>;

    /// All containers on the host, running and stopped.
    fn list_containers(&self) -> PatrolResult<Vec<ContainerSummary>>;

    /// Stop one container by id.
    fn stop_container(&self, id: &str) -> PatrolResult<()>;

    /// Reclaim unused images, networks and build cache.
    fn prune(&self) -> PatrolResult<()>;
}

/// Engine backed by the `docker` binary
pub struct DockerCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> DockerCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn checked(&self, inv: Invocation, op: &str) -> PatrolResult<String> {
        let out = self.runner.run(&inv)?;
        if !out.success {
            return Err(PatrolError::Engine {
                op: op.to_string(),
                detail: out.detail(),
            });
        }
        Ok(out.stdout)
    }
}

impl ContainerEngine for DockerCli<'_> {
    fn compose_up(&self, project_dir: &Path, env_file: Option<&Path>) -> PatrolResult<()> {
        let mut args = vec!["compose".to_string()];
        if let Some(env) = env_file {
            args.push("--env-file".to_string());
            args.push(env.to_string_lossy().into_owned());
        }
        args.push("up".to_string());
        args.push("-d".to_string());

        let inv = Invocation {
            program: "docker".to_string(),
            args,
            cwd: Some(project_dir.to_path_buf()),
        };
        self.checked(inv, "compose up")?;
        Ok(())
    }

    fn compose_services(&self, project_dir: &Path) -> PatrolResult<Vec<String>> {
        let inv = Invocation::new("docker", &["compose", "ps", "--services"]).in_dir(project_dir);
        let stdout = self.checked(inv, "compose ps")?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn list_containers(&self) -> PatrolResult<Vec<ContainerSummary>> {
        let inv = Invocation::new("docker", &["ps", "-a", "--format", "{{json .}}"]);
        let stdout = self.checked(inv, "ps")?;

        let mut containers = Vec::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            let row: PsRow = serde_json::from_str(line)?;
            containers.push(row.into());
        }
        debug!(count = containers.len(), "listed host containers");
        Ok(containers)
    }

    fn stop_container(&self, id: &str) -> PatrolResult<()> {
        let inv = Invocation::new("docker", &["stop", id]);
        let out = self.runner.run(&inv)?;
        if !out.success {
            return Err(PatrolError::ContainerLookup {
                id: id.to_string(),
                detail: out.detail(),
            });
        }
        Ok(())
    }

    fn prune(&self) -> PatrolResult<()> {
        let inv = Invocation::new("docker", &["system", "prune", "-f"]);
        self.checked(inv, "system prune")?;
        Ok(())
    }
}

/// One line of `docker ps --format '{{json .}}'`
#[derive(Debug, Deserialize)]
struct PsRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

impl From<PsRow> for ContainerSummary {
    fn from(row: PsRow) -> Self {
        ContainerSummary {
            id: row.id,
            name: row.names,
            labels: parse_label_list(&row.labels),
        }
    }
}

/// Split docker's comma-separated `key=value` label string into a map.
fn parse_label_list(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (key, value) = pair.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Scripted engine for tests
///
/// Declares services per project directory, serves a fixed container list and
/// records every compose/stop/prune call. Uses `Arc<Mutex<>>` internally so it
/// can be cloned and shared.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockEngine {
    inner: std::sync::Arc<std::sync::Mutex<MockEngineState>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockEngineState {
    services: HashMap<std::path::PathBuf, Vec<String>>,
    containers: Vec<ContainerSummary>,
    failing_stops: Vec<String>,
    up_calls: Vec<(std::path::PathBuf, Option<std::path::PathBuf>)>,
    stop_calls: Vec<String>,
    prune_calls: usize,
}

#[cfg(test)]
impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_services(&self, project_dir: &Path, services: &[&str]) {
        self.inner.lock().unwrap().services.insert(
            project_dir.to_path_buf(),
            services.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn add_container(&self, id: &str, name: &str, labels: &[(&str, &str)]) {
        self.inner.lock().unwrap().containers.push(ContainerSummary {
            id: id.to_string(),
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    pub fn fail_stop_of(&self, id: &str) {
        self.inner.lock().unwrap().failing_stops.push(id.to_string());
    }

    pub fn up_calls(&self) -> Vec<(std::path::PathBuf, Option<std::path::PathBuf>)> {
        self.inner.lock().unwrap().up_calls.clone()
    }

    pub fn stop_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().stop_calls.clone()
    }

    pub fn prune_calls(&self) -> usize {
        self.inner.lock().unwrap().prune_calls
    }
}

#[cfg(test)]
impl ContainerEngine for MockEngine {
    fn compose_up(&self, project_dir: &Path, env_file: Option<&Path>) -> PatrolResult<()> {
        self.inner
            .lock()
            .unwrap()
            .up_calls
            .push((project_dir.to_path_buf(), env_file.map(Path::to_path_buf)));
        Ok(())
    }

    fn compose_services(&self, project_dir: &Path) -> PatrolResult<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .services
            .get(project_dir)
            .cloned()
            .unwrap_or_default())
    }

    fn list_containers(&self) -> PatrolResult<Vec<ContainerSummary>> {
        Ok(self.inner.lock().unwrap().containers.clone())
    }

    fn stop_container(&self, id: &str) -> PatrolResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.failing_stops.iter().any(|f| f == id) {
            return Err(PatrolError::ContainerLookup {
                id: id.to_string(),
                detail: "no such container".to_string(),
            });
        }
        state.stop_calls.push(id.to_string());
        Ok(())
    }

    fn prune(&self) -> PatrolResult<()> {
        self.inner.lock().unwrap().prune_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockRunner;
    use std::path::PathBuf;

    #[test]
    fn test_parse_label_list() {
        let labels = parse_label_list("dockpatrol_prune=false,com.example.role=db");
        assert_eq!(labels.get("dockpatrol_prune").unwrap(), "false");
        assert_eq!(labels.get("com.example.role").unwrap(), "db");
    }

    #[test]
    fn test_parse_label_list_empty_and_malformed() {
        assert!(parse_label_list("").is_empty());
        assert!(parse_label_list("novalue").is_empty());
        let labels = parse_label_list("a=1,broken,b=2");
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_list_containers_parses_json_lines() {
        let runner = MockRunner::new();
        runner.respond(
            "docker",
            concat!(
                r#"{"ID":"aaa111","Names":"web","Labels":"com.docker.compose.project=app"}"#,
                "\n",
                r#"{"ID":"bbb222","Names":"orphan","Labels":""}"#,
                "\n",
            ),
        );

        let cli = DockerCli::new(&runner);
        let containers = cli.list_containers().unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "web");
        assert_eq!(
            containers[0].labels.get("com.docker.compose.project").unwrap(),
            "app"
        );
        assert!(containers[1].labels.is_empty());
    }

    #[test]
    fn test_compose_up_without_env_file() {
        let runner = MockRunner::new();
        let cli = DockerCli::new(&runner);
        cli.compose_up(&PathBuf::from("/stacks/app"), None).unwrap();

        let calls = runner.recorded();
        assert_eq!(calls[0].args, vec!["compose", "up", "-d"]);
        assert_eq!(calls[0].cwd, Some(PathBuf::from("/stacks/app")));
    }

    #[test]
    fn test_compose_up_with_env_file() {
        let runner = MockRunner::new();
        let cli = DockerCli::new(&runner);
        cli.compose_up(
            &PathBuf::from("/stacks/app"),
            Some(&PathBuf::from("/stacks/app/.env")),
        )
        .unwrap();

        let calls = runner.recorded();
        assert_eq!(
            calls[0].args,
            vec!["compose", "--env-file", "/stacks/app/.env", "up", "-d"]
        );
    }

    #[test]
    fn test_compose_services_splits_lines() {
        let runner = MockRunner::new();
        runner.respond("docker", "web\ndb\n\n");

        let cli = DockerCli::new(&runner);
        let services = cli
            .compose_services(&PathBuf::from("/stacks/app"))
            .unwrap();
        assert_eq!(services, vec!["web", "db"]);
    }

    #[test]
    fn test_stop_failure_maps_to_container_lookup() {
        let runner = MockRunner::new();
        runner.fail("docker", "No such container: ghost");

        let cli = DockerCli::new(&runner);
        let err = cli.stop_container("ghost").unwrap_err();
        assert!(matches!(err, PatrolError::ContainerLookup { .. }));
    }
}
