//! Dockpatrol - GitOps reconciliation agent for docker-compose stacks
//!
//! Dockpatrol keeps a host's running containers aligned with the compose
//! manifests stored in a Git repository: it mirrors the repository, starts the
//! declared stacks, stops undeclared containers (unless exempted by label) and
//! prunes unused images, once or forever at a fixed interval.

pub mod config;
pub mod enforcer;
pub mod engine;
pub mod error;
pub mod expect;
pub mod launcher;
pub mod mirror;
pub mod patrol;
pub mod process;
pub mod scanner;
pub mod secrets;

// Re-exports for convenience
pub use config::Settings;
pub use enforcer::{enforce, is_exempt, EnforceOutcome, EXEMPTION_LABEL};
pub use engine::{ContainerEngine, ContainerSummary, DockerCli};
pub use error::{PatrolError, PatrolResult};
pub use expect::expected_containers;
pub use launcher::launch_stacks;
pub use mirror::GitMirror;
pub use patrol::{CycleReport, Patrol};
pub use process::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use scanner::discover_manifests;
pub use secrets::{SecretDecryptor, SopsDecryptor};
