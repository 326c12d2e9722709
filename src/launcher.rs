//! Stack launcher
//!
//! Brings every discovered stack up via the engine's convergent start. Each
//! manifest is handled independently and best-effort: a decryption or compose
//! failure is logged and the remaining stacks still launch.

use std::path::Path;

use tracing::{debug, error, info};

use crate::engine::ContainerEngine;
use crate::secrets::SecretDecryptor;

/// Encrypted env file expected next to a manifest
const ENV_ENC_FILE: &str = ".env.enc";
/// Plaintext env file handed to compose
const ENV_FILE: &str = ".env";

/// Launch every stack in `manifests`, decrypting env files where present.
///
/// Returns the number of manifests whose launch recorded a failure.
pub fn launch_stacks(
    manifests: &[std::path::PathBuf],
    decryptor: &dyn SecretDecryptor,
    engine: &dyn ContainerEngine,
) -> usize {
    let mut failures = 0;

    for manifest in manifests {
        let Some(dir) = manifest.parent() else {
            error!(manifest = %manifest.display(), "manifest has no parent directory");
            failures += 1;
            continue;
        };

        if !launch_one(dir, manifest, decryptor, engine) {
            failures += 1;
        }
    }

    failures
}

fn launch_one(
    dir: &Path,
    manifest: &Path,
    decryptor: &dyn SecretDecryptor,
    engine: &dyn ContainerEngine,
) -> bool {
    let encrypted = dir.join(ENV_ENC_FILE);
    let plaintext = dir.join(ENV_FILE);

    if encrypted.exists() {
        // Decryption failure is not fatal: compose still runs, and it picks
        // up whatever plaintext .env already exists on disk.
        if let Err(e) = decryptor.decrypt(&encrypted, &plaintext) {
            error!(error = %e, manifest = %manifest.display(), "env decryption failed");
        }
    }

    let env_file = plaintext.exists().then_some(plaintext.as_path());
    debug!(manifest = %manifest.display(), env_file = env_file.is_some(), "starting stack");

    match engine.compose_up(dir, env_file) {
        Ok(()) => {
            info!(manifest = %manifest.display(), "stack is up");
            true
        }
        Err(e) => {
            error!(error = %e, manifest = %manifest.display(), "compose up failed");
            false
        }
    }
}
