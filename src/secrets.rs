//! Secret decryption
//!
//! Encrypted env files (`.env.enc`) live next to their compose manifest and
//! are decrypted to a plaintext `.env` before launch. The external tool is
//! sops with an age key; decrypted output is captured from stdout and written
//! by this process rather than through shell redirection.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PatrolError, PatrolResult};
use crate::process::{CommandRunner, Invocation};

/// Abstract secret-decryption seam, mockable in tests
pub trait SecretDecryptor {
    /// Decrypt `encrypted` (dotenv format) and write the plaintext to `output`.
    fn decrypt(&self, encrypted: &Path, output: &Path) -> PatrolResult<()>;
}

/// sops-backed decryptor using an age key file
pub struct SopsDecryptor<'a> {
    key_file: PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> SopsDecryptor<'a> {
    pub fn new(key_file: impl Into<PathBuf>, runner: &'a dyn CommandRunner) -> Self {
        Self {
            key_file: key_file.into(),
            runner,
        }
    }
}

impl SecretDecryptor for SopsDecryptor<'_> {
    fn decrypt(&self, encrypted: &Path, output: &Path) -> PatrolResult<()> {
        info!(file = %encrypted.display(), "decrypting env file");

        let encrypted_arg = encrypted.to_string_lossy().into_owned();
        let key_arg = self.key_file.to_string_lossy().into_owned();
        let inv = Invocation::new(
            "sops",
            &[
                "--decrypt",
                "--input-type",
                "dotenv",
                "--output-type",
                "dotenv",
                "--age",
                key_arg.as_str(),
                encrypted_arg.as_str(),
            ],
        );

        let out = self.runner.run(&inv)?;
        if !out.success {
            return Err(PatrolError::Decryption {
                file: encrypted.to_path_buf(),
                detail: out.detail(),
            });
        }

        fs::write(output, out.stdout.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockRunner;
    use tempfile::tempdir;

    #[test]
    fn test_decrypt_writes_captured_plaintext() {
        let dir = tempdir().unwrap();
        let encrypted = dir.path().join(".env.enc");
        let output = dir.path().join(".env");
        fs::write(&encrypted, "ciphertext").unwrap();

        let runner = MockRunner::new();
        runner.respond("sops", "SECRET=hunter2\n");

        let decryptor = SopsDecryptor::new("/app/key.txt", &runner);
        decryptor.decrypt(&encrypted, &output).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "SECRET=hunter2\n");

        let calls = runner.recorded();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].args.contains(&"--age".to_string()));
        assert!(calls[0].args.contains(&"/app/key.txt".to_string()));
    }

    #[test]
    fn test_decrypt_failure_leaves_no_output() {
        let dir = tempdir().unwrap();
        let encrypted = dir.path().join(".env.enc");
        let output = dir.path().join(".env");
        fs::write(&encrypted, "ciphertext").unwrap();

        let runner = MockRunner::new();
        runner.fail("sops", "no matching key");

        let decryptor = SopsDecryptor::new("/app/key.txt", &runner);
        let err = decryptor.decrypt(&encrypted, &output).unwrap_err();

        assert!(matches!(err, PatrolError::Decryption { .. }));
        assert!(!output.exists());
    }
}
