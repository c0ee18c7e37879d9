//! Login shell lookup in the credential registry.

use super::passwd::{self, ScanError};
use std::io;
use std::ops::ControlFlow;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot open registry '{}': {}", .path.display(), .source)]
    CannotOpen { path: PathBuf, source: io::Error },
    #[error("failed reading registry '{}': {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
}

/// Scans a passwd-format registry for an account's shell.
#[derive(Debug, Clone)]
pub struct ShellResolver {
    registry: PathBuf,
}

impl ShellResolver {
    pub fn new(registry: impl Into<PathBuf>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    /// Return the seventh field of the record named `identifier`.
    ///
    /// The whole file is scanned and the last matching record wins. An
    /// account with no record yields an empty shell, not an error.
    pub fn resolve_shell(&self, identifier: &str) -> Result<String, RegistryError> {
        let mut shell = String::new();

        passwd::scan(&self.registry, |entry| {
            if entry.name == identifier {
                shell.clear();
                shell.push_str(entry.shell);
            }
            ControlFlow::Continue(())
        })
        .map_err(|e| match e {
            ScanError::Open(source) => RegistryError::CannotOpen {
                path: self.registry.clone(),
                source,
            },
            ScanError::Read(source) => RegistryError::Read {
                path: self.registry.clone(),
                source,
            },
        })?;

        Ok(shell)
    }
}
