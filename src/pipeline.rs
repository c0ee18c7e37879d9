//! Request pipeline: validate, resolve, format.
//!
//! One invocation per connection. The pipeline walks these stages:
//!
//! ```text
//! Received -> Validated -> IdentityLookedUp -> ShellLookedUp -> ForwardChecked -> Formatted
//!     \___________\_______________\________________________________________________-> Rejected
//! ```
//!
//! Validation, identity lookup, and shell lookup failures are hard and end
//! in `Rejected`. Forward lookup failures are soft: the target is left
//! empty. The stop/continue decision is made here and nowhere else.

use crate::accounts::{
    AccountDirectory, AccountRecord, ForwardResolver, LookupError, PasswdFileDirectory,
    RegistryError, ShellResolver, SystemDirectory,
};
use crate::config::{Config, IdentitySource};
use crate::protocols::finger::{response, validate, ValidationError};
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    IdentityLookedUp,
    ShellLookedUp,
    ForwardChecked,
    Formatted,
    Rejected,
}

/// Why a request produced no reply.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("invalid identifier: {0}")]
    Invalid(#[from] ValidationError),
    #[error("unknown account")]
    UnknownAccount,
    #[error("account directory unavailable: {0}")]
    DirectoryUnavailable(#[source] io::Error),
    #[error(transparent)]
    RegistryUnavailable(#[from] RegistryError),
    #[error("account no longer exists")]
    NotConfirmed,
}

impl Rejection {
    /// The last stage completed before the rejection.
    pub fn stage(&self) -> Stage {
        match self {
            Rejection::Invalid(_) => Stage::Received,
            Rejection::UnknownAccount | Rejection::DirectoryUnavailable(_) => Stage::Validated,
            Rejection::RegistryUnavailable(_) => Stage::IdentityLookedUp,
            Rejection::NotConfirmed => Stage::Formatted,
        }
    }
}

impl From<LookupError> for Rejection {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NotFound => Rejection::UnknownAccount,
            LookupError::Unavailable(e) => Rejection::DirectoryUnavailable(e),
        }
    }
}

/// Terminal state of one pipeline run.
#[derive(Debug)]
pub enum Outcome {
    /// Reply text to send.
    Formatted(String),
    /// Close without writing.
    Rejected(Rejection),
}

impl Outcome {
    pub fn stage(&self) -> Stage {
        match self {
            Outcome::Formatted(_) => Stage::Formatted,
            Outcome::Rejected(_) => Stage::Rejected,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Formatted(_) => None,
            Outcome::Rejected(rejection) => Some(rejection),
        }
    }

    /// Bytes to write back; empty on rejection.
    pub fn reply(&self) -> &[u8] {
        match self {
            Outcome::Formatted(reply) => reply.as_bytes(),
            Outcome::Rejected(_) => &[],
        }
    }
}

/// The read-only dependencies of a request, shared by all connections.
pub struct Pipeline {
    directory: Box<dyn AccountDirectory>,
    shells: ShellResolver,
    forwards: ForwardResolver,
}

impl Pipeline {
    pub fn new(
        directory: impl AccountDirectory + 'static,
        shells: ShellResolver,
        forwards: ForwardResolver,
    ) -> Self {
        Pipeline {
            directory: Box::new(directory),
            shells,
            forwards,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let shells = ShellResolver::new(&config.registry);
        let forwards = ForwardResolver::new(&config.forward_file, config.forward_comment_column);

        match config.identity_source {
            IdentitySource::System => Self::new(SystemDirectory::new(), shells, forwards),
            IdentitySource::File => Self::new(
                PasswdFileDirectory::new(&config.identity_file),
                shells,
                forwards,
            ),
        }
    }

    /// Run one request line through every stage.
    pub fn run(&self, raw: &str) -> Outcome {
        trace!(stage = ?Stage::Received, len = raw.len(), "Request received");

        match self.build_reply(raw) {
            Ok(reply) => {
                trace!(stage = ?Stage::Formatted, bytes = reply.len(), "Reply ready");
                Outcome::Formatted(reply)
            }
            Err(rejection) => {
                match &rejection {
                    Rejection::RegistryUnavailable(e) => warn!(error = %e, "Registry unavailable"),
                    Rejection::DirectoryUnavailable(e) => {
                        warn!(error = %e, "Account directory unavailable")
                    }
                    other => debug!(reason = %other, after = ?other.stage(), "Request rejected"),
                }
                Outcome::Rejected(rejection)
            }
        }
    }

    fn build_reply(&self, raw: &str) -> Result<String, Rejection> {
        let identifier = validate(raw)?;
        trace!(stage = ?Stage::Validated, %identifier);

        let identity = self.directory.lookup(identifier.as_str())?;
        trace!(stage = ?Stage::IdentityLookedUp, home = %identity.home_directory);

        let shell = self.shells.resolve_shell(identifier.as_str())?;
        trace!(stage = ?Stage::ShellLookedUp, %shell);

        let forward_target = self
            .forwards
            .resolve_forward(Path::new(&identity.home_directory))
            .unwrap_or_else(|e| {
                trace!(reason = %e, "No mail forwarding");
                String::new()
            });
        trace!(stage = ?Stage::ForwardChecked, forward = %forward_target);

        let record = AccountRecord {
            identifier: identifier.into_inner(),
            display_name: identity.display_name,
            home_directory: identity.home_directory,
            shell,
            forward_target,
        };
        let reply = response::format(&record);

        // The existence check runs after formatting, as deployed clients
        // have always seen it; the reply is withheld if it fails.
        if !self.directory.exists(&record.identifier) {
            return Err(Rejection::NotConfirmed);
        }

        Ok(reply)
    }
}
