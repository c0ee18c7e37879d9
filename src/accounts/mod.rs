//! Local identity sources.
//!
//! Three independent lookups feed one reply:
//! - `identity`: display name and home directory from the account directory
//! - `shell`: login shell from the credential registry file
//! - `forward`: mail forwarding target from the account's home directory
//!
//! Every source is read-only and opened per request; nothing is cached.

pub mod forward;
pub mod identity;
pub mod passwd;
pub mod shell;

pub use forward::ForwardResolver;
pub use identity::{AccountDirectory, LookupError, PasswdFileDirectory, SystemDirectory};
pub use shell::{RegistryError, ShellResolver};

/// Everything known about one account, built for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRecord {
    pub identifier: String,
    pub display_name: String,
    pub home_directory: String,
    /// Empty when the registry has no record for the account
    pub shell: String,
    /// Empty when no forwarding is configured
    pub forward_target: String,
}
