//! Account directory lookups: display name and home directory by login.

use super::passwd::{self, ScanError};
use std::ffi::{CStr, CString};
use std::io;
use std::ops::ControlFlow;
use std::path::PathBuf;
use thiserror::Error;

/// Initial scratch size when sysconf has no opinion.
const DEFAULT_BUFFER_LEN: usize = 1024;

/// Give up growing the getpwnam_r scratch buffer past this.
const MAX_BUFFER_LEN: usize = 1024 * 1024;

/// Primary account attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Free-text GECOS field, exactly as stored
    pub display_name: String,
    pub home_directory: String,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no such account")]
    NotFound,
    #[error("account directory unavailable: {0}")]
    Unavailable(#[source] io::Error),
}

/// Read-only source of account identities, keyed by login name.
pub trait AccountDirectory: Send + Sync {
    fn lookup(&self, name: &str) -> Result<Identity, LookupError>;

    /// Whether an account with this login exists at all.
    fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }
}

/// The OS account database, consulted through NSS with `getpwnam_r`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDirectory;

impl SystemDirectory {
    pub fn new() -> Self {
        SystemDirectory
    }
}

impl AccountDirectory for SystemDirectory {
    fn lookup(&self, name: &str) -> Result<Identity, LookupError> {
        // Interior NUL can never name an account.
        let c_name = CString::new(name).map_err(|_| LookupError::NotFound)?;
        let mut buf_len = initial_buffer_len();

        loop {
            let mut buf: Vec<libc::c_char> = vec![0; buf_len];
            // SAFETY: passwd is a plain C struct; all-zero is a valid value
            // that getpwnam_r overwrites on success.
            let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();

            // SAFETY: every pointer refers to a live local, and buf.len() is
            // the real capacity of buf.
            let rc = unsafe {
                libc::getpwnam_r(
                    c_name.as_ptr(),
                    &mut pwd,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };

            match rc {
                0 if result.is_null() => return Err(LookupError::NotFound),
                0 => {
                    // SAFETY: on success the string fields point into buf,
                    // which is still alive here.
                    let (display_name, home_directory) =
                        unsafe { (lossy_c_str(pwd.pw_gecos), lossy_c_str(pwd.pw_dir)) };
                    return Ok(Identity {
                        display_name,
                        home_directory,
                    });
                }
                libc::ERANGE if buf_len < MAX_BUFFER_LEN => buf_len *= 2,
                // getpwnam_r(3) lists these as "name not found" on some libcs
                libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM => {
                    return Err(LookupError::NotFound)
                }
                errno => return Err(LookupError::Unavailable(io::Error::from_raw_os_error(errno))),
            }
        }
    }
}

fn initial_buffer_len() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    let hint = unsafe { libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX) };
    if hint > 0 {
        hint as usize
    } else {
        DEFAULT_BUFFER_LEN
    }
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the call.
unsafe fn lossy_c_str(ptr: *const libc::c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// A passwd-format file standing in for the OS database.
///
/// The first matching record wins, as with the NSS `files` backend.
#[derive(Debug, Clone)]
pub struct PasswdFileDirectory {
    path: PathBuf,
}

impl PasswdFileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AccountDirectory for PasswdFileDirectory {
    fn lookup(&self, name: &str) -> Result<Identity, LookupError> {
        let mut found = None;

        passwd::scan(&self.path, |entry| {
            if entry.name == name {
                found = Some(Identity {
                    display_name: entry.gecos.to_string(),
                    home_directory: entry.home.to_string(),
                });
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .map_err(|e| match e {
            ScanError::Open(e) | ScanError::Read(e) => LookupError::Unavailable(e),
        })?;

        found.ok_or(LookupError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "root:x:0:0:root:/root:/bin/sh").unwrap();
        writeln!(file, "alice:x:1000:1000:Alice A:/home/alice:/bin/bash").unwrap();
        writeln!(file, "alice:x:1001:1001:Shadowed:/nowhere:/bin/false").unwrap();
        file
    }

    #[test]
    fn test_file_directory_lookup() {
        let file = fixture();
        let directory = PasswdFileDirectory::new(file.path());

        let identity = directory.lookup("alice").unwrap();
        assert_eq!(identity.display_name, "Alice A");
        assert_eq!(identity.home_directory, "/home/alice");
        assert!(directory.exists("alice"));
    }

    #[test]
    fn test_file_directory_not_found() {
        let file = fixture();
        let directory = PasswdFileDirectory::new(file.path());

        assert!(matches!(directory.lookup("bob"), Err(LookupError::NotFound)));
        assert!(!directory.exists("bob"));
    }

    #[test]
    fn test_file_directory_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let directory = PasswdFileDirectory::new(dir.path().join("missing"));

        assert!(matches!(
            directory.lookup("alice"),
            Err(LookupError::Unavailable(_))
        ));
    }

    #[test]
    fn test_system_directory_root() {
        let identity = SystemDirectory::new().lookup("root").unwrap();
        assert!(!identity.home_directory.is_empty());
    }

    #[test]
    fn test_system_directory_unknown() {
        let directory = SystemDirectory::new();
        assert!(matches!(
            directory.lookup("no-such-user-fingerd"),
            Err(LookupError::NotFound)
        ));
        assert!(matches!(
            directory.lookup("nul\0byte"),
            Err(LookupError::NotFound)
        ));
    }
}
