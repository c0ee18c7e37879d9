//! Per-account mail forwarding lookup.
//!
//! ## Comment convention
//!
//! A line is a comment when the *first* `#` on it sits exactly at byte
//! offset `comment_column`. With the default column of 1, `x# note` is a
//! comment while `#note` and `ab#c` are not. Empty lines are skipped too.
//! Of the remaining lines, the last one read is the forwarding target.
//!
//! Column 1 matches historical deployments of this service. Setting it to
//! 0 gives the conventional "starts with `#`" rule.
//!
//! The forward file lives in a user-writable directory, so only regular
//! files are read, and no line may exceed [`MAX_LINE_LEN`] bytes.

use super::passwd::{read_line, MAX_LINE_LEN};
use std::fs::OpenOptions;
use std::io::{self, BufReader};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default forward file name inside a home directory.
pub const DEFAULT_FILE_NAME: &str = ".forward";

/// Default byte offset of the comment marker.
pub const DEFAULT_COMMENT_COLUMN: usize = 1;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot open '{}': {}", .path.display(), .source)]
    CannotOpen { path: PathBuf, source: io::Error },
    #[error("'{}' is not a regular file", .path.display())]
    NotRegular { path: PathBuf },
    #[error("failed reading '{}': {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
}

/// Reads `<home>/<file_name>` for a forwarding address.
#[derive(Debug, Clone)]
pub struct ForwardResolver {
    file_name: String,
    comment_column: usize,
}

impl Default for ForwardResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_NAME, DEFAULT_COMMENT_COLUMN)
    }
}

impl ForwardResolver {
    pub fn new(file_name: impl Into<String>, comment_column: usize) -> Self {
        Self {
            file_name: file_name.into(),
            comment_column,
        }
    }

    /// Resolve the forwarding target configured under `home_directory`.
    ///
    /// Returns an empty string when the file holds no usable line. Callers
    /// treat every error here as "no forwarding".
    pub fn resolve_forward(&self, home_directory: &Path) -> Result<String, ForwardError> {
        let path = home_directory.join(&self.file_name);
        // O_NONBLOCK keeps a FIFO planted here from stalling the open.
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| ForwardError::CannotOpen {
                path: path.clone(),
                source,
            })?;

        let is_file = file
            .metadata()
            .map_err(|source| ForwardError::Read {
                path: path.clone(),
                source,
            })?
            .is_file();
        if !is_file {
            return Err(ForwardError::NotRegular { path });
        }

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut target = String::new();
        while read_line(&mut reader, &mut buf, MAX_LINE_LEN).map_err(|source| {
            ForwardError::Read {
                path: path.clone(),
                source,
            }
        })? {
            let line = String::from_utf8_lossy(&buf);
            if line.is_empty() || self.is_comment(&line) {
                continue;
            }
            target = line.into_owned();
        }

        Ok(target)
    }

    fn is_comment(&self, line: &str) -> bool {
        line.find('#') == Some(self.comment_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home_with_forward(contents: &str) -> tempfile::TempDir {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join(DEFAULT_FILE_NAME), contents).unwrap();
        home
    }

    #[test]
    fn test_last_line_wins() {
        let home = home_with_forward("first@example.org\nsecond@example.org\n");
        let target = ForwardResolver::default()
            .resolve_forward(home.path())
            .unwrap();
        assert_eq!(target, "second@example.org");
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        let home = home_with_forward("alice@example.org\n\n # old address\n\r\n");
        let target = ForwardResolver::default()
            .resolve_forward(home.path())
            .unwrap();
        assert_eq!(target, "alice@example.org");
    }

    #[test]
    fn test_hash_at_column_zero_is_not_comment_by_default() {
        let home = home_with_forward("alice@example.org\n#bob@example.org\n");
        let target = ForwardResolver::default()
            .resolve_forward(home.path())
            .unwrap();
        assert_eq!(target, "#bob@example.org");
    }

    #[test]
    fn test_only_first_hash_position_counts() {
        // First '#' is at offset 0, so the one at offset 1 is irrelevant.
        let home = home_with_forward("alice@example.org\n##x\n");
        let target = ForwardResolver::default()
            .resolve_forward(home.path())
            .unwrap();
        assert_eq!(target, "##x");
    }

    #[test]
    fn test_column_zero_convention() {
        let home = home_with_forward("alice@example.org\n# trailing note\n");
        let target = ForwardResolver::new(DEFAULT_FILE_NAME, 0)
            .resolve_forward(home.path())
            .unwrap();
        assert_eq!(target, "alice@example.org");
    }

    #[test]
    fn test_empty_file() {
        let home = home_with_forward("");
        let target = ForwardResolver::default()
            .resolve_forward(home.path())
            .unwrap();
        assert_eq!(target, "");
    }

    #[test]
    fn test_missing_file() {
        let home = tempfile::tempdir().unwrap();
        assert!(matches!(
            ForwardResolver::default().resolve_forward(home.path()),
            Err(ForwardError::CannotOpen { .. })
        ));
    }

    #[test]
    fn test_fifo_is_not_read() {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;
        use std::sync::mpsc;
        use std::time::Duration;

        let home = tempfile::tempdir().unwrap();
        let fifo = home.path().join(DEFAULT_FILE_NAME);
        let c_path = CString::new(fifo.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);

        // No writer ever opens the FIFO; a blocking open would hang here.
        let (tx, rx) = mpsc::channel();
        let dir = home.path().to_path_buf();
        std::thread::spawn(move || {
            let _ = tx.send(ForwardResolver::default().resolve_forward(&dir));
        });

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(ForwardError::NotRegular { .. })));
    }

    #[test]
    fn test_directory_is_not_read() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(DEFAULT_FILE_NAME)).unwrap();
        assert!(matches!(
            ForwardResolver::default().resolve_forward(home.path()),
            Err(ForwardError::NotRegular { .. })
        ));
    }

    #[test]
    fn test_oversized_line_fails() {
        let mut contents = String::from("alice@example.org\n");
        contents.push_str(&"x".repeat(MAX_LINE_LEN + 1));
        let home = home_with_forward(&contents);
        assert!(matches!(
            ForwardResolver::default().resolve_forward(home.path()),
            Err(ForwardError::Read { .. })
        ));
    }

    #[test]
    fn test_custom_file_name() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join(".mailfwd"), "carol@example.org\n").unwrap();
        let target = ForwardResolver::new(".mailfwd", DEFAULT_COMMENT_COLUMN)
            .resolve_forward(home.path())
            .unwrap();
        assert_eq!(target, "carol@example.org");
    }
}
