//! passwd(5) record parsing and file scanning.
//!
//! Shared by the shell lookup and the file-backed account directory. Each
//! line is `name:password:uid:gid:gecos:home:shell`; lines with fewer than
//! seven colon-separated fields are skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;
use thiserror::Error;

/// Minimum number of fields a usable record carries.
pub const MIN_FIELDS: usize = 7;

/// Longest line accepted from any account file, excluding the newline.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// A borrowed view of one passwd record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswdEntry<'a> {
    pub name: &'a str,
    pub gecos: &'a str,
    pub home: &'a str,
    pub shell: &'a str,
}

impl<'a> PasswdEntry<'a> {
    /// Parse a single line. Returns `None` for short or malformed records.
    pub fn parse(line: &'a str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < MIN_FIELDS {
            return None;
        }

        Some(PasswdEntry {
            name: fields[0],
            gecos: fields[4],
            home: fields[5],
            shell: fields[6],
        })
    }
}

/// Failure while scanning a passwd-format file.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file could not be opened.
    #[error("cannot open: {0}")]
    Open(#[source] io::Error),
    /// The file opened but a read failed part way through.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
}

/// Read one line into `line`, without its `\n` or `\r\n` terminator.
///
/// Returns `Ok(false)` at end of input. A line longer than `max_len` bytes
/// fails with `InvalidData` once `max_len + 1` bytes have been buffered, so
/// a file with no newlines never grows the buffer without bound.
pub fn read_line<R: BufRead>(
    reader: &mut R,
    line: &mut Vec<u8>,
    max_len: usize,
) -> io::Result<bool> {
    line.clear();
    let limit = max_len as u64 + 1;
    if Read::take(&mut *reader, limit).read_until(b'\n', line)? == 0 {
        return Ok(false);
    }

    if line.last() == Some(&b'\n') {
        line.pop();
    } else if line.len() > max_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line longer than {max_len} bytes"),
        ));
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    Ok(true)
}

/// Visit every parseable record in `path`, in file order.
///
/// The file handle is dropped before returning on every path, including
/// early `Break` from the visitor.
pub fn scan<F>(path: &Path, mut visit: F) -> Result<(), ScanError>
where
    F: FnMut(PasswdEntry<'_>) -> ControlFlow<()>,
{
    let file = File::open(path).map_err(ScanError::Open)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    while read_line(&mut reader, &mut buf, MAX_LINE_LEN).map_err(ScanError::Read)? {
        let line = String::from_utf8_lossy(&buf);
        if let Some(entry) = PasswdEntry::parse(&line) {
            if visit(entry).is_break() {
                break;
            }
        }
    }

    Ok(())
}
