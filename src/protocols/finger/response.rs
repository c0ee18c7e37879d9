//! Reply formatting.
//!
//! ```text
//! Login: <identifier, left-aligned in 32 columns> Name : <display name>
//! Directory: <home, left-aligned in 28 columns> Shell: <shell>
//! Mail forwarded to <target>
//! ```
//!
//! The third line appears only when a forwarding target is set. Column
//! widths are part of the wire contract.

use crate::accounts::AccountRecord;
use std::fmt::Write;

pub const LOGIN_WIDTH: usize = 32;
pub const DIRECTORY_WIDTH: usize = 28;

/// Render an account record as the reply body.
pub fn format(record: &AccountRecord) -> String {
    let mut reply = String::with_capacity(128);

    // Writing to a String cannot fail.
    let _ = writeln!(
        reply,
        "Login: {:<width$} Name : {}",
        record.identifier,
        record.display_name,
        width = LOGIN_WIDTH
    );
    let _ = writeln!(
        reply,
        "Directory: {:<width$} Shell: {}",
        record.home_directory,
        record.shell,
        width = DIRECTORY_WIDTH
    );
    if !record.forward_target.is_empty() {
        let _ = writeln!(reply, "Mail forwarded to {}", record.forward_target);
    }

    reply
}
