//! Finger protocol (RFC 742, single-user queries only).
//!
//! One transaction per connection:
//! - Client sends: `<identifier>\r\n` (at most 33 bytes are read, once)
//! - Server responds: a short account record, or nothing at all
//! - Server closes the connection
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  alice\r\n
//! Response: Login: alice                            Name : Alice A
//!           Directory: /home/alice                  Shell: /bin/bash
//! ```
//!
//! There is no error reply. Invalid or unknown identifiers get a closed
//! connection with an empty body.

pub mod handler;
pub mod parser;
pub mod response;

pub use handler::handle_connection;
pub use parser::{validate, ValidationError};
