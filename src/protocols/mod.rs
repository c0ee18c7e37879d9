//! Protocol implementations.
//!
//! - `finger`: the RFC 742 account information protocol
//!
//! Protocol modules own request parsing, reply formatting, and the
//! per-connection handler. Account lookups live in `crate::accounts`.

pub mod finger;
