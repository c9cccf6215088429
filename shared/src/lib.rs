//! Types shared by every sluice crate: the error taxonomy, configuration
//! and the wire protocol.

pub mod config;
pub mod error;
pub mod protocol;
