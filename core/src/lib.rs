//! Request-to-SQL compilation for the sluice gateway.
//!
//! Everything here is independent of the transport and of any particular
//! database connection: the compilers are pure functions over typed
//! request fields, and the database is reached through the traits in
//! [`backend`].

pub mod backend;
pub mod daemon;
pub mod format;
pub mod operation;
pub mod paginate;
pub mod rules;
pub mod sql;

