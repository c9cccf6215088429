//! WebSocket front end of the sluice gateway.
//!
//! The gateway accepts connections and hands each one a [`session::Session`]
//! and a [`dispatch::Dispatcher`]. The dispatcher decodes envelopes, runs
//! each operation as its own task and replies through the session.

pub mod auth;
pub mod context;
pub mod dispatch;
pub mod gateway;
pub mod session;

pub use context::{Endpoint, Services};
pub use gateway::GatewayServer;
