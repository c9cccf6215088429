//! The JSON wire protocol spoken over each duplex connection.

pub mod envelope;
pub mod frame;
pub mod operation;

pub use envelope::Envelope;
pub use frame::{JsonLiteral, ServerFrame, PROTOCOL_ERROR_CLOSE_CODE};
pub use operation::OperationKind;
