pub mod types;

pub use types::SluiceError;

/// Shorthand Result type used throughout sluice.
pub type Result<T> = std::result::Result<T, SluiceError>;
