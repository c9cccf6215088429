//! Token issuers and the claim sets they produce.

pub mod claims;
pub mod jwt;
pub mod registry;

pub use claims::ClaimSet;
pub use jwt::JwtIssuer;
pub use registry::{ClaimsDecoder, IssuerRegistry};
