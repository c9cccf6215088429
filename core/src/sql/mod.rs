//! Injection-safe SQL composition.

pub mod fragment;

pub use fragment::Sql;
