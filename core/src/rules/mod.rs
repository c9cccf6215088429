//! Client filter trees and their compilation to SQL predicates.

pub mod compile;
pub mod node;
pub mod querybuilder;

pub use compile::{compile, compile_rules};
pub use node::{Combinator, Operator, RuleNode};
pub use querybuilder::RuleParseError;
