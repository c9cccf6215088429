pub mod lifecycle;
pub mod runtime;

pub use lifecycle::{Lifecycle, LifecycleState, ShutdownSignal};
pub use runtime::RuntimeConfig;
