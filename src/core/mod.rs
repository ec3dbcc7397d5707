// ============================================================================
// event-signals - Core Module
// Reserved names, errors, callback types and per-instance storage
// ============================================================================

pub mod constants;
pub mod error;
pub mod instances;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use error::SignalError;
pub use instances::InstanceMap;
pub use types::{
    listener, method_listener, same_callback, Callback, Getter, ListenerResult, Method,
    MethodCallback, Signals,
};
