// ============================================================================
// event-signals - Primitives Module
// Signaling wrappers: signaler, property, method observer
// ============================================================================

pub mod observer;
pub mod property;
pub mod signaler;

// Re-export for convenience
pub use observer::Observed;
pub use property::{BoundProperty, Deleter, Property, Setter, SignalerProperty};
pub use signaler::{signaler, BoundSignaler, FnSignaler, InstanceControl, Signaler};
