// ============================================================================
// event-signals - Signals Module
// Named channels and the per-host registry that dispatches them
// ============================================================================

pub mod channel;
pub mod registry;

pub use channel::SignalChannel;
pub use registry::SignalRegistry;
