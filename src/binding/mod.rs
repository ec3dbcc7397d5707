// ============================================================================
// event-signals - Binding Module
// Member lookup, accessors, and two-way binding between objects
// ============================================================================

pub mod accessor;
pub mod binder;
pub mod link;
pub mod members;

pub use accessor::{Accessor, MethodAccessor, SharedAccessor, WeakAccessor};
pub use binder::{
    bind, bind_signals, resolve_accessor, unbind, unbind_all, unbind_signals, Bindable,
};
pub use link::{Bindings, Connection, Endpoint, Link};
pub use members::{Introspect, Members, MethodMember, PropertyMember};
