// ============================================================================
// event-signals - Observer Signals and Two-Way Binding for Rust
// ============================================================================
//
// Named, ordered listener lists ("signals") attached to methods and
// properties, fired automatically around every call or assignment, plus a
// binder that keeps two objects' members equal through those signals.
//
// Single-threaded by construction: everything is `Rc`/`RefCell`.
// ============================================================================

pub mod binding;
pub mod core;
mod macros;
pub mod primitives;
pub mod signals;

// Re-export core items at crate root for ergonomic access
pub use core::constants::{
    is_reserved, BEFORE_CHANGE, BEFORE_DELETE, CHANGE, DELETE, PROPERTY_SIGNALS, SIGNALER_SIGNALS,
};
pub use core::error::SignalError;
pub use core::instances::InstanceMap;
pub use core::types::{
    listener, method_listener, same_callback, Callback, Getter, ListenerResult, Method,
    MethodCallback, Signals,
};

// Dispatch engine
pub use signals::{SignalChannel, SignalRegistry};

// Wrappers
pub use primitives::observer::Observed;
pub use primitives::property::{BoundProperty, Deleter, Property, Setter, SignalerProperty};
pub use primitives::signaler::{signaler, BoundSignaler, FnSignaler, InstanceControl, Signaler};

// Binding
pub use binding::accessor::{Accessor, MethodAccessor, SharedAccessor, WeakAccessor};
pub use binding::binder::{
    bind, bind_signals, resolve_accessor, unbind, unbind_all, unbind_signals, Bindable,
};
pub use binding::link::{Bindings, Connection, Endpoint, Link};
pub use binding::members::{Introspect, Members, MethodMember, PropertyMember};

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Point {
        x: Cell<i32>,
    }

    introspect!(Point, |members| members
        .method("set_x", |p: &Point, x: i32| p.x.set(x.max(0)))
        .method("get_x", |p: &Point, _: ()| p.x.get()));

    struct Label {
        text: RefCell<String>,
    }

    introspect!(Label, |members| members.property(
        "text",
        Property::new()
            .getter(|l: &Label| l.text.borrow().clone())
            .setter(|l: &Label, v: String| *l.text.borrow_mut() = v),
    ));

    fn point() -> Rc<Point> {
        Rc::new(Point { x: Cell::new(0) })
    }

    fn label(text: &str) -> Rc<Label> {
        Rc::new(Label {
            text: RefCell::new(text.to_owned()),
        })
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[test]
    fn reserved_names_exported() {
        assert_eq!(SIGNALER_SIGNALS, [BEFORE_CHANGE, CHANGE]);
        assert!(PROPERTY_SIGNALS.contains(&DELETE));
        assert!(is_reserved(BEFORE_DELETE));
        assert!(!is_reserved("custom"));
    }

    #[test]
    fn registry_round_trip_through_macros() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let registry = SignalRegistry::<i32>::new();

        let cb = registry.on("custom", listener!(seen => |v: &i32| {
            seen.borrow_mut().push(*v);
            Ok(())
        }));
        registry.fire("custom", &1).unwrap();
        registry.off("custom", &cb).unwrap();
        registry.fire("custom", &2).unwrap();

        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn hosts_share_one_capability_trait() {
        fn mute<A: ?Sized + 'static>(host: &dyn Signals<A>) {
            host.block(None, true);
        }

        let set = signaler(|_: i32| ());
        let owner = point();
        let method = Signaler::new(|p: &Point, x: i32| p.x.set(x)).bind(&owner);
        let property = SignalerProperty::<Point, i32>::new().bind(&owner);

        mute::<i32>(&set);
        mute::<i32>(&method);
        mute::<[i32]>(&property);
        assert!(set.is_blocked(None));
        assert!(method.is_blocked(None));
        assert!(property.is_blocked(None));
    }

    // =========================================================================
    // Wrapped calls
    // =========================================================================

    #[test]
    fn clamped_setter_reports_stored_value() {
        let set_x = Signaler::new(|p: &Point, x: i32| p.x.set(x.max(0)))
            .with_getter(|p: &Point| p.x.get());
        let owner = point();
        let seen = Rc::new(Cell::new(-99));

        set_x.bind(&owner).on(CHANGE, listener!(seen => |x: &i32| {
            seen.set(*x);
            Ok(())
        }));
        set_x.call(&owner, -1).unwrap();

        assert_eq!(seen.get(), 0);
    }

    #[test]
    fn observed_method_without_listeners() {
        let observed = Observed::new(Point { x: Cell::new(0) });
        observed.call::<i32, ()>("set_x", 5).unwrap();
        assert_eq!(observed.x.get(), 5);
    }

    // =========================================================================
    // Binding
    // =========================================================================

    #[test]
    fn bound_properties_stay_equal_until_unbound() {
        let a = label("");
        let b = label("");
        bind::<String, _, _>(&a, "text", &b, None).unwrap();

        let set_b = |text: &str| {
            resolve_accessor::<String, _>(&b, "text")
                .unwrap()
                .assign(text.to_owned())
                .unwrap()
        };

        set_b("5");
        assert_eq!(*a.text.borrow(), "5");

        unbind::<String, _, _>(&a, "text", &b).unwrap();
        set_b("9");
        assert_eq!(*a.text.borrow(), "5");
    }

    #[test]
    fn snake_case_method_pair_binds() {
        let p = point();
        let q = point();
        p.x.set(3);

        bind::<i32, _, _>(&p, "x", &q, None).unwrap();
        assert_eq!(q.x.get(), 3);

        resolve_accessor::<i32, _>(&q, "x").unwrap().assign(-8).unwrap();
        assert_eq!(q.x.get(), 0);
        assert_eq!(p.x.get(), 0);
    }

    #[test]
    fn resolution_failure_names_the_type() {
        let p = point();
        let err = resolve_accessor::<i32, _>(&p, "y").err().unwrap();
        assert!(err.to_string().contains("Point"));
    }
}
