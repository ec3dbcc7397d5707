// ============================================================================
// event-signals - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// This reduces the boilerplate of cloning `Rc` handles before moving them
/// into a listener.
///
/// # Usage
///
/// ```rust
/// use event_signals::{cloned, listener, SignalRegistry};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let hits = Rc::new(Cell::new(0));
/// let registry = SignalRegistry::<i32>::new();
///
/// registry.on("change", listener(cloned!(hits => move |_: &i32| {
///     hits.set(hits.get() + 1);
///     Ok(())
/// })));
///
/// registry.fire("change", &1).unwrap();
/// assert_eq!(hits.get(), 1);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a listener with automatic variable capturing.
///
/// Wraps `listener(cloned!(... => move |arg: &T| ...))`.
///
/// # Usage
///
/// ```rust
/// use event_signals::{listener, SignalRegistry};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let registry = SignalRegistry::<i32>::new();
///
/// registry.on("change", listener!(seen => |v: &i32| {
///     seen.borrow_mut().push(*v);
///     Ok(())
/// }));
///
/// registry.fire("change", &3).unwrap();
/// assert_eq!(*seen.borrow(), vec![3]);
/// ```
#[macro_export]
macro_rules! listener {
    // Case 1: With dependencies
    ($($deps:ident),+ => |$arg:ident : $ty:ty| $body:expr) => {
        $crate::listener($crate::cloned!($($deps),+ => move |$arg: $ty| $body))
    };
    // Case 2: No dependencies
    (|$arg:ident : $ty:ty| $body:expr) => {
        $crate::listener(move |$arg: $ty| $body)
    };
}

/// Implement [`Introspect`](crate::Introspect) with a per-thread member table.
///
/// The table is built once per thread, the first time it is requested.
///
/// # Usage
///
/// ```rust
/// use event_signals::{introspect, Introspect};
/// use std::cell::Cell;
///
/// struct Door {
///     open: Cell<bool>,
/// }
///
/// introspect!(Door, |members| members
///     .method("set_open", |d: &Door, v: bool| d.open.set(v))
///     .method("is_open", |d: &Door, _: ()| d.open.get()));
///
/// assert!(Door::members().has_method("set_open"));
/// ```
#[macro_export]
macro_rules! introspect {
    ($ty:ty, |$members:ident| $body:expr) => {
        impl $crate::Introspect for $ty {
            fn members() -> ::std::rc::Rc<$crate::Members<Self>> {
                ::std::thread_local! {
                    static MEMBERS: ::std::rc::Rc<$crate::Members<$ty>> = {
                        let $members = $crate::Members::<$ty>::new();
                        ::std::rc::Rc::new($body)
                    };
                }
                MEMBERS.with(::std::rc::Rc::clone)
            }
        }
    };
}
