// ============================================================================
// event-signals - Type Definitions
// Callback handles and the capability trait shared by every signal host
// ============================================================================

use std::rc::{Rc, Weak};

use super::error::SignalError;
use crate::signals::registry::SignalRegistry;

// =============================================================================
// CALLBACKS
// =============================================================================
//
// Closures have no equality in Rust, so a callback's identity is its
// allocation: `off` removes the entry that shares the same `Rc` as the handle
// it is given. Attaching one handle twice produces two entries.
// =============================================================================

/// What a listener returns. An `Err` aborts the dispatch that called it.
pub type ListenerResult = Result<(), SignalError>;

/// A listener connected to a signal, receiving the fired arguments.
pub type Callback<A> = Rc<dyn Fn(&A) -> ListenerResult>;

/// A class-level listener that also receives the owning instance.
///
/// Stored on a `Signaler` or `SignalerProperty` and bound to each instance
/// when that instance's registry is created.
pub type MethodCallback<O, A> = Rc<dyn Fn(&O, &A) -> ListenerResult>;

/// A wrapped method taking the owner and its arguments.
pub type Method<O, A, R> = Rc<dyn Fn(&O, A) -> R>;

/// Reads the observed value back from the owner.
pub type Getter<O, T> = Rc<dyn Fn(&O) -> T>;

/// Create a callback handle from a closure.
///
/// # Example
///
/// ```
/// use event_signals::{listener, SignalRegistry};
///
/// let registry = SignalRegistry::<i32>::new();
/// let print = registry.on("change", listener(|v: &i32| {
///     println!("changed to {v}");
///     Ok(())
/// }));
/// registry.off("change", &print).unwrap();
/// ```
pub fn listener<A, F>(f: F) -> Callback<A>
where
    A: ?Sized,
    F: Fn(&A) -> ListenerResult + 'static,
{
    Rc::new(f)
}

/// Create a class-level callback handle from a closure.
pub fn method_listener<O, A, F>(f: F) -> MethodCallback<O, A>
where
    A: ?Sized,
    F: Fn(&O, &A) -> ListenerResult + 'static,
{
    Rc::new(f)
}

/// Check whether two handles refer to the same callback allocation.
pub fn same_callback<A: ?Sized>(a: &Callback<A>, b: &Callback<A>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Bind a class-level callback to one owner.
///
/// Holds the owner weakly; once the owner is gone the callback does nothing.
pub(crate) fn bind_method_callback<O, A>(callback: MethodCallback<O, A>, owner: Weak<O>) -> Callback<A>
where
    O: 'static,
    A: ?Sized + 'static,
{
    Rc::new(move |args: &A| match owner.upgrade() {
        Some(owner) => callback(&owner, args),
        None => Ok(()),
    })
}

/// Identity of an object, taken from its address.
pub(crate) fn address_of<O: ?Sized>(value: &O) -> usize {
    value as *const O as *const () as usize
}

// =============================================================================
// SIGNALS - the on/off/fire/block capability set
// =============================================================================

/// Anything that owns a signal registry: bound signalers, bound properties and
/// free-function signalers.
///
/// Every method is scoped to the host's own registry; hosts never share one.
pub trait Signals<A: ?Sized + 'static> {
    /// The registry this host dispatches through.
    fn registry(&self) -> &SignalRegistry<A>;

    /// Callbacks currently connected to `name`, in dispatch order.
    fn get_signal(&self, name: &str) -> Vec<Callback<A>> {
        self.registry().get_signal(name)
    }

    /// Connect a callback, returning the handle for `off`.
    fn on(&self, name: &str, callback: Callback<A>) -> Callback<A> {
        self.registry().on(name, callback)
    }

    /// Disconnect the first occurrence of `callback`.
    fn off(&self, name: &str, callback: &Callback<A>) -> Result<(), SignalError> {
        self.registry().off(name, callback)
    }

    /// Disconnect every callback from `name`.
    fn off_all(&self, name: &str) -> usize {
        self.registry().off_all(name)
    }

    /// Call every connected callback with `args`.
    fn fire(&self, name: &str, args: &A) -> Result<(), SignalError> {
        self.registry().fire(name, args)
    }

    /// Block or unblock one signal, or every signal when `name` is `None`.
    fn block(&self, name: Option<&str>, block: bool) {
        self.registry().block(name, block)
    }

    /// Whether `name` (or the whole host when `None`) is blocked.
    fn is_blocked(&self, name: Option<&str>) -> bool {
        self.registry().is_blocked(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn identity_follows_the_allocation() {
        let a: Callback<i32> = listener(|_| Ok(()));
        let b: Callback<i32> = listener(|_| Ok(()));
        let a2 = a.clone();

        assert!(same_callback(&a, &a2));
        assert!(!same_callback(&a, &b));
    }

    #[test]
    fn bound_method_callback_drops_with_owner() {
        let hits = Rc::new(Cell::new(0));
        let owner = Rc::new(10);

        let cb = bind_method_callback(
            method_listener({
                let hits = hits.clone();
                move |owner: &i32, v: &i32| {
                    hits.set(hits.get() + owner + v);
                    Ok(())
                }
            }),
            Rc::downgrade(&owner),
        );

        cb(&1).unwrap();
        assert_eq!(hits.get(), 11);

        drop(owner);
        cb(&1).unwrap();
        assert_eq!(hits.get(), 11);
    }

    #[test]
    fn address_is_stable_for_shared_owner() {
        let owner = Rc::new(String::from("p"));
        let other = owner.clone();
        assert_eq!(address_of(&*owner), address_of(&*other));
        assert_eq!(address_of(&*owner), Rc::as_ptr(&owner) as *const () as usize);
    }
}
