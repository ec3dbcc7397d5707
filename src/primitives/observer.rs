// ============================================================================
// event-signals - Method Observer
// Wraps every registered method of an instance in a signaler
// ============================================================================
//
// `Observed::new` walks the type's member table once. Plain methods get a
// signaler of their own (used only by this instance); methods registered as
// signalers are shared, never wrapped twice. Registries are still created
// lazily, the first time a method is bound.
// ============================================================================

use std::any::type_name;
use std::ops::Deref;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::binding::members::{Introspect, ObservedEntry};
use crate::core::error::SignalError;
use crate::primitives::signaler::{BoundSignaler, Signaler};

/// An instance whose methods all fire `before_change` / `change`.
///
/// # Example
///
/// ```
/// use event_signals::{introspect, listener, Observed, Signals, CHANGE};
/// use std::cell::{Cell, RefCell};
/// use std::rc::Rc;
///
/// struct Counter {
///     count: Cell<i32>,
/// }
///
/// introspect!(Counter, |members| members
///     .method("add", |c: &Counter, n: i32| c.count.set(c.count.get() + n)));
///
/// let counter = Observed::new(Counter { count: Cell::new(0) });
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// counter.method::<i32, ()>("add").unwrap().on(CHANGE, listener({
///     let seen = seen.clone();
///     move |n: &i32| {
///         seen.borrow_mut().push(*n);
///         Ok(())
///     }
/// }));
///
/// counter.call::<i32, ()>("add", 2).unwrap();
/// counter.call::<i32, ()>("add", 3).unwrap();
/// assert_eq!(counter.count.get(), 5);
/// assert_eq!(*seen.borrow(), vec![2, 3]);
/// ```
pub struct Observed<O> {
    inner: Rc<O>,
    methods: IndexMap<String, ObservedEntry<O>>,
}

impl<O: Introspect> Observed<O> {
    pub fn new(object: O) -> Self {
        Self::from_rc(Rc::new(object))
    }

    /// Observe an instance that is already shared.
    pub fn from_rc(inner: Rc<O>) -> Self {
        let methods: IndexMap<_, _> = O::members().observe_all().into_iter().collect();
        debug!(
            owner = type_name::<O>(),
            methods = methods.len(),
            "instance observed"
        );
        Self { inner, methods }
    }

    fn signaler<A: 'static, R: 'static>(&self, name: &str) -> Result<&Signaler<O, A, R>, SignalError> {
        let entry = self
            .methods
            .get(name)
            .ok_or_else(|| SignalError::MethodNotFound(name.to_owned()))?;
        entry
            .signaler
            .downcast_ref::<Signaler<O, A, R>>()
            .ok_or_else(|| SignalError::TypeMismatch {
                name: name.to_owned(),
                expected: type_name::<Signaler<O, A, R>>(),
            })
    }

    /// The observed method `name`, bound to this instance.
    pub fn method<A: 'static, R: 'static>(&self, name: &str) -> Result<BoundSignaler<O, A, R>, SignalError> {
        Ok(self.signaler::<A, R>(name)?.bind(&self.inner))
    }

    /// Call the observed method `name` with signals.
    pub fn call<A: Clone + 'static, R: 'static>(&self, name: &str, args: A) -> Result<R, SignalError> {
        self.method::<A, R>(name)?.call(args)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    /// Block or unblock `signal` (every signal when `None`) on all methods.
    pub fn block(&self, signal: Option<&str>, block: bool) {
        for entry in self.methods.values() {
            entry.control.block_instance(&self.inner, signal, block);
        }
    }

    /// Block or unblock `signal` on one method.
    pub fn block_method(&self, name: &str, signal: Option<&str>, block: bool) -> Result<(), SignalError> {
        let entry = self
            .methods
            .get(name)
            .ok_or_else(|| SignalError::MethodNotFound(name.to_owned()))?;
        entry.control.block_instance(&self.inner, signal, block);
        Ok(())
    }

    pub fn is_blocked(&self, name: &str, signal: Option<&str>) -> Result<bool, SignalError> {
        let entry = self
            .methods
            .get(name)
            .ok_or_else(|| SignalError::MethodNotFound(name.to_owned()))?;
        Ok(entry.control.is_instance_blocked(&self.inner, signal))
    }

    /// The shared instance.
    pub fn owner(&self) -> &Rc<O> {
        &self.inner
    }
}

impl<O> Deref for Observed<O> {
    type Target = O;

    fn deref(&self) -> &O {
        &self.inner
    }
}

impl<O> std::fmt::Debug for Observed<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observed")
            .field("type", &type_name::<O>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
