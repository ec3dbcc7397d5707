// ============================================================================
// event-signals - Accessors
// The uniform value/assign/connect view the binder works through
// ============================================================================
//
// Whatever a name resolves to (a property, a setter method with an optional
// getter, a free-function signaler) the binder only sees an `Accessor<T>`.
//
// Propagation callbacks live in the other side's registry, so they hold a
// `WeakAccessor`: it rebuilds the accessor while its owner is alive and yields
// nothing afterwards. A binding never keeps either owner alive.
// ============================================================================

use std::rc::Rc;

use crate::binding::link::{Bindings, Connection};
use crate::core::constants::CHANGE;
use crate::core::error::SignalError;
use crate::core::types::{address_of, listener, Callback, Getter, Signals};
use crate::primitives::property::BoundProperty;
use crate::primitives::signaler::{BoundSignaler, FnSignaler};
use crate::signals::registry::SignalRegistry;

/// A shared accessor, as produced by resolution.
pub type SharedAccessor<T> = Rc<dyn Accessor<T>>;

/// Rebuilds an accessor on demand without keeping its owner alive.
pub type WeakAccessor<T> = Rc<dyn Fn() -> Option<SharedAccessor<T>>>;

/// A readable, assignable value whose changes can be observed.
pub trait Accessor<T> {
    /// Current value, or `None` if it cannot be read.
    fn value(&self) -> Option<T>;

    /// Assign through the signaling path, so `change` listeners fire.
    fn assign(&self, value: T) -> Result<(), SignalError>;

    /// Connect a callback receiving each value delivered to `change`.
    fn connect_change(&self, callback: Callback<T>) -> Connection;

    /// Binding records of the underlying registry.
    fn bindings(&self) -> &Bindings;

    /// Identity of the object this accessor belongs to.
    fn owner_id(&self) -> usize;

    /// A handle that yields this accessor again while its owner is alive.
    fn downgrade(&self) -> WeakAccessor<T>;
}

fn connect_registry<A: 'static>(registry: &Rc<SignalRegistry<A>>, callback: Callback<A>) -> Connection {
    let callback = registry.on(CHANGE, callback);
    let registry = Rc::downgrade(registry);
    Connection::new(move || match registry.upgrade() {
        Some(registry) => registry.off(CHANGE, &callback),
        None => Ok(()),
    })
}

fn shared<T: 'static, X>(rebuild: impl Fn() -> Option<X> + 'static) -> WeakAccessor<T>
where
    X: Accessor<T> + 'static,
{
    Rc::new(move || rebuild().map(|accessor| Rc::new(accessor) as SharedAccessor<T>))
}

// =============================================================================
// PROPERTY
// =============================================================================

impl<O: 'static, T: Clone + PartialEq + 'static> Accessor<T> for BoundProperty<O, T> {
    fn value(&self) -> Option<T> {
        self.get().ok()
    }

    fn assign(&self, value: T) -> Result<(), SignalError> {
        self.set(value).map(|_| ())
    }

    fn connect_change(&self, callback: Callback<T>) -> Connection {
        self.connect(
            CHANGE,
            listener(move |args: &[T]| match args.first() {
                Some(value) => callback(value),
                None => Ok(()),
            }),
        )
    }

    fn bindings(&self) -> &Bindings {
        Signals::registry(self).bindings()
    }

    fn owner_id(&self) -> usize {
        address_of(&**self.owner())
    }

    fn downgrade(&self) -> WeakAccessor<T> {
        shared(self.weak_handle())
    }
}

// =============================================================================
// SIGNALERS
// =============================================================================

impl<O: 'static, T: Clone + 'static, R: 'static> Accessor<T> for BoundSignaler<O, T, R> {
    fn value(&self) -> Option<T> {
        self.observed()
    }

    fn assign(&self, value: T) -> Result<(), SignalError> {
        self.call(value).map(|_| ())
    }

    fn connect_change(&self, callback: Callback<T>) -> Connection {
        connect_registry(self.shared_registry(), callback)
    }

    fn bindings(&self) -> &Bindings {
        self.shared_registry().bindings()
    }

    fn owner_id(&self) -> usize {
        address_of(&**self.owner())
    }

    fn downgrade(&self) -> WeakAccessor<T> {
        shared(self.weak_handle())
    }
}

impl<T: Clone + 'static, R: 'static> Accessor<T> for FnSignaler<T, R> {
    fn value(&self) -> Option<T> {
        self.observed()
    }

    fn assign(&self, value: T) -> Result<(), SignalError> {
        self.call(value).map(|_| ())
    }

    fn connect_change(&self, callback: Callback<T>) -> Connection {
        connect_registry(self.shared_registry(), callback)
    }

    fn bindings(&self) -> &Bindings {
        self.shared_registry().bindings()
    }

    fn owner_id(&self) -> usize {
        address_of(&**self.shared_registry())
    }

    fn downgrade(&self) -> WeakAccessor<T> {
        shared(self.weak_handle())
    }
}

// =============================================================================
// METHOD PAIR - setter signaler plus a separately found getter
// =============================================================================

/// A setter method and the getter found next to it.
///
/// Values sent to `change` listeners are re-read through the getter, so a
/// setter that transforms its input propagates what it actually stored.
pub struct MethodAccessor<O, T> {
    setter: BoundSignaler<O, T, ()>,
    getter: Option<Getter<O, T>>,
}

impl<O, T> MethodAccessor<O, T> {
    pub fn new(setter: BoundSignaler<O, T, ()>, getter: Option<Getter<O, T>>) -> Self {
        Self { setter, getter }
    }

    pub fn setter(&self) -> &BoundSignaler<O, T, ()> {
        &self.setter
    }

    pub fn has_getter(&self) -> bool {
        self.getter.is_some()
    }
}

impl<O, T> Clone for MethodAccessor<O, T> {
    fn clone(&self) -> Self {
        Self {
            setter: self.setter.clone(),
            getter: self.getter.clone(),
        }
    }
}

impl<O: 'static, T: Clone + 'static> Accessor<T> for MethodAccessor<O, T> {
    fn value(&self) -> Option<T> {
        match &self.getter {
            Some(getter) => Some(getter(self.setter.owner())),
            None => self.setter.observed(),
        }
    }

    fn assign(&self, value: T) -> Result<(), SignalError> {
        self.setter.call(value)
    }

    fn connect_change(&self, callback: Callback<T>) -> Connection {
        let callback = match &self.getter {
            Some(getter) => {
                let getter = getter.clone();
                let owner = Rc::downgrade(self.setter.owner());
                listener(move |value: &T| match owner.upgrade() {
                    Some(owner) => callback(&getter(&owner)),
                    None => callback(value),
                })
            }
            None => callback,
        };
        connect_registry(self.setter.shared_registry(), callback)
    }

    fn bindings(&self) -> &Bindings {
        self.setter.shared_registry().bindings()
    }

    fn owner_id(&self) -> usize {
        address_of(&**self.setter.owner())
    }

    fn downgrade(&self) -> WeakAccessor<T> {
        let setter = self.setter.weak_handle();
        let getter = self.getter.clone();
        shared(move || Some(MethodAccessor::new(setter()?, getter.clone())))
    }
}
