// ============================================================================
// event-signals - Properties
// Plain get/set/delete accessors and their signaling upgrade
// ============================================================================
//
// `SignalerProperty` wraps get/set/delete of a per-instance value:
//
//   set:    before_change [v] -> store (fset) -> read back (fget) -> change [stored]
//   delete: before_delete []  -> fdel -> clear slot              -> delete []
//   get:    no signals
//
// Listeners receive the argument slice: one value for the change signals,
// none for the delete signals.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;
use std::slice;

use tracing::trace;

use crate::binding::link::Connection;
use crate::core::constants::{BEFORE_CHANGE, BEFORE_DELETE, CHANGE, DELETE};
use crate::core::error::SignalError;
use crate::core::instances::InstanceMap;
use crate::core::types::{bind_method_callback, Callback, Getter, MethodCallback, Signals};
use crate::signals::registry::SignalRegistry;

/// Stores a value on the owner.
pub type Setter<O, T> = Rc<dyn Fn(&O, T)>;

/// Removes a value from the owner.
pub type Deleter<O> = Rc<dyn Fn(&O)>;

// =============================================================================
// PROPERTY - plain accessors, no signals
// =============================================================================

/// A gettable, settable and deletable attribute of `O`, without signals.
///
/// Any accessor may be absent. The binder upgrades a `Property` to a
/// [`SignalerProperty`] when it needs to observe it.
pub struct Property<O, T> {
    fget: Option<Getter<O, T>>,
    fset: Option<Setter<O, T>>,
    fdel: Option<Deleter<O>>,
}

impl<O: 'static, T: 'static> Property<O, T> {
    pub fn new() -> Self {
        Self {
            fget: None,
            fset: None,
            fdel: None,
        }
    }

    pub fn getter(mut self, fget: impl Fn(&O) -> T + 'static) -> Self {
        self.fget = Some(Rc::new(fget));
        self
    }

    pub fn setter(mut self, fset: impl Fn(&O, T) + 'static) -> Self {
        self.fset = Some(Rc::new(fset));
        self
    }

    pub fn deleter(mut self, fdel: impl Fn(&O) + 'static) -> Self {
        self.fdel = Some(Rc::new(fdel));
        self
    }

    pub fn get(&self, owner: &O) -> Result<T, SignalError> {
        self.fget
            .as_ref()
            .map(|fget| fget(owner))
            .ok_or(SignalError::NoValue)
    }

    pub fn set(&self, owner: &O, value: T) -> Result<(), SignalError> {
        let fset = self.fset.as_ref().ok_or(SignalError::ReadOnly)?;
        fset(owner, value);
        Ok(())
    }

    pub fn delete(&self, owner: &O) -> Result<(), SignalError> {
        let fdel = self.fdel.as_ref().ok_or(SignalError::NotDeletable)?;
        fdel(owner);
        Ok(())
    }
}

impl<O, T> Property<O, T> {
    pub fn is_readable(&self) -> bool {
        self.fget.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.fset.is_some()
    }

    pub fn is_deletable(&self) -> bool {
        self.fdel.is_some()
    }
}

impl<O, T> Clone for Property<O, T> {
    fn clone(&self) -> Self {
        Self {
            fget: self.fget.clone(),
            fset: self.fset.clone(),
            fdel: self.fdel.clone(),
        }
    }
}

impl<O: 'static, T: 'static> Default for Property<O, T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SIGNALER PROPERTY - class-level, one registry per instance
// =============================================================================

pub(crate) struct PropertyState<T> {
    value: RefCell<Option<T>>,
    registry: SignalRegistry<[T]>,
}

/// A property that fires signals on set and delete.
///
/// Created once per attribute and shared by every instance of `O`; each
/// instance gets its own value slot and registry on first use. Without a
/// getter or setter the property stores the value in that slot.
///
/// # Example
///
/// ```
/// use event_signals::{listener, SignalerProperty, CHANGE};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// struct Settings;
///
/// let volume: SignalerProperty<Settings, u8> = SignalerProperty::new().with_default(5);
/// let owner = Rc::new(Settings);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// volume.on(&owner, CHANGE, listener({
///     let seen = seen.clone();
///     move |args: &[u8]| {
///         seen.borrow_mut().extend_from_slice(args);
///         Ok(())
///     }
/// }));
///
/// assert_eq!(volume.get(&owner).unwrap(), 5);
/// assert!(volume.set(&owner, 7).unwrap());
/// assert!(!volume.set(&owner, 7).unwrap());
/// assert_eq!(*seen.borrow(), vec![7]);
/// ```
pub struct SignalerProperty<O, T> {
    accessors: Property<O, T>,
    default: Option<Rc<T>>,
    check_change: bool,
    name: Option<String>,
    defaults: Vec<(String, MethodCallback<O, [T]>)>,
    instances: InstanceMap<O, PropertyState<T>>,
}

impl<O: 'static, T: Clone + PartialEq + 'static> SignalerProperty<O, T> {
    pub fn new() -> Self {
        Self::from(Property::new())
    }

    pub fn getter(mut self, fget: impl Fn(&O) -> T + 'static) -> Self {
        self.accessors = self.accessors.getter(fget);
        self
    }

    pub fn setter(mut self, fset: impl Fn(&O, T) + 'static) -> Self {
        self.accessors = self.accessors.setter(fset);
        self
    }

    pub fn deleter(mut self, fdel: impl Fn(&O) + 'static) -> Self {
        self.accessors = self.accessors.deleter(fdel);
        self
    }

    /// Value returned before anything was stored.
    pub fn with_default(mut self, value: T) -> Self {
        self.default = Some(Rc::new(value));
        self
    }

    /// When on (the default), setting the current value again fires nothing.
    pub fn check_change(mut self, check: bool) -> Self {
        self.check_change = check;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Connect a listener to `signal` on every instance, receiving the owner.
    pub fn on_each(mut self, signal: impl Into<String>, callback: MethodCallback<O, [T]>) -> Self {
        self.defaults.push((signal.into(), callback));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn checks_change(&self) -> bool {
        self.check_change
    }

    /// The plain accessors this property wraps.
    pub fn accessors(&self) -> &Property<O, T> {
        &self.accessors
    }

    fn state(&self, owner: &Rc<O>) -> Rc<PropertyState<T>> {
        self.instances.get_or_init(owner, || {
            let registry = SignalRegistry::new();
            for (signal, callback) in &self.defaults {
                registry.on(signal, bind_method_callback(callback.clone(), Rc::downgrade(owner)));
            }
            PropertyState {
                value: RefCell::new(None),
                registry,
            }
        })
    }

    /// Bind to one instance for value access and signal management.
    pub fn bind(&self, owner: &Rc<O>) -> BoundProperty<O, T> {
        BoundProperty {
            accessors: self.accessors.clone(),
            default: self.default.clone(),
            check_change: self.check_change,
            owner: owner.clone(),
            state: self.state(owner),
        }
    }

    pub fn get(&self, owner: &Rc<O>) -> Result<T, SignalError> {
        self.bind(owner).get()
    }

    /// Store a value; returns false when the value was unchanged and nothing fired.
    pub fn set(&self, owner: &Rc<O>, value: T) -> Result<bool, SignalError> {
        self.bind(owner).set(value)
    }

    pub fn delete(&self, owner: &Rc<O>) -> Result<(), SignalError> {
        self.bind(owner).delete()
    }

    // =========================================================================
    // CLASS-LEVEL SIGNAL MANAGEMENT
    // =========================================================================

    pub fn on(&self, owner: &Rc<O>, signal: &str, callback: Callback<[T]>) -> Callback<[T]> {
        self.state(owner).registry.on(signal, callback)
    }

    pub fn off(&self, owner: &Rc<O>, signal: &str, callback: &Callback<[T]>) -> Result<(), SignalError> {
        self.state(owner).registry.off(signal, callback)
    }

    pub fn get_signal(&self, owner: &Rc<O>, signal: &str) -> Vec<Callback<[T]>> {
        self.state(owner).registry.get_signal(signal)
    }

    pub fn fire(&self, owner: &Rc<O>, signal: &str, args: &[T]) -> Result<(), SignalError> {
        self.state(owner).registry.fire(signal, args)
    }

    pub fn block(&self, owner: &Rc<O>, signal: Option<&str>, blocked: bool) {
        self.state(owner).registry.block(signal, blocked);
    }

    /// Number of live instances with a slot.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl<O, T> From<Property<O, T>> for SignalerProperty<O, T> {
    fn from(accessors: Property<O, T>) -> Self {
        Self {
            accessors,
            default: None,
            check_change: true,
            name: None,
            defaults: Vec::new(),
            instances: InstanceMap::new(),
        }
    }
}

impl<O: 'static, T: Clone + PartialEq + 'static> Default for SignalerProperty<O, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, T> std::fmt::Debug for SignalerProperty<O, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalerProperty")
            .field("name", &self.name)
            .field("readable", &self.accessors.is_readable())
            .field("writable", &self.accessors.is_writable())
            .field("deletable", &self.accessors.is_deletable())
            .field("check_change", &self.check_change)
            .field("instances", &self.instances.len())
            .finish()
    }
}

// =============================================================================
// BOUND PROPERTY - one instance's value and signals
// =============================================================================

/// A signaling property bound to one owner.
pub struct BoundProperty<O, T> {
    accessors: Property<O, T>,
    default: Option<Rc<T>>,
    check_change: bool,
    owner: Rc<O>,
    state: Rc<PropertyState<T>>,
}

impl<O, T> Clone for BoundProperty<O, T> {
    fn clone(&self) -> Self {
        Self {
            accessors: self.accessors.clone(),
            default: self.default.clone(),
            check_change: self.check_change,
            owner: self.owner.clone(),
            state: self.state.clone(),
        }
    }
}

impl<O, T: Clone + PartialEq + 'static> BoundProperty<O, T> {
    /// Read the value. Fires nothing.
    ///
    /// With a getter the value is computed and cached in the slot; without
    /// one the slot is returned, then the default.
    pub fn get(&self) -> Result<T, SignalError> {
        if let Some(fget) = &self.accessors.fget {
            let value = fget(&self.owner);
            *self.state.value.borrow_mut() = Some(value.clone());
            return Ok(value);
        }
        self.stored().ok_or(SignalError::NoValue)
    }

    fn stored(&self) -> Option<T> {
        self.state
            .value
            .borrow()
            .clone()
            .or_else(|| self.default.as_deref().cloned())
    }

    fn current(&self) -> Option<T> {
        match &self.accessors.fget {
            Some(fget) => Some(fget(&self.owner)),
            None => self.stored(),
        }
    }

    /// Store a value with signals. Returns false if it was unchanged.
    pub fn set(&self, value: T) -> Result<bool, SignalError> {
        let accessors = &self.accessors;
        if accessors.fget.is_some() && accessors.fset.is_none() {
            return Err(SignalError::ReadOnly);
        }
        if self.check_change && self.current().as_ref() == Some(&value) {
            trace!("property value unchanged, skipping signals");
            return Ok(false);
        }

        self.state.registry.fire(BEFORE_CHANGE, slice::from_ref(&value))?;

        let stored = match (&accessors.fset, &accessors.fget) {
            (Some(fset), Some(fget)) => {
                fset(&self.owner, value);
                fget(&self.owner)
            }
            (Some(fset), None) => {
                fset(&self.owner, value.clone());
                value
            }
            (None, _) => value,
        };
        *self.state.value.borrow_mut() = Some(stored.clone());

        self.state.registry.fire(CHANGE, slice::from_ref(&stored))?;
        Ok(true)
    }

    /// Delete the value with signals.
    pub fn delete(&self) -> Result<(), SignalError> {
        let fdel = self
            .accessors
            .fdel
            .as_ref()
            .ok_or(SignalError::NotDeletable)?;

        self.state.registry.fire(BEFORE_DELETE, &[])?;
        fdel(&self.owner);
        self.state.value.borrow_mut().take();
        self.state.registry.fire(DELETE, &[])
    }
}

impl<O, T> BoundProperty<O, T> {
    pub fn owner(&self) -> &Rc<O> {
        &self.owner
    }

    /// Connect `callback` to `signal`, returning a handle that disconnects it.
    pub(crate) fn connect(&self, signal: &'static str, callback: Callback<[T]>) -> Connection
    where
        T: 'static,
    {
        let callback = self.state.registry.on(signal, callback);
        let state = Rc::downgrade(&self.state);
        Connection::new(move || match state.upgrade() {
            Some(state) => state.registry.off(signal, &callback),
            None => Ok(()),
        })
    }
}

impl<O: 'static, T: 'static> BoundProperty<O, T> {
    /// Rebuilds this handle while the owner is alive, without holding it.
    pub(crate) fn weak_handle(&self) -> Box<dyn Fn() -> Option<Self>> {
        let accessors = self.accessors.clone();
        let default = self.default.clone();
        let check_change = self.check_change;
        let owner = Rc::downgrade(&self.owner);
        let state = Rc::downgrade(&self.state);
        Box::new(move || {
            Some(Self {
                accessors: accessors.clone(),
                default: default.clone(),
                check_change,
                owner: owner.upgrade()?,
                state: state.upgrade()?,
            })
        })
    }
}

impl<O, T: 'static> Signals<[T]> for BoundProperty<O, T> {
    fn registry(&self) -> &SignalRegistry<[T]> {
        &self.state.registry
    }
}

// =============================================================================
// TESTS
// =============================================================================
