// ============================================================================
// event-signals - Signaler
// A function wrapper that fires before_change / change around every call
// ============================================================================
//
// Call protocol, for every invocation:
//
//   1. resolve the registry for this owner (created on first use)
//   2. fire `before_change` with the arguments
//   3. call the wrapped function
//   4. observed value = getter(owner) if configured, else the arguments
//   5. fire `change` with the observed value
//   6. return the wrapped function's result
//
// A listener error in step 2 skips the call. One in step 5 surfaces after the
// call has already taken effect.
// ============================================================================

use std::cell::OnceCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::core::constants::{BEFORE_CHANGE, CHANGE};
use crate::core::error::SignalError;
use crate::core::instances::InstanceMap;
use crate::binding::members::Introspect;
use crate::core::types::{bind_method_callback, Getter, Method, MethodCallback, Signals};
use crate::signals::registry::SignalRegistry;

// =============================================================================
// SIGNALER - class-level wrapper around a method
// =============================================================================

/// A method wrapped with `before_change` / `change` signals.
///
/// The signaler is created once per method and shared by every instance of
/// `O`. Each instance gets its own registry the first time it is bound, so
/// listeners connected through one instance never see calls made on another.
///
/// `A` is the argument type (use a tuple for several arguments) and `R` the
/// return type.
///
/// # Example
///
/// ```
/// use event_signals::{listener, Signaler, Signals, CHANGE};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// struct Point {
///     x: Cell<i32>,
/// }
///
/// let set_x = Signaler::new(|p: &Point, x: i32| p.x.set(x.max(0)))
///     .with_getter(|p: &Point| p.x.get());
///
/// let point = Rc::new(Point { x: Cell::new(0) });
/// let seen = Rc::new(Cell::new(99));
///
/// let bound = set_x.bind(&point);
/// bound.on(CHANGE, listener({
///     let seen = seen.clone();
///     move |x: &i32| {
///         seen.set(*x);
///         Ok(())
///     }
/// }));
///
/// bound.call(-1).unwrap();
/// assert_eq!(seen.get(), 0);
/// ```
pub struct Signaler<O, A, R = ()> {
    func: Method<O, A, R>,
    getter: Option<Getter<O, A>>,
    named_getter: Option<NamedGetter<O, A>>,
    name: Option<String>,
    defaults: Vec<(String, MethodCallback<O, A>)>,
    instances: InstanceMap<O, SignalRegistry<A>>,
}

impl<O: 'static, A: 'static, R: 'static> Signaler<O, A, R> {
    pub fn new(func: impl Fn(&O, A) -> R + 'static) -> Self {
        Self::from_method(Rc::new(func))
    }

    /// Wrap an already shared method.
    pub fn from_method(func: Method<O, A, R>) -> Self {
        Self {
            func,
            getter: None,
            named_getter: None,
            name: None,
            defaults: Vec::new(),
            instances: InstanceMap::new(),
        }
    }

    /// Read the observed value back from the owner after each call.
    pub fn with_getter(mut self, getter: impl Fn(&O) -> A + 'static) -> Self {
        self.getter = Some(Rc::new(getter));
        self
    }

    pub(crate) fn with_shared_getter(mut self, getter: Option<Getter<O, A>>) -> Self {
        self.getter = getter;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Connect a listener to `signal` on every instance.
    ///
    /// The callback receives the owner as well as the arguments. It is copied
    /// into each instance registry when that registry is created.
    pub fn on_each(mut self, signal: impl Into<String>, callback: MethodCallback<O, A>) -> Self {
        self.defaults.push((signal.into(), callback));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_getter(&self) -> bool {
        self.getter.is_some() || self.named_getter.is_some()
    }

    /// The wrapped function, without signals.
    pub fn method(&self) -> Method<O, A, R> {
        self.func.clone()
    }

    /// The registry for `owner`, created on first use.
    pub fn registry(&self, owner: &Rc<O>) -> Rc<SignalRegistry<A>> {
        self.instances.get_or_init(owner, || {
            let registry = SignalRegistry::new();
            for (signal, callback) in &self.defaults {
                registry.on(signal, bind_method_callback(callback.clone(), Rc::downgrade(owner)));
            }
            trace!(
                method = self.name.as_deref().unwrap_or("<anonymous>"),
                defaults = self.defaults.len(),
                "instance registry created"
            );
            registry
        })
    }

    /// The explicit getter, else the named one looked up on first use.
    fn resolved_getter(&self) -> Option<Getter<O, A>> {
        if let Some(getter) = &self.getter {
            return Some(getter.clone());
        }
        let named = self.named_getter.as_ref()?;
        named
            .resolved
            .get_or_init(|| {
                let getter = (named.lookup)(&named.name);
                if getter.is_none() {
                    debug!(
                        getter = named.name.as_str(),
                        "getter method not found, observing arguments"
                    );
                }
                getter
            })
            .clone()
    }

    /// Bind to one instance, producing a callable handle with its signals.
    pub fn bind(&self, owner: &Rc<O>) -> BoundSignaler<O, A, R> {
        BoundSignaler {
            func: self.func.clone(),
            getter: self.resolved_getter(),
            owner: owner.clone(),
            registry: self.registry(owner),
        }
    }

    /// Number of live instances with a registry.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// A getter given by method name, resolved through the owner's members.
struct NamedGetter<O, A> {
    name: String,
    lookup: fn(&str) -> Option<Getter<O, A>>,
    resolved: OnceCell<Option<Getter<O, A>>>,
}

fn lookup_getter<O: Introspect, A: 'static>(name: &str) -> Option<Getter<O, A>> {
    O::members().getter::<A>(name)
}

impl<O: Introspect, A: 'static, R: 'static> Signaler<O, A, R> {
    /// Read the observed value back through the method called `name`.
    ///
    /// The method must take `()` and return `A`. It is looked up in
    /// `O::members()` the first time the signaler is bound; if there is no
    /// such method the arguments are observed instead.
    pub fn with_getter_named(mut self, name: impl Into<String>) -> Self {
        self.named_getter = Some(NamedGetter {
            name: name.into(),
            lookup: lookup_getter::<O, A>,
            resolved: OnceCell::new(),
        });
        self
    }
}

impl<O: 'static, A: Clone + 'static, R: 'static> Signaler<O, A, R> {
    /// Call the wrapped method on `owner` with signals.
    pub fn call(&self, owner: &Rc<O>, args: A) -> Result<R, SignalError> {
        self.bind(owner).call(args)
    }
}

impl<O, A, R> std::fmt::Debug for Signaler<O, A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signaler")
            .field("name", &self.name)
            .field("getter", &self.getter.is_some())
            .field("named_getter", &self.named_getter.as_ref().map(|named| &named.name))
            .field("defaults", &self.defaults.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}

// =============================================================================
// INSTANCE CONTROL - type-erased per-owner access
// =============================================================================

/// Registry control for one owner without knowing the argument types.
///
/// Lets a collection of signalers with different signatures be blocked or
/// inspected together.
pub trait InstanceControl<O> {
    fn block_instance(&self, owner: &Rc<O>, signal: Option<&str>, block: bool);

    fn is_instance_blocked(&self, owner: &Rc<O>, signal: Option<&str>) -> bool;

    fn instance_signal_names(&self, owner: &Rc<O>) -> Vec<String>;
}

impl<O: 'static, A: 'static, R: 'static> InstanceControl<O> for Signaler<O, A, R> {
    fn block_instance(&self, owner: &Rc<O>, signal: Option<&str>, block: bool) {
        self.registry(owner).block(signal, block);
    }

    fn is_instance_blocked(&self, owner: &Rc<O>, signal: Option<&str>) -> bool {
        self.registry(owner).is_blocked(signal)
    }

    fn instance_signal_names(&self, owner: &Rc<O>) -> Vec<String> {
        self.registry(owner).signal_names()
    }
}

// =============================================================================
// BOUND SIGNALER - one instance's view
// =============================================================================

/// A signaler bound to one owner.
///
/// Cheap to clone; clones share the owner's registry.
pub struct BoundSignaler<O, A, R = ()> {
    func: Method<O, A, R>,
    getter: Option<Getter<O, A>>,
    owner: Rc<O>,
    registry: Rc<SignalRegistry<A>>,
}

impl<O, A, R> Clone for BoundSignaler<O, A, R> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
            getter: self.getter.clone(),
            owner: self.owner.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<O, A: Clone + 'static, R> BoundSignaler<O, A, R> {
    /// Call the wrapped method with signals.
    pub fn call(&self, args: A) -> Result<R, SignalError> {
        self.registry.fire(BEFORE_CHANGE, &args)?;

        let (result, observed) = match &self.getter {
            Some(getter) => {
                let result = (self.func)(&self.owner, args);
                (result, getter(&self.owner))
            }
            None => {
                let observed = args.clone();
                ((self.func)(&self.owner, args), observed)
            }
        };

        self.registry.fire(CHANGE, &observed)?;
        Ok(result)
    }
}

impl<O, A, R> BoundSignaler<O, A, R> {
    pub fn owner(&self) -> &Rc<O> {
        &self.owner
    }

    /// The current observed value, if a getter is configured.
    pub fn observed(&self) -> Option<A> {
        self.getter.as_ref().map(|getter| getter(&self.owner))
    }

    pub(crate) fn shared_registry(&self) -> &Rc<SignalRegistry<A>> {
        &self.registry
    }
}

impl<O: 'static, A: 'static, R: 'static> BoundSignaler<O, A, R> {
    /// Rebuilds this handle while the owner and its registry are alive.
    pub(crate) fn weak_handle(&self) -> Box<dyn Fn() -> Option<Self>> {
        let func = self.func.clone();
        let getter = self.getter.clone();
        let owner = Rc::downgrade(&self.owner);
        let registry = Rc::downgrade(&self.registry);
        Box::new(move || {
            Some(Self {
                func: func.clone(),
                getter: getter.clone(),
                owner: owner.upgrade()?,
                registry: registry.upgrade()?,
            })
        })
    }
}

impl<O, A: 'static, R> Signals<A> for BoundSignaler<O, A, R> {
    fn registry(&self) -> &SignalRegistry<A> {
        &self.registry
    }
}

// =============================================================================
// FN SIGNALER - free function with a single registry
// =============================================================================

/// A free function wrapped with `before_change` / `change` signals.
///
/// Unlike [`Signaler`] there is no owner, so there is exactly one registry.
///
/// # Example
///
/// ```
/// use event_signals::{listener, signaler, Signals, BEFORE_CHANGE};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let double = signaler(|x: i32| x * 2);
///
/// double.on(BEFORE_CHANGE, listener({
///     let log = log.clone();
///     move |x: &i32| {
///         log.borrow_mut().push(*x);
///         Ok(())
///     }
/// }));
///
/// assert_eq!(double.call(21).unwrap(), 42);
/// assert_eq!(*log.borrow(), vec![21]);
/// ```
pub struct FnSignaler<A, R = ()> {
    func: Rc<dyn Fn(A) -> R>,
    getter: Option<Rc<dyn Fn() -> A>>,
    registry: Rc<SignalRegistry<A>>,
}

impl<A: 'static, R: 'static> FnSignaler<A, R> {
    pub fn new(func: impl Fn(A) -> R + 'static) -> Self {
        Self {
            func: Rc::new(func),
            getter: None,
            registry: Rc::new(SignalRegistry::new()),
        }
    }

    /// Compute the observed value after each call instead of reusing the arguments.
    pub fn with_getter(mut self, getter: impl Fn() -> A + 'static) -> Self {
        self.getter = Some(Rc::new(getter));
        self
    }

    pub fn observed(&self) -> Option<A> {
        self.getter.as_ref().map(|getter| getter())
    }

    pub(crate) fn shared_registry(&self) -> &Rc<SignalRegistry<A>> {
        &self.registry
    }

    pub(crate) fn weak_handle(&self) -> Box<dyn Fn() -> Option<Self>> {
        let func = self.func.clone();
        let getter = self.getter.clone();
        let registry = Rc::downgrade(&self.registry);
        Box::new(move || {
            Some(Self {
                func: func.clone(),
                getter: getter.clone(),
                registry: registry.upgrade()?,
            })
        })
    }
}

impl<A: Clone + 'static, R: 'static> FnSignaler<A, R> {
    pub fn call(&self, args: A) -> Result<R, SignalError> {
        self.registry.fire(BEFORE_CHANGE, &args)?;

        let (result, observed) = match &self.getter {
            Some(getter) => {
                let result = (self.func)(args);
                (result, getter())
            }
            None => {
                let observed = args.clone();
                ((self.func)(args), observed)
            }
        };

        self.registry.fire(CHANGE, &observed)?;
        Ok(result)
    }
}

impl<A, R> Clone for FnSignaler<A, R> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
            getter: self.getter.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<A: 'static, R> Signals<A> for FnSignaler<A, R> {
    fn registry(&self) -> &SignalRegistry<A> {
        &self.registry
    }
}

/// Wrap a free function with signals.
pub fn signaler<A, R>(func: impl Fn(A) -> R + 'static) -> FnSignaler<A, R>
where
    A: 'static,
    R: 'static,
{
    FnSignaler::new(func)
}

// =============================================================================
// TESTS
// =============================================================================
