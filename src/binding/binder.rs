// ============================================================================
// event-signals - Binder
// Two-way value binding between named members of two objects
// ============================================================================
//
// bind(a, "x", b, "x"):
//
//   1. resolve both names to accessors (upgrading to signalers as needed)
//   2. connect a propagation callback on each side's `change`
//   3. push A's current value into B
//
// Both callbacks share one guard flag. While a value is being pushed across
// the link, the echo coming back from the other side is dropped, so setting
// either side assigns the other exactly once.
//
// Each callback reaches its target through a weak handle. Dropping either
// owner turns the link inert; it never keeps the other owner alive.
// ============================================================================

use std::any::type_name;
use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::binding::accessor::{Accessor, MethodAccessor, SharedAccessor, WeakAccessor};
use crate::binding::link::Link;
use crate::binding::members::Introspect;
use crate::core::error::SignalError;
use crate::core::types::{address_of, listener, Callback, Getter};
use crate::primitives::observer::Observed;
use crate::primitives::signaler::BoundSignaler;

// =============================================================================
// BINDABLE - objects the binder can look members up on
// =============================================================================

/// An object whose members can be resolved by name.
pub trait Bindable {
    type Owner: Introspect;

    fn owner(&self) -> &Rc<Self::Owner>;

    /// The setter method `name` as a signaler bound to the owner.
    ///
    /// `getter` is attached if a plain method has to be upgraded.
    fn setter<T: Clone + 'static>(
        &self,
        name: &str,
        getter: Option<Getter<Self::Owner, T>>,
    ) -> Result<Option<BoundSignaler<Self::Owner, T, ()>>, SignalError>;
}

impl<O: Introspect> Bindable for Rc<O> {
    type Owner = O;

    fn owner(&self) -> &Rc<O> {
        self
    }

    fn setter<T: Clone + 'static>(
        &self,
        name: &str,
        getter: Option<Getter<O, T>>,
    ) -> Result<Option<BoundSignaler<O, T, ()>>, SignalError> {
        let signaler = O::members().signaling_method::<T, ()>(name, getter)?;
        Ok(signaler.map(|signaler| signaler.bind(self)))
    }
}

impl<O: Introspect> Bindable for Observed<O> {
    type Owner = O;

    fn owner(&self) -> &Rc<O> {
        Observed::owner(self)
    }

    /// Uses the instance's own observed signaler, so calls made through the
    /// `Observed` handle propagate.
    fn setter<T: Clone + 'static>(
        &self,
        name: &str,
        _getter: Option<Getter<O, T>>,
    ) -> Result<Option<BoundSignaler<O, T, ()>>, SignalError> {
        if !self.has_method(name) {
            return Ok(None);
        }
        self.method::<T, ()>(name).map(Some)
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

type Strategy<B, T> = fn(&B, &str) -> Result<Option<SharedAccessor<T>>, SignalError>;

/// A property called `name`, upgraded to a signaling property.
fn property_strategy<B, T>(target: &B, name: &str) -> Result<Option<SharedAccessor<T>>, SignalError>
where
    B: Bindable,
    T: Clone + PartialEq + 'static,
{
    let property = <B::Owner as Introspect>::members().signaling_property::<T>(name)?;
    Ok(property.map(|property| Rc::new(property.bind(target.owner())) as SharedAccessor<T>))
}

/// `set_<name>` with `get_<name>`, `is_<name>` or `has_<name>`.
fn snake_case_strategy<B, T>(target: &B, name: &str) -> Result<Option<SharedAccessor<T>>, SignalError>
where
    B: Bindable,
    T: Clone + PartialEq + 'static,
{
    let getters = [format!("get_{name}"), format!("is_{name}"), format!("has_{name}")];
    method_pair(target, &format!("set_{name}"), &getters)
}

/// `set<name>` with `<name>` or `get<name>`.
fn camel_case_strategy<B, T>(target: &B, name: &str) -> Result<Option<SharedAccessor<T>>, SignalError>
where
    B: Bindable,
    T: Clone + PartialEq + 'static,
{
    let getters = [name.to_owned(), format!("get{name}")];
    method_pair(target, &format!("set{name}"), &getters)
}

/// `name` is itself the setter, e.g. `"set_x"` with getter `"get_x"`.
fn setter_name_strategy<B, T>(target: &B, name: &str) -> Result<Option<SharedAccessor<T>>, SignalError>
where
    B: Bindable,
    T: Clone + PartialEq + 'static,
{
    let getters: Vec<String> = match name.strip_prefix("set") {
        Some(rest) => vec![format!("get{rest}"), format!("is{rest}"), format!("has{rest}")],
        None => Vec::new(),
    };
    method_pair(target, name, &getters)
}

fn method_pair<B, T>(
    target: &B,
    setter: &str,
    getters: &[String],
) -> Result<Option<SharedAccessor<T>>, SignalError>
where
    B: Bindable,
    T: Clone + PartialEq + 'static,
{
    let members = <B::Owner as Introspect>::members();
    if !members.has_method(setter) {
        return Ok(None);
    }
    let getter = getters.iter().find_map(|name| members.getter::<T>(name));
    let Some(bound) = target.setter::<T>(setter, getter.clone())? else {
        return Ok(None);
    };
    Ok(Some(Rc::new(MethodAccessor::new(bound, getter)) as SharedAccessor<T>))
}

/// Find a signal-capable accessor for `name` on `target`.
///
/// Tries, in order: a property; `set_<name>` with `get_`/`is_`/`has_<name>`;
/// `set<name>` with `<name>`/`get<name>`; `name` itself as the setter. Plain
/// properties and methods are upgraded to their signaling form in the type's
/// member table.
pub fn resolve_accessor<T, B>(target: &B, name: &str) -> Result<SharedAccessor<T>, SignalError>
where
    T: Clone + PartialEq + 'static,
    B: Bindable,
{
    let strategies: [Strategy<B, T>; 4] = [
        property_strategy::<B, T>,
        snake_case_strategy::<B, T>,
        camel_case_strategy::<B, T>,
        setter_name_strategy::<B, T>,
    ];

    for strategy in strategies {
        if let Some(accessor) = strategy(target, name)? {
            return Ok(accessor);
        }
    }

    debug!(member = name, owner = type_name::<B::Owner>(), "no accessor found");
    Err(SignalError::NotResolvable {
        name: name.to_owned(),
        type_name: type_name::<B::Owner>(),
    })
}

// =============================================================================
// LINKING
// =============================================================================

fn propagate<T: Clone + 'static>(guard: Rc<Cell<bool>>, target: WeakAccessor<T>) -> Callback<T> {
    listener(move |value: &T| {
        if guard.get() {
            return Ok(());
        }
        let Some(target) = target() else {
            trace!("binding target dropped, nothing to propagate");
            return Ok(());
        };
        guard.set(true);
        let result = target.assign(value.clone());
        guard.set(false);
        result
    })
}

fn connect_pair<T: Clone + 'static>(x: SharedAccessor<T>, y: SharedAccessor<T>) -> Rc<Link> {
    let guard = Rc::new(Cell::new(false));
    let connections = vec![
        x.connect_change(propagate(guard.clone(), y.downgrade())),
        y.connect_change(propagate(guard.clone(), x.downgrade())),
    ];
    Link::attach(
        (x.bindings(), x.owner_id()),
        (y.bindings(), y.owner_id()),
        guard,
        connections,
    )
}

fn detach_all(links: Vec<Rc<Link>>, what: &str) -> Result<usize, SignalError> {
    if links.is_empty() {
        return Err(SignalError::NotBound(what.to_owned()));
    }
    let count = links.len();
    let mut first_error = None;
    for link in links {
        if let Err(err) = link.detach() {
            first_error.get_or_insert(err);
        }
    }
    debug!(binding = what, removed = count, "unbound");
    first_error.map_or(Ok(count), Err)
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Keep `a.name_a` and `b.name_b` equal.
///
/// `name_b` defaults to `name_a`. A's current value is pushed into B right
/// away (skipped if A cannot be read). After that a change on either side is
/// assigned to the other.
///
/// # Example
///
/// ```
/// use event_signals::{bind, introspect, unbind, SignalerProperty};
/// use std::rc::Rc;
///
/// struct Model;
/// struct View;
///
/// introspect!(Model, |members| members
///     .signaler_property("title", SignalerProperty::new().with_default(String::from("draft"))));
/// introspect!(View, |members| members
///     .signaler_property("title", SignalerProperty::<View, String>::new()));
///
/// let model = Rc::new(Model);
/// let view = Rc::new(View);
/// bind::<String, _, _>(&model, "title", &view, None).unwrap();
///
/// let title = |v: &Rc<View>| {
///     event_signals::resolve_accessor::<String, _>(v, "title").unwrap().value()
/// };
/// assert_eq!(title(&view).as_deref(), Some("draft"));
///
/// unbind::<String, _, _>(&model, "title", &view).unwrap();
/// ```
pub fn bind<T, A, B>(a: &A, name_a: &str, b: &B, name_b: Option<&str>) -> Result<(), SignalError>
where
    T: Clone + PartialEq + 'static,
    A: Bindable,
    B: Bindable,
{
    let name_b = name_b.unwrap_or(name_a);
    let x = resolve_accessor::<T, A>(a, name_a)?;
    let y = resolve_accessor::<T, B>(b, name_b)?;

    let link = connect_pair(x.clone(), y.clone());
    if let Some(value) = x.value() {
        if let Err(err) = link.guarded(|| y.assign(value)) {
            return link.detach().and(Err(err));
        }
    }

    debug!(
        a = type_name::<A::Owner>(),
        name_a,
        b = type_name::<B::Owner>(),
        name_b,
        "bound"
    );
    Ok(())
}

/// Remove every binding between `a.name_a` and any member of `b`.
///
/// Fails with `NotBound` if there was none.
pub fn unbind<T, A, B>(a: &A, name_a: &str, b: &B) -> Result<usize, SignalError>
where
    T: Clone + PartialEq + 'static,
    A: Bindable,
    B: Bindable,
{
    let x = resolve_accessor::<T, A>(a, name_a)?;
    let peer = address_of(&**b.owner());
    detach_all(x.bindings().links_where(|end| end.owner_id() == peer), name_a)
}

/// Remove every binding touching `a.name_a`.
pub fn unbind_all<T, A>(a: &A, name_a: &str) -> Result<usize, SignalError>
where
    T: Clone + PartialEq + 'static,
    A: Bindable,
{
    let x = resolve_accessor::<T, A>(a, name_a)?;
    detach_all(x.bindings().links_where(|_| true), name_a)
}

/// Bind two accessors the caller already holds.
///
/// No name resolution and no initial sync.
pub fn bind_signals<T, X, Y>(x: &X, y: &Y) -> Rc<Link>
where
    T: Clone + 'static,
    X: Accessor<T> + Clone + 'static,
    Y: Accessor<T> + Clone + 'static,
{
    connect_pair(Rc::new(x.clone()), Rc::new(y.clone()))
}

/// Remove bindings made with [`bind_signals`] between `x` and `y`, or every
/// binding on `x` when `y` is `None`.
pub fn unbind_signals<T>(x: &dyn Accessor<T>, y: Option<&dyn Accessor<T>>) -> Result<usize, SignalError> {
    let links = match y {
        Some(y) => {
            let peer = y.bindings().id();
            x.bindings().links_where(|end| end.bindings_id() == peer)
        }
        None => x.bindings().links_where(|_| true),
    };
    detach_all(links, "signals")
}

// =============================================================================
// TESTS
// =============================================================================
