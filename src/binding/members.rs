// ============================================================================
// event-signals - Member Tables
// Named properties and methods of a type, looked up by the binder and observer
// ============================================================================
//
// Rust has no reflective attribute lookup, so a type lists the members it
// wants reachable by name in a `Members<Self>` table and hands it out through
// `Introspect`. Entries are type-erased and downcast by value type on lookup.
//
// The table is shared: upgrading a plain property or method to its signaling
// form replaces the entry in place, so every later lookup (and every other
// instance of the type) sees the signaling version.
// ============================================================================

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::core::error::SignalError;
use crate::core::types::{Getter, Method};
use crate::primitives::property::{Property, SignalerProperty};
use crate::primitives::signaler::{InstanceControl, Signaler};

/// Types whose members can be found by name.
///
/// Implement it by keeping the table in a `thread_local!`, or with
/// [`introspect!`](crate::introspect):
///
/// ```
/// use event_signals::{introspect, Introspect, Property};
/// use std::cell::Cell;
///
/// struct Slider {
///     value: Cell<f64>,
/// }
///
/// introspect!(Slider, |members| members
///     .property(
///         "value",
///         Property::new()
///             .getter(|s: &Slider| s.value.get())
///             .setter(|s: &Slider, v: f64| s.value.set(v)),
///     )
///     .method("reset", |s: &Slider, _: ()| s.value.set(0.0)));
///
/// assert!(Slider::members().has_property("value"));
/// assert_eq!(Slider::members().method_names(), vec!["reset".to_string()]);
/// ```
pub trait Introspect: Sized + 'static {
    fn members() -> Rc<Members<Self>>;
}

// =============================================================================
// MEMBER ENTRIES
// =============================================================================

/// A property entry, before or after its upgrade.
pub enum PropertyMember<O, T> {
    Plain(Rc<Property<O, T>>),
    Signaling(Rc<SignalerProperty<O, T>>),
}

impl<O, T> Clone for PropertyMember<O, T> {
    fn clone(&self) -> Self {
        match self {
            Self::Plain(property) => Self::Plain(property.clone()),
            Self::Signaling(property) => Self::Signaling(property.clone()),
        }
    }
}

/// A method entry, before or after its upgrade.
pub enum MethodMember<O, A, R> {
    Plain(Method<O, A, R>),
    Signaling(Rc<Signaler<O, A, R>>),
}

impl<O, A, R> Clone for MethodMember<O, A, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Plain(method) => Self::Plain(method.clone()),
            Self::Signaling(signaler) => Self::Signaling(signaler.clone()),
        }
    }
}

impl<O: 'static, A: 'static, R: 'static> MethodMember<O, A, R> {
    /// The underlying function, without signals.
    pub fn method(&self) -> Method<O, A, R> {
        match self {
            Self::Plain(method) => method.clone(),
            Self::Signaling(signaler) => signaler.method(),
        }
    }

    pub fn is_signaling(&self) -> bool {
        matches!(self, Self::Signaling(_))
    }
}

/// A method wrapped for one observed instance.
pub(crate) struct ObservedEntry<O> {
    /// `Rc<Signaler<O, A, R>>`, erased.
    pub(crate) signaler: Rc<dyn Any>,
    pub(crate) control: Rc<dyn InstanceControl<O>>,
}

type ObserveFn<O> = fn(&Rc<dyn Any>) -> Option<ObservedEntry<O>>;

struct MethodEntry<O> {
    member: Rc<dyn Any>,
    observe: ObserveFn<O>,
}

/// Plain methods get a fresh signaler; existing signalers are shared.
fn observe_method<O: 'static, A: 'static, R: 'static>(member: &Rc<dyn Any>) -> Option<ObservedEntry<O>> {
    let signaler = match member.downcast_ref::<MethodMember<O, A, R>>()? {
        MethodMember::Plain(method) => Rc::new(Signaler::from_method(method.clone())),
        MethodMember::Signaling(signaler) => signaler.clone(),
    };
    Some(ObservedEntry {
        signaler: signaler.clone(),
        control: signaler,
    })
}

// =============================================================================
// MEMBERS TABLE
// =============================================================================

/// The named properties and methods of `O`.
pub struct Members<O> {
    properties: RefCell<IndexMap<String, Rc<dyn Any>>>,
    methods: RefCell<IndexMap<String, MethodEntry<O>>>,
}

impl<O: 'static> Members<O> {
    pub fn new() -> Self {
        Self {
            properties: RefCell::new(IndexMap::new()),
            methods: RefCell::new(IndexMap::new()),
        }
    }

    // =========================================================================
    // BUILDER
    // =========================================================================

    pub fn property<T: 'static>(self, name: impl Into<String>, property: Property<O, T>) -> Self {
        self.insert_property(name.into(), PropertyMember::Plain(Rc::new(property)))
    }

    pub fn signaler_property<T: 'static>(
        self,
        name: impl Into<String>,
        property: SignalerProperty<O, T>,
    ) -> Self {
        self.insert_property(name.into(), PropertyMember::Signaling(Rc::new(property)))
    }

    pub fn method<A: 'static, R: 'static>(
        self,
        name: impl Into<String>,
        method: impl Fn(&O, A) -> R + 'static,
    ) -> Self {
        self.insert_method(name.into(), MethodMember::Plain(Rc::new(method)))
    }

    pub fn signaler<A: 'static, R: 'static>(
        self,
        name: impl Into<String>,
        signaler: Signaler<O, A, R>,
    ) -> Self {
        let name = name.into();
        let signaler = match signaler.name() {
            Some(_) => signaler,
            None => signaler.named(name.clone()),
        };
        self.insert_method(name, MethodMember::Signaling(Rc::new(signaler)))
    }

    fn insert_property<T: 'static>(self, name: String, member: PropertyMember<O, T>) -> Self {
        self.properties.borrow_mut().insert(name, Rc::new(member));
        self
    }

    fn insert_method<A: 'static, R: 'static>(self, name: String, member: MethodMember<O, A, R>) -> Self {
        self.methods.borrow_mut().insert(
            name,
            MethodEntry {
                member: Rc::new(member),
                observe: observe_method::<O, A, R>,
            },
        );
        self
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.borrow().contains_key(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.borrow().contains_key(name)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.borrow().keys().cloned().collect()
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.borrow().keys().cloned().collect()
    }

    /// The property called `name`, if its value type is `T`.
    ///
    /// Missing is `Ok(None)`; present with another type is `TypeMismatch`.
    pub fn get_property<T: 'static>(&self, name: &str) -> Result<Option<PropertyMember<O, T>>, SignalError> {
        let properties = self.properties.borrow();
        let Some(entry) = properties.get(name) else {
            return Ok(None);
        };
        entry
            .downcast_ref::<PropertyMember<O, T>>()
            .cloned()
            .map(Some)
            .ok_or_else(|| mismatch::<PropertyMember<O, T>>(name))
    }

    /// The method called `name`, if its signature is `Fn(&O, A) -> R`.
    pub fn get_method<A: 'static, R: 'static>(
        &self,
        name: &str,
    ) -> Result<Option<MethodMember<O, A, R>>, SignalError> {
        let methods = self.methods.borrow();
        let Some(entry) = methods.get(name) else {
            return Ok(None);
        };
        entry
            .member
            .downcast_ref::<MethodMember<O, A, R>>()
            .cloned()
            .map(Some)
            .ok_or_else(|| mismatch::<MethodMember<O, A, R>>(name))
    }

    /// A getter: a method called `name` taking `()` and returning `T`.
    ///
    /// Unlike the other lookups, a method with another signature is skipped.
    pub fn getter<T: 'static>(&self, name: &str) -> Option<Getter<O, T>> {
        let method = self.get_method::<(), T>(name).ok()??.method();
        Some(Rc::new(move |owner: &O| method(owner, ())))
    }

    // =========================================================================
    // UPGRADES
    // =========================================================================

    /// The property called `name` in its signaling form, upgrading it in place.
    pub fn signaling_property<T>(&self, name: &str) -> Result<Option<Rc<SignalerProperty<O, T>>>, SignalError>
    where
        T: Clone + PartialEq + 'static,
    {
        let property = match self.get_property::<T>(name)? {
            None => return Ok(None),
            Some(PropertyMember::Signaling(property)) => return Ok(Some(property)),
            Some(PropertyMember::Plain(property)) => property,
        };

        let upgraded = Rc::new(SignalerProperty::from((*property).clone()).named(name));
        self.properties.borrow_mut().insert(
            name.to_owned(),
            Rc::new(PropertyMember::Signaling(upgraded.clone())),
        );
        debug!(property = name, owner = type_name::<O>(), "property upgraded to signaler");
        Ok(Some(upgraded))
    }

    /// The method called `name` as a signaler, upgrading it in place.
    ///
    /// `getter` is attached only when a plain method is upgraded; an existing
    /// signaler keeps its own.
    pub fn signaling_method<A: 'static, R: 'static>(
        &self,
        name: &str,
        getter: Option<Getter<O, A>>,
    ) -> Result<Option<Rc<Signaler<O, A, R>>>, SignalError> {
        let method = match self.get_method::<A, R>(name)? {
            None => return Ok(None),
            Some(MethodMember::Signaling(signaler)) => return Ok(Some(signaler)),
            Some(MethodMember::Plain(method)) => method,
        };

        let upgraded = Rc::new(
            Signaler::from_method(method)
                .with_shared_getter(getter)
                .named(name),
        );
        if let Some(entry) = self.methods.borrow_mut().get_mut(name) {
            entry.member = Rc::new(MethodMember::Signaling(upgraded.clone()));
        }
        debug!(method = name, owner = type_name::<O>(), "method upgraded to signaler");
        Ok(Some(upgraded))
    }

    /// Wrap every method for one observed instance, in registration order.
    pub(crate) fn observe_all(&self) -> Vec<(String, ObservedEntry<O>)> {
        let methods = self.methods.borrow();
        methods
            .iter()
            .filter_map(|(name, entry)| {
                let observed = (entry.observe)(&entry.member)?;
                Some((name.clone(), observed))
            })
            .collect()
    }
}

impl<O: 'static> Default for Members<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> std::fmt::Debug for Members<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Members")
            .field("properties", &self.properties.borrow().keys().collect::<Vec<_>>())
            .field("methods", &self.methods.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn mismatch<E>(name: &str) -> SignalError {
    SignalError::TypeMismatch {
        name: name.to_owned(),
        expected: type_name::<E>(),
    }
}
