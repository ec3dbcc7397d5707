use event_signals::{
    bind, introspect, listener, resolve_accessor, unbind, unbind_all, Introspect, Observed,
    Property, SignalError, BEFORE_CHANGE,
};
use rstest::rstest;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Default)]
struct Widget {
    width: Cell<i32>,
    height: Cell<i32>,
    size: Cell<i32>,
    weight: Cell<i32>,
    margin: Cell<i32>,
}

introspect!(Widget, |members| members
    .property(
        "width",
        Property::new()
            .getter(|w: &Widget| w.width.get())
            .setter(|w: &Widget, v: i32| w.width.set(v)),
    )
    .method("set_height", |w: &Widget, v: i32| w.height.set(v))
    .method("get_height", |w: &Widget, _: ()| w.height.get())
    .method("setSize", |w: &Widget, v: i32| w.size.set(v))
    .method("Size", |w: &Widget, _: ()| w.size.get())
    .method("setWeight", |w: &Widget, v: i32| w.weight.set(v))
    .method("getWeight", |w: &Widget, _: ()| w.weight.get())
    .method("set_margin", |w: &Widget, v: i32| w.margin.set(v.max(0)))
    .method("get_margin", |w: &Widget, _: ()| w.margin.get()));

fn widget() -> Rc<Widget> {
    Rc::new(Widget::default())
}

fn assign(w: &Rc<Widget>, name: &str, value: i32) {
    resolve_accessor::<i32, _>(w, name)
        .unwrap()
        .assign(value)
        .unwrap();
}

// =============================================================================
// RESOLUTION
// =============================================================================

#[rstest]
#[case::property("width", |w: &Widget| w.width.get())]
#[case::snake_case_pair("height", |w: &Widget| w.height.get())]
#[case::camel_case_with_bare_getter("Size", |w: &Widget| w.size.get())]
#[case::camel_case_with_get_prefix("Weight", |w: &Widget| w.weight.get())]
#[case::setter_name("set_margin", |w: &Widget| w.margin.get())]
fn every_naming_convention_resolves(#[case] name: &str, #[case] field: fn(&Widget) -> i32) {
    let w = widget();
    let accessor = resolve_accessor::<i32, _>(&w, name).unwrap();

    accessor.assign(7).unwrap();

    assert_eq!(field(&w), 7);
    assert_eq!(accessor.value(), Some(7));
}

#[test]
fn resolution_upgrades_the_shared_table() {
    resolve_accessor::<i32, _>(&widget(), "height").unwrap();
    let set_height = Widget::members()
        .get_method::<i32, ()>("set_height")
        .unwrap()
        .unwrap();
    assert!(set_height.is_signaling());
}

#[test]
fn wrong_value_type_is_reported() {
    let err = resolve_accessor::<String, _>(&widget(), "width").err().unwrap();
    assert!(matches!(err, SignalError::TypeMismatch { .. }));
}

// =============================================================================
// BIND / UNBIND
// =============================================================================

#[test]
fn bound_values_follow_until_unbound() {
    let a = widget();
    let b = widget();
    bind::<i32, _, _>(&a, "width", &b, None).unwrap();

    assign(&b, "width", 5);
    assert_eq!(a.width.get(), 5);

    unbind::<i32, _, _>(&a, "width", &b).unwrap();
    assign(&b, "width", 9);
    assert_eq!(a.width.get(), 5);
}

#[test]
fn different_names_on_each_side() {
    let a = widget();
    let b = widget();
    a.height.set(12);
    bind::<i32, _, _>(&a, "height", &b, Some("Size")).unwrap();
    assert_eq!(b.size.get(), 12);

    assign(&b, "Size", 4);
    assert_eq!(a.height.get(), 4);
}

#[test]
fn clamped_side_does_not_echo() {
    let a = widget();
    let b = widget();
    bind::<i32, _, _>(&a, "width", &b, Some("set_margin")).unwrap();

    assign(&a, "width", -6);
    assert_eq!(b.margin.get(), 0);
    assert_eq!(a.width.get(), -6);
}

#[test]
fn failed_initial_sync_leaves_nothing_bound() {
    let a = widget();
    let b = widget();
    a.width.set(3);
    let width = Widget::members()
        .signaling_property::<i32>("width")
        .unwrap()
        .unwrap();
    width.on(&b, BEFORE_CHANGE, listener(|_: &[i32]| Err(SignalError::aborted("locked"))));

    assert!(bind::<i32, _, _>(&a, "width", &b, None).is_err());
    assert_eq!(b.width.get(), 0);
    assert!(resolve_accessor::<i32, _>(&a, "width").unwrap().bindings().is_empty());
}

#[test]
fn unbind_all_clears_every_peer() {
    let hub = widget();
    let peers: Vec<_> = (0..3).map(|_| widget()).collect();
    for peer in &peers {
        bind::<i32, _, _>(&hub, "height", peer, None).unwrap();
    }

    assert_eq!(unbind_all::<i32, _>(&hub, "height").unwrap(), 3);
    assert!(matches!(
        unbind_all::<i32, _>(&hub, "height"),
        Err(SignalError::NotBound(_))
    ));
}

// =============================================================================
// OBSERVED INSTANCES
// =============================================================================

#[test]
fn observed_instance_binds_like_a_plain_one() {
    let observed = Observed::new(Widget::default());
    let plain = widget();
    bind::<i32, _, _>(&observed, "height", &plain, None).unwrap();

    observed.call::<i32, ()>("set_height", 8).unwrap();
    assert_eq!(plain.height.get(), 8);

    assign(&plain, "height", 2);
    assert_eq!(observed.height.get(), 2);
}
