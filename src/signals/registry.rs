// ============================================================================
// event-signals - Signal Registry
// Named channels for one host: get / on / off / fire / block
// ============================================================================
//
// Channels are created lazily the first time a name is referenced by
// `get_signal`, `on`, `fire` or `block`, and iterate in creation order.
//
// Dispatch uses the collect-then-call pattern: the callback list is cloned
// while the channel map is borrowed, the borrow is released, and only then are
// callbacks invoked. A listener may therefore fire, connect or disconnect on
// this same registry without a borrow panic; such changes apply from the next
// `fire` on.
// ============================================================================

use std::cell::{Cell, RefCell};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::channel::SignalChannel;
use crate::binding::link::Bindings;
use crate::core::error::SignalError;
use crate::core::types::Callback;

/// The signal channels owned by one host.
///
/// `A` is the argument type every channel of this host is fired with. It may
/// be unsized: property hosts use `[T]`, so change signals carry one value and
/// delete signals carry none.
///
/// # Example
///
/// ```
/// use event_signals::{listener, SignalRegistry};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let registry = SignalRegistry::<i32>::new();
///
/// registry.on("change", listener({
///     let seen = seen.clone();
///     move |v: &i32| {
///         seen.borrow_mut().push(*v);
///         Ok(())
///     }
/// }));
///
/// registry.fire("change", &1).unwrap();
/// registry.block(Some("change"), true);
/// registry.fire("change", &2).unwrap();
///
/// assert_eq!(*seen.borrow(), vec![1]);
/// ```
pub struct SignalRegistry<A: ?Sized> {
    channels: RefCell<IndexMap<String, SignalChannel<A>>>,
    blocked: Cell<bool>,
    bindings: Bindings,
}

impl<A: ?Sized + 'static> SignalRegistry<A> {
    pub fn new() -> Self {
        Self {
            channels: RefCell::new(IndexMap::new()),
            blocked: Cell::new(false),
            bindings: Bindings::default(),
        }
    }

    /// Run `f` on the channel for `name`, creating it if absent.
    fn with_channel<R>(&self, name: &str, f: impl FnOnce(&mut SignalChannel<A>) -> R) -> R {
        let mut channels = self.channels.borrow_mut();
        if let Some(channel) = channels.get_mut(name) {
            return f(channel);
        }
        let channel = channels
            .entry(name.to_owned())
            .or_insert_with(|| SignalChannel::new(name));
        f(channel)
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Callbacks connected to `name`, creating an empty channel if needed.
    pub fn get_signal(&self, name: &str) -> Vec<Callback<A>> {
        self.with_channel(name, |channel| channel.callbacks().to_vec())
    }

    /// Callbacks connected to `name`, failing if the channel was never created.
    pub fn try_get_signal(&self, name: &str) -> Result<Vec<Callback<A>>, SignalError> {
        self.channels
            .borrow()
            .get(name)
            .map(|channel| channel.callbacks().to_vec())
            .ok_or_else(|| SignalError::SignalNotFound(name.to_owned()))
    }

    /// Whether a channel named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.borrow().contains_key(name)
    }

    /// Number of callbacks on `name` (0 if the channel does not exist).
    pub fn listener_count(&self, name: &str) -> usize {
        self.channels
            .borrow()
            .get(name)
            .map_or(0, SignalChannel::len)
    }

    /// Names of every channel, in creation order.
    pub fn signal_names(&self) -> Vec<String> {
        self.channels.borrow().keys().cloned().collect()
    }

    // =========================================================================
    // CONNECT / DISCONNECT
    // =========================================================================

    /// Append `callback` to `name`. Returns the same handle for `off`.
    pub fn on(&self, name: &str, callback: Callback<A>) -> Callback<A> {
        self.with_channel(name, |channel| channel.push(callback.clone()));
        callback
    }

    /// Remove the first occurrence of `callback` from `name`.
    pub fn off(&self, name: &str, callback: &Callback<A>) -> Result<(), SignalError> {
        let mut channels = self.channels.borrow_mut();
        let channel = channels
            .get_mut(name)
            .ok_or_else(|| SignalError::SignalNotFound(name.to_owned()))?;
        if channel.remove(callback) {
            Ok(())
        } else {
            Err(SignalError::CallbackNotFound(name.to_owned()))
        }
    }

    /// Remove every callback from `name`. Returns how many were removed.
    pub fn off_all(&self, name: &str) -> usize {
        self.channels
            .borrow_mut()
            .get_mut(name)
            .map_or(0, SignalChannel::clear)
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Call every callback on `name`, in order, with `args`.
    ///
    /// Does nothing while the registry or the channel is blocked. The first
    /// callback error stops the dispatch and is returned as is.
    pub fn fire(&self, name: &str, args: &A) -> Result<(), SignalError> {
        if self.blocked.get() {
            trace!(signal = name, "registry blocked, skipping dispatch");
            return Ok(());
        }

        let snapshot = self.with_channel(name, |channel| {
            if channel.is_blocked() {
                None
            } else {
                Some(channel.callbacks().to_vec())
            }
        });

        let Some(callbacks) = snapshot else {
            trace!(signal = name, "signal blocked, skipping dispatch");
            return Ok(());
        };

        trace!(signal = name, listeners = callbacks.len(), "dispatching signal");
        for callback in callbacks {
            callback(args)?;
        }
        Ok(())
    }

    // =========================================================================
    // BLOCKING
    // =========================================================================

    /// Block or unblock one signal, or the whole registry when `name` is `None`.
    pub fn block(&self, name: Option<&str>, block: bool) {
        match name {
            Some(name) => {
                self.with_channel(name, |channel| channel.set_blocked(block));
                debug!(signal = name, blocked = block, "signal block changed");
            }
            None => {
                self.blocked.set(block);
                debug!(blocked = block, "registry block changed");
            }
        }
    }

    /// With a name, that channel's own flag; without, the registry-wide flag.
    pub fn is_blocked(&self, name: Option<&str>) -> bool {
        match name {
            Some(name) => self
                .channels
                .borrow()
                .get(name)
                .is_some_and(SignalChannel::is_blocked),
            None => self.blocked.get(),
        }
    }

    /// Binding records attached to this host.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

impl<A: ?Sized + 'static> Default for SignalRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> std::fmt::Debug for SignalRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalRegistry")
            .field("channels", &*self.channels.borrow())
            .field("blocked", &self.blocked.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{listener, same_callback};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Callback<i32> {
        let log = log.clone();
        listener(move |v: &i32| {
            log.borrow_mut().push(format!("{tag}{v}"));
            Ok(())
        })
    }

    #[test]
    fn fire_runs_in_attach_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = SignalRegistry::new();

        registry.on("change", recorder(&log, "a"));
        registry.on("change", recorder(&log, "b"));
        registry.on("change", recorder(&log, "c"));
        registry.fire("change", &1).unwrap();

        assert_eq!(*log.borrow(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn get_signal_creates_lazily() {
        let registry = SignalRegistry::<i32>::new();
        assert!(!registry.contains("custom"));
        assert!(registry.try_get_signal("custom").is_err_and(|err| err.is_not_found()));

        assert!(registry.get_signal("custom").is_empty());
        assert!(registry.contains("custom"));
        assert!(registry.try_get_signal("custom").unwrap().is_empty());
    }

    #[test]
    fn fire_creates_channel() {
        let registry = SignalRegistry::<i32>::new();
        registry.fire("custom", &1).unwrap();
        assert_eq!(registry.signal_names(), vec!["custom".to_string()]);
    }

    #[test]
    fn off_twice_attached_then_not_found() {
        let registry = SignalRegistry::<i32>::new();
        let cb = listener(|_: &i32| Ok(()));

        registry.on("change", cb.clone());
        registry.on("change", cb.clone());

        registry.off("change", &cb).unwrap();
        assert_eq!(registry.listener_count("change"), 1);
        registry.off("change", &cb).unwrap();
        assert_eq!(registry.listener_count("change"), 0);

        let err = registry.off("change", &cb).unwrap_err();
        assert!(matches!(err, SignalError::CallbackNotFound(ref n) if n == "change"));
    }

    #[test]
    fn off_on_missing_channel() {
        let registry = SignalRegistry::<i32>::new();
        let cb = listener(|_: &i32| Ok(()));
        let err = registry.off("nothing", &cb).unwrap_err();
        assert!(matches!(err, SignalError::SignalNotFound(_)));
    }

    #[test]
    fn off_all_clears_channel() {
        let registry = SignalRegistry::<i32>::new();
        registry.on("change", listener(|_| Ok(())));
        registry.on("change", listener(|_| Ok(())));

        assert_eq!(registry.off_all("change"), 2);
        assert_eq!(registry.off_all("change"), 0);
        assert_eq!(registry.off_all("missing"), 0);
    }

    #[test]
    fn channel_block_and_restore() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = SignalRegistry::new();
        registry.on("change", recorder(&log, "x"));

        registry.block(Some("change"), true);
        assert!(registry.is_blocked(Some("change")));
        registry.fire("change", &1).unwrap();
        assert!(log.borrow().is_empty());

        registry.block(Some("change"), false);
        registry.fire("change", &2).unwrap();
        assert_eq!(*log.borrow(), vec!["x2"]);
    }

    #[test]
    fn global_block_mutes_every_channel() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = SignalRegistry::new();
        registry.on("before_change", recorder(&log, "b"));
        registry.on("change", recorder(&log, "c"));

        registry.block(None, true);
        registry.fire("before_change", &1).unwrap();
        registry.fire("change", &1).unwrap();
        assert!(log.borrow().is_empty());

        // Named query still reports the channel's own flag
        assert!(registry.is_blocked(None));
        assert!(!registry.is_blocked(Some("change")));

        registry.block(None, false);
        registry.fire("change", &3).unwrap();
        assert_eq!(*log.borrow(), vec!["c3"]);
    }

    #[test]
    fn block_before_any_listener_creates_channel() {
        let registry = SignalRegistry::<i32>::new();
        registry.block(Some("later"), true);
        assert!(registry.contains("later"));

        let hits = Rc::new(RefCell::new(0));
        registry.on("later", listener({
            let hits = hits.clone();
            move |_: &i32| {
                *hits.borrow_mut() += 1;
                Ok(())
            }
        }));
        registry.fire("later", &0).unwrap();
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn listener_error_aborts_remaining() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = SignalRegistry::new();

        registry.on("change", recorder(&log, "a"));
        registry.on("change", listener(|_: &i32| Err(SignalError::aborted("boom"))));
        registry.on("change", recorder(&log, "c"));

        let err = registry.fire("change", &1).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(*log.borrow(), vec!["a1"]);
    }

    #[test]
    fn listener_can_disconnect_itself_during_fire() {
        let registry = Rc::new(SignalRegistry::<i32>::new());
        let hits = Rc::new(RefCell::new(0));
        let handle: Rc<RefCell<Option<Callback<i32>>>> = Rc::new(RefCell::new(None));

        let once = listener({
            let registry = Rc::downgrade(&registry);
            let handle = handle.clone();
            let hits = hits.clone();
            move |_: &i32| {
                *hits.borrow_mut() += 1;
                if let (Some(registry), Some(me)) = (registry.upgrade(), handle.borrow().clone()) {
                    registry.off("change", &me)?;
                }
                Ok(())
            }
        });
        *handle.borrow_mut() = Some(registry.on("change", once));

        registry.fire("change", &1).unwrap();
        registry.fire("change", &2).unwrap();
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(registry.listener_count("change"), 0);
    }

    #[test]
    fn listener_added_during_fire_runs_next_time() {
        let registry = Rc::new(SignalRegistry::<i32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        registry.on("change", listener({
            let registry = Rc::downgrade(&registry);
            let log = log.clone();
            move |v: &i32| {
                log.borrow_mut().push(format!("outer{v}"));
                if let Some(registry) = registry.upgrade() {
                    if registry.listener_count("change") == 1 {
                        registry.on("change", recorder(&log, "late"));
                    }
                }
                Ok(())
            }
        }));

        registry.fire("change", &1).unwrap();
        assert_eq!(*log.borrow(), vec!["outer1"]);

        registry.fire("change", &2).unwrap();
        assert_eq!(*log.borrow(), vec!["outer1", "outer2", "late2"]);
    }

    #[test]
    fn nested_fire_on_same_registry() {
        let registry = Rc::new(SignalRegistry::<i32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        registry.on("outer", listener({
            let registry = Rc::downgrade(&registry);
            move |v: &i32| match registry.upgrade() {
                Some(registry) => registry.fire("inner", &(v * 10)),
                None => Ok(()),
            }
        }));
        registry.on("inner", recorder(&log, "inner"));

        registry.fire("outer", &4).unwrap();
        assert_eq!(*log.borrow(), vec!["inner40"]);
    }

    #[test]
    fn get_signal_returns_handles_in_order() {
        let registry = SignalRegistry::<i32>::new();
        let a = registry.on("change", listener(|_| Ok(())));
        let b = registry.on("change", listener(|_| Ok(())));

        let callbacks = registry.get_signal("change");
        assert_eq!(callbacks.len(), 2);
        assert!(same_callback(&callbacks[0], &a));
        assert!(same_callback(&callbacks[1], &b));
    }

    #[test]
    fn unsized_slice_arguments() {
        let registry = SignalRegistry::<[i32]>::new();
        let total = Rc::new(RefCell::new(0));
        registry.on("delete", listener({
            let total = total.clone();
            move |args: &[i32]| {
                *total.borrow_mut() += args.len();
                Ok(())
            }
        }));

        registry.fire("delete", &[]).unwrap();
        registry.fire("delete", &[1, 2]).unwrap();
        assert_eq!(*total.borrow(), 2);
    }
}
