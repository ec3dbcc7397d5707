// ============================================================================
// event-signals - Instance Side Table
// Per-owner state for class-level wrappers, keyed by owner identity
// ============================================================================
//
// A `Signaler` or `SignalerProperty` is created once and shared by every
// instance of a type, but each instance needs its own listeners. The wrapper
// keeps this table: owner address -> (weak owner, state).
//
// The owner is held weakly so the table never keeps an instance alive. An
// address can be reused after its owner drops; a dead weak pointer at that
// key marks the entry as stale and it is replaced.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::types::address_of;

struct Entry<O, V> {
    owner: Weak<O>,
    value: Rc<V>,
}

/// Side table mapping live owners to their per-instance state.
pub struct InstanceMap<O, V> {
    entries: RefCell<HashMap<usize, Entry<O, V>>>,
}

impl<O, V> InstanceMap<O, V> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Get the state for `owner`, creating it with `init` on first use.
    ///
    /// `init` runs without the table borrowed, so it may look up other owners.
    pub fn get_or_init(&self, owner: &Rc<O>, init: impl FnOnce() -> V) -> Rc<V> {
        if let Some(value) = self.get(owner) {
            return value;
        }

        let value = Rc::new(init());
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, entry| entry.owner.strong_count() > 0);
        entries.insert(
            address_of(&**owner),
            Entry {
                owner: Rc::downgrade(owner),
                value: value.clone(),
            },
        );
        value
    }

    /// Get the state for `owner` if it was already created.
    pub fn get(&self, owner: &O) -> Option<Rc<V>> {
        let entries = self.entries.borrow();
        entries
            .get(&address_of(owner))
            .filter(|entry| entry.owner.strong_count() > 0)
            .map(|entry| entry.value.clone())
    }

    /// Number of entries whose owner is still alive.
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|entry| entry.owner.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose owner is gone.
    pub fn prune(&self) {
        self.entries
            .borrow_mut()
            .retain(|_, entry| entry.owner.strong_count() > 0);
    }
}

impl<O, V> Default for InstanceMap<O, V> {
    fn default() -> Self {
        Self::new()
    }
}
