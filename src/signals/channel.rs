// ============================================================================
// event-signals - Signal Channel
// The ordered listener list behind one signal name
// ============================================================================

use crate::core::types::{same_callback, Callback};

/// Ordered callbacks for one named signal, plus its blocked flag.
///
/// Insertion order is dispatch order. Duplicates are allowed; `remove` takes
/// out the first matching entry only.
pub struct SignalChannel<A: ?Sized> {
    name: String,
    callbacks: Vec<Callback<A>>,
    blocked: bool,
}

impl<A: ?Sized> SignalChannel<A> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callbacks: Vec::new(),
            blocked: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn callbacks(&self) -> &[Callback<A>] {
        &self.callbacks
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn push(&mut self, callback: Callback<A>) {
        self.callbacks.push(callback);
    }

    /// Position of the first entry sharing `callback`'s allocation.
    pub fn position(&self, callback: &Callback<A>) -> Option<usize> {
        self.callbacks.iter().position(|cb| same_callback(cb, callback))
    }

    pub fn contains(&self, callback: &Callback<A>) -> bool {
        self.position(callback).is_some()
    }

    /// Remove the first occurrence. Returns false if it was not connected.
    pub fn remove(&mut self, callback: &Callback<A>) -> bool {
        match self.position(callback) {
            Some(index) => {
                // `remove`, not `swap_remove`: order must survive
                self.callbacks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every callback, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.callbacks.len();
        self.callbacks.clear();
        count
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }
}

impl<A: ?Sized> std::fmt::Debug for SignalChannel<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalChannel")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks.len())
            .field("blocked", &self.blocked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::listener;

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let a: Callback<i32> = listener(|_| Ok(()));
        let b: Callback<i32> = listener(|_| Ok(()));
        let c: Callback<i32> = listener(|_| Ok(()));

        let mut channel = SignalChannel::new("change");
        channel.push(a.clone());
        channel.push(b.clone());
        channel.push(c.clone());

        assert!(channel.remove(&b));
        assert_eq!(channel.len(), 2);
        assert!(same_callback(&channel.callbacks()[0], &a));
        assert!(same_callback(&channel.callbacks()[1], &c));
    }

    #[test]
    fn duplicates_are_removed_one_at_a_time() {
        let a: Callback<i32> = listener(|_| Ok(()));
        let mut channel = SignalChannel::new("change");
        channel.push(a.clone());
        channel.push(a.clone());

        assert!(channel.remove(&a));
        assert!(channel.contains(&a));
        assert!(channel.remove(&a));
        assert!(!channel.remove(&a));
        assert!(channel.is_empty());
    }

    #[test]
    fn clear_reports_count_and_keeps_flag() {
        let mut channel: SignalChannel<i32> = SignalChannel::new("change");
        channel.push(listener(|_| Ok(())));
        channel.push(listener(|_| Ok(())));
        channel.set_blocked(true);

        assert_eq!(channel.clear(), 2);
        assert!(channel.is_blocked());
        assert_eq!(channel.name(), "change");
    }

    #[test]
    fn debug_shows_listener_count() {
        let mut channel: SignalChannel<i32> = SignalChannel::new("change");
        channel.push(listener(|_| Ok(())));
        let debug = format!("{:?}", channel);
        assert!(debug.contains("SignalChannel"));
        assert!(debug.contains("callbacks: 1"));
    }
}
