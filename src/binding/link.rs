// ============================================================================
// event-signals - Binding Records
// The bookkeeping that lets `unbind` remove exactly what `bind` added
// ============================================================================
//
// A binding connects two hosts. Each side gets one propagation callback on its
// `change` channel, and both sides record the same `Link` in their registry's
// `Bindings` list. The link owns the two `Connection`s, so detaching it
// disconnects both callbacks and drops it from both lists.
//
// Links are type-erased: they only know how to disconnect, and which
// registries and owners they join.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::error::SignalError;
use crate::core::types::ListenerResult;

type LinkList = RefCell<Vec<Rc<Link>>>;

// =============================================================================
// CONNECTION
// =============================================================================

/// A connected callback that knows how to disconnect itself.
pub struct Connection {
    disconnect: Box<dyn FnOnce() -> ListenerResult>,
}

impl Connection {
    pub fn new(disconnect: impl FnOnce() -> ListenerResult + 'static) -> Self {
        Self {
            disconnect: Box::new(disconnect),
        }
    }

    /// Remove the callback from the channel it was connected to.
    pub fn disconnect(self) -> Result<(), SignalError> {
        (self.disconnect)()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

// =============================================================================
// BINDINGS - per-registry list of links
// =============================================================================

/// The links attached to one registry.
#[derive(Default)]
pub struct Bindings {
    links: Rc<LinkList>,
}

impl Bindings {
    /// Identity of this list, shared by every accessor over the same registry.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.links) as *const () as usize
    }

    pub fn len(&self) -> usize {
        self.links.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.borrow().is_empty()
    }

    /// Snapshot of the current links.
    pub fn links(&self) -> Vec<Rc<Link>> {
        self.links.borrow().clone()
    }

    /// Links whose other end matches `matches`.
    pub fn links_where(&self, matches: impl Fn(&Endpoint) -> bool) -> Vec<Rc<Link>> {
        let id = self.id();
        self.links
            .borrow()
            .iter()
            .filter(|link| link.peer_of(id).is_some_and(&matches))
            .cloned()
            .collect()
    }

    fn attach(&self, link: Rc<Link>) {
        self.links.borrow_mut().push(link);
    }

    fn endpoint(&self, owner_id: usize) -> Endpoint {
        Endpoint {
            list: Rc::downgrade(&self.links),
            bindings_id: self.id(),
            owner_id,
        }
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("links", &self.len())
            .finish()
    }
}

// =============================================================================
// LINK
// =============================================================================

/// One side of a link.
pub struct Endpoint {
    list: Weak<LinkList>,
    bindings_id: usize,
    owner_id: usize,
}

impl Endpoint {
    pub fn bindings_id(&self) -> usize {
        self.bindings_id
    }

    pub fn owner_id(&self) -> usize {
        self.owner_id
    }
}

/// A two-way binding between two registries.
pub struct Link {
    ends: [Endpoint; 2],
    guard: Rc<Cell<bool>>,
    connections: RefCell<Vec<Connection>>,
}

impl Link {
    /// Record a link on both sides.
    ///
    /// `guard` is the flag shared with the propagation callbacks; it is set
    /// while a value is being pushed across the link.
    pub(crate) fn attach(
        x: (&Bindings, usize),
        y: (&Bindings, usize),
        guard: Rc<Cell<bool>>,
        connections: Vec<Connection>,
    ) -> Rc<Self> {
        let link = Rc::new(Self {
            ends: [x.0.endpoint(x.1), y.0.endpoint(y.1)],
            guard,
            connections: RefCell::new(connections),
        });
        x.0.attach(link.clone());
        if x.0.id() != y.0.id() {
            y.0.attach(link.clone());
        }
        link
    }

    /// The end opposite the registry identified by `bindings_id`.
    pub fn peer_of(&self, bindings_id: usize) -> Option<&Endpoint> {
        let [a, b] = &self.ends;
        if a.bindings_id == bindings_id {
            Some(b)
        } else if b.bindings_id == bindings_id {
            Some(a)
        } else {
            None
        }
    }

    pub fn ends(&self) -> &[Endpoint; 2] {
        &self.ends
    }

    /// Whether a value is currently being propagated across this link.
    pub fn is_propagating(&self) -> bool {
        self.guard.get()
    }

    /// Run `f` with propagation across this link suppressed.
    pub fn guarded<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = self.guard.replace(true);
        let result = f();
        self.guard.set(previous);
        result
    }

    /// Disconnect both callbacks and drop the link from both sides.
    ///
    /// Every connection is disconnected even if an earlier one fails; the
    /// first failure is returned afterwards. Detaching twice is a no-op.
    pub fn detach(self: &Rc<Self>) -> Result<(), SignalError> {
        let connections = std::mem::take(&mut *self.connections.borrow_mut());
        for end in &self.ends {
            if let Some(list) = end.list.upgrade() {
                list.borrow_mut().retain(|link| !Rc::ptr_eq(link, self));
            }
        }

        let mut first_error = None;
        for connection in connections {
            if let Err(err) = connection.disconnect() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("owners", &[self.ends[0].owner_id, self.ends[1].owner_id])
            .field("propagating", &self.guard.get())
            .field("connections", &self.connections.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_connection(count: &Rc<Cell<usize>>) -> Connection {
        let count = count.clone();
        Connection::new(move || {
            count.set(count.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn attach_records_on_both_sides() {
        let x = Bindings::default();
        let y = Bindings::default();
        let link = Link::attach((&x, 1), (&y, 2), Rc::new(Cell::new(false)), Vec::new());

        assert_eq!(x.len(), 1);
        assert_eq!(y.len(), 1);
        assert_eq!(link.peer_of(x.id()).map(Endpoint::owner_id), Some(2));
        assert_eq!(link.peer_of(y.id()).map(Endpoint::owner_id), Some(1));
        assert!(link.peer_of(12345).is_none());
    }

    #[test]
    fn detach_disconnects_and_clears_both_sides() {
        let x = Bindings::default();
        let y = Bindings::default();
        let count = Rc::new(Cell::new(0));
        let link = Link::attach(
            (&x, 1),
            (&y, 2),
            Rc::new(Cell::new(false)),
            vec![counting_connection(&count), counting_connection(&count)],
        );

        link.detach().unwrap();
        assert_eq!(count.get(), 2);
        assert!(x.is_empty());
        assert!(y.is_empty());

        link.detach().unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn links_where_filters_by_peer() {
        let x = Bindings::default();
        let y = Bindings::default();
        let z = Bindings::default();
        let guard = || Rc::new(Cell::new(false));

        Link::attach((&x, 1), (&y, 2), guard(), Vec::new());
        Link::attach((&x, 1), (&z, 3), guard(), Vec::new());

        assert_eq!(x.links_where(|end| end.owner_id() == 3).len(), 1);
        assert_eq!(x.links_where(|end| end.bindings_id() == y.id()).len(), 1);
        assert_eq!(x.links_where(|_| true).len(), 2);
        assert_eq!(y.links_where(|end| end.owner_id() == 1).len(), 1);
    }

    #[test]
    fn guarded_restores_previous_state() {
        let x = Bindings::default();
        let y = Bindings::default();
        let link = Link::attach((&x, 1), (&y, 2), Rc::new(Cell::new(false)), Vec::new());

        let inside = link.guarded(|| link.is_propagating());
        assert!(inside);
        assert!(!link.is_propagating());
    }

    #[test]
    fn disconnect_error_surfaces_after_every_connection_ran() {
        let x = Bindings::default();
        let y = Bindings::default();
        let count = Rc::new(Cell::new(0));
        let link = Link::attach(
            (&x, 1),
            (&y, 2),
            Rc::new(Cell::new(false)),
            vec![
                Connection::new(|| Err(SignalError::CallbackNotFound("change".into()))),
                counting_connection(&count),
                Connection::new(|| Err(SignalError::aborted("second failure"))),
                counting_connection(&count),
            ],
        );

        let err = link.detach().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(count.get(), 2);
        assert!(x.is_empty());
        assert!(y.is_empty());
    }
}
