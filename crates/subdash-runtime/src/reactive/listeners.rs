#![forbid(unsafe_code)]

//! Listener registry with RAII unsubscription.
//!
//! # Design
//!
//! [`ListenerSet<T>`] keeps every registered callback as a `Weak` reference.
//! The matching strong `Rc` lives inside the [`Subscription`] guard handed
//! back to the caller, so dropping the guard (or calling
//! [`Subscription::unsubscribe`]) makes the callback unreachable. Dead
//! entries are pruned lazily on the next notification.
//!
//! Both managers in this crate own one `ListenerSet` next to (not inside)
//! their `RefCell` state. Notification collects the live callbacks first and
//! only then invokes them, so listeners are free to call back into the
//! manager that notified them.
//!
//! # Invariants
//!
//! 1. Listeners are invoked in registration order.
//! 2. Unsubscribing one listener never affects another.
//! 3. A listener registered during a notification is not invoked by that
//!    same notification.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

/// Ordered set of weakly-held listener callbacks.
pub struct ListenerSet<T> {
    subscribers: RefCell<Vec<CallbackWeak<T>>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }
}

impl<T> fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("registered", &self.subscribers.borrow().len())
            .finish()
    }
}

impl<T: 'static> ListenerSet<T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. It stays registered for as long as the returned
    /// [`Subscription`] is alive.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.subscribers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Invoke every live callback with `value`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn notify(&self, value: &T) -> usize {
        let callbacks = self.live();
        for cb in &callbacks {
            cb(value);
        }
        callbacks.len()
    }

    /// Number of live listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Whether no live listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prune dead entries and upgrade the rest, releasing the borrow before
    /// anything gets called.
    fn live(&self) -> Vec<CallbackRc<T>> {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|w| w.strong_count() > 0);
        subscribers.iter().filter_map(Weak::upgrade).collect()
    }
}

/// RAII guard for a registered listener.
///
/// Dropping the guard unsubscribes. Keep it alive for as long as the
/// listening region is mounted.
#[must_use = "dropping a Subscription immediately unsubscribes its listener"]
pub struct Subscription {
    /// Type-erased strong reference keeping the callback `Rc` alive.
    _guard: Box<dyn Any>,
}

impl Subscription {
    /// Explicitly detach the listener. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn notifies_in_registration_order() {
        let set = ListenerSet::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        let _a = set.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let l2 = log.clone();
        let _b = set.subscribe(move |v| l2.borrow_mut().push(("b", *v)));

        assert_eq!(set.notify(&7), 2);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_only_detaches_that_listener() {
        let set = ListenerSet::<()>::new();
        let a_hits = Rc::new(Cell::new(0));
        let b_hits = Rc::new(Cell::new(0));

        let a = {
            let hits = a_hits.clone();
            set.subscribe(move |_| hits.set(hits.get() + 1))
        };
        let _b = {
            let hits = b_hits.clone();
            set.subscribe(move |_| hits.set(hits.get() + 1))
        };

        set.notify(&());
        a.unsubscribe();
        set.notify(&());

        assert_eq!(a_hits.get(), 1);
        assert_eq!(b_hits.get(), 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn dropped_guard_is_pruned() {
        let set = ListenerSet::<()>::new();
        {
            let _sub = set.subscribe(|_| {});
            assert_eq!(set.len(), 1);
        }
        assert!(set.is_empty());
        assert_eq!(set.notify(&()), 0);
    }

    #[test]
    fn listener_may_subscribe_during_notify() {
        let set = Rc::new(ListenerSet::<()>::new());
        let late = Rc::new(RefCell::new(Vec::new()));
        let hits = Rc::new(Cell::new(0));

        let _outer = {
            let registrar = set.clone();
            let late = late.clone();
            let hits = hits.clone();
            set.subscribe(move |_| {
                let hits = hits.clone();
                late.borrow_mut()
                    .push(registrar.subscribe(move |_| hits.set(hits.get() + 1)));
            })
        };

        set.notify(&());
        assert_eq!(hits.get(), 0, "new listener must not see the current round");
        set.notify(&());
        assert_eq!(hits.get(), 1);
    }
}
