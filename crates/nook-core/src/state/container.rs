//! Observable state container.
//!
//! A [`Store`] owns one typed state record. Every mutation goes through
//! [`Store::set_state`], which applies the updater, runs the record's
//! persistence hook against the previous value, and only then notifies
//! subscribers with the fully merged state.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use crate::error::CoreError;
use crate::storage::KeyValueStore;

/// Persistence hook run after every mutation.
pub trait Persist {
    /// Write whatever changed between `prev` and `self`.
    fn persist(&self, prev: &Self, kv: &dyn KeyValueStore) -> Result<(), CoreError>;
}

type Listener<T> = Box<dyn FnMut(&T)>;

struct Listeners<T> {
    entries: Vec<(u64, Listener<T>)>,
    /// Ids removed while their listener was detached for notification.
    removed: BTreeSet<u64>,
}

/// Handle returned by [`Store::subscribe`].
pub struct Subscription<T> {
    id: u64,
    listeners: Weak<RefCell<Listeners<T>>>,
}

impl<T> Subscription<T> {
    /// Stop receiving notifications. No-op if the store is gone.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.borrow_mut();
            let before = listeners.entries.len();
            listeners.entries.retain(|(id, _)| *id != self.id);
            if listeners.entries.len() == before {
                listeners.removed.insert(self.id);
            }
        }
    }
}

pub struct Store<T> {
    state: RefCell<T>,
    listeners: Rc<RefCell<Listeners<T>>>,
    next_id: Cell<u64>,
    kv: Option<Rc<dyn KeyValueStore>>,
}

impl<T: Clone + Persist + 'static> Store<T> {
    /// A store that never writes anywhere.
    pub fn new(initial: T) -> Self {
        Self {
            state: RefCell::new(initial),
            listeners: Rc::new(RefCell::new(Listeners {
                entries: Vec::new(),
                removed: BTreeSet::new(),
            })),
            next_id: Cell::new(0),
            kv: None,
        }
    }

    /// A store whose mutations are persisted to `kv`.
    pub fn persisted(initial: T, kv: Rc<dyn KeyValueStore>) -> Self {
        let mut store = Self::new(initial);
        store.kv = Some(kv);
        store
    }

    /// Snapshot of the current state.
    pub fn get_state(&self) -> T {
        self.state.borrow().clone()
    }

    /// Read the state in place without cloning.
    pub fn with_state<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Apply `updater`, persist, then notify. Returns the updater's result.
    pub fn set_state<R>(&self, updater: impl FnOnce(&mut T) -> R) -> R {
        let prev = self.state.borrow().clone();
        let (result, next) = {
            let mut state = self.state.borrow_mut();
            let result = updater(&mut state);
            (result, state.clone())
        };

        if let Some(kv) = &self.kv {
            if let Err(e) = next.persist(&prev, kv.as_ref()) {
                tracing::warn!(error = %e, "failed to persist state");
            }
        }

        self.notify(&next);
        result
    }

    /// Replace the whole state record.
    pub fn replace(&self, next: T) {
        self.set_state(|state| *state = next);
    }

    pub fn subscribe(&self, listener: impl FnMut(&T) + 'static) -> Subscription<T> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners
            .borrow_mut()
            .entries
            .push((id, Box::new(listener)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    fn notify(&self, state: &T) {
        // Detach the listeners so one of them may touch this store again.
        let mut current = std::mem::take(&mut self.listeners.borrow_mut().entries);
        for (_, listener) in current.iter_mut() {
            listener(state);
        }

        let mut listeners = self.listeners.borrow_mut();
        let removed = std::mem::take(&mut listeners.removed);
        current.retain(|(id, _)| !removed.contains(id));
        current.append(&mut listeners.entries);
        listeners.entries = current;
    }
}
