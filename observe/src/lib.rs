#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Synchronous publish/subscribe primitives for Critter Defence.
//!
//! [`Observable`] fans a single subject's events out to [`Observer`]s.
//! [`ObservableVec`] owns a keyed collection of entities and announces
//! membership changes to [`ObserverVec`]s as coalesced [`Delta`] batches.
//!
//! Observers are registered as shared `Rc<RefCell<_>>` handles and invoked in
//! registration order. Both subjects are single-threaded by construction.

mod delta;
mod observable;
mod observable_vec;

use std::{
    cell::{Cell, RefCell},
    fmt,
    hash::Hash,
    rc::Rc,
};

use critter_defence_core::{EntityKey, Error, Result};
use indexmap::IndexMap;

pub use delta::Delta;
pub use observable::Observable;
pub use observable_vec::{ObservableVec, DEFAULT_FOLLOW_UP_LIMIT};

/// Receives synchronous notifications from a single [`Observable`] subject.
pub trait Observer<E> {
    /// Reacts to an event published by the subject.
    ///
    /// Returning an error aborts the remaining fan-out and propagates the
    /// error to whoever triggered the notification.
    fn update(&mut self, event: &E) -> Result<()>;
}

/// Receives membership deltas from an [`ObservableVec`].
pub trait ObserverVec<T: Entity> {
    /// Reacts to the entities added to and removed from the collection.
    ///
    /// The emitting collection rejects structural mutation while this runs;
    /// use its `defer_*` methods to request follow-up changes.
    fn update(&mut self, delta: &Delta<T>) -> Result<()>;
}

/// Entity that can be stored in an [`ObservableVec`].
pub trait Entity: Clone {
    /// Stable identifier of the entity.
    type Id: Copy + Eq + Hash + fmt::Debug + Into<EntityKey>;

    /// Identifier of this entity. Must not change while the entity is stored.
    fn id(&self) -> Self::Id;
}

/// Shared handle to an [`Observer`] as stored by an [`Observable`].
pub type SharedObserver<E> = Rc<RefCell<dyn Observer<E>>>;

/// Shared handle to an [`ObserverVec`] as stored by an [`ObservableVec`].
pub type SharedVecObserver<T> = Rc<RefCell<dyn ObserverVec<T>>>;

/// Address of the observer allocation, ignoring trait object metadata.
fn address<O: ?Sized>(observer: &Rc<RefCell<O>>) -> *const () {
    Rc::as_ptr(observer).cast::<()>()
}

/// Observers in registration order, keyed by allocation address.
///
/// Every attach gets a fresh serial, so a pass can tell an observer that was
/// detached and attached again apart from the registration it started with.
struct Registry<O: ?Sized> {
    entries: IndexMap<*const (), (u64, Rc<RefCell<O>>)>,
    next_serial: u64,
}

impl<O: ?Sized> Registry<O> {
    fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            next_serial: 0,
        }
    }

    fn attach(&mut self, observer: Rc<RefCell<O>>) -> Result<()> {
        let key = address(&observer);
        if self.entries.contains_key(&key) {
            return Err(Error::AlreadyAttached);
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        let _ = self.entries.insert(key, (serial, observer));
        Ok(())
    }

    fn detach<P: ?Sized>(&mut self, observer: &Rc<RefCell<P>>) -> Result<()> {
        self.entries
            .shift_remove(&address(observer))
            .map(drop)
            .ok_or(Error::NotAttached)
    }

    fn contains<P: ?Sized>(&self, observer: &Rc<RefCell<P>>) -> bool {
        self.entries.contains_key(&address(observer))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Address, serial and handle of every observer, in order.
    fn snapshot(&self) -> Vec<(*const (), u64, Rc<RefCell<O>>)> {
        self.entries
            .iter()
            .map(|(key, (serial, observer))| (*key, *serial, Rc::clone(observer)))
            .collect()
    }

    /// Reports whether the registration taken into a snapshot still stands.
    fn is_current(&self, key: *const (), serial: u64) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|(current, _)| *current == serial)
    }
}

/// Keeps a subject's notifying flag raised for the duration of one pass.
struct PassGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> PassGuard<'a> {
    /// Raises the flag, failing if a pass is already running.
    fn enter(flag: &'a Cell<bool>) -> Result<Self> {
        if flag.replace(true) {
            return Err(Error::ReentrantMutation);
        }
        Ok(Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
