//! Keyed collection that announces membership changes in coalesced batches.

use std::{
    cell::{Cell, RefCell, RefMut},
    collections::VecDeque,
    fmt,
    rc::Rc,
};

use critter_defence_core::{Error, Result};
use indexmap::{IndexMap, IndexSet};

use crate::{Delta, Entity, ObserverVec, PassGuard, Registry, SharedVecObserver};

/// Follow-up passes a single commit may deliver before giving up.
pub const DEFAULT_FOLLOW_UP_LIMIT: usize = 16;

enum Deferred<T: Entity> {
    Insert(T),
    Remove(T::Id),
}

struct Batch<T: Entity> {
    added: IndexSet<T::Id>,
    removed: Vec<T>,
}

impl<T: Entity> Batch<T> {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl<T: Entity> Default for Batch<T> {
    fn default() -> Self {
        Self {
            added: IndexSet::new(),
            removed: Vec::new(),
        }
    }
}

/// Ordered collection of entities that owns its members and notifies
/// [`crate::ObserverVec`]s when membership changes.
///
/// Inserts and removals take effect immediately but are announced only when
/// [`ObservableVec::commit`] flushes the pending batch. Iteration order is
/// insertion order.
pub struct ObservableVec<T: Entity> {
    items: RefCell<IndexMap<T::Id, T>>,
    batch: RefCell<Batch<T>>,
    deferred: RefCell<VecDeque<Deferred<T>>>,
    observers: RefCell<Registry<dyn ObserverVec<T>>>,
    notifying: Cell<bool>,
    follow_up_limit: usize,
}

impl<T: Entity> ObservableVec<T> {
    /// Creates an empty collection using [`DEFAULT_FOLLOW_UP_LIMIT`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_follow_up_limit(DEFAULT_FOLLOW_UP_LIMIT)
    }

    /// Creates an empty collection that allows `limit` follow-up passes per
    /// commit.
    #[must_use]
    pub fn with_follow_up_limit(limit: usize) -> Self {
        Self {
            items: RefCell::new(IndexMap::new()),
            batch: RefCell::new(Batch::default()),
            deferred: RefCell::new(VecDeque::new()),
            observers: RefCell::new(Registry::new()),
            notifying: Cell::new(false),
            follow_up_limit: limit,
        }
    }

    /// Follow-up passes allowed per commit.
    #[must_use]
    pub fn follow_up_limit(&self) -> usize {
        self.follow_up_limit
    }

    /// Registers an observer at the end of the notification order.
    pub fn attach(&self, observer: SharedVecObserver<T>) -> Result<()> {
        self.observers.borrow_mut().attach(observer)?;
        log::debug!("vec observer attached ({} total)", self.observer_count());
        Ok(())
    }

    /// Unregisters an observer. A pass that is already running skips it,
    /// even if it is attached again before the pass ends.
    pub fn detach<O: ?Sized>(&self, observer: &Rc<RefCell<O>>) -> Result<()> {
        self.observers.borrow_mut().detach(observer)?;
        log::debug!("vec observer detached ({} remaining)", self.observer_count());
        Ok(())
    }

    /// Reports whether the observer is currently registered.
    #[must_use]
    pub fn is_attached<O: ?Sized>(&self, observer: &Rc<RefCell<O>>) -> bool {
        self.observers.borrow().contains(observer)
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Reports whether a notification pass is running.
    #[must_use]
    pub fn is_notifying(&self) -> bool {
        self.notifying.get()
    }

    /// Adds an entity and records it in the pending batch.
    ///
    /// Fails with [`Error::DuplicateId`] when an entity with the same id is
    /// live and with [`Error::ReentrantMutation`] during a notification pass.
    pub fn insert(&self, item: T) -> Result<T::Id> {
        if self.notifying.get() {
            return Err(Error::ReentrantMutation);
        }
        self.insert_now(item)
    }

    /// Removes a live entity and records it in the pending batch.
    ///
    /// Removing an entity that was inserted since the last commit cancels
    /// both changes.
    pub fn remove(&self, id: T::Id) -> Result<T> {
        if self.notifying.get() {
            return Err(Error::ReentrantMutation);
        }
        self.remove_now(id)
    }

    /// Inserts now, or after the running pass completes.
    ///
    /// The request is validated immediately against the membership the
    /// collection will have once every queued request is applied.
    pub fn defer_insert(&self, item: T) -> Result<T::Id> {
        let id = item.id();
        if !self.notifying.get() {
            return self.insert_now(item);
        }
        if self.projected_contains(id) {
            return Err(Error::DuplicateId(id.into()));
        }
        self.deferred.borrow_mut().push_back(Deferred::Insert(item));
        Ok(id)
    }

    /// Removes now, or after the running pass completes.
    pub fn defer_remove(&self, id: T::Id) -> Result<()> {
        if !self.notifying.get() {
            return self.remove_now(id).map(drop);
        }
        if !self.projected_contains(id) {
            return Err(Error::UnknownId(id.into()));
        }
        self.deferred.borrow_mut().push_back(Deferred::Remove(id));
        Ok(())
    }

    /// Mutates a live entity in place without notifying anyone.
    pub fn modify<R>(&self, id: T::Id, update: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut items = self.items_mut()?;
        let item = items.get_mut(&id).ok_or(Error::UnknownId(id.into()))?;
        Ok(update(item))
    }

    /// Runs `read` against a live entity.
    pub fn with<R>(&self, id: T::Id, read: impl FnOnce(&T) -> R) -> Option<R> {
        self.items.borrow().get(&id).map(read)
    }

    /// Copy of a live entity.
    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<T> {
        self.items.borrow().get(&id).cloned()
    }

    /// Reports whether an entity with the id is live.
    #[must_use]
    pub fn contains(&self, id: T::Id) -> bool {
        self.items.borrow().contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Reports whether no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Identifiers of the live entities in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<T::Id> {
        self.items.borrow().keys().copied().collect()
    }

    /// Copies of the live entities in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.borrow().values().cloned().collect()
    }

    /// Reports whether a commit would have anything to announce or apply.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.batch.borrow().is_empty() || !self.deferred.borrow().is_empty()
    }

    /// Announces the pending batch, then applies deferred requests and
    /// announces them in follow-up passes until nothing is pending.
    ///
    /// Returns every delta that was delivered. An empty batch notifies
    /// nobody. If an observer fails, the error is returned as is and requests
    /// queued so far stay pending for the next commit.
    pub fn commit(&self) -> Result<Vec<Delta<T>>> {
        if self.notifying.get() {
            return Err(Error::ReentrantMutation);
        }
        let mut delivered = Vec::new();
        let mut passes = 0;
        while self.has_pending() {
            if passes > self.follow_up_limit {
                return Err(Error::NotificationCascade { passes: passes - 1 });
            }
            let delta = self.take_delta();
            if !delta.is_empty() {
                log::debug!(
                    "commit pass {passes}: {} added, {} removed",
                    delta.added().len(),
                    delta.removed().len()
                );
                self.deliver(&delta)?;
                delivered.push(delta);
            }
            passes += 1;
            self.apply_deferred()?;
        }
        Ok(delivered)
    }

    fn items_mut(&self) -> Result<RefMut<'_, IndexMap<T::Id, T>>> {
        self.items
            .try_borrow_mut()
            .map_err(|_| Error::ReentrantMutation)
    }

    fn insert_now(&self, item: T) -> Result<T::Id> {
        let id = item.id();
        let mut items = self.items_mut()?;
        if items.contains_key(&id) {
            return Err(Error::DuplicateId(id.into()));
        }
        let _ = items.insert(id, item);
        let _ = self.batch.borrow_mut().added.insert(id);
        Ok(id)
    }

    fn remove_now(&self, id: T::Id) -> Result<T> {
        let removed = self
            .items_mut()?
            .shift_remove(&id)
            .ok_or(Error::UnknownId(id.into()))?;
        let mut batch = self.batch.borrow_mut();
        if !batch.added.shift_remove(&id) {
            batch.removed.push(removed.clone());
        }
        Ok(removed)
    }

    fn projected_contains(&self, id: T::Id) -> bool {
        let mut present = self.contains(id);
        for request in self.deferred.borrow().iter() {
            match request {
                Deferred::Insert(item) if item.id() == id => present = true,
                Deferred::Remove(target) if *target == id => present = false,
                _ => {}
            }
        }
        present
    }

    fn take_delta(&self) -> Delta<T> {
        let batch = std::mem::take(&mut *self.batch.borrow_mut());
        let items = self.items.borrow();
        let added = batch
            .added
            .iter()
            .filter_map(|id| items.get(id).cloned())
            .collect();
        Delta::new(added, batch.removed)
    }

    fn deliver(&self, delta: &Delta<T>) -> Result<()> {
        let _pass = PassGuard::enter(&self.notifying)?;
        let snapshot = self.observers.borrow().snapshot();
        for (key, serial, observer) in &snapshot {
            if !self.observers.borrow().is_current(*key, *serial) {
                continue;
            }
            let mut observer = observer
                .try_borrow_mut()
                .map_err(|_| Error::ReentrantMutation)?;
            observer.update(delta)?;
        }
        Ok(())
    }

    fn apply_deferred(&self) -> Result<()> {
        loop {
            let Some(request) = self.deferred.borrow_mut().pop_front() else {
                return Ok(());
            };
            match request {
                Deferred::Insert(item) => {
                    let _ = self.insert_now(item)?;
                }
                Deferred::Remove(id) => {
                    let _ = self.remove_now(id)?;
                }
            }
        }
    }
}

impl<T: Entity> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableVec")
            .field("len", &self.len())
            .field("pending", &self.has_pending())
            .field("observers", &self.observer_count())
            .field("notifying", &self.notifying.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use critter_defence_core::{CritterId, EntityKey};

    #[derive(Clone, Debug, PartialEq)]
    struct Token {
        id: CritterId,
        value: u32,
    }

    impl Entity for Token {
        type Id = CritterId;

        fn id(&self) -> CritterId {
            self.id
        }
    }

    fn token(id: u32) -> Token {
        Token {
            id: CritterId::new(id),
            value: 0,
        }
    }

    #[derive(Default)]
    struct Collector {
        deltas: Vec<Delta<Token>>,
    }

    impl ObserverVec<Token> for Collector {
        fn update(&mut self, delta: &Delta<Token>) -> Result<()> {
            self.deltas.push(delta.clone());
            Ok(())
        }
    }

    #[test]
    fn commit_coalesces_every_change_into_one_delta() {
        let vec: ObservableVec<Token> = ObservableVec::new();
        let collector = Rc::new(RefCell::new(Collector::default()));
        vec.attach(collector.clone()).expect("attach");

        let _ = vec.insert(token(1)).expect("insert");
        let _ = vec.insert(token(2)).expect("insert");
        let delivered = vec.commit().expect("commit");

        assert_eq!(delivered.len(), 1);
        let deltas = &collector.borrow().deltas;
        assert_eq!(deltas.len(), 1);
        assert_eq!(
            deltas[0].added_ids(),
            vec![CritterId::new(1), CritterId::new(2)]
        );
        assert!(deltas[0].removed().is_empty());
    }

    #[test]
    fn added_then_removed_is_not_announced() {
        let vec: ObservableVec<Token> = ObservableVec::new();
        let collector = Rc::new(RefCell::new(Collector::default()));
        vec.attach(collector.clone()).expect("attach");

        let id = vec.insert(token(5)).expect("insert");
        let removed = vec.remove(id).expect("remove");

        assert_eq!(removed, token(5));
        assert!(!vec.has_pending());
        assert!(vec.commit().expect("commit").is_empty());
        assert!(collector.borrow().deltas.is_empty());
    }

    #[test]
    fn removing_unknown_id_leaves_collection_unchanged() {
        let vec: ObservableVec<Token> = ObservableVec::new();
        let _ = vec.insert(token(1)).expect("insert");
        let _ = vec.commit().expect("commit");

        let result = vec.remove(CritterId::new(9));

        assert_eq!(
            result,
            Err(Error::UnknownId(EntityKey::Critter(CritterId::new(9))))
        );
        assert_eq!(vec.snapshot(), vec![token(1)]);
        assert!(!vec.has_pending());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let vec: ObservableVec<Token> = ObservableVec::new();
        let _ = vec.insert(token(3)).expect("insert");

        assert_eq!(
            vec.insert(token(3)),
            Err(Error::DuplicateId(EntityKey::Critter(CritterId::new(3))))
        );
        assert_eq!(vec.len(), 1);
    }

    #[test]
    fn removed_entity_is_gone_before_commit() {
        let vec: ObservableVec<Token> = ObservableVec::new();
        let id = vec.insert(token(4)).expect("insert");
        let _ = vec.commit().expect("commit");

        let _ = vec.remove(id).expect("remove");

        assert!(vec.get(id).is_none());
        let delivered = vec.commit().expect("commit");
        assert_eq!(delivered[0].removed_ids(), vec![id]);
    }

    #[test]
    fn modify_never_notifies() {
        let vec: ObservableVec<Token> = ObservableVec::new();
        let collector = Rc::new(RefCell::new(Collector::default()));
        let id = vec.insert(token(1)).expect("insert");
        let _ = vec.commit().expect("commit");
        vec.attach(collector.clone()).expect("attach");

        vec.modify(id, |item| item.value = 42).expect("modify");

        assert!(!vec.has_pending());
        assert!(vec.commit().expect("commit").is_empty());
        assert!(collector.borrow().deltas.is_empty());
        assert_eq!(vec.with(id, |item| item.value), Some(42));
    }

    struct Reaper {
        vec: Rc<ObservableVec<Token>>,
        direct: Vec<Result<CritterId>>,
    }

    impl ObserverVec<Token> for Reaper {
        fn update(&mut self, delta: &Delta<Token>) -> Result<()> {
            for id in delta.added_ids() {
                self.direct.push(self.vec.insert(token(id.get() + 100)));
                self.vec.defer_remove(id)?;
            }
            Ok(())
        }
    }

    #[test]
    fn callbacks_may_only_defer_structural_changes() {
        let vec: Rc<ObservableVec<Token>> = Rc::new(ObservableVec::new());
        let reaper = Rc::new(RefCell::new(Reaper {
            vec: Rc::clone(&vec),
            direct: Vec::new(),
        }));
        vec.attach(reaper.clone()).expect("attach");
        let id = vec.insert(token(1)).expect("insert");

        let delivered = vec.commit().expect("commit");

        assert_eq!(reaper.borrow().direct, vec![Err(Error::ReentrantMutation)]);
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[1].removed_ids(), vec![id]);
        assert!(vec.is_empty());
        assert!(!vec.has_pending());
    }

    struct Breeder {
        vec: Rc<ObservableVec<Token>>,
    }

    impl ObserverVec<Token> for Breeder {
        fn update(&mut self, delta: &Delta<Token>) -> Result<()> {
            for id in delta.added_ids() {
                let _ = self.vec.defer_insert(token(id.get() + 1))?;
            }
            Ok(())
        }
    }

    #[test]
    fn endless_follow_ups_report_a_cascade() {
        let vec: Rc<ObservableVec<Token>> = Rc::new(ObservableVec::with_follow_up_limit(3));
        let breeder = Rc::new(RefCell::new(Breeder {
            vec: Rc::clone(&vec),
        }));
        vec.attach(breeder).expect("attach");
        let _ = vec.insert(token(0)).expect("insert");

        assert_eq!(
            vec.commit(),
            Err(Error::NotificationCascade { passes: 3 })
        );
    }

    struct Rejoiner {
        vec: Rc<ObservableVec<Token>>,
        target: Rc<RefCell<Collector>>,
    }

    impl ObserverVec<Token> for Rejoiner {
        fn update(&mut self, _delta: &Delta<Token>) -> Result<()> {
            if self.vec.is_attached(&self.target) {
                self.vec.detach(&self.target)?;
                self.vec.attach(self.target.clone())?;
            }
            Ok(())
        }
    }

    #[test]
    fn rejoined_observer_skips_the_running_pass() {
        let vec: Rc<ObservableVec<Token>> = Rc::new(ObservableVec::new());
        let collector = Rc::new(RefCell::new(Collector::default()));
        let rejoiner = Rc::new(RefCell::new(Rejoiner {
            vec: Rc::clone(&vec),
            target: collector.clone(),
        }));
        vec.attach(rejoiner.clone()).expect("attach");
        vec.attach(collector.clone()).expect("attach");

        let _ = vec.insert(token(1)).expect("insert");
        let _ = vec.commit().expect("commit");
        assert!(collector.borrow().deltas.is_empty());
        assert!(vec.is_attached(&collector));

        vec.detach(&rejoiner).expect("detach");
        let _ = vec.insert(token(2)).expect("insert");
        let _ = vec.commit().expect("commit");
        assert_eq!(collector.borrow().deltas.len(), 1);
        assert_eq!(collector.borrow().deltas[0].added_ids(), vec![CritterId::new(2)]);
    }

    #[test]
    fn deferring_an_already_queued_insert_is_rejected() {
        struct Doubler {
            vec: Rc<ObservableVec<Token>>,
            outcome: Option<Result<CritterId>>,
        }

        impl ObserverVec<Token> for Doubler {
            fn update(&mut self, _delta: &Delta<Token>) -> Result<()> {
                if self.outcome.is_none() {
                    let _ = self.vec.defer_insert(token(50))?;
                    self.outcome = Some(self.vec.defer_insert(token(50)));
                }
                Ok(())
            }
        }

        let vec: Rc<ObservableVec<Token>> = Rc::new(ObservableVec::new());
        let doubler = Rc::new(RefCell::new(Doubler {
            vec: Rc::clone(&vec),
            outcome: None,
        }));
        vec.attach(doubler.clone()).expect("attach");
        let _ = vec.insert(token(1)).expect("insert");

        let _ = vec.commit().expect("commit");

        assert_eq!(
            doubler.borrow().outcome,
            Some(Err(Error::DuplicateId(EntityKey::Critter(CritterId::new(50)))))
        );
        assert_eq!(vec.len(), 2);
    }
}
