//! Single-subject notification primitive.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use critter_defence_core::{Error, Result};

use crate::{Observer, PassGuard, Registry, SharedObserver};

/// Subject that fans events out to its observers synchronously.
///
/// Observers run in registration order. If one fails, the observers that
/// precede it have already seen the event and the ones after it never will;
/// the failure is returned to the caller of [`Observable::notify`].
pub struct Observable<E> {
    observers: RefCell<Registry<dyn Observer<E>>>,
    notifying: Cell<bool>,
}

impl<E> Observable<E> {
    /// Creates a subject without observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RefCell::new(Registry::new()),
            notifying: Cell::new(false),
        }
    }

    /// Registers an observer at the end of the notification order.
    pub fn attach(&self, observer: SharedObserver<E>) -> Result<()> {
        self.observers.borrow_mut().attach(observer)?;
        log::debug!("observer attached ({} total)", self.observer_count());
        Ok(())
    }

    /// Unregisters an observer. It receives no event published afterwards,
    /// including the remainder of a pass that is currently running. Attaching
    /// it again during that pass moves it to the end of the order for later
    /// events only.
    pub fn detach<O: ?Sized>(&self, observer: &Rc<RefCell<O>>) -> Result<()> {
        self.observers.borrow_mut().detach(observer)?;
        log::debug!("observer detached ({} remaining)", self.observer_count());
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

    /// Delivers `event` to every registered observer.
    ///
    /// Publishing from inside one of this subject's own callbacks fails with
    /// [`Error::ReentrantMutation`].
    pub fn notify(&self, event: &E) -> Result<()> {
        let _pass = PassGuard::enter(&self.notifying)?;
        let snapshot = self.observers.borrow().snapshot();
        for (key, serial, observer) in &snapshot {
            if !self.observers.borrow().is_current(*key, *serial) {
                continue;
            }
            let mut observer = observer
                .try_borrow_mut()
                .map_err(|_| Error::ReentrantMutation)?;
            observer.update(event)?;
        }
        Ok(())
    }
}

impl<E> Default for Observable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Observable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.observer_count())
            .field("notifying", &self.notifying.get())
            .finish()
    }
}
