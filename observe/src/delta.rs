//! Membership change descriptor delivered by [`crate::ObservableVec`].

use crate::Entity;

/// Entities added to and removed from a collection since the previous
/// notification.
///
/// Entries are value snapshots taken when the batch was flushed. An entity
/// that was both added and removed inside one batch appears on neither side.
#[derive(Clone, Debug, PartialEq)]
pub struct Delta<T> {
    added: Vec<T>,
    removed: Vec<T>,
}

impl<T> Delta<T> {
    /// Creates a delta from explicit added and removed sets.
    #[must_use]
    pub fn new(added: Vec<T>, removed: Vec<T>) -> Self {
        Self { added, removed }
    }

    /// Entities that joined the collection, in insertion order.
    #[must_use]
    pub fn added(&self) -> &[T] {
        &self.added
    }

    /// Entities that left the collection, in removal order.
    #[must_use]
    pub fn removed(&self) -> &[T] {
        &self.removed
    }

    /// Reports whether the delta carries no change at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl<T: Entity> Delta<T> {
    /// Identifiers of the added entities.
    #[must_use]
    pub fn added_ids(&self) -> Vec<T::Id> {
        self.added.iter().map(Entity::id).collect()
    }

    /// Identifiers of the removed entities.
    #[must_use]
    pub fn removed_ids(&self) -> Vec<T::Id> {
        self.removed.iter().map(Entity::id).collect()
    }
}

impl<T> Default for Delta<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}
