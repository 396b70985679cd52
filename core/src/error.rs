//! Error taxonomy shared by every crate in the workspace.

use thiserror::Error as ThisError;

use crate::{Amount, CellCoord, EntityKey};

/// Convenience alias used by every fallible operation in the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by managers, notification primitives and logic controllers.
///
/// Lifecycle and validation failures (`InvalidSpec`, `UnknownId`,
/// `DuplicateId`, `InsufficientResources`) leave state untouched. Protocol
/// failures (`AlreadyAttached`, `NotAttached`, `ReentrantMutation`,
/// `NotificationCascade`) indicate a wiring defect in a collaborator.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Construction parameters are outside the accepted range.
    #[error("invalid spec: {0}")]
    InvalidSpec(SpecViolation),
    /// No live entity carries the identifier.
    #[error("unknown id {0}")]
    UnknownId(EntityKey),
    /// An entity with the identifier is already live.
    #[error("{0} is already live")]
    DuplicateId(EntityKey),
    /// The observer is already registered with the subject.
    #[error("observer is already attached")]
    AlreadyAttached,
    /// The observer is not registered with the subject.
    #[error("observer is not attached")]
    NotAttached,
    /// A structural change was attempted while the subject was notifying.
    #[error("structural mutation attempted during a notification pass")]
    ReentrantMutation,
    /// Deferred requests kept producing follow-up passes past the limit.
    #[error("notification did not settle after {passes} follow-up passes")]
    NotificationCascade {
        /// Number of follow-up passes that were delivered.
        passes: usize,
    },
    /// The economy cannot cover the price.
    #[error("insufficient resources: {required} required, {available} available")]
    InsufficientResources {
        /// Price of the rejected operation.
        required: Amount,
        /// Balance at the time of the request.
        available: Amount,
    },
    /// No walkable route connects the two cells.
    #[error("no route from {from} to {to}")]
    Unreachable {
        /// Start of the requested route.
        from: CellCoord,
        /// Destination of the requested route.
        to: CellCoord,
    },
}

/// Specific reason a spec was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum SpecViolation {
    /// The cell lies outside the map.
    #[error("cell {0} is outside the map")]
    OutOfBounds(CellCoord),
    /// The cell's terrain does not accept towers.
    #[error("cell {0} is not buildable")]
    NotBuildable(CellCoord),
    /// Another tower already stands on the cell.
    #[error("cell {0} already hosts a tower")]
    Occupied(CellCoord),
    /// No tower stands on the cell.
    #[error("cell {0} hosts no tower")]
    Vacant(CellCoord),
    /// Critters must start with positive health.
    #[error("health must be positive")]
    ZeroHealth,
    /// Critter levels start at one.
    #[error("level must be at least one")]
    ZeroLevel,
    /// A configuration field is out of range.
    #[error("configuration field `{0}` is out of range")]
    Config(&'static str),
    /// The map layout is malformed.
    #[error("map must contain exactly one entry and one exit")]
    MapLayout,
}
