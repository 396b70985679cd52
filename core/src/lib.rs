#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Critter Defence engine.
//!
//! This crate defines the vocabulary that connects the authoritative entity
//! managers, the rule systems and the presentation adapters. Managers own
//! live [`CritterId`]/[`TowerId`] entities and announce membership changes,
//! logic controllers publish [`CritterEvent`] and [`MapEvent`] values, and
//! every fallible operation reports a variant of [`Error`].

mod error;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result, SpecViolation};

/// Simulation tick counter. Ticks are discrete and strictly increasing.
pub type Tick = u64;

/// Amount of currency handled by the economy collaborator.
pub type Amount = u32;

/// Unique identifier assigned to a critter by its manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CritterId(u32);

impl CritterId {
    /// Creates a new critter identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower by its manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of any managed entity, used when reporting lifecycle errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// A critter owned by the critter manager.
    Critter(CritterId),
    /// A tower owned by the tower manager.
    Tower(TowerId),
}

impl From<CritterId> for EntityKey {
    fn from(id: CritterId) -> Self {
        Self::Critter(id)
    }
}

impl From<TowerId> for EntityKey {
    fn from(id: TowerId) -> Self {
        Self::Tower(id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critter(id) => write!(f, "critter#{}", id.get()),
            Self::Tower(id) => write!(f, "tower#{}", id.get()),
        }
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Squared Euclidean distance between the centres of two cells.
    #[must_use]
    pub fn distance_squared(self, other: CellCoord) -> u64 {
        let dx = u64::from(self.column().abs_diff(other.column()));
        let dy = u64::from(self.row().abs_diff(other.row()));
        dx * dx + dy * dy
    }

    /// Reports whether `other` lies within `radius` cells of this cell.
    #[must_use]
    pub fn within(self, other: CellCoord, radius: u32) -> bool {
        let radius = u64::from(radius);
        self.distance_squared(other) <= radius * radius
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Dimensions of the map measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    columns: u32,
    rows: u32,
}

impl GridSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }
}

/// Terrain assigned to a map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Walkable corridor that critters traverse.
    Path,
    /// Decorative ground; the only terrain that accepts towers.
    Scenery,
    /// Cell where critters enter the map.
    Entry,
    /// Cell critters try to reach; arriving damages the base.
    Exit,
}

impl CellKind {
    /// Reports whether critters may walk across the cell.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Path | Self::Entry | Self::Exit)
    }

    /// Reports whether a tower may be constructed on the cell.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(self, Self::Scenery)
    }
}

/// Types of critters that waves are composed of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CritterKind {
    /// Fast, fragile critter.
    Speedy,
    /// Slow critter with a large health pool.
    Tanky,
    /// Critter that hits the base hard.
    Strong,
    /// Middle-of-the-road critter.
    Balanced,
}

impl CritterKind {
    /// Derives the base statistics of a critter of this kind at `level`.
    ///
    /// Every attribute grows linearly with the level and saturates at
    /// `u32::MAX`, except the move interval which is fixed per kind.
    #[must_use]
    pub const fn stats(self, level: u32) -> CritterStats {
        match self {
            Self::Tanky => CritterStats {
                health: level.saturating_mul(15).saturating_add(100),
                strength: level.saturating_mul(2).saturating_add(5),
                reward: level.saturating_mul(6).saturating_add(15),
                move_interval: 90,
            },
            Self::Speedy => CritterStats {
                health: level.saturating_mul(5).saturating_add(40),
                strength: level.saturating_mul(2).saturating_add(4),
                reward: level.saturating_mul(4).saturating_add(10),
                move_interval: 30,
            },
            Self::Strong => CritterStats {
                health: level.saturating_mul(10).saturating_add(50),
                strength: level.saturating_mul(2).saturating_add(7),
                reward: level.saturating_mul(5).saturating_add(12),
                move_interval: 60,
            },
            Self::Balanced => CritterStats {
                health: level.saturating_mul(10).saturating_add(50),
                strength: level.saturating_mul(2).saturating_add(5),
                reward: level.saturating_mul(5).saturating_add(12),
                move_interval: 40,
            },
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Speedy => "Speedy",
            Self::Tanky => "Tanky",
            Self::Strong => "Strong",
            Self::Balanced => "Balanced",
        }
    }
}

/// Statistics shared by every critter of a given kind and level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CritterStats {
    /// Starting hit points.
    pub health: u32,
    /// Damage dealt to the base when the critter reaches the exit.
    pub strength: u32,
    /// Currency granted when the critter is destroyed.
    pub reward: Amount,
    /// Ticks of accumulated progress required per step.
    pub move_interval: u32,
}

/// Types of towers that can be constructed on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Direct damage tower.
    Basic,
    /// Direct damage plus a timed speed debuff.
    Slow,
    /// Area damage around the primary target.
    Splash,
}

impl TowerKind {
    /// Returns the level-one profile of this tower kind.
    #[must_use]
    pub const fn profile(self) -> TowerProfile {
        match self {
            Self::Basic => TowerProfile {
                cost: 100,
                refund_value: 70,
                range: 3,
                power: 25,
                shots_per_minute: 60,
            },
            Self::Slow => TowerProfile {
                cost: 120,
                refund_value: 80,
                range: 3,
                power: 15,
                shots_per_minute: 72,
            },
            Self::Splash => TowerProfile {
                cost: 150,
                refund_value: 100,
                range: 2,
                power: 20,
                shots_per_minute: 48,
            },
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basic Tower",
            Self::Slow => "Slow Tower",
            Self::Splash => "Splash Tower",
        }
    }
}

/// Purchase and combat parameters of a tower kind at level one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerProfile {
    /// Price charged on placement and on every upgrade.
    pub cost: Amount,
    /// Base refund, multiplied by the level when selling.
    pub refund_value: Amount,
    /// Targeting range in cells.
    pub range: u32,
    /// Damage applied per resolved attack.
    pub power: u32,
    /// Rate of fire.
    pub shots_per_minute: u32,
}

impl TowerProfile {
    /// Converts the rate of fire into a cooldown measured in ticks.
    ///
    /// A zero rate or tick rate produces a zero cooldown, meaning the tower
    /// fires on every tick. Tick rates too large to scale saturate.
    #[must_use]
    pub const fn cooldown_ticks(&self, ticks_per_second: u32) -> u32 {
        if self.shots_per_minute == 0 {
            return 0;
        }
        ticks_per_second.saturating_mul(60) / self.shots_per_minute
    }
}

/// Events published by the critter logic controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CritterEvent {
    /// A critter's health dropped to zero.
    Destroyed {
        /// Identifier of the destroyed critter.
        critter: CritterId,
        /// Currency granted for the kill.
        reward: Amount,
        /// Tick on which the critter died.
        tick: Tick,
    },
    /// A critter arrived at the exit cell.
    ReachedGoal {
        /// Identifier of the critter that escaped.
        critter: CritterId,
        /// Damage dealt to the base.
        strength: u32,
        /// Tick on which the critter arrived.
        tick: Tick,
    },
}

/// Events published by the map logic controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapEvent {
    /// A wave started spawning.
    WaveStarted {
        /// One-based wave number.
        wave: u32,
    },
    /// Every critter of the wave is gone and spawning finished.
    WaveCleared {
        /// One-based wave number.
        wave: u32,
    },
    /// A critter reached the exit and damaged the base.
    BaseDamaged {
        /// Remaining base health.
        remaining: u32,
    },
    /// Base health dropped to zero.
    BaseBreached,
    /// A map cell changed terrain.
    TopologyChanged {
        /// Cell that changed.
        cell: CellCoord,
        /// New terrain of the cell.
        kind: CellKind,
    },
}

/// Target chosen for a tower during the targeting phase of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower that will attack.
    pub tower: TowerId,
    /// Critter selected as the primary target.
    pub critter: CritterId,
}

/// Consequence of a resolved attack, applied by the critter logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Direct damage to a single critter.
    Damage {
        /// Critter that is hit.
        target: CritterId,
        /// Hit points removed.
        amount: u32,
    },
    /// Direct damage followed by a timed speed reduction.
    Slow {
        /// Critter that is hit.
        target: CritterId,
        /// Hit points removed.
        amount: u32,
        /// Speed that remains while slowed, in percent.
        speed_percent: u32,
        /// Ticks the slow lasts.
        duration_ticks: u32,
    },
    /// The same damage to every critter around the primary target.
    Splash {
        /// Primary target of the attack.
        target: CritterId,
        /// Cell the splash is centred on.
        center: CellCoord,
        /// Hit points removed from each critter in the area.
        amount: u32,
        /// Radius of the area in cells.
        radius: u32,
    },
}

impl Effect {
    /// Primary target of the effect.
    #[must_use]
    pub const fn target(&self) -> CritterId {
        match self {
            Self::Damage { target, .. }
            | Self::Slow { target, .. }
            | Self::Splash { target, .. } => *target,
        }
    }
}

/// Result of resolving one tower attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackOutcome {
    /// The attack landed and produced an effect.
    Hit {
        /// Tower that attacked.
        tower: TowerId,
        /// Effect that was applied.
        effect: Effect,
    },
    /// The target left the map before the attack resolved. The tower keeps
    /// its readiness.
    TargetGone {
        /// Tower whose attack fizzled.
        tower: TowerId,
        /// Critter that was no longer live.
        critter: CritterId,
    },
}
