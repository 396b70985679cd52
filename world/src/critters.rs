//! Authoritative critter state and the manager that owns it.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use critter_defence_core::{
    Amount, CellCoord, CritterId, CritterKind, Error, GridSize, Result, SpecViolation, Tick,
};
use critter_defence_observe::{Delta, Entity, ObservableVec, SharedVecObserver};

/// Progress gained per tick at full speed, expressed in percent.
pub const FULL_SPEED: u32 = 100;

/// Lifecycle stage of a critter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CritterState {
    /// Created but not yet moved.
    Spawned,
    /// Walking along its route.
    Moving,
    /// Hit by at least one attack since it spawned.
    Damaged,
    /// Arrived at the exit. Terminal.
    ReachedGoal,
    /// Health dropped to zero. Terminal.
    Destroyed,
}

impl CritterState {
    /// Reports whether the critter must be removed from the map.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ReachedGoal | Self::Destroyed)
    }
}

/// Timed speed reduction applied by slowing towers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlowDebuff {
    /// Speed that remains while the debuff is active, in percent.
    pub speed_percent: u32,
    /// Ticks the debuff still lasts.
    pub remaining_ticks: u32,
}

/// Parameters accepted by [`CritterManager::spawn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CritterSpec {
    /// Kind that selects the stat table.
    pub kind: CritterKind,
    /// Level the stats are scaled to. Starts at one.
    pub level: u32,
    /// Cell the critter appears on.
    pub cell: CellCoord,
    /// Replaces the starting health derived from the stat table.
    pub health: Option<u32>,
}

impl CritterSpec {
    /// Creates a spec using the stat table's starting health.
    #[must_use]
    pub const fn new(kind: CritterKind, level: u32, cell: CellCoord) -> Self {
        Self {
            kind,
            level,
            cell,
            health: None,
        }
    }

    /// Overrides the starting health.
    #[must_use]
    pub const fn with_health(mut self, health: u32) -> Self {
        self.health = Some(health);
        self
    }
}

/// Snapshot of a live critter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Critter {
    id: CritterId,
    kind: CritterKind,
    level: u32,
    cell: CellCoord,
    health: u32,
    max_health: u32,
    strength: u32,
    reward: Amount,
    move_interval: u32,
    spawn_tick: Tick,
    progress: u32,
    slow: Option<SlowDebuff>,
    state: CritterState,
}

impl Critter {
    /// Identifier allocated by the manager.
    #[must_use]
    pub const fn id(&self) -> CritterId {
        self.id
    }

    /// Kind of the critter.
    #[must_use]
    pub const fn kind(&self) -> CritterKind {
        self.kind
    }

    /// Level the stats were scaled to.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Cell currently occupied.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Hit points at spawn.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Damage dealt to the base on arrival.
    #[must_use]
    pub const fn strength(&self) -> u32 {
        self.strength
    }

    /// Currency granted when destroyed.
    #[must_use]
    pub const fn reward(&self) -> Amount {
        self.reward
    }

    /// Ticks of full-speed progress needed per step.
    #[must_use]
    pub const fn move_interval(&self) -> u32 {
        self.move_interval
    }

    /// Tick on which the critter was spawned.
    #[must_use]
    pub const fn spawn_tick(&self) -> Tick {
        self.spawn_tick
    }

    /// Active speed debuff, if any.
    #[must_use]
    pub const fn slow(&self) -> Option<SlowDebuff> {
        self.slow
    }

    /// Current lifecycle stage.
    #[must_use]
    pub const fn state(&self) -> CritterState {
        self.state
    }

    /// Accumulates one tick of progress and reports whether a step is due.
    ///
    /// Slowed critters gain progress at the debuff's speed; the debuff
    /// expires once its remaining ticks run out.
    pub fn advance(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let speed = match self.slow.as_mut() {
            Some(debuff) => {
                let speed = debuff.speed_percent;
                debuff.remaining_ticks = debuff.remaining_ticks.saturating_sub(1);
                speed
            }
            None => FULL_SPEED,
        };
        if self.slow.is_some_and(|debuff| debuff.remaining_ticks == 0) {
            self.slow = None;
        }
        self.progress = self.progress.saturating_add(speed);
        let threshold = self.move_interval.saturating_mul(FULL_SPEED);
        if self.progress < threshold {
            return false;
        }
        self.progress -= threshold;
        true
    }

    /// Moves the critter onto `cell`.
    pub fn step_to(&mut self, cell: CellCoord) {
        self.cell = cell;
        if self.state == CritterState::Spawned {
            self.state = CritterState::Moving;
        }
    }

    /// Subtracts `amount` hit points and returns the resulting state.
    pub fn apply_damage(&mut self, amount: u32) -> CritterState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.health = self.health.saturating_sub(amount);
        self.state = if self.health == 0 {
            CritterState::Destroyed
        } else {
            CritterState::Damaged
        };
        self.state
    }

    /// Installs a speed debuff, replacing any active one.
    pub fn apply_slow(&mut self, speed_percent: u32, duration_ticks: u32) {
        if self.state.is_terminal() || duration_ticks == 0 {
            return;
        }
        self.slow = Some(SlowDebuff {
            speed_percent: speed_percent.min(FULL_SPEED),
            remaining_ticks: duration_ticks,
        });
    }

    /// Marks the critter as having arrived at the exit.
    pub fn reach_goal(&mut self) {
        if !self.state.is_terminal() {
            self.state = CritterState::ReachedGoal;
        }
    }
}

impl Entity for Critter {
    type Id = CritterId;

    fn id(&self) -> CritterId {
        self.id
    }
}

/// Sole lifecycle authority for critters.
///
/// Spawns and removals take effect immediately and are announced as one
/// coalesced [`Delta`] per [`CritterManager::commit`].
#[derive(Debug)]
pub struct CritterManager {
    critters: ObservableVec<Critter>,
    bounds: GridSize,
    next_id: Cell<u32>,
}

impl CritterManager {
    /// Creates a manager that accepts critters inside `bounds`.
    #[must_use]
    pub fn new(bounds: GridSize, follow_up_limit: usize) -> Self {
        Self {
            critters: ObservableVec::with_follow_up_limit(follow_up_limit),
            bounds,
            next_id: Cell::new(0),
        }
    }

    /// Validates `spec`, creates the critter and records it for the next
    /// commit.
    pub fn spawn(&self, spec: CritterSpec, tick: Tick) -> Result<CritterId> {
        if self.critters.is_notifying() {
            return Err(Error::ReentrantMutation);
        }
        let critter = self.build(spec, tick)?;
        let id = self.critters.insert(critter)?;
        self.allocated(id, spec);
        Ok(id)
    }

    /// Spawns now, or once the running notification pass ends.
    ///
    /// The id is allocated immediately. A spawn requested from a callback is
    /// announced in a follow-up pass of the same commit.
    pub fn defer_spawn(&self, spec: CritterSpec, tick: Tick) -> Result<CritterId> {
        let critter = self.build(spec, tick)?;
        let id = self.critters.defer_insert(critter)?;
        self.allocated(id, spec);
        Ok(id)
    }

    fn build(&self, spec: CritterSpec, tick: Tick) -> Result<Critter> {
        if spec.level == 0 {
            return Err(Error::InvalidSpec(SpecViolation::ZeroLevel));
        }
        if !self.bounds.contains(spec.cell) {
            return Err(Error::InvalidSpec(SpecViolation::OutOfBounds(spec.cell)));
        }
        let stats = spec.kind.stats(spec.level);
        let health = spec.health.unwrap_or(stats.health);
        if health == 0 {
            return Err(Error::InvalidSpec(SpecViolation::ZeroHealth));
        }

        Ok(Critter {
            id: CritterId::new(self.next_id.get()),
            kind: spec.kind,
            level: spec.level,
            cell: spec.cell,
            health,
            max_health: health,
            strength: stats.strength,
            reward: stats.reward,
            move_interval: stats.move_interval,
            spawn_tick: tick,
            progress: 0,
            slow: None,
            state: CritterState::Spawned,
        })
    }

    fn allocated(&self, id: CritterId, spec: CritterSpec) {
        self.next_id.set(id.get().wrapping_add(1));
        log::debug!("spawned {:?} critter {} at {}", spec.kind, id.get(), spec.cell);
    }

    /// Removes a live critter, returning its final snapshot.
    pub fn remove(&self, id: CritterId) -> Result<Critter> {
        self.critters.remove(id)
    }

    /// Removes a critter now, or once the running notification pass ends.
    pub fn defer_remove(&self, id: CritterId) -> Result<()> {
        self.critters.defer_remove(id)
    }

    /// Announces pending spawns and removals to observers.
    pub fn commit(&self) -> Result<Vec<Delta<Critter>>> {
        self.critters.commit()
    }

    /// Copy of a live critter.
    #[must_use]
    pub fn find(&self, id: CritterId) -> Option<Critter> {
        self.critters.get(id)
    }

    /// Mutates a live critter without notifying observers.
    pub fn modify<R>(&self, id: CritterId, update: impl FnOnce(&mut Critter) -> R) -> Result<R> {
        self.critters.modify(id, update)
    }

    /// Identifiers of live critters in spawn order.
    #[must_use]
    pub fn ids(&self) -> Vec<CritterId> {
        self.critters.ids()
    }

    /// Copies of live critters in spawn order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Critter> {
        self.critters.snapshot()
    }

    /// Number of live critters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.critters.len()
    }

    /// Reports whether no critter is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.critters.is_empty()
    }

    /// Reports whether a commit has changes to announce.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.critters.has_pending()
    }

    /// Registers an observer of critter membership changes.
    pub fn attach(&self, observer: SharedVecObserver<Critter>) -> Result<()> {
        self.critters.attach(observer)
    }

    /// Unregisters an observer of critter membership changes.
    pub fn detach<O: ?Sized>(&self, observer: &Rc<RefCell<O>>) -> Result<()> {
        self.critters.detach(observer)
    }
}
