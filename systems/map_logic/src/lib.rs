#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Map-level rules: base health, wave bookkeeping and terrain authoring.
//!
//! [`MapLogic`] listens to critter membership changes and to critter logic
//! events, credits rewards, damages the base and publishes [`MapEvent`]s.

use std::{cell::RefCell, fmt, rc::Rc};

use critter_defence_core::{
    CellCoord, CellKind, CritterEvent, Error, MapEvent, Result, SpecViolation,
};
use critter_defence_observe::{Delta, Observable, Observer, ObserverVec};
use critter_defence_world::{Critter, CritterManager, MapGrid, Pathfinder, SharedEconomy};

/// Progress of the wave currently on the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveStatus {
    /// One-based number of the latest wave, zero before the first one.
    pub wave: u32,
    /// Every critter of the wave has been spawned.
    pub spawning_finished: bool,
    /// The wave has been announced as cleared.
    pub cleared: bool,
}

/// Simulation-side controller for the map, the base and the wave cycle.
pub struct MapLogic {
    map: Rc<RefCell<MapGrid>>,
    critters: Rc<CritterManager>,
    pathfinder: Box<dyn Pathfinder>,
    economy: SharedEconomy,
    base_health: u32,
    max_base_health: u32,
    live_critters: usize,
    status: WaveStatus,
    events: Observable<MapEvent>,
}

impl MapLogic {
    /// Creates the controller after checking that the map has one entry,
    /// one exit and a walkable route between them.
    pub fn new(
        map: Rc<RefCell<MapGrid>>,
        critters: Rc<CritterManager>,
        pathfinder: Box<dyn Pathfinder>,
        economy: SharedEconomy,
        base_health: u32,
    ) -> Result<Self> {
        if base_health == 0 {
            return Err(Error::InvalidSpec(SpecViolation::Config("base_health")));
        }
        let logic = Self {
            map,
            critters,
            pathfinder,
            economy,
            base_health,
            max_base_health: base_health,
            live_critters: 0,
            status: WaveStatus::default(),
            events: Observable::new(),
        };
        logic.check_layout(&logic.map.borrow())?;
        Ok(logic)
    }

    /// Subject announcing wave, base and topology changes.
    #[must_use]
    pub fn events(&self) -> &Observable<MapEvent> {
        &self.events
    }

    /// Remaining base health.
    #[must_use]
    pub const fn base_health(&self) -> u32 {
        self.base_health
    }

    /// Base health at the start of the game.
    #[must_use]
    pub const fn max_base_health(&self) -> u32 {
        self.max_base_health
    }

    /// Reports whether the base has fallen.
    #[must_use]
    pub const fn is_breached(&self) -> bool {
        self.base_health == 0
    }

    /// Critters announced as live by the latest committed deltas.
    #[must_use]
    pub const fn live_critters(&self) -> usize {
        self.live_critters
    }

    /// Progress of the current wave.
    #[must_use]
    pub const fn status(&self) -> WaveStatus {
        self.status
    }

    /// Entry cell of the map.
    pub fn entry(&self) -> Result<CellCoord> {
        self.map
            .borrow()
            .entry()
            .ok_or(Error::InvalidSpec(SpecViolation::MapLayout))
    }

    /// Announces the start of `wave`.
    pub fn start_wave(&mut self, wave: u32) -> Result<()> {
        self.status = WaveStatus {
            wave,
            spawning_finished: false,
            cleared: false,
        };
        log::info!("wave {wave} started");
        self.events.notify(&MapEvent::WaveStarted { wave })
    }

    /// Records that the current wave has no critters left to spawn.
    pub fn finish_spawning(&mut self) -> Result<()> {
        self.status.spawning_finished = true;
        self.check_cleared()
    }

    /// Changes the terrain of one cell.
    ///
    /// The change is rejected, leaving the map untouched, when the layout
    /// would stop having exactly one entry and one exit or when the entry or
    /// any live critter could no longer reach the exit.
    pub fn set_cell(&mut self, cell: CellCoord, kind: CellKind) -> Result<()> {
        let mut candidate = self.map.borrow().clone();
        let previous = candidate.set(cell, kind)?;
        if previous == kind {
            return Ok(());
        }
        self.check_layout(&candidate)?;
        *self.map.borrow_mut() = candidate;
        log::debug!("cell {cell} changed from {previous:?} to {kind:?}");
        self.events.notify(&MapEvent::TopologyChanged { cell, kind })
    }

    /// Moves the entry to `cell`; the old entry becomes path.
    pub fn set_entry(&mut self, cell: CellCoord) -> Result<()> {
        self.relocate(cell, CellKind::Entry)
    }

    /// Moves the exit to `cell`; the old exit becomes path.
    pub fn set_exit(&mut self, cell: CellCoord) -> Result<()> {
        self.relocate(cell, CellKind::Exit)
    }

    fn relocate(&mut self, cell: CellCoord, kind: CellKind) -> Result<()> {
        let mut candidate = self.map.borrow().clone();
        let old = candidate.cells_of(kind);
        if old == [cell] {
            return Ok(());
        }
        let mut changes = Vec::with_capacity(old.len() + 1);
        for previous in old {
            let _ = candidate.set(previous, CellKind::Path)?;
            changes.push((previous, CellKind::Path));
        }
        let _ = candidate.set(cell, kind)?;
        changes.push((cell, kind));
        self.check_layout(&candidate)?;
        *self.map.borrow_mut() = candidate;
        for (cell, kind) in changes {
            self.events.notify(&MapEvent::TopologyChanged { cell, kind })?;
        }
        Ok(())
    }

    fn check_layout(&self, map: &MapGrid) -> Result<()> {
        let (entry, exit) = map.validate()?;
        let _ = self.pathfinder.compute_path(entry, exit, map)?;
        for critter in self.critters.snapshot() {
            let _ = self.pathfinder.compute_path(critter.cell(), exit, map)?;
        }
        Ok(())
    }

    fn check_cleared(&mut self) -> Result<()> {
        let status = self.status;
        if status.wave == 0 || status.cleared || !status.spawning_finished {
            return Ok(());
        }
        if self.live_critters > 0 || self.is_breached() {
            return Ok(());
        }
        self.status.cleared = true;
        log::info!("wave {} cleared", status.wave);
        self.events.notify(&MapEvent::WaveCleared { wave: status.wave })
    }
}

impl ObserverVec<Critter> for MapLogic {
    fn update(&mut self, delta: &Delta<Critter>) -> Result<()> {
        self.live_critters += delta.added().len();
        self.live_critters = self.live_critters.saturating_sub(delta.removed().len());
        if !delta.removed().is_empty() {
            self.check_cleared()?;
        }
        Ok(())
    }
}

impl Observer<CritterEvent> for MapLogic {
    fn update(&mut self, event: &CritterEvent) -> Result<()> {
        match *event {
            CritterEvent::Destroyed { reward, .. } => {
                self.economy.borrow_mut().credit(reward);
                Ok(())
            }
            CritterEvent::ReachedGoal { strength, .. } => {
                if self.is_breached() {
                    return Ok(());
                }
                self.base_health = self.base_health.saturating_sub(strength);
                self.events.notify(&MapEvent::BaseDamaged {
                    remaining: self.base_health,
                })?;
                if self.is_breached() {
                    log::info!("base breached");
                    self.events.notify(&MapEvent::BaseBreached)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for MapLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapLogic")
            .field("base_health", &self.base_health)
            .field("live_critters", &self.live_critters)
            .field("status", &self.status)
            .field("events", &self.events)
            .finish()
    }
}
