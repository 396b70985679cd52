#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session context that owns the managers and drives one tick at a time.
//!
//! [`Simulation`] builds the critter and tower managers, the two logic
//! controllers and the rule systems, wires the observer relationships
//! between them and tears those relationships down again when dropped.

mod config;

use std::{cell::RefCell, fmt, mem, rc::Rc};

use critter_defence_core::{
    Amount, AttackOutcome, CellCoord, CellKind, Error, Result, SpecViolation, Tick, TowerTarget,
};
use critter_defence_system_critter_logic::CritterLogic;
use critter_defence_system_map_logic::MapLogic;
use critter_defence_system_spawning::{SpawnCommand, Spawning};
use critter_defence_system_tower_combat::TowerCombat;
use critter_defence_system_tower_targeting::TowerTargeting;
use critter_defence_world::{
    BreadthFirst, CritterManager, CritterSpec, Economy, MapGrid, Purse, TowerManager,
};

pub use config::{Config, TowerPlacement, WaveConfig};

/// What happened during one call to [`Simulation::step`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Tick that was processed.
    pub tick: Tick,
    /// Critters spawned at the entry.
    pub spawned: usize,
    /// Resolved tower attacks, in resolution order.
    pub outcomes: Vec<AttackOutcome>,
}

/// Owner of every authoritative component of a game session.
pub struct Simulation {
    tick: Tick,
    map: Rc<RefCell<MapGrid>>,
    purse: Rc<RefCell<Purse>>,
    critters: Rc<CritterManager>,
    towers: Rc<TowerManager>,
    critter_logic: Rc<RefCell<CritterLogic>>,
    map_logic: Rc<RefCell<MapLogic>>,
    targeting: TowerTargeting,
    combat: TowerCombat,
    spawning: Spawning,
    targets: Vec<TowerTarget>,
    commands: Vec<SpawnCommand>,
}

impl Simulation {
    /// Builds a session on a straight corridor sized by the configuration.
    pub fn corridor(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::new(config, MapGrid::straight_corridor(config.grid_size()))
    }

    /// Builds a session on `map`.
    pub fn new(config: &Config, map: MapGrid) -> Result<Self> {
        config.validate()?;
        let size = map.size();
        let map = Rc::new(RefCell::new(map));
        let purse = Purse::shared(config.starting_balance);
        let critters = Rc::new(CritterManager::new(size, config.follow_up_limit));
        let towers = Rc::new(TowerManager::new(
            Rc::clone(&map),
            purse.clone(),
            config.ticks_per_second,
            config.follow_up_limit,
        ));
        let map_logic = Rc::new(RefCell::new(MapLogic::new(
            Rc::clone(&map),
            Rc::clone(&critters),
            Box::new(BreadthFirst),
            purse.clone(),
            config.base_health,
        )?));
        let critter_logic = Rc::new(RefCell::new(CritterLogic::new(
            Rc::clone(&critters),
            Rc::clone(&map),
            Box::new(BreadthFirst),
        )));

        critters.attach(critter_logic.clone())?;
        critters.attach(map_logic.clone())?;
        critter_logic.borrow().events().attach(map_logic.clone())?;
        log::debug!(
            "simulation wired on a {}x{} map",
            size.columns(),
            size.rows()
        );

        Ok(Self {
            tick: 0,
            map,
            purse,
            critters,
            towers,
            critter_logic,
            map_logic,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            spawning: Spawning::new(config.waves.into()),
            targets: Vec::new(),
            commands: Vec::new(),
        })
    }

    /// Latest processed tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Shared critter manager.
    #[must_use]
    pub fn critters(&self) -> &Rc<CritterManager> {
        &self.critters
    }

    /// Shared tower manager.
    #[must_use]
    pub fn towers(&self) -> &Rc<TowerManager> {
        &self.towers
    }

    /// Map-level controller, whose events feed the presentation.
    #[must_use]
    pub fn map_logic(&self) -> &Rc<RefCell<MapLogic>> {
        &self.map_logic
    }

    /// Critter controller.
    #[must_use]
    pub fn critter_logic(&self) -> &Rc<RefCell<CritterLogic>> {
        &self.critter_logic
    }

    /// Copy of the current map.
    #[must_use]
    pub fn map(&self) -> MapGrid {
        self.map.borrow().clone()
    }

    /// Current balance of the session's purse.
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.purse.borrow().balance()
    }

    /// Latest wave number handed out by the scheduler.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.spawning.wave()
    }

    /// Reports whether the base has fallen or every wave has been cleared.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.map_logic.borrow().is_breached() || self.spawning.is_finished()
    }

    /// Processes one tick.
    ///
    /// Tower cooldowns run down, critters walk, towers pick their targets
    /// from one snapshot and then resolve their attacks in order, the wave
    /// scheduler spawns at the entry and finally both managers commit.
    pub fn step(&mut self) -> Result<StepReport> {
        self.tick += 1;
        let tick = self.tick;
        let mut report = StepReport {
            tick,
            ..StepReport::default()
        };

        self.combat.cool_down(&self.towers)?;
        self.critter_logic.borrow_mut().advance(tick)?;

        self.targeting.handle(
            &self.towers.snapshot(),
            &self.critters.snapshot(),
            &mut self.targets,
        );
        let critter_logic = &self.critter_logic;
        self.combat.handle(
            &self.targets,
            &self.towers,
            &self.critters,
            |effect| critter_logic.borrow_mut().apply_effect(effect, tick),
            &mut report.outcomes,
        )?;

        let field_clear = self.critters.is_empty();
        let mut commands = mem::take(&mut self.commands);
        commands.clear();
        self.spawning.handle(field_clear, &mut commands);
        let mut wave_spawned = false;
        for command in &commands {
            match *command {
                SpawnCommand::StartWave { wave } => {
                    self.map_logic.borrow_mut().start_wave(wave)?;
                }
                SpawnCommand::Spawn { kind, level } => {
                    let entry = self.map_logic.borrow().entry()?;
                    let _ = self
                        .critters
                        .spawn(CritterSpec::new(kind, level, entry), tick)?;
                    report.spawned += 1;
                }
                SpawnCommand::WaveSpawned { .. } => wave_spawned = true,
            }
        }
        self.commands = commands;

        let _ = self.critters.commit()?;
        if wave_spawned {
            self.map_logic.borrow_mut().finish_spawning()?;
        }
        let _ = self.towers.commit()?;
        Ok(report)
    }

    /// Changes the terrain of `cell` and replans every critter route.
    ///
    /// A cell hosting a tower can only stay scenery.
    pub fn set_cell(&mut self, cell: CellCoord, kind: CellKind) -> Result<()> {
        if kind != CellKind::Scenery && self.towers.tower_at(cell).is_some() {
            return Err(Error::InvalidSpec(SpecViolation::Occupied(cell)));
        }
        self.map_logic.borrow_mut().set_cell(cell, kind)?;
        self.critter_logic.borrow_mut().recompute_routes()
    }

    /// Moves the entry and replans every critter route.
    pub fn set_entry(&mut self, cell: CellCoord) -> Result<()> {
        if self.towers.tower_at(cell).is_some() {
            return Err(Error::InvalidSpec(SpecViolation::Occupied(cell)));
        }
        self.map_logic.borrow_mut().set_entry(cell)?;
        self.critter_logic.borrow_mut().recompute_routes()
    }

    /// Moves the exit and replans every critter route.
    pub fn set_exit(&mut self, cell: CellCoord) -> Result<()> {
        if self.towers.tower_at(cell).is_some() {
            return Err(Error::InvalidSpec(SpecViolation::Occupied(cell)));
        }
        self.map_logic.borrow_mut().set_exit(cell)?;
        self.critter_logic.borrow_mut().recompute_routes()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Logic controllers hold the critter manager that holds them.
        let _ = self.critters.detach(&self.critter_logic);
        let _ = self.critters.detach(&self.map_logic);
        if let Ok(logic) = self.critter_logic.try_borrow() {
            let _ = logic.events().detach(&self.map_logic);
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("critters", &self.critters.len())
            .field("towers", &self.towers.len())
            .field("balance", &self.balance())
            .field("spawning", &self.spawning)
            .finish()
    }
}
