//! Headless presentation: views wired to a session, a logging renderer and
//! the run summary.

use std::{cell::RefCell, fmt, rc::Rc};

use anyhow::Result;
use critter_defence_presentation::{Layout, MapUI, Renderer, TowerUIManager, VisualState};
use critter_defence_simulation::Simulation;
use serde::Serialize;

/// Map and tower views registered with a running session.
#[derive(Debug)]
pub(crate) struct Views {
    map: Rc<RefCell<MapUI>>,
    towers: Rc<RefCell<TowerUIManager>>,
}

impl Views {
    /// Creates the views and registers them with the session's subjects.
    pub(crate) fn attach(
        simulation: &Simulation,
        layout: Layout,
        base_health: u32,
    ) -> Result<Self> {
        let map = Rc::new(RefCell::new(MapUI::new(simulation.map(), layout, base_health)));
        let towers = Rc::new(RefCell::new(TowerUIManager::new(layout)));
        simulation.critters().attach(map.clone())?;
        simulation
            .map_logic()
            .borrow()
            .events()
            .attach(map.clone())?;
        simulation.towers().attach(towers.clone())?;
        Ok(Self { map, towers })
    }

    /// Pulls positions, health and levels from the latest snapshots.
    pub(crate) fn refresh(&self, simulation: &Simulation) {
        self.map
            .borrow_mut()
            .refresh(&simulation.critters().snapshot(), simulation.balance());
        self.towers
            .borrow_mut()
            .refresh(&simulation.towers().snapshot());
    }

    /// Renders one frame.
    pub(crate) fn draw(&self, renderer: &mut dyn Renderer) -> Result<()> {
        self.map.borrow().draw(&self.towers.borrow(), renderer)
    }

    /// Unregisters both views from every subject they were attached to.
    pub(crate) fn detach(&self, simulation: &Simulation) -> Result<()> {
        simulation
            .map_logic()
            .borrow()
            .events()
            .detach(&self.map)?;
        simulation.critters().detach(&self.map)?;
        simulation.towers().detach(&self.towers)?;
        Ok(())
    }
}

/// Renderer that writes a one-line description of every frame to the log.
#[derive(Debug, Default)]
pub(crate) struct LogRenderer {
    frames: u64,
    banner: Option<String>,
}

impl Renderer for LogRenderer {
    fn draw(&mut self, state: &VisualState) -> Result<()> {
        self.frames += 1;
        if state.banner != self.banner {
            if let Some(banner) = &state.banner {
                log::info!("{banner}");
            }
            self.banner = state.banner.clone();
        }
        log::info!(
            "frame {}: wave {}, base {}/{}, balance {}, {} critters, {} towers",
            self.frames,
            state.hud.wave,
            state.hud.base_health,
            state.hud.max_base_health,
            state.hud.balance,
            state.critters.len(),
            state.towers.len()
        );
        Ok(())
    }
}

/// How the session ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Outcome {
    /// The tick limit was reached first.
    #[default]
    Unfinished,
    /// Every wave was cleared.
    Survived,
    /// The base fell.
    Breached,
}

/// Totals printed at the end of a run.
#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct Summary {
    pub(crate) ticks: u64,
    pub(crate) waves: u32,
    pub(crate) spawned: usize,
    pub(crate) hits: usize,
    pub(crate) fizzled: usize,
    pub(crate) base_health: u32,
    pub(crate) max_base_health: u32,
    pub(crate) balance: u32,
    pub(crate) towers: usize,
    pub(crate) critters_left: usize,
    pub(crate) outcome: Outcome,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Outcome::Unfinished => "tick limit reached",
            Outcome::Survived => "every wave cleared",
            Outcome::Breached => "base breached",
        };
        writeln!(f, "{outcome} after {} ticks", self.ticks)?;
        writeln!(f, "waves: {}", self.waves)?;
        writeln!(
            f,
            "critters: {} spawned, {} left",
            self.spawned, self.critters_left
        )?;
        writeln!(f, "attacks: {} hits, {} fizzled", self.hits, self.fizzled)?;
        writeln!(
            f,
            "base: {}/{}",
            self.base_health, self.max_base_health
        )?;
        write!(f, "balance: {}, towers: {}", self.balance, self.towers)
    }
}
