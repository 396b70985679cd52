#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick critter rules: walking routes, taking hits and leaving the map.
//!
//! [`CritterLogic`] subscribes to the critter manager to plan a route for
//! every critter that joins and publishes [`CritterEvent`]s whenever a
//! critter is destroyed or escapes through the exit.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    fmt,
    rc::Rc,
};

use critter_defence_core::{
    CellCoord, CritterEvent, CritterId, Effect, Error, Result, SpecViolation, Tick,
};
use critter_defence_observe::{Delta, Observable, ObserverVec};
use critter_defence_world::{Critter, CritterManager, CritterState, MapGrid, Pathfinder};

/// Simulation-side controller for critter movement and damage.
pub struct CritterLogic {
    critters: Rc<CritterManager>,
    map: Rc<RefCell<MapGrid>>,
    pathfinder: Box<dyn Pathfinder>,
    routes: HashMap<CritterId, VecDeque<CellCoord>>,
    events: Observable<CritterEvent>,
}

impl CritterLogic {
    /// Creates the controller. It still has to be attached to `critters`.
    #[must_use]
    pub fn new(
        critters: Rc<CritterManager>,
        map: Rc<RefCell<MapGrid>>,
        pathfinder: Box<dyn Pathfinder>,
    ) -> Self {
        Self {
            critters,
            map,
            pathfinder,
            routes: HashMap::new(),
            events: Observable::new(),
        }
    }

    /// Subject announcing destroyed and escaped critters.
    #[must_use]
    pub fn events(&self) -> &Observable<CritterEvent> {
        &self.events
    }

    /// Remaining cells on a critter's route, ending with the exit.
    #[must_use]
    pub fn route(&self, id: CritterId) -> Option<Vec<CellCoord>> {
        self.routes
            .get(&id)
            .map(|route| route.iter().copied().collect())
    }

    /// Number of critters with a planned route.
    #[must_use]
    pub fn routed(&self) -> usize {
        self.routes.len()
    }

    /// Advances every routed critter by one tick.
    ///
    /// Critters that arrive at the exit are removed and announced as
    /// [`CritterEvent::ReachedGoal`].
    pub fn advance(&mut self, tick: Tick) -> Result<()> {
        for id in self.critters.ids() {
            let arrived = match self.routes.get_mut(&id) {
                None => continue,
                Some(route) if route.is_empty() => true,
                Some(route) => {
                    if !self.critters.modify(id, Critter::advance)? {
                        continue;
                    }
                    if let Some(next) = route.pop_front() {
                        self.critters.modify(id, |critter| critter.step_to(next))?;
                    }
                    route.is_empty()
                }
            };
            if arrived {
                self.escape(id, tick)?;
            }
        }
        Ok(())
    }

    /// Applies a resolved attack. Effects on critters that are no longer
    /// live are ignored.
    pub fn apply_effect(&mut self, effect: &Effect, tick: Tick) -> Result<()> {
        match *effect {
            Effect::Damage { target, amount } => {
                let _ = self.damage(target, amount, tick)?;
            }
            Effect::Slow {
                target,
                amount,
                speed_percent,
                duration_ticks,
            } => {
                if self.damage(target, amount, tick)? == Some(CritterState::Damaged) {
                    self.critters.modify(target, |critter| {
                        critter.apply_slow(speed_percent, duration_ticks);
                    })?;
                }
            }
            Effect::Splash {
                center,
                amount,
                radius,
                ..
            } => {
                let struck: Vec<CritterId> = self
                    .critters
                    .snapshot()
                    .iter()
                    .filter(|critter| center.within(critter.cell(), radius))
                    .map(Critter::id)
                    .collect();
                for id in struck {
                    let _ = self.damage(id, amount, tick)?;
                }
            }
        }
        Ok(())
    }

    /// Plans a fresh route for every live critter against the current map.
    ///
    /// Fails without touching existing routes if any critter is cut off.
    pub fn recompute_routes(&mut self) -> Result<()> {
        let mut routes = HashMap::with_capacity(self.routes.len());
        for critter in self.critters.snapshot() {
            let _ = routes.insert(critter.id(), self.plan(critter.cell())?);
        }
        self.routes = routes;
        log::debug!("recomputed {} critter routes", self.routes.len());
        Ok(())
    }

    fn plan(&self, origin: CellCoord) -> Result<VecDeque<CellCoord>> {
        let map = self.map.borrow();
        let goal = map
            .exit()
            .ok_or(Error::InvalidSpec(SpecViolation::MapLayout))?;
        Ok(self.pathfinder.compute_path(origin, goal, &map)?.into())
    }

    fn damage(&mut self, id: CritterId, amount: u32, tick: Tick) -> Result<Option<CritterState>> {
        if self.critters.find(id).is_none() {
            return Ok(None);
        }
        let state = self
            .critters
            .modify(id, |critter| critter.apply_damage(amount))?;
        if state == CritterState::Destroyed {
            let critter = self.critters.remove(id)?;
            let _ = self.routes.remove(&id);
            log::debug!("critter {} destroyed on tick {tick}", id.get());
            self.events.notify(&CritterEvent::Destroyed {
                critter: id,
                reward: critter.reward(),
                tick,
            })?;
        }
        Ok(Some(state))
    }

    fn escape(&mut self, id: CritterId, tick: Tick) -> Result<()> {
        self.critters.modify(id, Critter::reach_goal)?;
        let critter = self.critters.remove(id)?;
        let _ = self.routes.remove(&id);
        log::debug!("critter {} reached the exit on tick {tick}", id.get());
        self.events.notify(&CritterEvent::ReachedGoal {
            critter: id,
            strength: critter.strength(),
            tick,
        })
    }
}

impl ObserverVec<Critter> for CritterLogic {
    fn update(&mut self, delta: &Delta<Critter>) -> Result<()> {
        for critter in delta.removed() {
            let _ = self.routes.remove(&critter.id());
        }
        for critter in delta.added() {
            let route = self.plan(critter.cell())?;
            let _ = self.routes.insert(critter.id(), route);
        }
        Ok(())
    }
}

impl fmt::Debug for CritterLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CritterLogic")
            .field("routes", &self.routes.len())
            .field("events", &self.events)
            .finish()
    }
}
