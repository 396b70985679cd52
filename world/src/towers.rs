//! Authoritative tower state and the manager that owns it.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use critter_defence_core::{Amount, CellCoord, Error, Result, SpecViolation, TowerId, TowerKind};
use critter_defence_observe::{Delta, Entity, ObservableVec, SharedVecObserver};

use crate::{MapGrid, SharedEconomy};

/// Damage added to a tower by each upgrade.
pub const UPGRADE_POWER_BONUS: u32 = 5;

/// Range in cells added to a tower by each upgrade.
pub const UPGRADE_RANGE_BONUS: u32 = 1;

/// Parameters accepted by [`TowerManager::place`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerSpec {
    /// Kind of tower to build.
    pub kind: TowerKind,
    /// Cell the tower stands on.
    pub cell: CellCoord,
    /// Price charged for placement and for every upgrade.
    pub cost: Amount,
}

impl TowerSpec {
    /// Creates a spec priced at the kind's catalogue cost.
    #[must_use]
    pub const fn new(kind: TowerKind, cell: CellCoord) -> Self {
        Self {
            kind,
            cell,
            cost: kind.profile().cost,
        }
    }

    /// Overrides the price.
    #[must_use]
    pub const fn with_cost(mut self, cost: Amount) -> Self {
        self.cost = cost;
        self
    }
}

/// Snapshot of a live tower.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tower {
    id: TowerId,
    kind: TowerKind,
    cell: CellCoord,
    level: u32,
    cost: Amount,
    refund_value: Amount,
    range: u32,
    power: u32,
    cooldown_ticks: u32,
    cooldown_remaining: u32,
}

impl Tower {
    /// Identifier allocated by the manager.
    #[must_use]
    pub const fn id(&self) -> TowerId {
        self.id
    }

    /// Kind of the tower.
    #[must_use]
    pub const fn kind(&self) -> TowerKind {
        self.kind
    }

    /// Cell the tower stands on.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Upgrade level, starting at one.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Price paid on placement and charged per upgrade.
    #[must_use]
    pub const fn cost(&self) -> Amount {
        self.cost
    }

    /// Base refund; selling returns this times the level.
    #[must_use]
    pub const fn refund_value(&self) -> Amount {
        self.refund_value
    }

    /// Currency returned when the tower is sold now.
    #[must_use]
    pub const fn sale_value(&self) -> Amount {
        self.refund_value.saturating_mul(self.level)
    }

    /// Targeting range in cells.
    #[must_use]
    pub const fn range(&self) -> u32 {
        self.range
    }

    /// Damage applied per resolved attack.
    #[must_use]
    pub const fn power(&self) -> u32 {
        self.power
    }

    /// Ticks between two attacks.
    #[must_use]
    pub const fn cooldown_ticks(&self) -> u32 {
        self.cooldown_ticks
    }

    /// Ticks until the tower may attack again.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    /// Reports whether the tower may attack on this tick.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.cooldown_remaining == 0
    }

    /// Counts one tick off the cooldown.
    pub fn cool_down(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }

    /// Restarts the cooldown after a resolved attack.
    pub fn reset_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_ticks;
    }

    fn upgrade(&mut self) {
        self.level += 1;
        self.power += UPGRADE_POWER_BONUS;
        self.range += UPGRADE_RANGE_BONUS;
        self.refund_value += self.cost / 10;
    }
}

impl Entity for Tower {
    type Id = TowerId;

    fn id(&self) -> TowerId {
        self.id
    }
}

/// Sole lifecycle authority for towers.
///
/// Placement and upgrades are paid through the shared economy; sales refund
/// into it. Membership changes are announced once per
/// [`TowerManager::commit`].
pub struct TowerManager {
    towers: ObservableVec<Tower>,
    map: Rc<RefCell<MapGrid>>,
    economy: SharedEconomy,
    ticks_per_second: u32,
    next_id: Cell<u32>,
}

impl TowerManager {
    /// Creates a manager validating placements against `map` and charging
    /// `economy`.
    #[must_use]
    pub fn new(
        map: Rc<RefCell<MapGrid>>,
        economy: SharedEconomy,
        ticks_per_second: u32,
        follow_up_limit: usize,
    ) -> Self {
        Self {
            towers: ObservableVec::with_follow_up_limit(follow_up_limit),
            map,
            economy,
            ticks_per_second,
            next_id: Cell::new(0),
        }
    }

    /// Validates the placement, charges its cost and creates the tower.
    ///
    /// Nothing is charged or created when any check fails.
    pub fn place(&self, spec: TowerSpec) -> Result<TowerId> {
        if self.towers.is_notifying() {
            return Err(Error::ReentrantMutation);
        }
        match self.map.borrow().cell(spec.cell) {
            None => return Err(Error::InvalidSpec(SpecViolation::OutOfBounds(spec.cell))),
            Some(kind) if !kind.is_buildable() => {
                return Err(Error::InvalidSpec(SpecViolation::NotBuildable(spec.cell)))
            }
            Some(_) => {}
        }
        if self.tower_at(spec.cell).is_some() {
            return Err(Error::InvalidSpec(SpecViolation::Occupied(spec.cell)));
        }
        self.economy.borrow_mut().debit(spec.cost)?;

        let profile = spec.kind.profile();
        let id = TowerId::new(self.next_id.get());
        let tower = Tower {
            id,
            kind: spec.kind,
            cell: spec.cell,
            level: 1,
            cost: spec.cost,
            refund_value: profile.refund_value,
            range: profile.range,
            power: profile.power,
            cooldown_ticks: profile.cooldown_ticks(self.ticks_per_second),
            cooldown_remaining: 0,
        };
        if let Err(error) = self.towers.insert(tower) {
            self.economy.borrow_mut().credit(spec.cost);
            return Err(error);
        }
        self.next_id.set(id.get().wrapping_add(1));
        log::debug!("placed {} {} at {}", spec.kind.label(), id.get(), spec.cell);
        Ok(id)
    }

    /// Removes a live tower without refunding it.
    pub fn remove(&self, id: TowerId) -> Result<Tower> {
        self.towers.remove(id)
    }

    /// Removes a tower and credits its sale value, which is returned.
    pub fn sell(&self, id: TowerId) -> Result<Amount> {
        let tower = self.towers.remove(id)?;
        let refund = tower.sale_value();
        self.economy.borrow_mut().credit(refund);
        log::debug!("sold tower {} for {refund}", id.get());
        Ok(refund)
    }

    /// Removes a tower now, or once the running notification pass ends.
    pub fn defer_remove(&self, id: TowerId) -> Result<()> {
        self.towers.defer_remove(id)
    }

    /// Sells a tower now, or once the running notification pass ends.
    ///
    /// The sale value is credited as soon as the request is accepted.
    pub fn defer_sell(&self, id: TowerId) -> Result<Amount> {
        let refund = self
            .towers
            .with(id, Tower::sale_value)
            .ok_or(Error::UnknownId(id.into()))?;
        self.towers.defer_remove(id)?;
        self.economy.borrow_mut().credit(refund);
        log::debug!("sale of tower {} for {refund} accepted", id.get());
        Ok(refund)
    }

    /// Charges the tower's cost and raises its level, power, range and
    /// refund value. Returns the upgraded snapshot.
    pub fn upgrade(&self, id: TowerId) -> Result<Tower> {
        let cost = self
            .towers
            .with(id, Tower::cost)
            .ok_or(Error::UnknownId(id.into()))?;
        self.economy.borrow_mut().debit(cost)?;
        let upgraded = self.towers.modify(id, |tower| {
            tower.upgrade();
            tower.clone()
        });
        if upgraded.is_err() {
            self.economy.borrow_mut().credit(cost);
        }
        upgraded
    }

    /// Announces pending placements and removals to observers.
    pub fn commit(&self) -> Result<Vec<Delta<Tower>>> {
        self.towers.commit()
    }

    /// Copy of a live tower.
    #[must_use]
    pub fn find(&self, id: TowerId) -> Option<Tower> {
        self.towers.get(id)
    }

    /// Copy of the tower standing on `cell`.
    #[must_use]
    pub fn tower_at(&self, cell: CellCoord) -> Option<Tower> {
        self.towers
            .snapshot()
            .into_iter()
            .find(|tower| tower.cell() == cell)
    }

    /// Mutates a live tower without notifying observers.
    pub fn modify<R>(&self, id: TowerId, update: impl FnOnce(&mut Tower) -> R) -> Result<R> {
        self.towers.modify(id, update)
    }

    /// Identifiers of live towers in placement order.
    #[must_use]
    pub fn ids(&self) -> Vec<TowerId> {
        self.towers.ids()
    }

    /// Copies of live towers in placement order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Tower> {
        self.towers.snapshot()
    }

    /// Number of live towers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.towers.len()
    }

    /// Reports whether no tower is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    /// Reports whether a commit has changes to announce.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.towers.has_pending()
    }

    /// Currency available in the shared economy.
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.economy.borrow().balance()
    }

    /// Registers an observer of tower membership changes.
    pub fn attach(&self, observer: SharedVecObserver<Tower>) -> Result<()> {
        self.towers.attach(observer)
    }

    /// Unregisters an observer of tower membership changes.
    pub fn detach<O: ?Sized>(&self, observer: &Rc<RefCell<O>>) -> Result<()> {
        self.towers.detach(observer)
    }
}

impl fmt::Debug for TowerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TowerManager")
            .field("towers", &self.towers)
            .field("balance", &self.balance())
            .field("next_id", &self.next_id.get())
            .finish()
    }
}
