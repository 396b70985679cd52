//! Tower panel input translated into tower manager calls.

use std::{collections::VecDeque, rc::Rc};

use critter_defence_core::{Amount, CellCoord, Error, Result, SpecViolation, TowerId, TowerKind};
use critter_defence_world::{TowerManager, TowerSpec};

/// Player command issued from the tower panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelCommand {
    /// Choose the kind used by later placements.
    Select(TowerKind),
    /// Place a tower of the selected kind.
    Place,
    /// Sell the tower on the target cell.
    Sell,
    /// Upgrade the tower on the target cell.
    Upgrade,
}

/// Queued panel input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelEvent {
    /// What to do.
    pub command: PanelCommand,
    /// Cell the command applies to. Ignored by [`PanelCommand::Select`].
    pub cell: CellCoord,
}

impl PanelEvent {
    /// Creates an event.
    #[must_use]
    pub const fn new(command: PanelCommand, cell: CellCoord) -> Self {
        Self { command, cell }
    }
}

/// Successful result of one panel event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelOutcome {
    /// The selected kind changed.
    Selected(TowerKind),
    /// A tower was placed.
    Placed(TowerId),
    /// A tower was sold for `refund`.
    Sold {
        /// Tower that was sold.
        tower: TowerId,
        /// Amount credited back.
        refund: Amount,
    },
    /// A tower reached `level`.
    Upgraded {
        /// Tower that was upgraded.
        tower: TowerId,
        /// Level after the upgrade.
        level: u32,
    },
}

/// Translates queued panel events into tower manager calls.
#[derive(Debug)]
pub struct PanelInput {
    towers: Rc<TowerManager>,
    selected: TowerKind,
    queue: VecDeque<PanelEvent>,
}

impl PanelInput {
    /// Creates the panel with [`TowerKind::Basic`] selected.
    #[must_use]
    pub fn new(towers: Rc<TowerManager>) -> Self {
        Self {
            towers,
            selected: TowerKind::Basic,
            queue: VecDeque::new(),
        }
    }

    /// Kind used by the next placement.
    #[must_use]
    pub const fn selected(&self) -> TowerKind {
        self.selected
    }

    /// Queues an event for the next [`PanelInput::process`].
    pub fn push(&mut self, event: PanelEvent) {
        self.queue.push_back(event);
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Runs every queued event in order and returns one result per event.
    pub fn process(&mut self) -> Vec<Result<PanelOutcome>> {
        let mut results = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop_front() {
            let result = self.apply(event);
            if let Err(error) = &result {
                log::warn!("panel {:?} on {} rejected: {error}", event.command, event.cell);
            }
            results.push(result);
        }
        results
    }

    fn apply(&mut self, event: PanelEvent) -> Result<PanelOutcome> {
        match event.command {
            PanelCommand::Select(kind) => {
                self.selected = kind;
                Ok(PanelOutcome::Selected(kind))
            }
            PanelCommand::Place => self
                .towers
                .place(TowerSpec::new(self.selected, event.cell))
                .map(PanelOutcome::Placed),
            PanelCommand::Sell => {
                let tower = self.tower_at(event.cell)?;
                let refund = self.towers.sell(tower)?;
                Ok(PanelOutcome::Sold { tower, refund })
            }
            PanelCommand::Upgrade => {
                let tower = self.tower_at(event.cell)?;
                let upgraded = self.towers.upgrade(tower)?;
                Ok(PanelOutcome::Upgraded {
                    tower,
                    level: upgraded.level(),
                })
            }
        }
    }

    fn tower_at(&self, cell: CellCoord) -> Result<TowerId> {
        self.towers
            .tower_at(cell)
            .map(|tower| tower.id())
            .ok_or(Error::InvalidSpec(SpecViolation::Vacant(cell)))
    }
}
