#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that chooses deterministic tower targets from manager snapshots.

use critter_defence_core::{CellCoord, CritterId, Tick, TowerId, TowerTarget};
use critter_defence_world::{Critter, Tower};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<TowerWorkspace>,
    critter_workspace: Vec<CritterCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a target for every ready tower.
    ///
    /// Each tower picks the nearest live critter within its range, measured
    /// as squared distance between cells. Ties go to the critter spawned
    /// earliest, then to the lowest identifier. The output buffer is cleared
    /// before it is filled, in tower order.
    pub fn handle(&mut self, towers: &[Tower], critters: &[Critter], out: &mut Vec<TowerTarget>) {
        out.clear();

        self.prepare_tower_workspace(towers);
        if self.tower_workspace.is_empty() {
            return;
        }

        self.prepare_critter_workspace(critters);
        if self.critter_workspace.is_empty() {
            return;
        }

        for tower in &self.tower_workspace {
            let max_distance = u64::from(tower.range) * u64::from(tower.range);
            let mut best: Option<BestCandidate> = None;

            for candidate in &self.critter_workspace {
                let distance_sq = tower.cell.distance_squared(candidate.cell);
                if distance_sq > max_distance {
                    continue;
                }

                let current = BestCandidate {
                    distance_sq,
                    spawn_tick: candidate.spawn_tick,
                    critter: candidate.id,
                };

                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(best_candidate) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    critter: best_candidate.critter,
                });
            }
        }
    }

    fn prepare_tower_workspace(&mut self, towers: &[Tower]) {
        self.tower_workspace.clear();
        self.tower_workspace.reserve(towers.len());

        for tower in towers.iter().filter(|tower| tower.is_ready()) {
            self.tower_workspace.push(TowerWorkspace {
                id: tower.id(),
                cell: tower.cell(),
                range: tower.range(),
            });
        }
    }

    fn prepare_critter_workspace(&mut self, critters: &[Critter]) {
        self.critter_workspace.clear();
        self.critter_workspace.reserve(critters.len());

        for critter in critters.iter().filter(|critter| !critter.state().is_terminal()) {
            self.critter_workspace.push(CritterCandidate {
                id: critter.id(),
                cell: critter.cell(),
                spawn_tick: critter.spawn_tick(),
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TowerWorkspace {
    id: TowerId,
    cell: CellCoord,
    range: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CritterCandidate {
    id: CritterId,
    cell: CellCoord,
    spawn_tick: Tick,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    distance_sq: u64,
    spawn_tick: Tick,
    critter: CritterId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        (self.distance_sq, self.spawn_tick, self.critter)
            < (other.distance_sq, other.spawn_tick, other.critter)
    }
}
