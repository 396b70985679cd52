//! Route planning across the walkable cells of a [`MapGrid`].

use std::collections::VecDeque;

use critter_defence_core::{CellCoord, Error, Result};

use crate::MapGrid;

/// Computes walking routes for critters.
pub trait Pathfinder {
    /// Returns the cells to step through from `origin` to `goal`, excluding
    /// `origin` and ending with `goal`. Cells that are not walkable on `map`
    /// are obstacles.
    ///
    /// Fails with [`Error::Unreachable`] when no route exists.
    fn compute_path(
        &self,
        origin: CellCoord,
        goal: CellCoord,
        map: &MapGrid,
    ) -> Result<Vec<CellCoord>>;
}

/// Four-neighbour breadth-first search over the map.
#[derive(Clone, Copy, Debug, Default)]
pub struct BreadthFirst;

impl Pathfinder for BreadthFirst {
    fn compute_path(
        &self,
        origin: CellCoord,
        goal: CellCoord,
        map: &MapGrid,
    ) -> Result<Vec<CellCoord>> {
        let unreachable = Error::Unreachable { from: origin, to: goal };
        let mut field = NavigationField::default();
        let size = map.size();
        field.rebuild_with(size.columns(), size.rows(), &[goal], |cell| {
            !map.is_walkable(cell)
        });

        let mut current = origin;
        let mut distance = match field.distance(origin) {
            Some(distance) if distance != u16::MAX => distance,
            _ => return Err(unreachable),
        };
        let mut route = Vec::with_capacity(usize::from(distance));
        while distance > 0 {
            let next = neighbors(current, size.columns(), size.rows())
                .find(|candidate| field.distance(*candidate) == Some(distance - 1))
                .ok_or(unreachable.clone())?;
            route.push(next);
            current = next;
            distance -= 1;
        }
        Ok(route)
    }
}

/// Dense distance-to-goal grid built with a reverse breadth-first search.
///
/// Distances default to `u16::MAX` for unreachable cells.
#[derive(Clone, Debug, Default)]
struct NavigationField {
    width: u32,
    height: u32,
    distances: Vec<u16>,
}

impl NavigationField {
    fn rebuild_with<F>(&mut self, width: u32, height: u32, goals: &[CellCoord], mut is_blocked: F)
    where
        F: FnMut(CellCoord) -> bool,
    {
        let width_usize = usize::try_from(width).unwrap_or(0);
        let height_usize = usize::try_from(height).unwrap_or(0);
        let cell_count = width_usize.checked_mul(height_usize).unwrap_or(0);

        self.width = width;
        self.height = height;
        self.distances.clear();
        self.distances.resize(cell_count, u16::MAX);
        if cell_count == 0 {
            return;
        }

        let mut queue = VecDeque::new();
        for &goal in goals {
            if goal.column() >= width || goal.row() >= height || is_blocked(goal) {
                continue;
            }
            if let Some(index) = index(width_usize, goal) {
                if self.distances[index] == 0 {
                    continue;
                }
                self.distances[index] = 0;
                queue.push_back(goal);
            }
        }

        while let Some(cell) = queue.pop_front() {
            let Some(current_index) = index(width_usize, cell) else {
                continue;
            };
            let current_distance = self.distances[current_index];
            if current_distance >= u16::MAX.saturating_sub(1) {
                continue;
            }
            let next_distance = current_distance + 1;

            for neighbor in neighbors(cell, width, height) {
                if is_blocked(neighbor) {
                    continue;
                }
                let Some(neighbor_index) = index(width_usize, neighbor) else {
                    continue;
                };
                if self.distances[neighbor_index] <= next_distance {
                    continue;
                }
                self.distances[neighbor_index] = next_distance;
                queue.push_back(neighbor);
            }
        }
    }

    fn distance(&self, cell: CellCoord) -> Option<u16> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        index(width, cell).and_then(|offset| self.distances.get(offset).copied())
    }
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }
    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }
    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }
    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

fn index(width: usize, cell: CellCoord) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
