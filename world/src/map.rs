//! Cell grid describing the terrain critters walk across.

use critter_defence_core::{CellCoord, CellKind, Error, GridSize, Result, SpecViolation};

/// Dense row-major grid of [`CellKind`] values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapGrid {
    size: GridSize,
    cells: Vec<CellKind>,
}

impl MapGrid {
    /// Creates a map of the given size covered in scenery.
    #[must_use]
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![CellKind::Scenery; size.cell_count()],
        }
    }

    /// Builds the demo layout: a single horizontal corridor through the
    /// middle row, entering on the left edge and leaving on the right.
    #[must_use]
    pub fn straight_corridor(size: GridSize) -> Self {
        let mut map = Self::new(size);
        if size.columns() == 0 || size.rows() == 0 {
            return map;
        }
        let row = size.rows() / 2;
        let last = size.columns() - 1;
        for column in 0..=last {
            let kind = match column {
                0 => CellKind::Entry,
                c if c == last => CellKind::Exit,
                _ => CellKind::Path,
            };
            if let Some(index) = map.index(CellCoord::new(column, row)) {
                map.cells[index] = kind;
            }
        }
        map
    }

    /// Parses a map from text rows.
    ///
    /// `.` is scenery, `#` is path, `E` is the entry and `X` the exit. Every
    /// row must have the same width.
    pub fn from_rows(rows: &[&str]) -> Result<Self> {
        let width = rows.first().map_or(0, |row| row.chars().count());
        let mut cells = Vec::with_capacity(width * rows.len());
        for row in rows {
            if row.chars().count() != width {
                return Err(Error::InvalidSpec(SpecViolation::MapLayout));
            }
            for symbol in row.chars() {
                cells.push(match symbol {
                    '.' => CellKind::Scenery,
                    '#' => CellKind::Path,
                    'E' => CellKind::Entry,
                    'X' => CellKind::Exit,
                    _ => return Err(Error::InvalidSpec(SpecViolation::MapLayout)),
                });
            }
        }
        let columns =
            u32::try_from(width).map_err(|_| Error::InvalidSpec(SpecViolation::MapLayout))?;
        let height =
            u32::try_from(rows.len()).map_err(|_| Error::InvalidSpec(SpecViolation::MapLayout))?;
        Ok(Self {
            size: GridSize::new(columns, height),
            cells,
        })
    }

    /// Dimensions of the map.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Terrain of a cell, or `None` outside the map.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<CellKind> {
        self.index(cell).and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether critters may walk across the cell.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.cell(cell).is_some_and(CellKind::is_walkable)
    }

    /// Replaces the terrain of a cell and returns the previous terrain.
    pub fn set(&mut self, cell: CellCoord, kind: CellKind) -> Result<CellKind> {
        let index = self
            .index(cell)
            .ok_or(Error::InvalidSpec(SpecViolation::OutOfBounds(cell)))?;
        Ok(std::mem::replace(&mut self.cells[index], kind))
    }

    /// Every cell of the given kind in row-major order.
    #[must_use]
    pub fn cells_of(&self, kind: CellKind) -> Vec<CellCoord> {
        self.coords()
            .filter(|cell| self.cell(*cell) == Some(kind))
            .collect()
    }

    /// The single entry cell, if the layout has exactly one.
    #[must_use]
    pub fn entry(&self) -> Option<CellCoord> {
        single(self.cells_of(CellKind::Entry))
    }

    /// The single exit cell, if the layout has exactly one.
    #[must_use]
    pub fn exit(&self) -> Option<CellCoord> {
        single(self.cells_of(CellKind::Exit))
    }

    /// Checks that the layout has exactly one entry and one exit.
    pub fn validate(&self) -> Result<(CellCoord, CellCoord)> {
        match (self.entry(), self.exit()) {
            (Some(entry), Some(exit)) => Ok((entry, exit)),
            _ => Err(Error::InvalidSpec(SpecViolation::MapLayout)),
        }
    }

    /// Iterates every coordinate in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> {
        let columns = self.size.columns();
        (0..self.size.rows())
            .flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.size.contains(cell) {
            return None;
        }
        let width = usize::try_from(self.size.columns()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

fn single(cells: Vec<CellCoord>) -> Option<CellCoord> {
    match cells.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}
