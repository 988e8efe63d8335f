use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CellCoord;

/// Single map cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    symbol: char,
    blocked: bool,
    tags: BTreeSet<String>,
}

impl Cell {
    /// Creates an unblocked, untagged cell with the provided terrain symbol.
    #[must_use]
    pub const fn new(symbol: char) -> Self {
        Self {
            symbol,
            blocked: false,
            tags: BTreeSet::new(),
        }
    }

    /// Terrain symbol of the cell.
    #[must_use]
    pub const fn symbol(&self) -> char {
        self.symbol
    }

    /// Reports whether a blocker vetoes walking on the cell.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Named location tags attached to the cell.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Reports whether the cell carries the provided location tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Reasons a grid cannot be constructed or edited.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The grid contains no cells.
    #[error("grid must contain at least one row and one column")]
    Empty,
    /// A row length differs from the first row.
    #[error("row {row} holds {found} cells but {expected} were expected")]
    RaggedRow {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// The grid dimensions do not fit the coordinate type.
    #[error("grid of {columns}x{rows} cells exceeds the addressable size")]
    TooLarge {
        /// Number of columns requested.
        columns: usize,
        /// Number of rows requested.
        rows: usize,
    },
    /// The cell lies outside the grid.
    #[error("cell {cell} lies outside the {columns}x{rows} grid")]
    OutOfBounds {
        /// Offending cell.
        cell: CellCoord,
        /// Number of columns in the grid.
        columns: u32,
        /// Number of rows in the grid.
        rows: u32,
    },
}

/// Rectangular, row-major map of cells.
///
/// Every row has the same length; the dimensions derive from the shape the
/// grid was built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Builds a grid from rows of cells.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, GridError> {
        let row_count = rows.len();
        let column_count = rows.first().map_or(0, Vec::len);
        if row_count == 0 || column_count == 0 {
            return Err(GridError::Empty);
        }

        for (index, row) in rows.iter().enumerate() {
            if row.len() != column_count {
                return Err(GridError::RaggedRow {
                    row: index,
                    expected: column_count,
                    found: row.len(),
                });
            }
        }

        let too_large = GridError::TooLarge {
            columns: column_count,
            rows: row_count,
        };
        let columns = u32::try_from(column_count).map_err(|_| too_large.clone())?;
        let row_total = u32::try_from(row_count).map_err(|_| too_large)?;

        Ok(Self {
            columns,
            rows: row_total,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Builds a grid from one string per row, one symbol per character.
    pub fn from_symbols<S: AsRef<str>>(rows: &[S]) -> Result<Self, GridError> {
        Self::from_rows(
            rows.iter()
                .map(|row| row.as_ref().chars().map(Cell::new).collect())
                .collect(),
        )
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Cell stored at the coordinate, if inside the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Every cell with its coordinate in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> {
        let columns = self.columns.max(1);
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            (CellCoord::new(index % columns, index / columns), cell)
        })
    }

    /// Coordinates of cells carrying `tag`, in row-major order.
    pub fn cells_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = CellCoord> + 'a {
        self.iter()
            .filter(move |(_, cell)| cell.has_tag(tag))
            .map(|(coord, _)| coord)
    }

    /// Attaches a location tag to a cell.
    pub fn tag(&mut self, coord: CellCoord, tag: impl Into<String>) -> Result<(), GridError> {
        let cell = self.cell_mut(coord)?;
        let _ = cell.tags.insert(tag.into());
        Ok(())
    }

    /// Marks a cell as blocked regardless of its symbol.
    pub fn block(&mut self, coord: CellCoord) -> Result<(), GridError> {
        self.cell_mut(coord)?.blocked = true;
        Ok(())
    }

    fn cell_mut(&mut self, coord: CellCoord) -> Result<&mut Cell, GridError> {
        let out_of_bounds = GridError::OutOfBounds {
            cell: coord,
            columns: self.columns,
            rows: self.rows,
        };
        let index = self.index(coord).ok_or_else(|| out_of_bounds.clone())?;
        self.cells.get_mut(index).ok_or(out_of_bounds)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}
