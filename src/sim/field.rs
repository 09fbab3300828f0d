//! Playfield tile grid
//!
//! Level geometry is a grid of cells: empty, solid, or breakable with hit
//! points. The grid's outer rectangle doubles as the arena walls. Authoring
//! of real levels is out of scope; the grid only answers solidity queries
//! and applies cell damage.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::TILE_SIZE;

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Solid,
    Breakable {
        hp: u8,
    },
}

impl Cell {
    #[inline]
    pub fn is_solid(&self) -> bool {
        !matches!(self, Cell::Empty)
    }
}

/// The level's tile grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playfield {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl Playfield {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::Empty; cols * rows],
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Playfield width in pixels
    #[inline]
    pub fn width(&self) -> f32 {
        self.cols as f32 * TILE_SIZE
    }

    /// Playfield height in pixels
    #[inline]
    pub fn height(&self) -> f32 {
        self.rows as f32 * TILE_SIZE
    }

    pub fn cell(&self, col: usize, row: usize) -> Cell {
        if col >= self.cols || row >= self.rows {
            return Cell::Empty;
        }
        self.cells[row * self.cols + col]
    }

    pub fn set_cell(&mut self, col: usize, row: usize, cell: Cell) {
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = cell;
        }
    }

    /// Whether the cell at grid coordinates blocks movement
    #[inline]
    pub fn is_solid(&self, col: usize, row: usize) -> bool {
        self.cell(col, row).is_solid()
    }

    /// Whether the cell at grid coordinates is breakable
    #[inline]
    pub fn is_breakable(&self, col: usize, row: usize) -> bool {
        matches!(self.cell(col, row), Cell::Breakable { .. })
    }

    /// Grid coordinates containing a world position (None outside the grid)
    pub fn cell_at(&self, pos: Vec2) -> Option<(usize, usize)> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let col = (pos.x / TILE_SIZE) as usize;
        let row = (pos.y / TILE_SIZE) as usize;
        if col < self.cols && row < self.rows {
            Some((col, row))
        } else {
            None
        }
    }

    /// World-space center of a cell
    pub fn cell_center(&self, col: usize, row: usize) -> Vec2 {
        Vec2::new(
            (col as f32 + 0.5) * TILE_SIZE,
            (row as f32 + 0.5) * TILE_SIZE,
        )
    }

    /// Remove one hit point from a breakable cell. Returns true when the
    /// cell was destroyed by this hit. Solid and empty cells are untouched.
    pub fn chip(&mut self, col: usize, row: usize) -> bool {
        if col >= self.cols || row >= self.rows {
            return false;
        }
        let idx = row * self.cols + col;
        if let Cell::Breakable { hp } = self.cells[idx] {
            if hp <= 1 {
                self.cells[idx] = Cell::Empty;
                return true;
            }
            self.cells[idx] = Cell::Breakable { hp: hp - 1 };
        }
        false
    }

    /// Whether a position has drifted past the playfield by `margin`
    pub fn out_of_bounds(&self, pos: Vec2, margin: f32) -> bool {
        pos.x < -margin
            || pos.y < -margin
            || pos.x > self.width() + margin
            || pos.y > self.height() + margin
    }

    /// Grid cells overlapped by an AABB, clamped to the grid
    pub fn cells_overlapping(
        &self,
        min: Vec2,
        max: Vec2,
    ) -> impl Iterator<Item = (usize, usize)> + '_ {
        let c0 = (min.x / TILE_SIZE).floor().max(0.0) as usize;
        let r0 = (min.y / TILE_SIZE).floor().max(0.0) as usize;
        let c1 = ((max.x / TILE_SIZE).floor() as isize).clamp(0, self.cols as isize - 1) as usize;
        let r1 = ((max.y / TILE_SIZE).floor() as isize).clamp(0, self.rows as isize - 1) as usize;
        (r0..=r1.max(r0)).flat_map(move |r| (c0..=c1.max(c0)).map(move |c| (c, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_queries() {
        let mut f = Playfield::new(4, 4);
        assert!(!f.is_solid(1, 1));
        f.set_cell(1, 1, Cell::Solid);
        assert!(f.is_solid(1, 1));
        f.set_cell(2, 1, Cell::Breakable { hp: 2 });
        assert!(f.is_solid(2, 1));
        assert!(f.is_breakable(2, 1));
        // Out-of-range reads are empty, never a panic
        assert!(!f.is_solid(99, 99));
    }

    #[test]
    fn test_chip_to_destruction() {
        let mut f = Playfield::new(4, 4);
        f.set_cell(0, 0, Cell::Breakable { hp: 2 });
        assert!(!f.chip(0, 0));
        assert!(f.is_solid(0, 0));
        assert!(f.chip(0, 0));
        assert!(!f.is_solid(0, 0));
        // Chipping empty or solid cells is a no-op
        assert!(!f.chip(0, 0));
        f.set_cell(1, 0, Cell::Solid);
        assert!(!f.chip(1, 0));
        assert!(f.is_solid(1, 0));
    }

    #[test]
    fn test_out_of_bounds_margin() {
        let f = Playfield::new(4, 4); // 64x64 px
        assert!(!f.out_of_bounds(Vec2::new(32.0, 32.0), 16.0));
        assert!(!f.out_of_bounds(Vec2::new(70.0, 32.0), 16.0));
        assert!(f.out_of_bounds(Vec2::new(81.0, 32.0), 16.0));
        assert!(f.out_of_bounds(Vec2::new(32.0, -17.0), 16.0));
    }

    #[test]
    fn test_cell_at() {
        let f = Playfield::new(4, 4);
        assert_eq!(f.cell_at(Vec2::new(8.0, 8.0)), Some((0, 0)));
        assert_eq!(f.cell_at(Vec2::new(17.0, 40.0)), Some((1, 2)));
        assert_eq!(f.cell_at(Vec2::new(-1.0, 8.0)), None);
        assert_eq!(f.cell_at(Vec2::new(999.0, 8.0)), None);
    }
}
