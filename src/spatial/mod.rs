//! Spatial model - grid shape, cell addressing and the all-pairs distance index

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, GridResult};

pub type CellId = usize;

/// Cell position in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Signed anchor for painted regions; may lie outside the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub row: i64,
    pub col: i64,
}

impl Anchor {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// Width and height of a grid, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    width: usize,
    height: usize,
}

impl GridShape {
    pub fn new(width: usize, height: usize) -> GridResult<Self> {
        if width == 0 || height == 0 || width.checked_mul(height).is_none() {
            return Err(GridError::InvalidDimension { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    /// Convert cell position to row-major cell ID
    pub fn pos_to_id(&self, pos: CellPos) -> Option<CellId> {
        if self.contains(pos) {
            Some(pos.row * self.width + pos.col)
        } else {
            None
        }
    }

    /// Checked variant of [`GridShape::pos_to_id`] used by indexed accessors
    pub fn require(&self, pos: CellPos) -> GridResult<CellId> {
        if pos.row >= self.height {
            return Err(GridError::out_of_range("row", pos.row, self.height));
        }
        if pos.col >= self.width {
            return Err(GridError::out_of_range("col", pos.col, self.width));
        }
        Ok(pos.row * self.width + pos.col)
    }

    /// Row-major iteration over every cell
    pub fn cells(&self) -> impl Iterator<Item = CellPos> + '_ {
        (0..self.cell_count()).map(move |id| CellPos {
            row: id / self.width,
            col: id % self.width,
        })
    }

    /// Half-open row and column ranges of `[row0, row1) x [col0, col1)` clipped to the grid
    pub fn clip(
        &self,
        row0: i64,
        row1: i64,
        col0: i64,
        col1: i64,
    ) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let height = i64::try_from(self.height).unwrap_or(i64::MAX);
        let width = i64::try_from(self.width).unwrap_or(i64::MAX);
        let clamp_rows = |v: i64| v.clamp(0, height) as usize;
        let clamp_cols = |v: i64| v.clamp(0, width) as usize;
        let rows = clamp_rows(row0)..clamp_rows(row1).max(clamp_rows(row0));
        let cols = clamp_cols(col0)..clamp_cols(col1).max(clamp_cols(col0));
        (rows, cols)
    }
}

/// Manhattan distance between two positions
pub fn manhattan(a: CellPos, b: CellPos) -> u32 {
    (a.row.abs_diff(b.row) + a.col.abs_diff(b.col)) as u32
}

/// All-pairs Manhattan distances, indexed by (row1, col1, row2, col2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceIndex {
    shape: GridShape,
    distances: Vec<u32>,
}

impl DistanceIndex {
    /// Enumerates every unordered pair of cells, self-pairs included, and
    /// writes each distance at both (a, b) and (b, a).
    pub fn build(shape: GridShape) -> Self {
        let n = shape.cell_count();
        let mut distances = vec![0_u32; n * n];
        for first in 0..n {
            let a = CellPos::new(first / shape.width, first % shape.width);
            for second in first..n {
                let b = CellPos::new(second / shape.width, second % shape.width);
                let d = manhattan(a, b);
                distances[first * n + second] = d;
                distances[second * n + first] = d;
            }
        }
        debug!(
            width = shape.width,
            height = shape.height,
            entries = distances.len(),
            "built distance index"
        );
        Self { shape, distances }
    }

    pub fn get(&self, a: CellPos, b: CellPos) -> Option<u32> {
        let first = self.shape.pos_to_id(a)?;
        let second = self.shape.pos_to_id(b)?;
        Some(self.distances[first * self.shape.cell_count() + second])
    }

    /// Distance by raw (row1, col1, row2, col2) indices
    pub fn at(&self, row1: usize, col1: usize, row2: usize, col2: usize) -> Option<u32> {
        self.get(CellPos::new(row1, col1), CellPos::new(row2, col2))
    }

    /// Distances from `origin` to every cell, row-major
    pub fn row_of(&self, origin: CellPos) -> Option<&[u32]> {
        let n = self.shape.cell_count();
        let id = self.shape.pos_to_id(origin)?;
        Some(&self.distances[id * n..(id + 1) * n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape() {
        let shape = GridShape::new(10, 5).unwrap();

        assert_eq!(shape.width(), 10);
        assert_eq!(shape.height(), 5);
        assert_eq!(shape.cell_count(), 50);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            GridShape::new(0, 3),
            Err(GridError::InvalidDimension { width: 0, height: 3 })
        ));
        assert!(GridShape::new(3, 0).is_err());
    }

    #[test]
    fn test_cell_count_overflow_rejected() {
        assert!(matches!(
            GridShape::new(usize::MAX, 2),
            Err(GridError::InvalidDimension { height: 2, .. })
        ));
        assert!(GridShape::new(usize::MAX / 2 + 1, 2).is_err());
    }

    #[test]
    fn test_pos_id_conversion() {
        let shape = GridShape::new(10, 5).unwrap();

        let pos = CellPos::new(2, 3);
        let id = shape.pos_to_id(pos).unwrap();
        assert_eq!(id, 23); // 2 * 10 + 3

        assert_eq!(shape.cells().nth(id), Some(pos));
        assert_eq!(shape.pos_to_id(CellPos::new(5, 0)), None);
    }

    #[test]
    fn test_clip_outside_region() {
        let shape = GridShape::new(4, 3).unwrap();

        let (rows, cols) = shape.clip(-2, 2, 3, 9);
        assert_eq!(rows, 0..2);
        assert_eq!(cols, 3..4);

        let (rows, cols) = shape.clip(5, 8, -4, -1);
        assert!(rows.is_empty());
        assert!(cols.is_empty());
    }

    #[test]
    fn test_distance_index_matches_manhattan() {
        let shape = GridShape::new(4, 3).unwrap();
        let index = DistanceIndex::build(shape);

        for a in shape.cells() {
            assert_eq!(index.get(a, a), Some(0));
            for b in shape.cells() {
                let expected = (a.row.abs_diff(b.row) + a.col.abs_diff(b.col)) as u32;
                assert_eq!(index.get(a, b), Some(expected));
                assert_eq!(index.get(a, b), index.get(b, a));
            }
        }
    }

    #[test]
    fn test_distance_row() {
        let shape = GridShape::new(3, 2).unwrap();
        let index = DistanceIndex::build(shape);

        let row = index.row_of(CellPos::new(0, 0)).unwrap();
        assert_eq!(row, &[0, 1, 2, 1, 2, 3]);
        assert_eq!(index.at(1, 2, 0, 0), Some(3));
        assert_eq!(index.at(2, 0, 0, 0), None);
    }
}
