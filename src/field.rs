//! Flat per-cell storage for costs and species counts

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::spatial::{CellId, GridShape};

/// `len` copies of `value`, or an error instead of an allocation abort
fn try_filled<T: Clone>(len: usize, value: T, shape: GridShape) -> GridResult<Vec<T>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| GridError::InvalidDimension {
            width: shape.width(),
            height: shape.height(),
        })?;
    values.resize(len, value);
    Ok(values)
}

/// Traversal cost per cell, row-major. Values only ever go up through [`CostField::raise`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostField {
    values: Vec<f64>,
}

impl CostField {
    pub fn filled(shape: GridShape, initial_cost: f64) -> GridResult<Self> {
        Ok(Self {
            values: try_filled(shape.cell_count(), initial_cost, shape)?,
        })
    }

    pub fn get(&self, id: CellId) -> f64 {
        self.values[id]
    }

    /// Unconditional write, used when hydrating from tables.
    pub fn set(&mut self, id: CellId, value: f64) {
        self.values[id] = value;
    }

    /// Max-merge; returns true when the cell changed.
    pub fn raise(&mut self, id: CellId, value: f64) -> bool {
        let cell = &mut self.values[id];
        if *cell < value {
            *cell = value;
            true
        } else {
            false
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Population counts with explicit axes: species, then row, then col.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesField {
    species: usize,
    cells: usize,
    counts: Vec<u32>,
}

impl SpeciesField {
    pub fn zeroed(species: usize, shape: GridShape) -> GridResult<Self> {
        let cells = shape.cell_count();
        let len = species.checked_mul(cells).ok_or_else(|| {
            GridError::InvalidParameter(format!(
                "{species} species over {cells} cells overflows the species field"
            ))
        })?;
        Ok(Self {
            species,
            cells,
            counts: try_filled(len, 0, shape)?,
        })
    }

    pub fn species_count(&self) -> usize {
        self.species
    }

    fn offset(&self, species: usize, cell: CellId) -> usize {
        debug_assert!(species < self.species && cell < self.cells);
        species * self.cells + cell
    }

    pub fn get(&self, species: usize, cell: CellId) -> u32 {
        self.counts[self.offset(species, cell)]
    }

    pub fn set(&mut self, species: usize, cell: CellId, count: u32) {
        let offset = self.offset(species, cell);
        self.counts[offset] = count;
    }

    pub fn increment(&mut self, species: usize, cell: CellId) {
        let offset = self.offset(species, cell);
        self.counts[offset] = self.counts[offset].saturating_add(1);
    }

    /// Row-major plane for one species
    pub fn plane(&self, species: usize) -> &[u32] {
        let start = species * self.cells;
        &self.counts[start..start + self.cells]
    }

    pub fn total(&self, species: usize) -> u64 {
        self.plane(species).iter().map(|&count| count as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_raise_is_max_merge() {
        let shape = GridShape::new(2, 2).unwrap();
        let mut field = CostField::filled(shape, 3.0).unwrap();

        assert!(field.raise(0, 5.0));
        assert!(!field.raise(0, 4.0));
        assert!(!field.raise(1, 3.0));
        assert_eq!(field.as_slice(), &[5.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_species_planes_are_disjoint() {
        let shape = GridShape::new(3, 2).unwrap();
        let mut field = SpeciesField::zeroed(2, shape).unwrap();

        field.increment(1, 4);
        field.increment(1, 4);
        field.set(0, 5, 7);

        assert_eq!(field.get(1, 4), 2);
        assert_eq!(field.get(0, 4), 0);
        assert_eq!(field.plane(0), &[0, 0, 0, 0, 0, 7]);
        assert_eq!(field.total(1), 2);
    }

    #[test]
    fn test_oversized_species_field_is_an_error() {
        let shape = GridShape::new(1 << 20, 1 << 20).unwrap();

        assert!(matches!(
            SpeciesField::zeroed(usize::MAX / 4, shape),
            Err(GridError::InvalidParameter(_))
        ));
    }
}
