//! The spatial grid: cost field, species field, thresholds and distances

use std::cell::OnceCell;
use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GridSettings;
use crate::error::{GridError, GridResult};
use crate::field::{CostField, SpeciesField};
use crate::render::{MatrixRenderer, MatrixView};
use crate::spatial::{manhattan, Anchor, CellPos, DistanceIndex, GridShape};
use crate::table::{CellRecord, CellTable, ThresholdTable};

/// Cost assigned to cells a cell table does not mention.
pub const DEFAULT_INITIAL_COST: f64 = 1.0;

/// How a sampled point `(x, y)` maps onto grid axes when seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedAxes {
    /// Historical mapping kept for compatibility with existing data: `x` is
    /// bounds-checked against the height but lands on the column axis, and
    /// `y` is checked against the width but lands on the row axis. On
    /// non-square grids a point that passes the check yet maps past the
    /// last row or column is dropped.
    #[default]
    Legacy,
    /// `x` is the row and `y` is the column.
    RowCol,
}

/// Outcome of one seeding call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeedReport {
    pub placed: usize,
    pub dropped: usize,
}

/// Value applied by a Gaussian circle at offset (`d_row`, `d_col`) from its center
pub fn gaussian_falloff(peak_cost: f64, std_dev: f64, d_row: i64, d_col: i64) -> f64 {
    let (d_row, d_col) = (d_row as f64, d_col as f64);
    peak_cost * (-(d_row * d_row + d_col * d_col) / (std_dev * std_dev)).exp()
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    shape: GridShape,
    cost: CostField,
    species: SpeciesField,
    thresholds: Vec<f64>,
    distances: OnceCell<DistanceIndex>,
}

impl PartialEq for SpatialGrid {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.cost == other.cost
            && self.species == other.species
            && self.thresholds == other.thresholds
    }
}

impl SpatialGrid {
    pub fn new(
        width: usize,
        height: usize,
        initial_cost: f64,
        species_count: usize,
    ) -> GridResult<Self> {
        let shape = GridShape::new(width, height)?;
        if !initial_cost.is_finite() || initial_cost < 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "initial cost must be finite and non-negative, got {initial_cost}"
            )));
        }
        debug!(width, height, species_count, initial_cost, "allocating grid");
        Ok(Self {
            shape,
            cost: CostField::filled(shape, initial_cost)?,
            species: SpeciesField::zeroed(species_count, shape)?,
            thresholds: vec![0.0; species_count],
            distances: OnceCell::new(),
        })
    }

    pub fn from_settings(settings: &GridSettings) -> GridResult<Self> {
        let grid = Self::new(
            settings.width,
            settings.height,
            settings.initial_cost,
            settings.species,
        )?;
        if settings.eager_distances {
            grid.precompute_distances();
        }
        Ok(grid)
    }

    /// Rebuilds a grid from its cell and threshold tables.
    ///
    /// The shape is inferred from the largest row and column indices present.
    /// Cells absent from the table keep [`DEFAULT_INITIAL_COST`] and zero counts.
    pub fn from_tables(cells: &CellTable, thresholds: &ThresholdTable) -> GridResult<Self> {
        if cells.rows.is_empty() {
            return Err(GridError::MalformedInput("cell table has no rows".into()));
        }
        let extent = |max: usize, axis: &str| {
            max.checked_add(1).ok_or_else(|| {
                GridError::MalformedInput(format!("{axis} index {max} has no representable extent"))
            })
        };
        let height = extent(cells.rows.iter().map(|r| r.row).max().unwrap_or(0), "row")?;
        let width = extent(cells.rows.iter().map(|r| r.col).max().unwrap_or(0), "col")?;
        let mut grid = Self::new(width, height, DEFAULT_INITIAL_COST, cells.species_count)?;

        for record in &cells.rows {
            if record.species.len() != cells.species_count {
                return Err(GridError::MalformedInput(format!(
                    "cell ({}, {}) has {} species counts, expected {}",
                    record.row,
                    record.col,
                    record.species.len(),
                    cells.species_count
                )));
            }
            if !record.cost.is_finite() || record.cost < 0.0 {
                return Err(GridError::MalformedInput(format!(
                    "cell ({}, {}) has invalid cost {}",
                    record.row, record.col, record.cost
                )));
            }
            let id = grid.shape.require(CellPos::new(record.row, record.col))?;
            grid.cost.set(id, record.cost);
            for (species, &count) in record.species.iter().enumerate() {
                grid.species.set(species, id, count);
            }
        }

        for (species, &value) in thresholds.values.iter().enumerate() {
            grid.set_threshold(species, value)?;
        }
        debug!(
            width,
            height,
            species = cells.species_count,
            rows = cells.rows.len(),
            "hydrated grid from tables"
        );
        Ok(grid)
    }

    pub fn load(cells: impl AsRef<Path>, thresholds: impl AsRef<Path>) -> GridResult<Self> {
        let cells = CellTable::read_csv(cells)?;
        let thresholds = ThresholdTable::read_csv(thresholds)?;
        Self::from_tables(&cells, &thresholds)
    }

    pub fn save(&self, cells: impl AsRef<Path>, thresholds: impl AsRef<Path>) -> GridResult<()> {
        let (cell_table, threshold_table) = self.export_tables();
        cell_table.write_csv(cells)?;
        threshold_table.write_csv(thresholds)
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn width(&self) -> usize {
        self.shape.width()
    }

    pub fn height(&self) -> usize {
        self.shape.height()
    }

    pub fn species_count(&self) -> usize {
        self.species.species_count()
    }

    fn require_species(&self, species: usize) -> GridResult<()> {
        if species >= self.species_count() {
            return Err(GridError::out_of_range(
                "species",
                species,
                self.species_count(),
            ));
        }
        Ok(())
    }

    pub fn cost(&self, pos: CellPos) -> GridResult<f64> {
        Ok(self.cost.get(self.shape.require(pos)?))
    }

    pub fn costs(&self) -> &[f64] {
        self.cost.as_slice()
    }

    pub fn population(&self, species: usize, pos: CellPos) -> GridResult<u32> {
        self.require_species(species)?;
        Ok(self.species.get(species, self.shape.require(pos)?))
    }

    pub fn total_population(&self, species: usize) -> GridResult<u64> {
        self.require_species(species)?;
        Ok(self.species.total(species))
    }

    pub fn threshold(&self, species: usize) -> GridResult<f64> {
        self.require_species(species)?;
        Ok(self.thresholds[species])
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn set_threshold(&mut self, species: usize, value: f64) -> GridResult<()> {
        self.require_species(species)?;
        self.thresholds[species] = value;
        Ok(())
    }

    /// All-pairs distance index, built on first access and cached.
    pub fn distance_index(&self) -> &DistanceIndex {
        self.distances.get_or_init(|| DistanceIndex::build(self.shape))
    }

    pub fn has_distance_index(&self) -> bool {
        self.distances.get().is_some()
    }

    pub fn precompute_distances(&self) -> &DistanceIndex {
        self.distance_index()
    }

    /// Manhattan distance between two cells; reads the index when it exists.
    pub fn distance(&self, a: CellPos, b: CellPos) -> GridResult<u32> {
        self.shape.require(a)?;
        self.shape.require(b)?;
        Ok(match self.distances.get().and_then(|index| index.get(a, b)) {
            Some(distance) => distance,
            None => manhattan(a, b),
        })
    }

    /// Draws `sample_size` points around `position` with isotropic variance
    /// `covariance` and adds one individual per in-bounds point, using the
    /// legacy axis mapping (see [`SeedAxes::Legacy`]).
    pub fn seed_species<R: Rng + ?Sized>(
        &mut self,
        position: (f64, f64),
        covariance: f64,
        sample_size: usize,
        species: usize,
        rng: &mut R,
    ) -> GridResult<SeedReport> {
        self.seed_species_with(
            position,
            covariance,
            sample_size,
            species,
            SeedAxes::Legacy,
            rng,
        )
    }

    pub fn seed_species_with<R: Rng + ?Sized>(
        &mut self,
        position: (f64, f64),
        covariance: f64,
        sample_size: usize,
        species: usize,
        axes: SeedAxes,
        rng: &mut R,
    ) -> GridResult<SeedReport> {
        self.require_species(species)?;
        if !covariance.is_finite() || covariance < 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "covariance must be finite and non-negative, got {covariance}"
            )));
        }
        let std_dev = covariance.sqrt();
        let invalid =
            |err: NormalError| GridError::InvalidParameter(format!("seed spread: {err}"));
        let along_x = Normal::new(position.0, std_dev).map_err(invalid)?;
        let along_y = Normal::new(position.1, std_dev).map_err(invalid)?;

        let height = self.height() as f64;
        let width = self.width() as f64;
        let mut report = SeedReport::default();
        for _ in 0..sample_size {
            let x = along_x.sample(rng);
            let y = along_y.sample(rng);
            let in_bounds = (0.0..height).contains(&x) && (0.0..width).contains(&y);
            let target = match axes {
                SeedAxes::Legacy => CellPos::new(y.floor() as usize, x.floor() as usize),
                SeedAxes::RowCol => CellPos::new(x.floor() as usize, y.floor() as usize),
            };
            match self.shape.pos_to_id(target) {
                Some(id) if in_bounds => {
                    self.species.increment(species, id);
                    report.placed += 1;
                }
                _ => report.dropped += 1,
            }
        }
        debug!(
            species,
            placed = report.placed,
            dropped = report.dropped,
            ?axes,
            "seeded species"
        );
        Ok(report)
    }

    /// Raises every cell of `[corner.row, corner.row + height) x [corner.col, corner.col + width)`
    /// to at least `cost`. Returns the number of cells that changed.
    pub fn paint_rectangle(&mut self, corner: Anchor, width: usize, height: usize, cost: f64) -> usize {
        let extent = |len: usize| i64::try_from(len).unwrap_or(i64::MAX);
        let (rows, cols) = self.shape.clip(
            corner.row,
            corner.row.saturating_add(extent(height)),
            corner.col,
            corner.col.saturating_add(extent(width)),
        );
        let mut changed = 0;
        for row in rows {
            for col in cols.clone() {
                let id = row * self.width() + col;
                changed += usize::from(self.cost.raise(id, cost));
            }
        }
        debug!(?corner, width, height, cost, changed, "painted rectangle");
        changed
    }

    pub fn paint_circle(&mut self, center: Anchor, radius: usize, cost: f64) -> usize {
        let changed = self.paint_disc(center, radius, |_, _| cost);
        debug!(?center, radius, cost, changed, "painted circle");
        changed
    }

    /// Like [`SpatialGrid::paint_circle`], with the applied cost falling off
    /// as [`gaussian_falloff`] from `peak_cost` at the center.
    pub fn paint_circle_gaussian(
        &mut self,
        center: Anchor,
        radius: usize,
        peak_cost: f64,
        std_dev: f64,
    ) -> GridResult<usize> {
        if !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "gaussian std must be finite and positive, got {std_dev}"
            )));
        }
        let changed = self.paint_disc(center, radius, |d_row, d_col| {
            gaussian_falloff(peak_cost, std_dev, d_row, d_col)
        });
        debug!(?center, radius, peak_cost, std_dev, changed, "painted gaussian circle");
        Ok(changed)
    }

    fn paint_disc(&mut self, center: Anchor, radius: usize, value: impl Fn(i64, i64) -> f64) -> usize {
        let radius = i64::try_from(radius).unwrap_or(i64::MAX);
        let (rows, cols) = self.shape.clip(
            center.row.saturating_sub(radius),
            center.row.saturating_add(radius).saturating_add(1),
            center.col.saturating_sub(radius),
            center.col.saturating_add(radius).saturating_add(1),
        );
        let reach = i128::from(radius) * i128::from(radius);
        let mut changed = 0;
        for row in rows {
            for col in cols.clone() {
                let d_row = row as i128 - i128::from(center.row);
                let d_col = col as i128 - i128::from(center.col);
                if d_row * d_row + d_col * d_col > reach {
                    continue;
                }
                // inside the disc both offsets are bounded by the i64 radius
                let value = value(d_row as i64, d_col as i64);
                let id = row * self.width() + col;
                changed += usize::from(self.cost.raise(id, value));
            }
        }
        changed
    }

    /// Row-major cell table and positional threshold table.
    pub fn export_tables(&self) -> (CellTable, ThresholdTable) {
        let species_count = self.species_count();
        let rows = self
            .shape
            .cells()
            .enumerate()
            .map(|(id, pos)| CellRecord {
                row: pos.row,
                col: pos.col,
                cost: self.cost.get(id),
                species: (0..species_count)
                    .map(|species| self.species.get(species, id))
                    .collect(),
            })
            .collect();
        (
            CellTable {
                species_count,
                rows,
            },
            ThresholdTable {
                values: self.thresholds.clone(),
            },
        )
    }

    pub fn cost_matrix(&self) -> MatrixView {
        MatrixView::new(self.height(), self.width(), self.cost.as_slice().to_vec())
    }

    pub fn species_matrix(&self, species: usize) -> GridResult<MatrixView> {
        self.require_species(species)?;
        let values = self
            .species
            .plane(species)
            .iter()
            .map(|&count| count as f64)
            .collect();
        Ok(MatrixView::new(self.height(), self.width(), values))
    }

    pub fn render_cost_map(&self, renderer: &mut dyn MatrixRenderer) -> GridResult<()> {
        renderer.render("cost", &self.cost_matrix())
    }

    pub fn render_species_map(
        &self,
        species: usize,
        renderer: &mut dyn MatrixRenderer,
    ) -> GridResult<()> {
        let matrix = self.species_matrix(species)?;
        renderer.render(&format!("specie {species}"), &matrix)
    }
}
