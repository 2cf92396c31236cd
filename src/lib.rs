pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod render;
pub mod rng;
pub mod scenario;
pub mod spatial;
pub mod table;

pub use config::GridSettings;
pub use error::{GridError, GridResult};
pub use grid::{SeedAxes, SeedReport, SpatialGrid};
pub use render::{MatrixRenderer, MatrixView, PngHeatmap};
pub use spatial::{Anchor, CellPos, DistanceIndex, GridShape};
pub use table::{CellRecord, CellTable, ThresholdTable};
