//! Renderable matrices and the renderer seam

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};
use tracing::debug;

use crate::error::{GridError, GridResult};

/// Row-major numeric matrix handed to a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixView {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl MatrixView {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), rows * cols, "matrix size mismatch");
        Self { rows, cols, values }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

pub trait MatrixRenderer {
    fn render(&mut self, title: &str, matrix: &MatrixView) -> GridResult<()>;
}

/// Writes one PNG heat map per rendered matrix
pub struct PngHeatmap {
    output_dir: PathBuf,
    scale: u32,
    written: Vec<PathBuf>,
}

impl PngHeatmap {
    pub fn new(output_dir: impl AsRef<Path>, scale: u32) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            scale: scale.max(1),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

fn pixels(len: usize, axis: &str) -> GridResult<u32> {
    u32::try_from(len).map_err(|_| {
        GridError::InvalidParameter(format!("{axis} of {len} cells is too large to render"))
    })
}

impl MatrixRenderer for PngHeatmap {
    fn render(&mut self, title: &str, matrix: &MatrixView) -> GridResult<()> {
        fs::create_dir_all(&self.output_dir)?;
        let file_name: String = title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = self.output_dir.join(format!("{file_name}.png"));

        let (lo, hi) = (matrix.min(), matrix.max());
        let span = if hi > lo { hi - lo } else { 1.0 };
        let cols = pixels(matrix.cols(), "width")?;
        let rows = pixels(matrix.rows(), "height")?;
        let (width, height) = match (cols.checked_mul(self.scale), rows.checked_mul(self.scale)) {
            (Some(width), Some(height)) => (width, height),
            _ => {
                return Err(GridError::InvalidParameter(format!(
                    "scale {} overflows a {cols}x{rows} image",
                    self.scale
                )))
            }
        };

        let cells: RgbImage = ImageBuffer::from_fn(cols, rows, |x, y| {
            hot((matrix.get(y as usize, x as usize) - lo) / span)
        });
        let image = imageops::resize(&cells, width, height, FilterType::Nearest);
        image.save(&path)?;

        debug!(path = %path.display(), width, height, "wrote heat map");
        self.written.push(path);
        Ok(())
    }
}

/// Black, red, yellow, white ramp over [0, 1]
fn hot(t: f64) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([
        channel(t * 3.0),
        channel(t * 3.0 - 1.0),
        channel(t * 3.0 - 2.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_extremes() {
        let matrix = MatrixView::new(2, 2, vec![1.0, -2.0, 4.0, 0.5]);

        assert_eq!(matrix.min(), -2.0);
        assert_eq!(matrix.max(), 4.0);
        assert_eq!(matrix.get(1, 0), 4.0);
    }

    #[test]
    fn test_hot_palette_endpoints() {
        assert_eq!(hot(0.0), Rgb([0, 0, 0]));
        assert_eq!(hot(1.0), Rgb([255, 255, 255]));
        assert_eq!(hot(1.0 / 3.0), Rgb([255, 0, 0]));
        assert_eq!(hot(f64::NAN), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_png_scaled_nearest() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = PngHeatmap::new(dir.path(), 2);
        let matrix = MatrixView::new(1, 3, vec![0.0, 1.0, 2.0]);

        renderer.render("cost map", &matrix).unwrap();

        let path = dir.path().join("cost_map.png");
        assert_eq!(renderer.written(), &[path.clone()]);
        let image = image::open(path).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (6, 2));
        assert_eq!(*image.get_pixel(0, 1), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(1, 0), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(5, 1), Rgb([255, 255, 255]));
    }
}
