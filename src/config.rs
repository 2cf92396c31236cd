//! Configuration for grid construction and logging

use serde::{Deserialize, Serialize};

/// Parameters for building an empty grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_initial_cost")]
    pub initial_cost: f64,
    #[serde(default = "default_species")]
    pub species: usize,
    /// Build the distance index up front instead of on first access
    #[serde(default)]
    pub eager_distances: bool,
}

fn default_width() -> usize {
    10
}

fn default_height() -> usize {
    10
}

fn default_initial_cost() -> f64 {
    1.0
}

fn default_species() -> usize {
    15
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            initial_cost: default_initial_cost(),
            species: default_species(),
            eager_distances: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
