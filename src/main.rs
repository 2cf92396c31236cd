use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use habitat_grid::{
    config::LoggingConfig,
    scenario::ScenarioLoader,
    PngHeatmap, SpatialGrid,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Build, paint and seed a habitat grid")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Cell table to start from instead of an empty grid
    #[arg(long, requires = "thresholds")]
    cells: Option<PathBuf>,

    /// Threshold table paired with --cells
    #[arg(long, requires = "cells")]
    thresholds: Option<PathBuf>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the exported tables
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Also write cost and species heat maps
    #[arg(long)]
    render: bool,

    /// Pixels per cell in rendered heat maps
    #[arg(long, default_value_t = 8)]
    scale: u32,
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let scenario = match &cli.scenario {
        Some(path) => Some(ScenarioLoader::new(".").load(path)?),
        None => None,
    };
    init_logging(
        &scenario
            .as_ref()
            .map(|s| s.logging.clone())
            .unwrap_or_default(),
    );

    let grid = match (&cli.cells, &cli.thresholds) {
        (Some(cells), Some(thresholds)) => SpatialGrid::load(cells, thresholds)
            .with_context(|| format!("Failed to load grid from {}", cells.display()))?,
        _ => match &scenario {
            Some(scenario) => SpatialGrid::from_settings(&scenario.grid)?,
            None => anyhow::bail!("either --scenario or --cells/--thresholds is required"),
        },
    };

    let (grid, summary) = match &scenario {
        Some(scenario) => {
            info!(
                scenario = %scenario.name,
                description = scenario.description.as_deref().unwrap_or(""),
                "applying scenario"
            );
            let (grid, summary) = scenario.apply(grid, cli.seed.unwrap_or(scenario.seed))?;
            (grid, Some(summary))
        }
        None => (grid, None),
    };

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("Failed to create {}", cli.out.display()))?;
    grid.save(cli.out.join("cells.csv"), cli.out.join("thresholds.csv"))?;
    if let Some(summary) = &summary {
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(cli.out.join("summary.json"), json)?;
    }

    if cli.render {
        let mut renderer = PngHeatmap::new(cli.out.join("maps"), cli.scale);
        grid.render_cost_map(&mut renderer)?;
        for species in 0..grid.species_count() {
            grid.render_species_map(species, &mut renderer)?;
        }
        info!(maps = renderer.written().len(), "rendered heat maps");
    }

    println!(
        "Grid {}x{} with {} species written to {}",
        grid.width(),
        grid.height(),
        grid.species_count(),
        cli.out.display()
    );
    Ok(())
}
