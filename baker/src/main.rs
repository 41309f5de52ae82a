use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use journey_engine::{JourneyData, TerrainConfig, TerrainPipeline};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod export;
mod preview;
mod summary;

use export::BakedField;
use summary::BundleSummary;

#[derive(Parser)]
#[command(name = "journey_baker")]
#[command(about = "Bake an autobiographical journey dataset into terrain buffers", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a JSON summary of the mapped feature bundle
    Inspect {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Synthesize a field and write it as a compressed blob
    Bake {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "height")]
        mode: Mode,
        #[arg(short, long)]
        out: PathBuf,
        /// Grayscale PNG of the height field (height mode only)
        #[arg(short, long)]
        preview: Option<PathBuf>,
    },

    /// Write the default configuration as RON
    DefaultConfig {
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Height,
    Cloud,
}

fn load_pipeline(config: Option<&Path>) -> Result<TerrainPipeline> {
    let config = match config {
        Some(path) => TerrainConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TerrainConfig::default(),
    };
    Ok(TerrainPipeline::new(config)?)
}

fn load_data(path: &Path) -> Result<JourneyData> {
    JourneyData::load(path).with_context(|| format!("loading journey data {}", path.display()))
}

fn inspect(data: &Path, config: Option<&Path>) -> Result<()> {
    let pipeline = load_pipeline(config)?;
    let bundle = pipeline.bundle(&load_data(data)?);
    let summary = BundleSummary::of(&bundle);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn bake(data: &Path, config: Option<&Path>, mode: Mode, out: &Path, preview: Option<&Path>) -> Result<()> {
    let pipeline = load_pipeline(config)?;
    let bundle = pipeline.bundle(&load_data(data)?);

    let field = match mode {
        Mode::Height => {
            let field = pipeline.height_field(&bundle);
            if let Some(path) = preview {
                preview::save_height_preview(&field, path)?;
            }
            BakedField::from_height_field(field)
        }
        Mode::Cloud => {
            if preview.is_some() {
                warn!("--preview is only rendered in height mode, skipping");
            }
            BakedField::PointCloud(pipeline.point_cloud(&bundle))
        }
    };

    export::write_baked(out, field).with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn default_config(out: &Path) -> Result<()> {
    let text = TerrainConfig::default().to_ron_string()?;
    fs::write(out, text).with_context(|| format!("writing {}", out.display()))?;
    info!("Wrote default config to {:?}", out);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match cli.command {
        Commands::Inspect { data, config } => inspect(&data, config.as_deref()),
        Commands::Bake { data, config, mode, out, preview } => {
            bake(&data, config.as_deref(), mode, &out, preview.as_deref())
        }
        Commands::DefaultConfig { out } => default_config(&out),
    }
}
