//! Compute a loss landscape from a recorded MLP trajectory.
//!
//! Usage:
//!   landscape --trajectory <json> --dataset <json> --layers <sizes> [options]
//!
//! Examples:
//!   landscape --trajectory ./runs/spirals/trajectory.json \
//!             --dataset ./runs/spirals/data.json --layers 2,50,3 \
//!             --method pca --resolution 40 --output landscape.json

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use candle_core::Device;
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loss_landscape_rs::{
    ClassificationDataset, DirectionPair, LandscapeConfig, LossLandscape, MlpClassifier,
    ReductionKind, Trajectory,
};

#[derive(Parser)]
#[command(name = "landscape")]
#[command(about = "Project a training trajectory to 2D and evaluate the loss surface around it")]
struct Args {
    /// Trajectory JSON (array of {step, flat_w, loss, accuracy})
    #[arg(short, long)]
    trajectory: PathBuf,

    /// Dataset JSON ({"inputs": [[f32]], "labels": [u32]})
    #[arg(short, long)]
    dataset: PathBuf,

    /// MLP layer sizes, input first (e.g. 2,50,3)
    #[arg(short, long, value_delimiter = ',', required = true)]
    layers: Vec<usize>,

    /// Reduction method: pca, random or custom
    #[arg(short, long)]
    method: Option<ReductionKind>,

    /// Custom directions JSON ({"dir1": [f32], "dir2": [f32]})
    #[arg(long)]
    directions: Option<PathBuf>,

    /// Seed for random directions
    #[arg(long)]
    seed: Option<u64>,

    /// Grid points per axis
    #[arg(long)]
    resolution: Option<usize>,

    /// Grid padding as a fraction of the path extent
    #[arg(long)]
    margin: Option<f32>,

    /// Maximum trajectory steps kept (0 keeps all)
    #[arg(long)]
    max_frames: Option<usize>,

    /// LandscapeConfig JSON; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output report path
    #[arg(short, long, default_value = "landscape.json")]
    output: PathBuf,
}

#[derive(Deserialize)]
struct DatasetFile {
    inputs: Vec<Vec<f32>>,
    labels: Vec<u32>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn resolve_config(args: &Args) -> anyhow::Result<LandscapeConfig> {
    let mut config = match &args.config {
        Some(path) => LandscapeConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LandscapeConfig::default(),
    };

    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(resolution) = args.resolution {
        config.grid.resolution = resolution;
    }
    if let Some(margin) = args.margin {
        config.grid.margin = margin;
    }
    if let Some(max_frames) = args.max_frames {
        config.max_frames = (max_frames > 0).then_some(max_frames);
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = resolve_config(&args)?;

    let trajectory: Trajectory = read_json(&args.trajectory)?;
    let reference = trajectory
        .reference()
        .context("trajectory has no steps")?;
    info!(
        "Loaded {} steps of dimension {} from {}",
        trajectory.len(),
        reference.flat_w.len(),
        args.trajectory.display()
    );

    let device = Device::Cpu;
    let dataset: DatasetFile = read_json(&args.dataset)?;
    let data = ClassificationDataset::new(dataset.inputs, dataset.labels, &device)?;
    info!(
        "Loaded {} samples with {} features",
        data.len(),
        data.input_dim()
    );

    let mut model = MlpClassifier::from_flat_params(&args.layers, &reference.flat_w, &device)
        .with_context(|| format!("loading reference parameters into MLP {:?}", args.layers))?;

    let directions: Option<DirectionPair> = match &args.directions {
        Some(path) => Some(read_json(path)?),
        None => None,
    };
    let landscape = LossLandscape::compute(&trajectory, &mut model, &data, directions, &config)?;
    let report = landscape.report();

    if let Some([v1, v2]) = report.pcvariances {
        info!("PC variances: {:.4}, {:.4}", v1, v2);
    }
    if let Some(seed) = report.seed {
        info!("Random direction seed: {}", seed);
    }
    let path = &landscape.reduction.path;
    info!(
        "Path length {:.4}, efficiency {:.3}",
        path.path_length(),
        path.efficiency()
    );

    report.write_json(&args.output)?;
    info!("Report written to {}", args.output.display());

    Ok(())
}
