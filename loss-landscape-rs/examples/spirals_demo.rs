//! Train a small MLP on two interleaved spirals and map its loss landscape.
//!
//! Run with: cargo run --example spirals_demo -p loss-landscape-rs
//!
//! Every optimizer step is recorded into a trajectory; the landscape is then
//! computed around the trained parameters with PCA directions and written to
//! `spirals_landscape.json`.

use candle_core::Device;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loss_landscape_rs::{
    ClassificationDataset, GridConfig, LandscapeConfig, LossLandscape, MlpClassifier,
    ParameterModel, Trajectory, TrajectoryStep,
};

const SAMPLES_PER_ARM: usize = 100;
const STEPS: usize = 400;

fn spirals(seed: u64) -> (Vec<Vec<f32>>, Vec<u32>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut inputs = Vec::with_capacity(2 * SAMPLES_PER_ARM);
    let mut labels = Vec::with_capacity(2 * SAMPLES_PER_ARM);

    for arm in 0..2u32 {
        let offset = arm as f32 * std::f32::consts::PI;
        for i in 0..SAMPLES_PER_ARM {
            let r = i as f32 / SAMPLES_PER_ARM as f32;
            let theta = 4.0 * r + offset + rng.gen_range(-0.2..0.2);
            inputs.push(vec![r * theta.cos(), r * theta.sin()]);
            labels.push(arm);
        }
    }
    (inputs, labels)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let device = Device::Cpu;
    let (inputs, labels) = spirals(7);
    let data = ClassificationDataset::new(inputs, labels, &device)?;

    let mut model = MlpClassifier::new(&[2, 32, 2], 42, &device)?;
    info!("Training MLP with {} parameters", model.num_params());

    let params = ParamsAdamW {
        lr: 0.02,
        ..Default::default()
    };
    let mut opt = AdamW::new(model.vars(), params)?;

    let mut trajectory = Trajectory::default();
    for step in 0..STEPS {
        let loss = model.loss(&data)?;
        opt.backward_step(&loss)?;

        let eval = model.evaluate(&data)?;
        trajectory.push(TrajectoryStep::new(
            step,
            model.flat_params()?,
            eval.loss,
            eval.accuracy.unwrap_or(0.0),
        ))?;

        if step % 100 == 0 || step == STEPS - 1 {
            info!(
                "Step {:>4}: loss {:.4}, accuracy {:.3}",
                step,
                eval.loss,
                eval.accuracy.unwrap_or(0.0)
            );
        }
    }

    let config = LandscapeConfig::default()
        .with_max_frames(Some(100))
        .with_grid(GridConfig::default().with_resolution(25));
    let landscape = LossLandscape::compute(&trajectory, &mut model, &data, None, &config)?;

    let path = &landscape.reduction.path;
    let min = landscape.grid.grid_minimum;
    info!(
        "Path: {} points, length {:.3}, efficiency {:.3}",
        path.len(),
        path.path_length(),
        path.efficiency()
    );
    if let Some([v1, v2]) = landscape.reduction.pc_variances {
        info!("Explained variance: {:.3} + {:.3}", v1, v2);
    }
    info!(
        "Trained loss {:.4}; lowest grid loss {:.4} at ({:.3}, {:.3})",
        landscape.grid.loss_min, min.loss, min.x, min.y
    );

    landscape.report().write_json("spirals_landscape.json")?;
    info!("Report written to spirals_landscape.json");
    Ok(())
}
