use std::path::PathBuf;

use burn::backend::Autodiff;
use clap::{ArgAction, Parser};
use model::{DerainNetConfig, MainBackend};
use pipeline::{PipelineConfig, RunConfig, RunMode, TrainingSession};
use train::TrainConfig;
use tracing_subscriber::EnvFilter;

/// Train or evaluate a multi-stage rain removal network on paired rainy/clean images.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Directory holding the datasets
    #[arg(long, default_value = "/home/data")]
    data_path: String,

    /// Dataset to use, e.g. rain100L or rain100H
    #[arg(long, default_value = "rain100L")]
    data_name: String,

    /// Initial learning rate
    #[arg(long, default_value_t = 1e-3)]
    lr: f64,

    #[arg(long, default_value_t = 16)]
    batch_size: usize,

    /// Side length of the random training crops
    #[arg(long, default_value_t = 64)]
    patch_size: u32,

    /// Number of unrolled stages
    #[arg(long, default_value_t = 17)]
    num_stage: usize,

    /// Residual blocks per refinement network
    #[arg(long, default_value_t = 4)]
    num_block: usize,

    /// Feature maps of the rain layer
    #[arg(long, default_value_t = 32)]
    num_map: usize,

    /// Feature channels of the background
    #[arg(long, default_value_t = 32)]
    num_channel: usize,

    /// Epochs to train for
    #[arg(long, default_value_t = 100)]
    num_iter: usize,

    /// Epochs after which the learning rate decays
    #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = [25, 50, 75])]
    milestone: Vec<usize>,

    /// Learning rate decay factor at each milestone
    #[arg(long, default_value_t = 0.2)]
    gamma: f64,

    /// Batches decoded in parallel
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Batches drawn per training epoch
    #[arg(long, default_value_t = 1500)]
    batches_per_epoch: usize,

    /// Directory for metrics, checkpoints and derained images
    #[arg(long, default_value = "result")]
    save_path: String,

    /// Checkpoint to resume from, or to evaluate with --test-only true
    #[arg(long)]
    model_file: Option<PathBuf>,

    /// Only evaluate the checkpoint given by --model-file
    #[arg(long, action = ArgAction::Set, default_value_t = false)]
    test_only: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        let pipeline = PipelineConfig::new()
            .with_data_path(self.data_path.clone())
            .with_data_name(self.data_name.clone())
            .with_save_path(self.save_path.clone())
            .with_workers(self.workers)
            .with_seed(self.seed);
        let train = TrainConfig::new()
            .with_num_iter(self.num_iter)
            .with_batch_size(self.batch_size)
            .with_patch_size(self.patch_size)
            .with_batches_per_epoch(self.batches_per_epoch)
            .with_lr(self.lr)
            .with_milestones(self.milestone.clone())
            .with_gamma(self.gamma);
        let model = DerainNetConfig::new()
            .with_num_map(self.num_map)
            .with_num_channel(self.num_channel)
            .with_num_block(self.num_block)
            .with_num_stage(self.num_stage);
        RunConfig::new(pipeline, train, model)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mode = RunMode::from_flags(args.model_file.clone(), args.test_only)?;
    log::info!("Running {mode:?} on {}", args.data_name);

    let mut session =
        TrainingSession::<Autodiff<MainBackend>>::new(args.run_config(), Default::default())?;
    session.run(&mode).await?;

    let best = session.best();
    if best.epoch.is_some() {
        log::info!("Best result: {}", best.summary());
    }
    Ok(())
}
