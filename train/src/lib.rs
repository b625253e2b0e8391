#![recursion_limit = "256"]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod eval;
pub mod loss;
pub mod metrics;
pub mod msg;
pub mod scheduler;
pub mod train;

mod ssim;
mod stats;

pub use checkpoint::{Checkpoint, load_checkpoint, save_checkpoint};
pub use config::TrainConfig;
pub use error::{Result, TrainError};
pub use stats::RunningMean;
pub use train::{DerainOptimizer, DerainTrainer};
