use std::path::PathBuf;

use burn::prelude::Config;
use model::DerainNetConfig;
use train::TrainConfig;

#[derive(Config, Debug)]
pub struct PipelineConfig {
    /// Directory holding one folder per dataset.
    #[config(default = "String::from(\"/home/data\")")]
    pub data_path: String,

    /// Dataset folder under `data_path`, also used to name every result file.
    #[config(default = "String::from(\"rain100L\")")]
    pub data_name: String,

    /// Where metrics, checkpoints and derained images are written.
    ///
    /// This path can be set to be relative to the CWD.
    #[config(default = "String::from(\"result\")")]
    pub save_path: String,

    /// Batches decoded ahead of the training loop.
    #[config(default = 8)]
    pub workers: usize,

    /// Random seed.
    #[config(default = 42)]
    pub seed: u64,
}

impl PipelineConfig {
    pub fn save_dir(&self) -> PathBuf {
        PathBuf::from(&self.save_path)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.save_dir().join(format!("{}.csv", self.data_name))
    }

    pub fn best_path(&self) -> PathBuf {
        self.save_dir().join(format!("{}.txt", self.data_name))
    }

    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.save_dir()
            .join(format!("{}_{epoch}.pth", self.data_name))
    }

    pub fn config_path(&self) -> PathBuf {
        self.save_dir()
            .join(format!("{}_config.json", self.data_name))
    }

    /// Folder the derained test images are written to.
    pub fn image_dir(&self) -> PathBuf {
        self.save_dir().join(&self.data_name)
    }
}

/// Everything a run was started with. Saved next to the results.
#[derive(Config, Debug)]
pub struct RunConfig {
    pub pipeline: PipelineConfig,
    pub train: TrainConfig,
    pub model: DerainNetConfig,
}
