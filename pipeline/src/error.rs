use std::path::PathBuf;

use burn::tensor::DataError;
use dataset::DatasetError;
use thiserror::Error;
use train::TrainError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load dataset: {0}")]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to save image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image writer failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Failed to write metrics: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read tensor data: {0:?}")]
    TensorData(DataError),

    #[error("Output for {name} is not a valid {width}x{height} RGB image")]
    InvalidOutput {
        name: String,
        width: usize,
        height: usize,
    },

    #[error("Evaluation needs a checkpoint, pass --model-file")]
    EvaluateWithoutCheckpoint,

    #[error("Checkpoint {0} does not exist")]
    MissingCheckpoint(PathBuf),
}

impl From<DataError> for PipelineError {
    fn from(err: DataError) -> Self {
        PipelineError::TensorData(err)
    }
}
