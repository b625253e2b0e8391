use burn::record::RecorderError;
use burn::tensor::DataError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainError>;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Failed to encode or decode checkpoint: {0:?}")]
    Recorder(RecorderError),

    #[error("Checkpoint IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read tensor data: {0:?}")]
    TensorData(DataError),

    #[error("Image of {height}x{width} is smaller than the {window}x{window} SSIM window")]
    ImageTooSmall {
        height: usize,
        width: usize,
        window: usize,
    },
}

impl From<RecorderError> for TrainError {
    fn from(err: RecorderError) -> Self {
        TrainError::Recorder(err)
    }
}

impl From<DataError> for TrainError {
    fn from(err: DataError) -> Self {
        TrainError::TensorData(err)
    }
}
