use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Split directory not found: {0}")]
    MissingSplit(PathBuf),

    #[error("No images found in {0}")]
    EmptySplit(PathBuf),

    #[error("Found {rain} rainy images but {norain} clean images")]
    CountMismatch { rain: usize, norain: usize },

    #[error("Image pair {name} differs in size: rain {rain:?}, clean {norain:?}")]
    SizeMismatch {
        name: String,
        rain: (u32, u32),
        norain: (u32, u32),
    },

    #[error("Batch contains images of different sizes")]
    RaggedBatch,

    #[error("Image error: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("File IO error: {0}")]
    File(#[from] std::io::Error),

    #[error("Loader worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
