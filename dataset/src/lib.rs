mod error;
mod filesystem;
mod loader;
mod rain;
mod sample;

pub use error::{DatasetError, Result};
pub use loader::{BatchStream, RainBatch, RainLoader};
pub use rain::{RainDataset, Split};
pub use sample::{RainSample, images_to_tensor};
