use std::pin::Pin;
use std::sync::Arc;

use burn::prelude::{Backend, Tensor};
use futures::{Stream, StreamExt, stream};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{DatasetError, Result};
use crate::rain::RainDataset;
use crate::sample::{RainSample, images_to_tensor};

pub type BatchStream<B> = Pin<Box<dyn Stream<Item = Result<RainBatch<B>>> + Send>>;

/// A batch of image pairs as `[N, 3, H, W]` tensors in `[0, 255]`.
#[derive(Clone, Debug)]
pub struct RainBatch<B: Backend> {
    pub rain: Tensor<B, 4>,
    pub norain: Tensor<B, 4>,
    pub names: Vec<String>,
}

impl<B: Backend> RainBatch<B> {
    pub fn from_samples(samples: &[RainSample], device: &B::Device) -> Result<Self> {
        let rain: Vec<_> = samples.iter().map(|s| &s.rain).collect();
        let norain: Vec<_> = samples.iter().map(|s| &s.norain).collect();
        Ok(Self {
            rain: images_to_tensor(&rain, device)?,
            norain: images_to_tensor(&norain, device)?,
            names: samples.iter().map(|s| s.name.clone()).collect(),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.names.len()
    }
}

/// Iterates a [`RainDataset`] in batches. Decoding runs on the blocking pool with up to
/// `num_workers` batches in flight; batches are always yielded in order.
pub struct RainLoader {
    dataset: Arc<RainDataset>,
    batch_size: usize,
    num_workers: usize,
    shuffle: bool,
    rng: StdRng,
}

impl RainLoader {
    pub fn new(dataset: RainDataset, batch_size: usize, num_workers: usize) -> Self {
        Self {
            dataset: Arc::new(dataset),
            batch_size: batch_size.max(1),
            num_workers: num_workers.max(1),
            shuffle: false,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Reshuffle the sample order every epoch.
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn dataset(&self) -> &RainDataset {
        &self.dataset
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// One pass over the dataset. The last batch may be smaller than the batch size.
    pub fn epoch<B: Backend>(&mut self, device: &B::Device) -> BatchStream<B> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        let seed: u64 = self.rng.random();

        let batches: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        let dataset = self.dataset.clone();
        let device = device.clone();

        let stream = stream::iter(batches)
            .map(move |indices| {
                let dataset = dataset.clone();
                async move {
                    tokio::task::spawn_blocking(move || {
                        indices
                            .into_iter()
                            .map(|index| dataset.get(index, seed))
                            .collect::<Result<Vec<_>>>()
                    })
                    .await
                    .map_err(DatasetError::from)?
                }
            })
            .buffered(self.num_workers)
            .map(move |samples| RainBatch::<B>::from_samples(&samples?, &device));

        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rain::Split;
    use burn::backend::NdArray;
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::path::Path;

    fn make_test_split(root: &Path, count: usize) {
        let dir = root.join("toy").join("test");
        std::fs::create_dir_all(dir.join("rain")).unwrap();
        std::fs::create_dir_all(dir.join("norain")).unwrap();
        for i in 0..count {
            let img: RgbImage = ImageBuffer::from_pixel(5, 3, Rgb([i as u8, 0, 0]));
            img.save(dir.join("rain").join(format!("{i:03}.png"))).unwrap();
            img.save(dir.join("norain").join(format!("{i:03}.png"))).unwrap();
        }
    }

    #[tokio::test]
    async fn yields_all_samples_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        make_test_split(tmp.path(), 5);
        let ds = RainDataset::open(tmp.path(), "toy", Split::Test).unwrap();

        let mut loader = RainLoader::new(ds, 2, 3);
        assert_eq!(loader.dataset().len(), 5);
        assert_eq!(loader.num_batches(), 3);

        let mut stream = loader.epoch::<NdArray>(&Default::default());
        let mut names = vec![];
        let mut sizes = vec![];
        while let Some(batch) = stream.next().await {
            let batch = batch.unwrap();
            assert_eq!(batch.rain.dims(), [batch.batch_size(), 3, 3, 5]);
            sizes.push(batch.batch_size());
            names.extend(batch.names);
        }

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(names, vec!["000.png", "001.png", "002.png", "003.png", "004.png"]);
    }

    #[tokio::test]
    async fn shuffling_visits_every_sample_once() {
        let tmp = tempfile::tempdir().unwrap();
        make_test_split(tmp.path(), 6);
        let ds = RainDataset::open(tmp.path(), "toy", Split::Test).unwrap();

        let mut loader = RainLoader::new(ds, 4, 2).shuffled(3);
        let mut stream = loader.epoch::<NdArray>(&Default::default());
        let mut names = vec![];
        while let Some(batch) = stream.next().await {
            names.extend(batch.unwrap().names);
        }
        names.sort();
        assert_eq!(names.len(), 6);
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
