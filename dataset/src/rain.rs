use std::fmt;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{DatasetError, Result};
use crate::filesystem::Filesystem;
use crate::sample::RainSample;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// Paired rainy/clean images of one split, laid out as
/// `{root}/{name}/{split}/rain/*` and `{root}/{name}/{split}/norain/*`.
///
/// Pairs are matched by sorted file order. Training splits yield random patches and
/// may be longer than the number of files, in which case indices wrap around.
#[derive(Clone, Debug)]
pub struct RainDataset {
    split: Split,
    rain: Vec<PathBuf>,
    norain: Vec<PathBuf>,
    patch_size: Option<u32>,
    length: usize,
}

impl RainDataset {
    pub fn open(root: &Path, name: &str, split: Split) -> Result<Self> {
        let fs = Filesystem::new(root.join(name).join(split.to_string()));
        if !fs.root().is_dir() {
            return Err(DatasetError::MissingSplit(fs.root().to_path_buf()));
        }

        let rain = fs.images_in("rain");
        let norain = fs.images_in("norain");

        if rain.is_empty() {
            return Err(DatasetError::EmptySplit(fs.root().join("rain")));
        }
        if rain.len() != norain.len() {
            return Err(DatasetError::CountMismatch {
                rain: rain.len(),
                norain: norain.len(),
            });
        }

        log::info!(
            "Found {} {split} pairs under {}",
            rain.len(),
            fs.root().display()
        );

        let length = rain.len();
        Ok(Self {
            split,
            rain,
            norain,
            patch_size: None,
            length,
        })
    }

    /// Crop every sample to a random `patch x patch` window.
    pub fn with_patch_size(mut self, patch: u32) -> Self {
        self.patch_size = Some(patch);
        self
    }

    /// Report `length` samples per pass, cycling through the files.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn num_files(&self) -> usize {
        self.rain.len()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Loads item `index`. `seed` drives the augmentation of training patches.
    pub fn get(&self, index: usize, seed: u64) -> Result<RainSample> {
        let file = index % self.rain.len();
        let sample = RainSample::load(&self.rain[file], &self.norain[file])?;

        Ok(match self.patch_size {
            Some(patch) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
                sample.augment(patch, &mut rng)
            }
            None => sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn write_image(path: &Path, w: u32, h: u32, shade: u8) {
        let img: RgbImage = ImageBuffer::from_pixel(w, h, Rgb([shade, shade, shade]));
        img.save(path).unwrap();
    }

    fn make_split(root: &Path, split: &str, names: &[(&str, &str)]) {
        let dir = root.join("rain100L").join(split);
        std::fs::create_dir_all(dir.join("rain")).unwrap();
        std::fs::create_dir_all(dir.join("norain")).unwrap();
        for (i, (rain, norain)) in names.iter().enumerate() {
            write_image(&dir.join("rain").join(rain), 6, 4, 100 + i as u8);
            write_image(&dir.join("norain").join(norain), 6, 4, i as u8);
        }
    }

    #[test]
    fn pairs_by_sorted_order() {
        let tmp = tempfile::tempdir().unwrap();
        make_split(
            tmp.path(),
            "test",
            &[("rain-002.png", "norain-002.png"), ("rain-001.png", "norain-001.png")],
        );

        let ds = RainDataset::open(tmp.path(), "rain100L", Split::Test).unwrap();
        assert_eq!(ds.len(), 2);

        let first = ds.get(0, 0).unwrap();
        assert_eq!(first.name, "rain-001.png");
        // rain-001 was written second (shade 101), and its clean partner with shade 1.
        assert_eq!(first.rain.get_pixel(0, 0)[0], 101);
        assert_eq!(first.norain.get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn training_length_wraps_around() {
        let tmp = tempfile::tempdir().unwrap();
        make_split(tmp.path(), "train", &[("a.png", "a.png"), ("b.png", "b.png")]);

        let ds = RainDataset::open(tmp.path(), "rain100L", Split::Train)
            .unwrap()
            .with_patch_size(8)
            .with_length(5);
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.num_files(), 2);

        let sample = ds.get(3, 11).unwrap();
        assert_eq!(sample.name, "b.png");
        assert_eq!(sample.dimensions(), (8, 8));
    }

    #[test]
    fn missing_split_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = RainDataset::open(tmp.path(), "rain100L", Split::Train).unwrap_err();
        assert!(matches!(err, DatasetError::MissingSplit(_)));
    }

    #[test]
    fn mismatched_counts_are_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        make_split(tmp.path(), "test", &[("a.png", "a.png")]);
        write_image(
            &tmp.path().join("rain100L/test/norain/extra.png"),
            6,
            4,
            0,
        );
        let err = RainDataset::open(tmp.path(), "rain100L", Split::Test).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::CountMismatch { rain: 1, norain: 2 }
        ));
    }
}
