use std::path::Path;

use burn::prelude::{Backend, Tensor, TensorData};
use image::{ImageBuffer, RgbImage, imageops};
use rand::Rng;

use crate::error::{DatasetError, Result};

/// A rainy image together with its clean ground truth.
#[derive(Clone, Debug)]
pub struct RainSample {
    pub rain: RgbImage,
    pub norain: RgbImage,
    /// File name of the rainy image, used when saving outputs.
    pub name: String,
}

impl RainSample {
    pub fn load(rain_path: &Path, norain_path: &Path) -> Result<Self> {
        let rain = image::open(rain_path)?.into_rgb8();
        let norain = image::open(norain_path)?.into_rgb8();
        let name = rain_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if rain.dimensions() != norain.dimensions() {
            return Err(DatasetError::SizeMismatch {
                name,
                rain: rain.dimensions(),
                norain: norain.dimensions(),
            });
        }

        Ok(Self { rain, norain, name })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rain.dimensions()
    }

    /// Random `patch x patch` crop with random horizontal and vertical flips, applied
    /// identically to both images. Images smaller than the patch are reflect-padded first.
    pub fn augment(self, patch: u32, rng: &mut impl Rng) -> Self {
        let rain = pad_reflect_to(&self.rain, patch);
        let norain = pad_reflect_to(&self.norain, patch);

        let (w, h) = rain.dimensions();
        let x = rng.random_range(0..=w - patch);
        let y = rng.random_range(0..=h - patch);

        let mut rain = imageops::crop_imm(&rain, x, y, patch, patch).to_image();
        let mut norain = imageops::crop_imm(&norain, x, y, patch, patch).to_image();

        if rng.random_bool(0.5) {
            imageops::flip_horizontal_in_place(&mut rain);
            imageops::flip_horizontal_in_place(&mut norain);
        }
        if rng.random_bool(0.5) {
            imageops::flip_vertical_in_place(&mut rain);
            imageops::flip_vertical_in_place(&mut norain);
        }

        Self {
            rain,
            norain,
            name: self.name,
        }
    }
}

// Mirror index without repeating the edge pixel, like numpy's "reflect" mode.
fn reflect(i: i64, n: i64) -> u32 {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let i = i.rem_euclid(period);
    (if i < n { i } else { period - i }) as u32
}

/// Pads each side of a too-small dimension by the missing amount, mirroring content.
pub(crate) fn pad_reflect_to(img: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let pad_x = size.saturating_sub(w);
    let pad_y = size.saturating_sub(h);
    if pad_x == 0 && pad_y == 0 {
        return img.clone();
    }

    ImageBuffer::from_fn(w + 2 * pad_x, h + 2 * pad_y, |x, y| {
        let src_x = reflect(x as i64 - pad_x as i64, w as i64);
        let src_y = reflect(y as i64 - pad_y as i64, h as i64);
        *img.get_pixel(src_x, src_y)
    })
}

/// Stacks images into a `[N, 3, H, W]` tensor with values in `[0, 255]`.
pub fn images_to_tensor<B: Backend>(images: &[&RgbImage], device: &B::Device) -> Result<Tensor<B, 4>> {
    let (w, h) = images.first().map(|img| img.dimensions()).unwrap_or((0, 0));
    if images.iter().any(|img| img.dimensions() != (w, h)) {
        return Err(DatasetError::RaggedBatch);
    }

    let values: Vec<f32> = images
        .iter()
        .flat_map(|img| img.as_raw().iter().map(|&v| v as f32))
        .collect();
    let data = TensorData::new(values, [images.len(), h as usize, w as usize, 3]);
    Ok(Tensor::<B, 4>::from_data(data, device).permute([0, 3, 1, 2]))
}
