use burn::tensor::{ElementConversion, Tensor, TensorData, backend::Backend};
use model::MetricBackend;

use crate::error::{Result, TrainError};
use crate::ssim::{SSIM_WINDOW_SIZE, Ssim};

/// Pixel values are in `[0, 255]`.
const DATA_RANGE: f64 = 255.0;

/// BT.601 luma of an `[N, 3, H, W]` image, keeping a single channel.
pub fn rgb_to_y<B: Backend>(img: Tensor<B, 4>) -> Tensor<B, 4> {
    let weights = Tensor::<B, 4>::from_data(
        TensorData::new(vec![0.256789f64, 0.504129, 0.097906], [1, 3, 1, 1]),
        &img.device(),
    );
    (img * weights).sum_dim(1) + 16.0
}

/// Moves an image to the double precision metric backend.
pub fn to_metric<B: Backend>(img: Tensor<B, 4>) -> Tensor<MetricBackend, 4> {
    Tensor::from_data(img.into_data().convert::<f64>(), &Default::default())
}

pub fn psnr<B: Backend>(x: Tensor<B, 4>, y: Tensor<B, 4>) -> f64 {
    let mse = ((x - y) / DATA_RANGE).powi_scalar(2).mean();
    let mse: f64 = mse.into_scalar().elem();
    -10.0 * mse.log10()
}

// Halfway cases round to even, so a 640 pixel short side pools by 2.
fn pool_factor(h: usize, w: usize) -> usize {
    ((h.min(w) as f64 / 256.0).round_ties_even() as usize).max(1)
}

// Non-overlapping f x f average pooling, dropping the remainder rows and columns.
fn downsample<B: Backend>(img: Tensor<B, 4>, f: usize) -> Tensor<B, 4> {
    let [n, c, h, w] = img.dims();
    let (oh, ow) = (h / f, w / f);
    img.slice([0..n, 0..c, 0..oh * f, 0..ow * f])
        .reshape([n, c, oh, f, ow, f])
        .mean_dim(5)
        .mean_dim(3)
        .reshape([n, c, oh, ow])
}

/// Mean SSIM with an 11x11 gaussian window. Large images are first average-pooled so
/// that their short side is roughly 256 pixels.
pub fn ssim<B: Backend>(x: Tensor<B, 4>, y: Tensor<B, 4>) -> Result<f64> {
    let [_, channels, h, w] = x.dims();
    let mut x = x / DATA_RANGE;
    let mut y = y / DATA_RANGE;

    let f = pool_factor(h, w);
    if f > 1 {
        x = downsample(x, f);
        y = downsample(y, f);
    }

    let [_, _, height, width] = x.dims();
    if height < SSIM_WINDOW_SIZE || width < SSIM_WINDOW_SIZE {
        return Err(TrainError::ImageTooSmall {
            height,
            width,
            window: SSIM_WINDOW_SIZE,
        });
    }

    let ssim = Ssim::new(SSIM_WINDOW_SIZE, channels, &x.device());
    Ok(ssim.ssim(x, y).mean().into_scalar().elem())
}
