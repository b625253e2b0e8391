use burn::tensor::{Tensor, backend::Backend};
use dataset::RainBatch;
use model::DerainNet;

use crate::error::Result;
use crate::metrics::{psnr, rgb_to_y, ssim, to_metric};
use crate::msg::EvalStats;

pub struct EvalSample<B: Backend> {
    /// Final background estimate, clamped and truncated to 8-bit values.
    pub output: Tensor<B, 4>,
    pub stats: EvalStats,
}

/// Clamps to `[0, 255]` and drops the fractional part, like a cast to `u8`.
pub fn quantize<B: Backend>(img: Tensor<B, 4>) -> Tensor<B, 4> {
    img.clamp(0.0, 255.0).floor()
}

/// PSNR and SSIM of two `[N, 3, H, W]` images, measured on luma in double precision.
pub fn luma_stats<B: Backend>(img: Tensor<B, 4>, reference: Tensor<B, 4>) -> Result<EvalStats> {
    let y = rgb_to_y(to_metric(img));
    let gt = rgb_to_y(to_metric(reference));
    Ok(EvalStats {
        psnr: psnr(y.clone(), gt.clone()),
        ssim: ssim(y, gt)?,
    })
}

/// Runs the model on a test batch and scores its final estimate against the clean image.
pub fn eval_stats<B: Backend>(model: &DerainNet<B>, batch: &RainBatch<B>) -> Result<EvalSample<B>> {
    let output = quantize(model.forward(batch.rain.clone()).background());
    let stats = luma_stats(output.clone(), batch.norain.clone())?;
    Ok(EvalSample { output, stats })
}

/// SSIM of the untouched rainy input, the score a model has to beat.
pub fn baseline_ssim<B: Backend>(batch: &RainBatch<B>) -> Result<f64> {
    ssim(
        rgb_to_y(to_metric(batch.rain.clone())),
        rgb_to_y(to_metric(batch.norain.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use model::DerainNetConfig;

    type B = NdArray;

    fn batch(rain: Tensor<B, 4>, norain: Tensor<B, 4>) -> RainBatch<B> {
        RainBatch {
            rain,
            norain,
            names: vec!["0.png".into()],
        }
    }

    fn ramp(offset: f32) -> Tensor<B, 4> {
        let values: Vec<f32> = (0..3 * 16 * 16).map(|i| (i % 200) as f32 + offset).collect();
        Tensor::<B, 1>::from_floats(values.as_slice(), &Default::default()).reshape([1, 3, 16, 16])
    }

    #[test]
    fn quantize_clamps_and_truncates() {
        let img = Tensor::<B, 1>::from_floats([-3.0, 0.7, 12.9, 254.99, 300.0], &Default::default())
            .reshape([1, 1, 1, 5]);
        let out: Vec<f32> = quantize(img).into_data().to_vec().unwrap();
        assert_eq!(out, vec![0.0, 0.0, 12.0, 254.0, 255.0]);
    }

    #[test]
    fn baseline_of_clean_input_is_perfect() {
        let value = baseline_ssim(&batch(ramp(0.0), ramp(0.0))).unwrap();
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn baseline_drops_with_rain() {
        let clean = ramp(0.0);
        let streaks = Tensor::<B, 4>::ones([1, 3, 16, 16], &Default::default()) * 40.0;
        let value = baseline_ssim(&batch(clean.clone() + streaks, clean)).unwrap();
        assert!(value < 1.0);
    }

    #[test]
    fn eval_scores_quantized_output() {
        let model = DerainNetConfig::new()
            .with_num_map(2)
            .with_num_channel(2)
            .with_num_block(1)
            .with_num_stage(1)
            .init::<B>(&Default::default());
        let sample = eval_stats(&model, &batch(ramp(20.0), ramp(0.0))).unwrap();

        assert_eq!(sample.output.dims(), [1, 3, 16, 16]);
        let values: Vec<f32> = sample.output.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (0.0..=255.0).contains(v) && v.fract() == 0.0));
        assert!(sample.stats.psnr.is_finite());
        assert!(sample.stats.ssim <= 1.0 + 1e-9);
    }
}
