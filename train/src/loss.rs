use burn::{
    nn::loss::{MseLoss, Reduction},
    tensor::{Tensor, backend::Backend},
};
use model::DerainOutput;

const INIT_WEIGHT: f32 = 0.1;
const STAGE_BACKGROUND_WEIGHT: f32 = 0.1;
const FINAL_BACKGROUND_WEIGHT: f32 = 1.0;
const STAGE_RAIN_WEIGHT: f32 = 0.1;
const FINAL_RAIN_WEIGHT: f32 = 0.9;

/// The composite reconstruction loss and its unweighted terms.
#[derive(Clone, Debug)]
pub struct DerainLoss<B: Backend> {
    pub total: Tensor<B, 1>,
    /// Error of the initial background estimate.
    pub init: Tensor<B, 1>,
    /// Summed background error over all stages.
    pub stage_background: Tensor<B, 1>,
    /// Background error of the last stage.
    pub background: Tensor<B, 1>,
    /// Summed rain-streak error over all stages.
    pub stage_rain: Tensor<B, 1>,
    /// Rain-streak error of the last stage.
    pub rain: Tensor<B, 1>,
}

/// Mean-squared errors of every estimate against the clean image (for backgrounds)
/// or `rain - clean` (for rain streaks), combined with fixed weights.
pub fn derain_loss<B: Backend>(
    output: &DerainOutput<B>,
    rain: Tensor<B, 4>,
    norain: Tensor<B, 4>,
) -> DerainLoss<B> {
    let mse = MseLoss::new();
    let err = |pred: Tensor<B, 4>, target: Tensor<B, 4>| mse.forward(pred, target, Reduction::Mean);

    let streaks = rain - norain.clone();
    let zero = || Tensor::<B, 1>::zeros([1], &norain.device());

    let init = err(output.b0.clone(), norain.clone());
    let stage_background = output
        .list_b
        .iter()
        .fold(zero(), |acc, b| acc + err(b.clone(), norain.clone()));
    let stage_rain = output
        .list_r
        .iter()
        .fold(zero(), |acc, r| acc + err(r.clone(), streaks.clone()));
    let background = err(output.background(), norain.clone());
    let rain = err(output.rain_streaks(), streaks);

    let total = init.clone() * INIT_WEIGHT
        + stage_background.clone() * STAGE_BACKGROUND_WEIGHT
        + background.clone() * FINAL_BACKGROUND_WEIGHT
        + stage_rain.clone() * STAGE_RAIN_WEIGHT
        + rain.clone() * FINAL_RAIN_WEIGHT;

    DerainLoss {
        total,
        init,
        stage_background,
        background,
        stage_rain,
        rain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn filled(value: f32) -> Tensor<B, 4> {
        Tensor::ones([2, 3, 4, 4], &Default::default()) * value
    }

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_scalar()
    }

    #[test]
    fn combines_terms_with_fixed_weights() {
        let norain = filled(0.0);
        let rain = filled(2.0);
        let output = DerainOutput {
            b0: filled(1.0),
            list_b: vec![filled(2.0), filled(3.0)],
            list_r: vec![filled(2.0), filled(4.0)],
        };

        let loss = derain_loss(&output, rain, norain);

        assert!((scalar(loss.init) - 1.0).abs() < 1e-5);
        assert!((scalar(loss.stage_background) - 13.0).abs() < 1e-5);
        assert!((scalar(loss.background) - 9.0).abs() < 1e-5);
        assert!((scalar(loss.stage_rain) - 4.0).abs() < 1e-5);
        assert!((scalar(loss.rain) - 4.0).abs() < 1e-5);
        // 0.1 * 1 + 0.1 * 13 + 9 + 0.1 * 4 + 0.9 * 4
        assert!((scalar(loss.total) - 14.4).abs() < 1e-4);
    }

    #[test]
    fn perfect_estimates_have_zero_loss() {
        let norain = filled(50.0);
        let rain = filled(80.0);
        let output = DerainOutput {
            b0: norain.clone(),
            list_b: vec![norain.clone(); 3],
            list_r: vec![filled(30.0); 3],
        };

        let loss = derain_loss(&output, rain, norain);
        assert!(scalar(loss.total).abs() < 1e-6);
    }
}
