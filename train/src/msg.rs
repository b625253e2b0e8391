/// Outcome of a single optimizer update.
#[derive(Clone, Debug)]
pub struct TrainStepStats {
    pub loss: f64,
    pub batch_size: usize,
    pub lr: f64,
}

/// Image quality of a derained output, measured on luma.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalStats {
    pub psnr: f64,
    pub ssim: f64,
}
