use burn::prelude::Config;

#[derive(Config, Debug)]
pub struct TrainConfig {
    /// Number of epochs to train for.
    #[config(default = 100)]
    pub num_iter: usize,

    #[config(default = 16)]
    pub batch_size: usize,

    /// Side length of the random training crops.
    #[config(default = 64)]
    pub patch_size: u32,

    /// One epoch draws this many batches of random crops.
    #[config(default = 1500)]
    pub batches_per_epoch: usize,

    /// Initial learning rate.
    #[config(default = 1e-3)]
    pub lr: f64,

    /// Epochs after which the learning rate is multiplied by `gamma`.
    #[config(default = "vec![25, 50, 75]")]
    pub milestones: Vec<usize>,

    #[config(default = 0.2)]
    pub gamma: f64,
}

impl TrainConfig {
    pub fn samples_per_epoch(&self) -> usize {
        self.batch_size * self.batches_per_epoch
    }
}
