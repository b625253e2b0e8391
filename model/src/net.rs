use burn::{
    config::Config,
    module::Module,
    tensor::{Tensor, backend::Backend},
};

use crate::block::{RefineNet, RefineNetConfig};

#[derive(Config, Debug)]
pub struct DerainNetConfig {
    /// Feature maps used to model the rain layer.
    #[config(default = 32)]
    pub num_map: usize,
    /// Feature channels used to model the background.
    #[config(default = 32)]
    pub num_channel: usize,
    /// Residual blocks per refinement network.
    #[config(default = 4)]
    pub num_block: usize,
    /// Number of unrolled stages.
    #[config(default = 17)]
    pub num_stage: usize,
}

/// Everything the network estimates for one input batch. Values are in `[0, 255]`.
#[derive(Clone, Debug)]
pub struct DerainOutput<B: Backend> {
    /// Initial background estimate, before the first stage.
    pub b0: Tensor<B, 4>,
    /// Background estimate after each stage.
    pub list_b: Vec<Tensor<B, 4>>,
    /// Rain-streak estimate after each stage.
    pub list_r: Vec<Tensor<B, 4>>,
}

impl<B: Backend> DerainOutput<B> {
    /// Background estimate of the last stage.
    pub fn background(&self) -> Tensor<B, 4> {
        self.list_b.last().cloned().unwrap_or_else(|| self.b0.clone())
    }

    /// Rain-streak estimate of the last stage.
    pub fn rain_streaks(&self) -> Tensor<B, 4> {
        self.list_r
            .last()
            .cloned()
            .unwrap_or_else(|| self.b0.zeros_like())
    }
}

#[derive(Module, Debug)]
pub struct Stage<B: Backend> {
    rain_net: RefineNet<B>,
    background_net: RefineNet<B>,
}

/// Staged decomposition of a rainy image `O` into background `B` and rain `R`.
///
/// Each stage re-estimates `R` from the residual `O - B` and then `B` from `O - R`.
#[derive(Module, Debug)]
pub struct DerainNet<B: Backend> {
    init_net: RefineNet<B>,
    stages: Vec<Stage<B>>,
}

impl DerainNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DerainNet<B> {
        let rain = RefineNetConfig::new(self.num_map, self.num_block);
        let background = RefineNetConfig::new(self.num_channel, self.num_block);

        DerainNet {
            init_net: background.init(device),
            stages: (0..self.num_stage)
                .map(|_| Stage {
                    rain_net: rain.init(device),
                    background_net: background.init(device),
                })
                .collect(),
        }
    }
}

impl<B: Backend> DerainNet<B> {
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn forward(&self, rain: Tensor<B, 4>) -> DerainOutput<B> {
        let o = rain / 255.0;

        let b0 = o.clone() + self.init_net.forward(o.clone());

        let mut b = b0.clone();
        let mut list_b = Vec::with_capacity(self.stages.len());
        let mut list_r = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let residual = o.clone() - b;
            let r = residual.clone() + stage.rain_net.forward(residual);

            let estimate = o.clone() - r.clone();
            b = estimate.clone() + stage.background_net.forward(estimate);

            list_b.push(b.clone() * 255.0);
            list_r.push(r * 255.0);
        }

        DerainOutput {
            b0: b0 * 255.0,
            list_b,
            list_r,
        }
    }
}
