use burn::{
    config::Config,
    module::Module,
    nn::{
        PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    tensor::{Tensor, activation::relu, backend::Backend},
};

fn conv3x3<B: Backend>(channels: [usize; 2], device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new(channels, [3, 3])
        .with_padding(PaddingConfig2d::Same)
        .init(device)
}

/// Two 3x3 convolutions with a skip connection.
#[derive(Module, Debug)]
pub struct ResBlock<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
}

impl<B: Backend> ResBlock<B> {
    pub fn new(channels: usize, device: &B::Device) -> Self {
        Self {
            conv1: conv3x3([channels, channels], device),
            conv2: conv3x3([channels, channels], device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let y = relu(self.conv1.forward(x.clone()));
        relu(x + self.conv2.forward(y))
    }
}

#[derive(Config, Debug)]
pub struct RefineNetConfig {
    /// Channels of the image going in and out.
    #[config(default = 3)]
    pub channels: usize,
    /// Width of the hidden feature maps.
    pub hidden: usize,
    /// Number of residual blocks.
    pub num_blocks: usize,
}

/// Lifts an image into `hidden` feature maps, refines them with residual blocks
/// and projects back. Used as the per-stage update for both the rain and the
/// background estimate.
#[derive(Module, Debug)]
pub struct RefineNet<B: Backend> {
    head: Conv2d<B>,
    blocks: Vec<ResBlock<B>>,
    tail: Conv2d<B>,
}

impl RefineNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RefineNet<B> {
        RefineNet {
            head: conv3x3([self.channels, self.hidden], device),
            blocks: (0..self.num_blocks)
                .map(|_| ResBlock::new(self.hidden, device))
                .collect(),
            tail: conv3x3([self.hidden, self.channels], device),
        }
    }
}

impl<B: Backend> RefineNet<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let features = relu(self.head.forward(x));
        let features = self
            .blocks
            .iter()
            .fold(features, |features, block| block.forward(features));
        self.tail.forward(features)
    }
}
