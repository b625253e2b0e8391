pub mod block;
pub mod net;

pub use net::{DerainNet, DerainNetConfig, DerainOutput};

#[cfg(feature = "wgpu")]
pub type MainBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type MainBackend = burn::backend::NdArray<f32>;

/// Backend used for image-quality metrics, which are computed in double precision.
pub type MetricBackend = burn::backend::NdArray<f64>;
