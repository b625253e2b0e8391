use std::path::Path;

use burn::{
    module::Module,
    optim::Optimizer,
    record::{BinBytesRecorder, FullPrecisionSettings, Record, Recorder},
    tensor::backend::AutodiffBackend,
};
use model::DerainNet;

use crate::error::Result;
use crate::train::DerainOptimizer;

pub type ModelRecord<B> = <DerainNet<B> as Module<B>>::Record;
pub type OptimizerRecord<B> = <DerainOptimizer<B> as Optimizer<DerainNet<B>, B>>::Record;

/// Complete training state after an epoch.
#[derive(Record)]
pub struct Checkpoint<B: AutodiffBackend> {
    pub epoch: usize,
    pub model: ModelRecord<B>,
    pub optimizer: OptimizerRecord<B>,
    /// Position of the learning rate schedule.
    pub scheduler: usize,
}

/// Writes `ckpt` to exactly `path`, creating parent directories.
pub fn save_checkpoint<B: AutodiffBackend>(ckpt: Checkpoint<B>, path: &Path) -> Result<()> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let bytes = Recorder::<B>::record(&recorder, ckpt, ())?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    log::info!("Saved checkpoint to {}", path.display());
    Ok(())
}

pub fn load_checkpoint<B: AutodiffBackend>(path: &Path, device: &B::Device) -> Result<Checkpoint<B>> {
    let bytes = std::fs::read(path)?;
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let ckpt = Recorder::<B>::load(&recorder, bytes, device)?;
    log::info!("Loaded checkpoint from {}", path.display());
    Ok(ckpt)
}
