use crate::{
    checkpoint::Checkpoint,
    config::TrainConfig,
    loss::derain_loss,
    msg::TrainStepStats,
    scheduler::{MultiStepLrScheduler, MultiStepLrSchedulerConfig},
};

use burn::{
    LearningRate,
    lr_scheduler::LrScheduler,
    module::Module,
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::{ElementConversion, backend::AutodiffBackend},
};
use dataset::RainBatch;
use model::DerainNet;
use tracing::trace_span;

pub type DerainOptimizer<B> = OptimizerAdaptor<Adam, DerainNet<B>, B>;

fn create_default_optimizer<B: AutodiffBackend>() -> DerainOptimizer<B> {
    AdamConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-8)
        .init()
}

/// Owns the optimizer and learning rate schedule, and applies one update per batch.
pub struct DerainTrainer<B: AutodiffBackend> {
    config: TrainConfig,
    sched: MultiStepLrScheduler,
    optim: DerainOptimizer<B>,
}

impl<B: AutodiffBackend> DerainTrainer<B> {
    pub fn new(config: &TrainConfig) -> Self {
        let sched = MultiStepLrSchedulerConfig::new(config.lr, config.milestones.clone())
            .with_gamma(config.gamma)
            .init();

        Self {
            config: config.clone(),
            sched,
            optim: create_default_optimizer(),
        }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Learning rate of the current epoch.
    pub fn lr(&self) -> LearningRate {
        self.sched.lr()
    }

    pub fn step(
        &mut self,
        batch: &RainBatch<B>,
        model: DerainNet<B>,
    ) -> (DerainNet<B>, TrainStepStats) {
        let output = trace_span!("Forward pass", sync_burn = true)
            .in_scope(|| model.forward(batch.rain.clone()));

        let _span = trace_span!("Calculate losses", sync_burn = true).entered();
        let loss = derain_loss(&output, batch.rain.clone(), batch.norain.clone());
        drop(_span);

        let grads = trace_span!("Backward pass", sync_burn = true)
            .in_scope(|| GradientsParams::from_grads(loss.total.backward(), &model));

        let lr = self.lr();
        let model = trace_span!("Optimizer step", sync_burn = true)
            .in_scope(|| self.optim.step(lr, model, grads));

        let stats = TrainStepStats {
            loss: loss.total.into_scalar().elem(),
            batch_size: batch.batch_size(),
            lr,
        };

        (model, stats)
    }

    /// Advances the learning rate schedule. Called once after every training epoch.
    pub fn end_epoch(&mut self) -> LearningRate {
        self.sched.step()
    }

    /// Snapshot of everything needed to continue training after `epoch`.
    pub fn checkpoint(&self, epoch: usize, model: &DerainNet<B>) -> Checkpoint<B> {
        Checkpoint {
            epoch,
            model: model.clone().into_record(),
            optimizer: self.optim.to_record(),
            scheduler: self.sched.to_record::<B>(),
        }
    }

    /// Loads a checkpoint into `model` and the trainer. Returns the restored model and the
    /// epoch the checkpoint was taken at.
    pub fn restore(&mut self, ckpt: Checkpoint<B>, model: DerainNet<B>) -> (DerainNet<B>, usize) {
        self.optim = create_default_optimizer().load_record(ckpt.optimizer);
        self.sched = self.sched.clone().load_record::<B>(ckpt.scheduler);
        (model.load_record(ckpt.model), ckpt.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Tensor;
    use model::DerainNetConfig;

    type B = Autodiff<NdArray>;

    fn tiny_model() -> DerainNet<B> {
        DerainNetConfig::new()
            .with_num_map(2)
            .with_num_channel(2)
            .with_num_block(1)
            .with_num_stage(2)
            .init(&Default::default())
    }

    fn batch() -> RainBatch<B> {
        let device = Default::default();
        RainBatch {
            rain: Tensor::ones([2, 3, 6, 6], &device) * 200.0,
            norain: Tensor::ones([2, 3, 6, 6], &device) * 100.0,
            names: vec!["a.png".into(), "b.png".into()],
        }
    }

    #[test]
    fn step_reports_batch_stats() {
        let config = TrainConfig::new().with_lr(1e-2);
        let mut trainer = DerainTrainer::<B>::new(&config);

        let (_, stats) = trainer.step(&batch(), tiny_model());
        assert_eq!(stats.batch_size, 2);
        assert!(stats.loss.is_finite() && stats.loss >= 0.0);
        assert!((stats.lr - 1e-2).abs() < 1e-12);
    }

    #[test]
    fn repeated_steps_reduce_loss() {
        let config = TrainConfig::new().with_lr(1e-2);
        let mut trainer = DerainTrainer::<B>::new(&config);
        let batch = batch();

        let mut model = tiny_model();
        let mut losses = vec![];
        for _ in 0..20 {
            let (next, stats) = trainer.step(&batch, model);
            model = next;
            losses.push(stats.loss);
        }
        assert!(losses[19] < losses[0], "{losses:?}");
    }

    #[test]
    fn schedule_advances_per_epoch() {
        let config = TrainConfig::new()
            .with_lr(1.0)
            .with_milestones(vec![1])
            .with_gamma(0.5);
        let mut trainer = DerainTrainer::<B>::new(&config);
        assert_eq!(trainer.lr(), 1.0);
        assert_eq!(trainer.end_epoch(), 0.5);
        assert_eq!(trainer.lr(), 0.5);
    }

    #[test]
    fn restore_resumes_schedule_and_epoch() {
        let config = TrainConfig::new().with_milestones(vec![2]).with_gamma(0.5);
        let mut trainer = DerainTrainer::<B>::new(&config);
        let (model, _) = trainer.step(&batch(), tiny_model());
        trainer.end_epoch();
        trainer.end_epoch();
        let ckpt = trainer.checkpoint(7, &model);

        let mut fresh = DerainTrainer::<B>::new(&config);
        let (_, epoch) = fresh.restore(ckpt, tiny_model());
        assert_eq!(epoch, 7);
        assert!((fresh.lr() - config.lr * 0.5).abs() < 1e-12);
    }
}
