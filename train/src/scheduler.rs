use burn::{LearningRate, config::Config, lr_scheduler::LrScheduler, prelude::Backend};

/// Multi-step learning rate schedule configuration.
#[derive(Config, Debug)]
pub struct MultiStepLrSchedulerConfig {
    /// Learning rate before the first milestone.
    initial_lr: LearningRate,
    /// Epochs at which the learning rate decays.
    milestones: Vec<usize>,
    /// Multiplicative decay applied at each milestone.
    #[config(default = 0.1)]
    gamma: f64,
}

impl MultiStepLrSchedulerConfig {
    pub fn init(&self) -> MultiStepLrScheduler {
        let mut milestones = self.milestones.clone();
        milestones.sort_unstable();
        MultiStepLrScheduler {
            initial_lr: self.initial_lr,
            milestones,
            gamma: self.gamma,
            epoch: 0,
        }
    }
}

/// Decays the learning rate by `gamma` once the epoch counter reaches each milestone.
///
/// [`lr`](MultiStepLrScheduler::lr) is the rate for the current epoch, [`step`](LrScheduler::step)
/// advances to the next epoch. The record is the epoch counter.
#[derive(Clone, Debug)]
pub struct MultiStepLrScheduler {
    initial_lr: LearningRate,
    milestones: Vec<usize>,
    gamma: f64,
    epoch: usize,
}

impl MultiStepLrScheduler {
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn lr(&self) -> LearningRate {
        let passed = self.milestones.iter().filter(|&&m| m <= self.epoch).count();
        self.initial_lr * self.gamma.powi(passed as i32)
    }
}

impl LrScheduler for MultiStepLrScheduler {
    type Record<B: Backend> = usize;

    fn step(&mut self) -> LearningRate {
        self.epoch += 1;
        self.lr()
    }

    fn to_record<B: Backend>(&self) -> Self::Record<B> {
        self.epoch
    }

    fn load_record<B: Backend>(mut self, record: Self::Record<B>) -> Self {
        self.epoch = record;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn decays_at_milestones() {
        let mut sched = MultiStepLrSchedulerConfig::new(1.0, vec![4, 2])
            .with_gamma(0.2)
            .init();

        let mut lrs = vec![sched.lr()];
        for _ in 0..5 {
            lrs.push(sched.step());
        }

        let expected = [1.0, 1.0, 0.2, 0.2, 0.04, 0.04];
        for (lr, want) in lrs.iter().zip(expected) {
            assert!(close(*lr, want), "{lrs:?}");
        }
    }

    #[test]
    fn record_restores_position() {
        let config = MultiStepLrSchedulerConfig::new(1e-3, vec![1]).with_gamma(0.5);
        let mut sched = config.init();
        sched.step();
        sched.step();

        let record = sched.to_record::<NdArray>();
        let restored = config.init().load_record::<NdArray>(record);
        assert_eq!(restored.epoch(), 2);
        assert!(close(restored.lr(), 5e-4));
    }
}
