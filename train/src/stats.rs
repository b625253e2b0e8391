/// Weighted running mean, e.g. of per-batch losses weighted by batch size.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunningMean {
    total: f64,
    weight: usize,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64, weight: usize) {
        self.total += value * weight as f64;
        self.weight += weight;
    }

    pub fn count(&self) -> usize {
        self.weight
    }

    pub fn mean(&self) -> f64 {
        if self.weight == 0 {
            return 0.0;
        }
        self.total / self.weight as f64
    }
}

#[cfg(test)]
mod tests {
    use super::RunningMean;

    #[test]
    fn weights_by_batch_size() {
        let mut mean = RunningMean::new();
        mean.push(1.0, 16);
        mean.push(4.0, 16);
        mean.push(10.0, 4);
        assert_eq!(mean.count(), 36);
        assert!((mean.mean() - (16.0 + 64.0 + 40.0) / 36.0).abs() < 1e-12);
    }

    #[test]
    fn empty_mean_is_zero() {
        assert_eq!(RunningMean::new().mean(), 0.0);
    }
}
