use std::path::Path;

use train::msg::EvalStats;

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochRow {
    pub stats: EvalStats,
    /// Mean training loss. Absent for evaluation-only runs.
    pub loss: Option<f64>,
}

/// Per-epoch metrics of a run. The whole table is rewritten after every epoch.
#[derive(Clone, Debug, Default)]
pub struct MetricsTable {
    track_loss: bool,
    rows: Vec<EpochRow>,
}

impl MetricsTable {
    pub fn new(track_loss: bool) -> Self {
        Self {
            track_loss,
            rows: vec![],
        }
    }

    pub fn push(&mut self, stats: EvalStats, loss: Option<f64>) {
        self.rows.push(EpochRow { stats, loss });
    }

    pub fn rows(&self) -> &[EpochRow] {
        &self.rows
    }

    /// Writes `Epoch,PSNR,SSIM[,Loss]`. `Epoch` is the row index, starting at 0.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut w = csv::Writer::from_path(path)?;
        if self.track_loss {
            w.write_record(["Epoch", "PSNR", "SSIM", "Loss"])?;
        } else {
            w.write_record(["Epoch", "PSNR", "SSIM"])?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let mut record = vec![
                i.to_string(),
                format!("{:.4}", row.stats.psnr),
                format!("{:.4}", row.stats.ssim),
            ];
            if self.track_loss {
                record.push(row.loss.map(|l| format!("{l:.4}")).unwrap_or_default());
            }
            w.write_record(&record)?;
        }
        w.flush()?;
        Ok(())
    }
}

/// Best scores seen so far. Starts at zero, so the first positive result always wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct BestScore {
    pub epoch: Option<usize>,
    pub psnr: f64,
    pub ssim: f64,
}

impl BestScore {
    /// Records `stats` if it beats both the best PSNR and the best SSIM.
    pub fn update(&mut self, epoch: usize, stats: EvalStats) -> bool {
        if stats.psnr > self.psnr && stats.ssim > self.ssim {
            self.epoch = Some(epoch);
            self.psnr = stats.psnr;
            self.ssim = stats.ssim;
            true
        } else {
            false
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Epoch: {} PSNR:{:.2} SSIM:{:.4}",
            self.epoch.unwrap_or_default(),
            self.psnr,
            self.ssim
        )
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.summary())?;
        Ok(())
    }
}
