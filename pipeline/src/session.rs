use std::path::Path;

use burn::{
    config::Config, module::AutodiffModule, prelude::Backend, tensor::backend::AutodiffBackend,
};
use dataset::{RainDataset, RainLoader, Split};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use model::DerainNet;
use train::{
    DerainTrainer, RunningMean,
    eval::{baseline_ssim, eval_stats},
    load_checkpoint,
    msg::EvalStats,
    save_checkpoint,
};

use crate::config::RunConfig;
use crate::error::{PipelineError, Result};
use crate::eval_export::eval_save_to_disk;
use crate::mode::RunMode;
use crate::report::{BestScore, MetricsTable};

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg} {bar:30} {pos}/{len} [{elapsed}<{eta}]") {
        bar.set_style(style);
    }
    bar
}

/// A training or evaluation run, with all the state that lives across epochs.
pub struct TrainingSession<B: AutodiffBackend> {
    config: RunConfig,
    model: DerainNet<B>,
    trainer: DerainTrainer<B>,
    test_loader: RainLoader,
    table: MetricsTable,
    best: BestScore,
    device: B::Device,
}

impl<B: AutodiffBackend> TrainingSession<B> {
    pub fn new(config: RunConfig, device: B::Device) -> Result<Self> {
        log::info!("Using seed {}", config.pipeline.seed);
        B::seed(config.pipeline.seed);

        let pipeline = &config.pipeline;
        let test = RainDataset::open(
            Path::new(&pipeline.data_path),
            &pipeline.data_name,
            Split::Test,
        )?;
        let test_loader = RainLoader::new(test, 1, pipeline.workers);

        let model = config.model.init(&device);
        let trainer = DerainTrainer::new(&config.train);

        Ok(Self {
            config,
            model,
            trainer,
            test_loader,
            table: MetricsTable::default(),
            best: BestScore::default(),
            device,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn model(&self) -> &DerainNet<B> {
        &self.model
    }

    pub fn table(&self) -> &MetricsTable {
        &self.table
    }

    pub fn best(&self) -> BestScore {
        self.best
    }

    pub async fn run(&mut self, mode: &RunMode) -> Result<()> {
        let pipeline = &self.config.pipeline;
        std::fs::create_dir_all(pipeline.save_dir())?;
        self.config.save(pipeline.config_path())?;

        let baseline = self.baseline().await?;
        log::info!("Baseline SSIM of the rainy test images: {baseline:.4}");

        match mode {
            RunMode::Fresh => {
                log::info!("Training from scratch");
                self.train(1).await
            }
            RunMode::Resume { checkpoint } => {
                let epoch = self.restore(checkpoint)?;
                log::info!("Resuming training after epoch {epoch}");
                self.train(epoch + 1).await
            }
            RunMode::Evaluate { checkpoint } => {
                self.restore(checkpoint)?;
                log::info!("Evaluating {}", checkpoint.display());
                self.table = MetricsTable::new(false);
                self.save_epoch(1, None, 1).await
            }
        }
    }

    /// Mean SSIM between the rainy and clean test images.
    pub async fn baseline(&mut self) -> Result<f64> {
        let mut ssim = RunningMean::new();
        let mut stream = self.test_loader.epoch::<B::InnerBackend>(&self.device);
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            ssim.push(baseline_ssim(&batch)?, batch.batch_size());
        }
        Ok(ssim.mean())
    }

    fn restore(&mut self, checkpoint: &Path) -> Result<usize> {
        if !checkpoint.exists() {
            return Err(PipelineError::MissingCheckpoint(checkpoint.to_owned()));
        }
        let ckpt = load_checkpoint::<B>(checkpoint, &self.device)?;
        let (model, epoch) = self.trainer.restore(ckpt, self.model.clone());
        self.model = model;
        Ok(epoch)
    }

    fn train_loader(&self) -> Result<RainLoader> {
        let pipeline = &self.config.pipeline;
        let train = &self.config.train;

        let dataset = RainDataset::open(
            Path::new(&pipeline.data_path),
            &pipeline.data_name,
            Split::Train,
        )?
        .with_patch_size(train.patch_size)
        .with_length(train.samples_per_epoch());

        Ok(RainLoader::new(dataset, train.batch_size, pipeline.workers).shuffled(pipeline.seed))
    }

    async fn train(&mut self, start_epoch: usize) -> Result<()> {
        let mut loader = self.train_loader()?;
        let last_epoch = start_epoch + self.config.train.num_iter - 1;
        self.table = MetricsTable::new(true);

        log::info!("Start training loop.");
        for epoch in start_epoch..=last_epoch {
            let loss = self.train_epoch(&mut loader, epoch, last_epoch).await?;
            let lr = self.trainer.end_epoch();
            log::info!("Epoch {epoch} done, mean loss {loss:.4}, next learning rate {lr:e}");
            self.save_epoch(epoch, Some(loss), last_epoch).await?;
        }
        Ok(())
    }

    async fn train_epoch(
        &mut self,
        loader: &mut RainLoader,
        epoch: usize,
        last_epoch: usize,
    ) -> Result<f64> {
        let bar = progress_bar(loader.num_batches());
        let mut loss = RunningMean::new();

        let mut stream = loader.epoch::<B>(&self.device);
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            let (model, stats) = self.trainer.step(&batch, self.model.clone());
            self.model = model;

            loss.push(stats.loss, stats.batch_size);
            bar.set_message(format!(
                "Train Epoch: [{epoch}/{last_epoch}] Loss: {:.4}",
                loss.mean()
            ));
            bar.inc(1);
        }
        bar.finish();
        Ok(loss.mean())
    }

    /// Scores the current model on the test split and writes every derained image.
    pub async fn evaluate(&mut self, epoch: usize, last_epoch: usize) -> Result<EvalStats> {
        let model = self.model.valid();
        let image_dir = self.config.pipeline.image_dir();
        let bar = progress_bar(self.test_loader.num_batches());
        let (mut psnr, mut ssim) = (RunningMean::new(), RunningMean::new());

        let mut stream = self.test_loader.epoch::<B::InnerBackend>(&self.device);
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            let sample = eval_stats(&model, &batch)?;

            psnr.push(sample.stats.psnr, batch.batch_size());
            ssim.push(sample.stats.ssim, batch.batch_size());
            eval_save_to_disk(sample.output, &batch.names, &image_dir).await?;

            bar.set_message(format!(
                "Test Epoch: [{epoch}/{last_epoch}] PSNR: {:.4} SSIM: {:.4}",
                psnr.mean(),
                ssim.mean()
            ));
            bar.inc(1);
        }
        bar.finish();

        Ok(EvalStats {
            psnr: psnr.mean(),
            ssim: ssim.mean(),
        })
    }

    /// Evaluates, then records metrics, the best score and a checkpoint for `epoch`.
    async fn save_epoch(&mut self, epoch: usize, loss: Option<f64>, last_epoch: usize) -> Result<()> {
        let stats = self.evaluate(epoch, last_epoch).await?;
        log::info!(
            "Epoch {epoch}: PSNR {:.4} SSIM {:.4}",
            stats.psnr,
            stats.ssim
        );

        let pipeline = &self.config.pipeline;
        self.table.push(stats, loss);
        self.table.write_csv(&pipeline.csv_path())?;

        if self.best.update(epoch, stats) {
            log::info!("New best: {}", self.best.summary());
            self.best.write(&pipeline.best_path())?;
        }

        save_checkpoint(
            self.trainer.checkpoint(epoch, &self.model),
            &pipeline.checkpoint_path(epoch),
        )?;
        Ok(())
    }
}
