use std::path::PathBuf;

use anyhow::{Result, ensure};
use eval_constants::INPUT_SIZE;
use eval_core::Dataset;
use tch::{Device, Reduction, Tensor, nn};

use crate::checkpoint;
use crate::model::EvalNet;
use crate::optim::Adam;

pub struct TrainConfig {
    pub batch_size: usize,
    pub epochs: usize,
    pub patience: usize,
    pub learning_rate: f64,
    pub device: Device,
    pub checkpoint_dir: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
pub enum StopReason {
    EarlyStopped,
    MaxEpochsReached,
}

pub struct TrainReport {
    pub reason: StopReason,
    pub best_loss: f64,
    pub epochs_run: usize,
}

/// Best-loss tracker. Exhausting the patience budget halts the epoch loop;
/// an epoch that merely matches the best loss counts as stale.
pub struct EarlyStopping {
    patience: usize,
    best_loss: f64,
    stale_epochs: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> EarlyStopping {
        EarlyStopping {
            patience,
            best_loss: f64::INFINITY,
            stale_epochs: 0,
        }
    }

    /// Records one epoch's average loss. Returns true when training
    /// should stop.
    pub fn observe(&mut self, avg_loss: f64) -> bool {
        if avg_loss < self.best_loss {
            self.best_loss = avg_loss;
            self.stale_epochs = 0;
            false
        } else {
            self.stale_epochs += 1;
            self.stale_epochs >= self.patience
        }
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }
}

/// Runs the epoch/mini-batch loop over the in-memory dataset, writing one
/// checkpoint per completed epoch and the final weights on exit.
pub fn train(dataset: &Dataset, config: &TrainConfig) -> Result<TrainReport> {
    ensure!(!dataset.is_empty(), "dataset is empty, nothing to train on");
    ensure!(
        dataset.len() > 1,
        "need at least two examples for batch statistics"
    );
    ensure!(config.batch_size > 0, "batch size must be positive");

    let vs = nn::VarStore::new(config.device);
    let net = EvalNet::new(&vs.root());
    let mut opt = Adam::new(&vs, config.learning_rate);

    let examples = dataset.len() as i64;
    let features = Tensor::from_slice(&dataset.features)
        .view([examples, INPUT_SIZE as i64])
        .to(config.device);
    let targets = Tensor::from_slice(&dataset.targets)
        .view([examples, 1])
        .to(config.device);

    let batch_size = config.batch_size as i64;
    let mut stopper = EarlyStopping::new(config.patience);
    let mut reason = StopReason::MaxEpochsReached;
    let mut epochs_run = 0;

    for epoch in 1..=config.epochs {
        let mut total_loss = 0.0;
        let mut batches = 0;

        let mut start = 0i64;
        while start < examples {
            let mut len = batch_size.min(examples - start);
            // a lone trailing example cannot feed batch norm, fold it in
            if examples - start - len == 1 {
                len += 1;
            }
            let batch_features = features.narrow(0, start, len);
            let batch_targets = targets.narrow(0, start, len);

            opt.zero_grad();
            let outputs = net.forward(&batch_features, true);
            let loss = outputs.mse_loss(&batch_targets, Reduction::Mean);
            loss.backward();
            opt.step();

            total_loss += loss.double_value(&[]);
            batches += 1;
            start += len;
        }

        let avg_loss = total_loss / batches as f64;
        epochs_run = epoch;

        checkpoint::write_checkpoint(&config.checkpoint_dir, epoch, &vs, &opt, avg_loss)?;
        println!("Epoch {epoch:02}/{} Loss: {avg_loss:.6}", config.epochs);

        if stopper.observe(avg_loss) {
            println!("Early stopping at epoch {epoch}, best loss {:.6}", stopper.best_loss());
            reason = StopReason::EarlyStopped;
            break;
        }
    }

    checkpoint::write_final(&vs, &config.output)?;

    Ok(TrainReport {
        reason,
        best_loss: stopper.best_loss(),
        epochs_run,
    })
}
