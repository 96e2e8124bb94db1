use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::{Args, Parser, Subcommand, ValueEnum};
use eval_constants::INPUT_SIZE;
use tch::{Device, Kind, Tensor, nn};

mod checkpoint;
mod model;
mod optim;
mod train;

use model::EvalNet;
use train::{StopReason, TrainConfig};

#[derive(Parser)]
#[command(about = "Trains a scalar chess position evaluator from a PGN corpus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: load games, build the dataset, train
    Train(TrainCommand),
    /// Reload the final weights and check the forward-pass contract
    Verify(VerifyCommand),
}

#[derive(Args)]
struct TrainCommand {
    /// Path to the PGN corpus
    #[arg(long)]
    corpus: PathBuf,

    /// Maximum number of games to load
    #[arg(long, default_value = "10000")]
    max_games: usize,

    #[arg(long, default_value = "2048")]
    batch_size: usize,

    #[arg(long, default_value = "20")]
    epochs: usize,

    /// Stale epochs tolerated before training stops early
    #[arg(long, default_value = "5")]
    patience: usize,

    #[arg(long, default_value = "1e-3")]
    learning_rate: f64,

    /// Compute device, resolved once at startup
    #[arg(long, value_enum, default_value = "auto")]
    device: DeviceArg,

    /// Directory receiving one checkpoint per epoch
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,

    /// Final weights path, overwritten on completion
    #[arg(long, default_value = "model/eval.safetensors")]
    output: PathBuf,
}

#[derive(Args)]
struct VerifyCommand {
    /// Final weights to verify
    #[arg(long, default_value = "model/eval.safetensors")]
    weights: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceArg {
    Auto,
    Cpu,
    Cuda,
}

impl DeviceArg {
    fn resolve(self) -> Device {
        match self {
            DeviceArg::Auto => Device::cuda_if_available(),
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Cuda => Device::Cuda(0),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train(cmd) => run_train(cmd),
        Commands::Verify(cmd) => run_verify(cmd),
    }
}

fn run_train(cmd: TrainCommand) -> Result<()> {
    let device = cmd.device.resolve();
    println!("Using device: {device:?}");

    let games = eval_core::load_games(&cmd.corpus, cmd.max_games)?;
    let dataset = eval_core::build_dataset(&games);
    println!("Dataset size: {} positions", dataset.len());

    let config = TrainConfig {
        batch_size: cmd.batch_size,
        epochs: cmd.epochs,
        patience: cmd.patience,
        learning_rate: cmd.learning_rate,
        device,
        checkpoint_dir: cmd.checkpoint_dir,
        output: cmd.output,
    };

    let report = train::train(&dataset, &config)?;

    match report.reason {
        StopReason::EarlyStopped => println!(
            "Training stopped early after {} epochs, best loss {:.6}",
            report.epochs_run, report.best_loss
        ),
        StopReason::MaxEpochsReached => println!(
            "Training completed after {} epochs, best loss {:.6}",
            report.epochs_run, report.best_loss
        ),
    }
    println!("Final model saved to {}", config.output.display());

    Ok(())
}

/// Loads the final weights twice into independent stores and runs one
/// forward pass per load on a fixed input. The exporter consumes exactly
/// this artifact, so both loads must agree and stay inside [-1, 1].
fn run_verify(cmd: VerifyCommand) -> Result<()> {
    let first = reload_and_eval(&cmd.weights)?;
    let second = reload_and_eval(&cmd.weights)?;

    ensure!(
        (first - second).abs() < 1e-9,
        "reloaded weights disagree: {first} vs {second}"
    );
    ensure!(
        first.abs() <= 1.0,
        "output {first} escapes the [-1, 1] contract"
    );

    println!("verified: value on the fixed input is {first:.6}");
    Ok(())
}

fn reload_and_eval(path: &Path) -> Result<f64> {
    let mut vs = nn::VarStore::new(Device::Cpu);
    let net = EvalNet::new(&vs.root());
    vs.load(path)
        .with_context(|| format!("failed to load weights from {}", path.display()))?;

    let input = Tensor::zeros([1, INPUT_SIZE as i64], (Kind::Float, Device::Cpu));
    Ok(net.forward(&input, false).double_value(&[0, 0]))
}
