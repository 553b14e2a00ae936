//! CIFAR-100 challenge CLI.
//!
//! Subcommands: `download` the dataset, `train` one of the three model
//! variants (followed by the evaluation stage), `evaluate` an existing
//! checkpoint, and `stats` for dataset statistics.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cifar100_challenge::backend::{report_backend_choice, DefaultBackend, TrainingBackend};
use cifar100_challenge::config::RunConfig;
use cifar100_challenge::dataset::cifar::{self, Cifar100, DatasetSplit};
use cifar100_challenge::dataset::split::TrainValSplit;
use cifar100_challenge::eval::evaluate_from_checkpoint;
use cifar100_challenge::model::ModelVariant;
use cifar100_challenge::training::early_stop::EarlyStoppingConfig;
use cifar100_challenge::training::run::run_training;
use cifar100_challenge::utils::logging::{init_logging, LogConfig};

/// CIFAR-100 image classification with Burn
///
/// Trains a hand-written CNN, a deep residual network, or a fine-tuned
/// pretrained network on CIFAR-100, and evaluates against the clean test
/// set plus an out-of-distribution set.
#[derive(Parser, Debug)]
#[command(name = "cifar100_challenge")]
#[command(version)]
#[command(about = "CIFAR-100 classifier training and OOD evaluation", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download and extract the CIFAR-100 binary dataset
    Download {
        /// Root data directory
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Train a model variant and run the evaluation stage
    Train {
        /// Model variant to train
        #[arg(short, long, value_enum, default_value_t = ModelVariant::Simple)]
        model: ModelVariant,

        /// Number of training epochs (defaults per variant)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Learning rate (defaults per variant)
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Root data directory
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Out-of-distribution image directory
        #[arg(long, default_value = "data/ood-test")]
        ood_dir: PathBuf,

        /// Best-model checkpoint path (extension added by the recorder)
        #[arg(long, default_value = "output/best_model")]
        checkpoint: PathBuf,

        /// Submission file path
        #[arg(long, default_value = "submission_ood.csv")]
        submission: PathBuf,

        /// Pretrained weights record (required for the transfer variant)
        #[arg(long)]
        pretrained: Option<PathBuf>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Force training-time augmentation on
        #[arg(long, default_value = "false")]
        augmentation: bool,

        /// Force training-time augmentation off
        #[arg(long, default_value = "false")]
        no_augmentation: bool,

        /// Disable early stopping
        #[arg(long, default_value = "false")]
        no_early_stop: bool,

        /// Early stopping patience in epochs
        #[arg(long)]
        early_stop_tolerance: Option<usize>,

        /// Minimum loss improvement to reset the patience counter
        #[arg(long)]
        early_stop_min_delta: Option<f64>,

        /// Experiment tracker project name
        #[arg(long, default_value = "cifar100-challenge")]
        tracker_project: String,

        /// Optional HTTP endpoint to mirror tracker records to
        #[arg(long)]
        tracker_endpoint: Option<String>,

        /// Worker threads for OOD image decoding
        #[arg(long, default_value = "4")]
        num_workers: usize,

        /// Skip the evaluation stage after training
        #[arg(long, default_value = "false")]
        skip_eval: bool,
    },

    /// Evaluate an existing checkpoint on the clean and OOD test sets
    Evaluate {
        /// Model variant the checkpoint was trained with
        #[arg(short, long, value_enum)]
        model: ModelVariant,

        /// Checkpoint path (as passed to train, without extension)
        #[arg(long, default_value = "output/best_model")]
        checkpoint: PathBuf,

        /// Root data directory
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Out-of-distribution image directory
        #[arg(long, default_value = "data/ood-test")]
        ood_dir: PathBuf,

        /// Submission file path
        #[arg(long, default_value = "submission_ood.csv")]
        submission: PathBuf,

        /// Batch size
        #[arg(short, long, default_value = "512")]
        batch_size: usize,

        /// Worker threads for OOD image decoding
        #[arg(long, default_value = "4")]
        num_workers: usize,
    },

    /// Show dataset statistics
    Stats {
        /// Root data directory
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Show the 80/20 train/validation split sizes
        #[arg(long, default_value = "false")]
        show_splits: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    match cli.command {
        Commands::Download { data_dir } => {
            cifar::download_cifar100(&data_dir)?;
            println!(
                "{} CIFAR-100 ready under {:?}",
                "Done:".green().bold(),
                cifar::binary_dir(&data_dir)
            );
        }

        Commands::Train {
            model,
            epochs,
            batch_size,
            learning_rate,
            data_dir,
            ood_dir,
            checkpoint,
            submission,
            pretrained,
            seed,
            augmentation,
            no_augmentation,
            no_early_stop,
            early_stop_tolerance,
            early_stop_min_delta,
            tracker_project,
            tracker_endpoint,
            num_workers,
            skip_eval,
        } => {
            let mut config = RunConfig::for_variant(model);

            if let Some(epochs) = epochs {
                config.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(learning_rate) = learning_rate {
                config.learning_rate = learning_rate;
            }
            config.data_dir = data_dir;
            config.ood_dir = ood_dir;
            config.checkpoint_path = checkpoint;
            config.submission_path = submission;
            config.pretrained_path = pretrained;
            config.seed = seed;
            config.tracker_project = tracker_project;
            config.tracker_endpoint = tracker_endpoint;
            config.num_workers = num_workers;

            if no_augmentation {
                config.augmentation = false;
            } else if augmentation {
                config.augmentation = true;
            }

            if no_early_stop {
                config.early_stopping = None;
            } else if early_stop_tolerance.is_some() || early_stop_min_delta.is_some() {
                let defaults = config.early_stopping.unwrap_or_default();
                config.early_stopping = Some(EarlyStoppingConfig {
                    tolerance: early_stop_tolerance.unwrap_or(defaults.tolerance),
                    min_delta: early_stop_min_delta.unwrap_or(defaults.min_delta),
                });
            }

            config.validate()?;
            config.print();
            report_backend_choice();

            println!("{}", format!("Training {}...", model).green().bold());
            let summary = run_training::<TrainingBackend>(&config)?;

            println!();
            println!("{}", "Training complete".green().bold());
            println!(
                "  Best validation accuracy: {:.2}% over {} epochs{}",
                summary.best_val_accuracy,
                summary.epochs_run,
                if summary.stopped_early {
                    " (early stop)"
                } else {
                    ""
                }
            );

            if skip_eval {
                info!("Skipping evaluation stage");
            } else {
                run_eval(&config)?;
            }
        }

        Commands::Evaluate {
            model,
            checkpoint,
            data_dir,
            ood_dir,
            submission,
            batch_size,
            num_workers,
        } => {
            let config = RunConfig {
                checkpoint_path: checkpoint,
                data_dir,
                ood_dir,
                submission_path: submission,
                batch_size,
                num_workers,
                ..RunConfig::for_variant(model)
            };

            report_backend_choice();
            run_eval(&config)?;
        }

        Commands::Stats {
            data_dir,
            show_splits,
        } => {
            cmd_stats(&data_dir, show_splits)?;
        }
    }

    Ok(())
}

fn run_eval(config: &RunConfig) -> Result<()> {
    println!("{}", "Evaluating best checkpoint...".cyan().bold());
    let report = evaluate_from_checkpoint::<DefaultBackend>(config)?;

    println!(
        "Clean CIFAR-100 test accuracy: {:.2}% ({} samples)",
        report.clean_accuracy, report.clean_samples
    );
    println!(
        "{} {:?} created with {} OOD predictions",
        "Done:".green().bold(),
        config.submission_path,
        report.ood_samples
    );
    Ok(())
}

fn cmd_stats(data_dir: &PathBuf, show_splits: bool) -> Result<()> {
    let binary_dir = cifar::binary_dir(data_dir);
    if !binary_dir.join("train.bin").exists() {
        println!(
            "{} dataset not found under {:?}",
            "Error:".red(),
            binary_dir
        );
        println!("Run first: cifar100_challenge download --data-dir {:?}", data_dir);
        return Ok(());
    }

    let train = Cifar100::load_from_binary(&binary_dir, DatasetSplit::Train)?;
    train.print_stats();

    if show_splits {
        let split = TrainValSplit::new(train.len(), 42);
        println!("\n{}", "Train/validation split (seed 42):".yellow().bold());
        println!(
            "  Training:   {} ({:.0}%)",
            split.train_len(),
            100.0 * split.train_len() as f64 / train.len() as f64
        );
        println!(
            "  Validation: {} ({:.0}%)",
            split.val_len(),
            100.0 * split.val_len() as f64 / train.len() as f64
        );
    }

    Ok(())
}
