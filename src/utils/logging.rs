//! Structured logging via the `tracing` crate.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to display
    pub level: Level,
    /// Include module targets in output
    pub include_target: bool,
    /// Use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Verbose config for debugging
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_target: true,
            ansi_colors: true,
        }
    }
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Epoch-level progress logger for training runs
pub struct TrainingLogger {
    epoch: usize,
    total_epochs: usize,
    epoch_start: std::time::Instant,
    training_start: std::time::Instant,
}

impl TrainingLogger {
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epoch_start: std::time::Instant::now(),
            training_start: std::time::Instant::now(),
        }
    }

    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = std::time::Instant::now();
        tracing::info!("Epoch {}/{} started", epoch + 1, self.total_epochs);
    }

    pub fn end_epoch(
        &self,
        train_loss: f64,
        train_acc: f64,
        val_loss: f64,
        val_acc: f64,
        learning_rate: f64,
    ) {
        let epoch_time = self.epoch_start.elapsed();

        tracing::info!(
            "Epoch {}/{} done in {:.1}s | train loss {:.4} acc {:.2}% | val loss {:.4} acc {:.2}% | lr {:.6}",
            self.epoch + 1,
            self.total_epochs,
            epoch_time.as_secs_f64(),
            train_loss,
            train_acc,
            val_loss,
            val_acc,
            learning_rate
        );
    }

    pub fn log_new_best(&self, accuracy: f64) {
        tracing::info!("New best model, validation accuracy {:.2}%", accuracy);
    }

    pub fn log_early_stop(&self, tolerance: usize) {
        tracing::warn!(
            "Early stopping triggered after {} epochs without improvement",
            tolerance
        );
    }

    pub fn log_complete(&self, best_accuracy: f64) {
        let total = self.training_start.elapsed();
        tracing::info!(
            "Training complete in {:.1}s | best validation accuracy {:.2}%",
            total.as_secs_f64(),
            best_accuracy
        );
    }
}
