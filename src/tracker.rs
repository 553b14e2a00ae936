//! Experiment tracking.
//!
//! Every run gets a timestamped directory under `output/runs/<project>/`
//! holding a snapshot of the configuration, a `metrics.jsonl` file with one
//! record per epoch, copies of uploaded artifacts and a closing summary.
//! When an HTTP endpoint is configured the same JSON payloads are mirrored
//! with POST requests; transport failures there are logged and ignored, the
//! local run directory stays authoritative.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One epoch's metric record. The key set is fixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_acc: f64,
    pub val_loss: f64,
    pub val_acc: f64,
    pub lr: f64,
}

/// Closing summary written by `finish`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunSummary {
    project: String,
    run_name: String,
    epochs_logged: usize,
    finished_at: String,
}

/// Handle to one tracked run
pub struct RunTracker {
    project: String,
    run_name: String,
    run_dir: PathBuf,
    epochs_logged: usize,
    endpoint: Option<String>,
    client: Option<reqwest::blocking::Client>,
}

impl RunTracker {
    /// Start a run: create the run directory and snapshot the configuration.
    ///
    /// `config` is any serializable run configuration; it is written as
    /// `config.json` (and mirrored when an endpoint is set).
    pub fn init<C: Serialize>(
        root: impl AsRef<Path>,
        project: &str,
        config: &C,
        endpoint: Option<String>,
    ) -> Result<Self> {
        let run_name = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let run_dir = root.as_ref().join(project).join(&run_name);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create run directory {:?}", run_dir))?;

        let config_json = serde_json::to_string_pretty(config)
            .context("failed to serialize run configuration")?;
        fs::write(run_dir.join("config.json"), &config_json)
            .with_context(|| format!("failed to write config snapshot in {:?}", run_dir))?;

        let client = endpoint.as_ref().map(|_| reqwest::blocking::Client::new());

        let tracker = Self {
            project: project.to_string(),
            run_name,
            run_dir,
            epochs_logged: 0,
            endpoint,
            client,
        };

        info!(
            "Tracking run {}/{} in {:?}",
            tracker.project, tracker.run_name, tracker.run_dir
        );

        tracker.post("init", &serde_json::json!({ "config": config }));
        Ok(tracker)
    }

    /// Register the model under observation
    pub fn watch(&self, model_name: &str) -> Result<()> {
        let payload = serde_json::json!({
            "project": self.project,
            "run": self.run_name,
            "model": model_name,
        });
        fs::write(
            self.run_dir.join("watch.json"),
            serde_json::to_string_pretty(&payload)?,
        )
        .with_context(|| format!("failed to write watch registration in {:?}", self.run_dir))?;

        self.post("watch", &payload);
        Ok(())
    }

    /// Append one epoch record to `metrics.jsonl`
    pub fn log_epoch(&mut self, record: &EpochRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("failed to serialize epoch record")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.metrics_path())
            .with_context(|| format!("failed to open {:?}", self.metrics_path()))?;
        writeln!(file, "{}", line)
            .with_context(|| format!("failed to append to {:?}", self.metrics_path()))?;

        self.epochs_logged += 1;
        self.post("log", record);
        Ok(())
    }

    /// Copy an artifact file (typically the best-model checkpoint) into the
    /// run directory.
    pub fn save_artifact(&self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .with_context(|| format!("artifact path has no file name: {:?}", path))?;

        let artifact_dir = self.run_dir.join("artifacts");
        fs::create_dir_all(&artifact_dir)
            .with_context(|| format!("failed to create {:?}", artifact_dir))?;

        fs::copy(path, artifact_dir.join(name))
            .with_context(|| format!("failed to copy artifact {:?}", path))?;
        Ok(())
    }

    /// Close the run: write the summary and notify the endpoint
    pub fn finish(self) -> Result<()> {
        let summary = RunSummary {
            project: self.project.clone(),
            run_name: self.run_name.clone(),
            epochs_logged: self.epochs_logged,
            finished_at: Local::now().to_rfc3339(),
        };

        fs::write(
            self.run_dir.join("summary.json"),
            serde_json::to_string_pretty(&summary)?,
        )
        .with_context(|| format!("failed to write run summary in {:?}", self.run_dir))?;

        self.post("finish", &summary);
        info!("Run {}/{} finished", self.project, self.run_name);
        Ok(())
    }

    /// Run directory on disk
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn metrics_path(&self) -> PathBuf {
        self.run_dir.join("metrics.jsonl")
    }

    /// Best-effort mirror to the remote endpoint
    fn post<P: Serialize>(&self, event: &str, payload: &P) {
        let (Some(endpoint), Some(client)) = (&self.endpoint, &self.client) else {
            return;
        };

        let url = format!(
            "{}/{}/{}/{}",
            endpoint.trim_end_matches('/'),
            self.project,
            self.run_name,
            event
        );
        if let Err(e) = client.post(&url).json(payload).send() {
            warn!("tracker mirror failed for {}: {}", event, e);
        }
    }
}

/// Read back every epoch record from a run directory
pub fn read_metrics(run_dir: &Path) -> Result<Vec<EpochRecord>> {
    let path = run_dir.join("metrics.jsonl");
    let content =
        fs::read_to_string(&path).with_context(|| format!("failed to read {:?}", path))?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).with_context(|| format!("bad metrics line: {}", line))
        })
        .collect()
}
