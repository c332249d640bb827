//! Background export of models for diagnostics.
//!
//! Each export runs on its own named thread. The handles are kept in an
//! [`ExportJobs`] set that the caller joins before returning a result, so
//! files of one round are complete before the next round starts. A failed
//! export is logged and counted, never propagated into a solve.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use cutplane_model::Model;
use tracing::{debug, warn};

/// Where and what to export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub directory: PathBuf,
    /// Write `<tag>.lp`.
    pub lp: bool,
    /// Write `<tag>.json` with the model summary.
    pub summary: bool,
}

impl ExportConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            lp: true,
            summary: true,
        }
    }

    pub fn with_lp(mut self, enabled: bool) -> Self {
        self.lp = enabled;
        self
    }

    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.summary = enabled;
        self
    }
}

/// Error type for a single export job.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    Io { path: PathBuf, message: String },
    Summary(String),
    Spawn(String),
    Panicked(String),
}

impl ExportError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::Io { .. } => "EXPORT_IO",
            ExportError::Summary(_) => "EXPORT_SUMMARY",
            ExportError::Spawn(_) => "EXPORT_SPAWN",
            ExportError::Panicked(_) => "EXPORT_PANICKED",
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io { path, message } => write!(
                f,
                "[{}] Failed to write '{}': {}",
                self.code(),
                path.display(),
                message
            ),
            ExportError::Summary(msg) => {
                write!(f, "[{}] Failed to render model summary: {}", self.code(), msg)
            }
            ExportError::Spawn(msg) => {
                write!(f, "[{}] Failed to start export thread: {}", self.code(), msg)
            }
            ExportError::Panicked(tag) => {
                write!(f, "[{}] Export thread for '{}' panicked", self.code(), tag)
            }
        }
    }
}

impl std::error::Error for ExportError {}

/// Hands out export job sets and unique file tags.
#[derive(Debug)]
pub struct DiagnosticsExporter {
    config: ExportConfig,
    sequence: AtomicUsize,
}

impl DiagnosticsExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            sequence: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// A fresh, unique file tag such as `master_0003`.
    pub fn next_tag(&self, label: &str) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{label}_{sequence:04}")
    }

    /// Empty job set writing into this exporter's directory.
    pub fn jobs(&self) -> ExportJobs {
        ExportJobs {
            config: self.config.clone(),
            handles: Vec::new(),
            failed_to_spawn: 0,
        }
    }
}

/// Join set of running export threads.
#[derive(Debug)]
pub struct ExportJobs {
    config: ExportConfig,
    handles: Vec<(String, JoinHandle<Result<(), ExportError>>)>,
    failed_to_spawn: usize,
}

impl ExportJobs {
    /// Write a copy of `model` as `<tag>.lp` / `<tag>.json` in the background.
    pub fn spawn_model_export(&mut self, model: &Model, tag: &str) {
        let model = model.clone();
        let config = self.config.clone();
        let job_tag = tag.to_string();
        let spawned = thread::Builder::new()
            .name(format!("cutplane-export-{tag}"))
            .spawn(move || export_model(&model, &config, &job_tag));
        match spawned {
            Ok(handle) => self.handles.push((tag.to_string(), handle)),
            Err(err) => {
                let err = ExportError::Spawn(err.to_string());
                warn!(
                    component = "export",
                    operation = "spawn",
                    status = "error",
                    tag,
                    error_code = err.code(),
                    "{err}"
                );
                self.failed_to_spawn += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every job and return how many failed.
    pub fn join_all(mut self) -> usize {
        self.join_pending()
    }

    fn join_pending(&mut self) -> usize {
        let mut failed = std::mem::take(&mut self.failed_to_spawn);
        for (tag, handle) in self.handles.drain(..) {
            let result = handle
                .join()
                .unwrap_or_else(|_| Err(ExportError::Panicked(tag.clone())));
            if let Err(err) = result {
                warn!(
                    component = "export",
                    operation = "join",
                    status = "error",
                    tag = %tag,
                    error_code = err.code(),
                    "{err}"
                );
                failed += 1;
            }
        }
        failed
    }
}

impl Drop for ExportJobs {
    fn drop(&mut self) {
        self.join_pending();
    }
}

/// Export `model` under a fresh `<model>_<label>` tag while `run` executes,
/// joining the job before returning.
pub(crate) fn with_export<T>(
    exporter: Option<&DiagnosticsExporter>,
    model: &Model,
    label: &str,
    run: impl FnOnce() -> T,
) -> T {
    let Some(exporter) = exporter else {
        return run();
    };
    let mut jobs = exporter.jobs();
    jobs.spawn_model_export(model, &exporter.next_tag(&format!("{}_{label}", model.name())));
    let result = run();
    let failed = jobs.join_all();
    if failed > 0 {
        debug!(
            component = "export",
            operation = "with_export",
            status = "warn",
            failed,
            "Diagnostics export incomplete"
        );
    }
    result
}

fn export_model(model: &Model, config: &ExportConfig, tag: &str) -> Result<(), ExportError> {
    let started = Instant::now();
    fs::create_dir_all(&config.directory).map_err(|err| io_error(&config.directory, &err))?;

    if config.lp {
        let path = config.directory.join(format!("{tag}.lp"));
        fs::write(&path, model.to_lp_string()).map_err(|err| io_error(&path, &err))?;
    }
    if config.summary {
        let path = config.directory.join(format!("{tag}.json"));
        let summary = model
            .summary_json()
            .map_err(|err| ExportError::Summary(err.to_string()))?;
        fs::write(&path, summary).map_err(|err| io_error(&path, &err))?;
    }

    debug!(
        component = "export",
        operation = "export_model",
        status = "success",
        tag,
        model = model.name(),
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Exported model"
    );
    Ok(())
}

fn io_error(path: &Path, err: &std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
