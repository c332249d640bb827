//! Solver configuration types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value of a backend-specific parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Str(value.to_string())
    }
}

/// Configuration options for solver behavior.
///
/// The same surface is understood by every backend. Anything a backend
/// needs beyond it (remote server credentials, native parameter names) goes
/// into [`SolverConfig::extension`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock time limit in seconds. `None` means no limit.
    pub time_limit: Option<f64>,
    /// Relative optimality gap target. `None` uses solver default.
    pub gap: Option<f64>,
    /// Number of threads to use. `None` uses solver default.
    pub threads: Option<u32>,
    /// Seconds without objective or bound movement after which a MIP solve
    /// is stopped and its incumbent returned.
    pub not_improvement_time: Option<f64>,
    /// Enable/disable presolve. `None` uses solver default.
    pub presolve: Option<bool>,
    /// Verbosity level. `None` uses solver default.
    pub verbosity: Option<u32>,
    /// Log solver output to console. `None` uses solver default.
    pub log_to_console: Option<bool>,
    /// Feasibility tolerance. `None` uses solver default.
    pub tolerance: Option<f64>,
    /// Length in seconds of the first progress slice of a monitored solve.
    pub progress_interval: Option<f64>,
    /// Rows per available core above which native rows are built by the
    /// worker pool.
    pub parallel_build_factor: Option<usize>,
    /// Fold single-column rows into column bounds.
    pub fold_singleton_rows: Option<bool>,
    /// Backend-specific parameters, passed through untouched.
    pub extension: BTreeMap<String, ParameterValue>,
}

impl SolverConfig {
    /// Create a new configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the relative optimality gap target.
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = Some(gap);
        self
    }

    /// Set the number of threads.
    pub fn with_threads(mut self, count: u32) -> Self {
        self.threads = Some(count);
        self
    }

    /// Set the no-improvement stall duration in seconds.
    pub fn with_not_improvement_time(mut self, seconds: f64) -> Self {
        self.not_improvement_time = Some(seconds);
        self
    }

    /// Enable or disable presolve.
    pub fn with_presolve(mut self, enabled: bool) -> Self {
        self.presolve = Some(enabled);
        self
    }

    /// Set the verbosity level.
    pub fn with_verbosity(mut self, level: u32) -> Self {
        self.verbosity = Some(level);
        self
    }

    /// Enable or disable console logging.
    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.log_to_console = Some(enabled);
        self
    }

    /// Set the feasibility tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = Some(tol);
        self
    }

    /// Set the first progress slice length in seconds.
    pub fn with_progress_interval(mut self, seconds: f64) -> Self {
        self.progress_interval = Some(seconds);
        self
    }

    /// Set the rows-per-core threshold of the row-building worker pool.
    pub fn with_parallel_build_factor(mut self, factor: usize) -> Self {
        self.parallel_build_factor = Some(factor);
        self
    }

    /// Enable or disable folding of single-column rows into bounds.
    pub fn with_fold_singleton_rows(mut self, enabled: bool) -> Self {
        self.fold_singleton_rows = Some(enabled);
        self
    }

    /// Add a backend-specific parameter.
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.extension.insert(name.into(), value.into());
        self
    }

    /// Check if this configuration is completely empty (all defaults).
    pub fn is_empty(&self) -> bool {
        self.time_limit.is_none()
            && self.gap.is_none()
            && self.threads.is_none()
            && self.not_improvement_time.is_none()
            && self.presolve.is_none()
            && self.verbosity.is_none()
            && self.log_to_console.is_none()
            && self.tolerance.is_none()
            && self.progress_interval.is_none()
            && self.parallel_build_factor.is_none()
            && self.fold_singleton_rows.is_none()
            && self.extension.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_is_empty() {
        let config = SolverConfig::new();
        assert!(config.is_empty());
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = SolverConfig::new()
            .with_time_limit(60.0)
            .with_gap(0.01)
            .with_threads(4)
            .with_not_improvement_time(5.0)
            .with_presolve(true)
            .with_verbosity(1)
            .with_tolerance(1e-6)
            .with_fold_singleton_rows(false);

        assert!(!config.is_empty());
        assert_eq!(config.time_limit, Some(60.0));
        assert_eq!(config.gap, Some(0.01));
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.not_improvement_time, Some(5.0));
        assert_eq!(config.presolve, Some(true));
        assert_eq!(config.verbosity, Some(1));
        assert_eq!(config.tolerance, Some(1e-6));
        assert_eq!(config.fold_singleton_rows, Some(false));
    }

    #[test]
    fn test_config_extension_block() {
        let config = SolverConfig::new()
            .with_extension("server", "compute.example:7000")
            .with_extension("simplex_strategy", 4_i64);
        assert!(!config.is_empty());
        assert_eq!(
            config.extension.get("simplex_strategy"),
            Some(&ParameterValue::Int(4))
        );
    }

    #[test]
    fn test_config_from_json_keeps_defaults() {
        let config = SolverConfig::from_json_str(
            r#"{"time_limit": 30.0, "extension": {"mip_heuristic_effort": 0.2}}"#,
        )
        .unwrap();
        assert_eq!(config.time_limit, Some(30.0));
        assert_eq!(config.gap, None);
        assert_eq!(
            config.extension.get("mip_heuristic_effort"),
            Some(&ParameterValue::Float(0.2))
        );
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = SolverConfig::new().with_threads(8).with_gap(0.05);
        let json = serde_json::to_string(&config).unwrap();
        let parsed = SolverConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
