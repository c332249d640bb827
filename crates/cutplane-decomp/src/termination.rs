//! Stopping rules for iterative loops.

use std::fmt;
use std::time::{Duration, Instant};

use cutplane_model::Sense;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Limits for an iterative decomposition or heuristic loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationPolicy {
    /// Maximum number of iterations.
    pub iteration_limit: Option<usize>,
    /// Consecutive iterations without a better value before stopping.
    pub not_better_iteration_limit: Option<usize>,
    /// Wall-clock budget in seconds.
    pub time_limit: Option<f64>,
    /// Relative gap at which the loop counts as converged.
    pub gap: Option<f64>,
}

impl TerminationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    pub fn with_not_better_iteration_limit(mut self, limit: usize) -> Self {
        self.not_better_iteration_limit = Some(limit);
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = Some(gap);
        self
    }

    /// Check if no limit is set.
    pub fn is_empty(&self) -> bool {
        self.iteration_limit.is_none()
            && self.not_better_iteration_limit.is_none()
            && self.time_limit.is_none()
            && self.gap.is_none()
    }
}

/// Why a loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationLimit,
    NotBetterLimit,
    TimeLimit,
    /// The bounds met within the policy gap.
    GapClosed,
    /// A round produced no violated cut although a subproblem stayed
    /// infeasible.
    Stalled,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::IterationLimit => "iteration_limit",
            StopReason::NotBetterLimit => "not_better_limit",
            StopReason::TimeLimit => "time_limit",
            StopReason::GapClosed => "gap_closed",
            StopReason::Stalled => "stalled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks iterations and the best value seen against a policy.
#[derive(Debug, Clone)]
pub struct TerminationTracker {
    policy: TerminationPolicy,
    sense: Sense,
    started: Instant,
    iterations: usize,
    not_better: usize,
    best: Option<f64>,
}

impl TerminationTracker {
    pub fn new(policy: TerminationPolicy, sense: Sense) -> Self {
        Self {
            policy,
            sense,
            started: Instant::now(),
            iterations: 0,
            not_better: 0,
            best: None,
        }
    }

    pub fn policy(&self) -> &TerminationPolicy {
        &self.policy
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record one finished iteration with the value it reached.
    ///
    /// Returns the first limit the loop has now hit, if any.
    pub fn record(&mut self, value: f64) -> Option<StopReason> {
        let improved = match self.best {
            Some(best) => self.sense.is_better(value, best),
            None => !value.is_nan(),
        };
        if improved {
            self.best = Some(value);
        }
        self.finish_iteration(improved)
    }

    /// Record one finished iteration that produced no value. It counts
    /// towards the not-better limit.
    pub fn record_iteration(&mut self) -> Option<StopReason> {
        self.finish_iteration(false)
    }

    fn finish_iteration(&mut self, improved: bool) -> Option<StopReason> {
        self.iterations += 1;
        if improved {
            self.not_better = 0;
        } else {
            self.not_better += 1;
        }
        let reason = self.check();
        if let Some(reason) = reason {
            debug!(
                component = "benders",
                operation = "terminate",
                status = "stop",
                reason = reason.as_str(),
                iterations = self.iterations,
                best = ?self.best,
                "Termination limit reached"
            );
        }
        reason
    }

    /// Limits that hold regardless of the last value.
    pub fn check(&self) -> Option<StopReason> {
        if self
            .policy
            .iteration_limit
            .is_some_and(|limit| self.iterations >= limit)
        {
            return Some(StopReason::IterationLimit);
        }
        if self
            .policy
            .not_better_iteration_limit
            .is_some_and(|limit| self.not_better >= limit)
        {
            return Some(StopReason::NotBetterLimit);
        }
        if self
            .policy
            .time_limit
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .is_some_and(|seconds| self.elapsed() >= Duration::from_secs_f64(seconds))
        {
            return Some(StopReason::TimeLimit);
        }
        None
    }

    /// `GapClosed` when `gap` is within the policy gap.
    pub fn check_gap(&self, gap: f64) -> Option<StopReason> {
        let target = self.policy.gap.unwrap_or(0.0).max(0.0);
        (gap <= target + f64::EPSILON).then_some(StopReason::GapClosed)
    }
}
