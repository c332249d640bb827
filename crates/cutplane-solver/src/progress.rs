//! Progress ticks, status callbacks and the no-improvement stall timer.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crate::config::SolverConfig;

const IMPROVEMENT_TOLERANCE: f64 = 1e-9;

/// Snapshot reported at every progress tick of a running solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolvingStatus {
    /// Objective of the current incumbent (infinite when none).
    pub objective: f64,
    /// Best proven objective bound.
    pub bound: f64,
    /// Relative gap between `objective` and `bound`.
    pub gap: f64,
    pub elapsed: Duration,
}

/// Caller-supplied progress callback; `Break` asks the backend to stop.
pub type StatusCallback<'a> = dyn FnMut(&SolvingStatus) -> ControlFlow<()> + 'a;

/// Why a monitored solve was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Neither objective nor bound moved for `not_improvement_time`.
    Stalled,
    /// The status callback returned `Break`.
    CallbackRequested,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Stalled => "stalled",
            StopReason::CallbackRequested => "callback_requested",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative gap `|objective - bound| / max(|objective|, 1e-10)`.
///
/// Zero when both values agree, infinite when either is not finite.
pub fn relative_gap(objective: f64, bound: f64) -> f64 {
    if !objective.is_finite() || !bound.is_finite() {
        return f64::INFINITY;
    }
    let diff = (objective - bound).abs();
    if diff <= IMPROVEMENT_TOLERANCE {
        return 0.0;
    }
    diff / objective.abs().max(1e-10)
}

/// Combines the stall timer with the caller's status callback.
///
/// A backend feeds every progress tick to [`SolveMonitor::tick`] and turns a
/// returned [`StopReason`] into a native interruption.
pub struct SolveMonitor<'a, 'b> {
    callback: Option<&'a mut StatusCallback<'b>>,
    not_improvement: Option<Duration>,
    started: Instant,
    last_improvement: Instant,
    last_objective: Option<f64>,
    last_bound: Option<f64>,
    ticks: usize,
}

impl<'a, 'b> SolveMonitor<'a, 'b> {
    pub fn new(config: &SolverConfig, callback: Option<&'a mut StatusCallback<'b>>) -> Self {
        let now = Instant::now();
        let not_improvement = config
            .not_improvement_time
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(Duration::from_secs_f64);
        Self {
            callback,
            not_improvement,
            started: now,
            last_improvement: now,
            last_objective: None,
            last_bound: None,
            ticks: 0,
        }
    }

    /// True when ticks can change the outcome of a solve.
    pub fn is_active(&self) -> bool {
        self.callback.is_some() || self.not_improvement.is_some()
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record a progress tick and decide whether to stop.
    pub fn tick(&mut self, objective: f64, bound: f64) -> Option<StopReason> {
        self.tick_at(objective, bound, Instant::now())
    }

    /// Tick for a search that is known to have advanced, for instance by
    /// simplex iterations, without reporting a better objective. Resets the
    /// stall timer.
    pub fn tick_advanced(&mut self, objective: f64, bound: f64) -> Option<StopReason> {
        let now = Instant::now();
        self.last_improvement = now;
        self.tick_at(objective, bound, now)
    }

    fn tick_at(&mut self, objective: f64, bound: f64, now: Instant) -> Option<StopReason> {
        self.ticks += 1;
        let status = SolvingStatus {
            objective,
            bound,
            gap: relative_gap(objective, bound),
            elapsed: now.saturating_duration_since(self.started),
        };

        let improved = moved(self.last_objective, objective) || moved(self.last_bound, bound);
        if improved {
            self.last_improvement = now;
            self.last_objective = Some(objective);
            self.last_bound = Some(bound);
        }

        tracing::trace!(
            component = "solver",
            operation = "progress",
            status = "tick",
            objective_value = objective,
            bound,
            gap = status.gap,
            elapsed_ms = status.elapsed.as_millis() as u64,
            "Solve progress"
        );

        if let Some(callback) = self.callback.as_deref_mut() {
            if callback(&status).is_break() {
                return Some(StopReason::CallbackRequested);
            }
        }

        match self.not_improvement {
            Some(limit) if now.saturating_duration_since(self.last_improvement) >= limit => {
                Some(StopReason::Stalled)
            }
            _ => None,
        }
    }
}

fn moved(previous: Option<f64>, current: f64) -> bool {
    match previous {
        None => true,
        Some(previous) if previous.is_finite() != current.is_finite() => true,
        Some(previous) if !previous.is_finite() => false,
        Some(previous) => {
            (previous - current).abs() > IMPROVEMENT_TOLERANCE * previous.abs().max(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_relative_gap() {
        assert_eq!(relative_gap(10.0, 10.0), 0.0);
        assert!((relative_gap(10.0, 9.0) - 0.1).abs() < 1e-12);
        assert!(relative_gap(f64::INFINITY, 9.0).is_infinite());
    }

    #[test]
    fn test_inactive_monitor_never_stops() {
        let config = SolverConfig::new();
        let mut monitor = SolveMonitor::new(&config, None);
        assert!(!monitor.is_active());
        assert_eq!(monitor.tick(5.0, 1.0), None);
        assert_eq!(monitor.ticks(), 1);
    }

    #[test]
    fn test_stall_timer_triggers_without_movement() {
        let config = SolverConfig::new().with_not_improvement_time(2.0);
        let mut monitor = SolveMonitor::new(&config, None);
        let start = monitor.started;
        assert!(monitor.is_active());

        assert_eq!(monitor.tick_at(10.0, 1.0, start + Duration::from_secs(1)), None);
        assert_eq!(monitor.tick_at(10.0, 1.0, start + Duration::from_secs(2)), None);
        assert_eq!(
            monitor.tick_at(10.0, 1.0, start + Duration::from_secs(3)),
            Some(StopReason::Stalled)
        );
    }

    #[test]
    fn test_bound_movement_resets_stall_timer() {
        let config = SolverConfig::new().with_not_improvement_time(2.0);
        let mut monitor = SolveMonitor::new(&config, None);
        let start = monitor.started;

        assert_eq!(monitor.tick_at(10.0, 1.0, start + Duration::from_secs(1)), None);
        assert_eq!(monitor.tick_at(10.0, 4.0, start + Duration::from_secs(3)), None);
        assert_eq!(monitor.tick_at(10.0, 4.0, start + Duration::from_secs(4)), None);
        assert_eq!(
            monitor.tick_at(10.0, 4.0, start + Duration::from_secs(5)),
            Some(StopReason::Stalled)
        );
    }

    #[test]
    fn test_advanced_tick_resets_stall_timer() {
        let config = SolverConfig::new().with_not_improvement_time(0.05);
        let mut monitor = SolveMonitor::new(&config, None);
        assert_eq!(monitor.tick(f64::NAN, f64::NAN), None);
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(monitor.tick_advanced(f64::NAN, f64::NAN), None);
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(monitor.tick(f64::NAN, f64::NAN), Some(StopReason::Stalled));
        assert_eq!(monitor.ticks(), 3);
    }

    #[test]
    fn test_callback_break_requests_stop() {
        let config = SolverConfig::new();
        let mut seen = Vec::new();
        let mut callback = |status: &SolvingStatus| {
            seen.push(status.objective);
            if status.gap < 0.05 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        {
            let mut monitor = SolveMonitor::new(&config, Some(&mut callback));
            assert!(monitor.is_active());
            assert_eq!(monitor.tick(12.0, 10.0), None);
            assert_eq!(monitor.tick(10.2, 10.0), Some(StopReason::CallbackRequested));
        }
        assert_eq!(seen.len(), 2);
    }
}
