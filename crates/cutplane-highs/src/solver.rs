//! The HiGHS implementation of the backend contract.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use cutplane_model::{Model, Sense, VariableKind};
use cutplane_solver::{
    Backend, HookContext, HookPoint, Hooks, SolveError, SolveMonitor, SolverConfig, SolverHandle,
    SolverOutput, SolverStatus, StatusCallback, StopReason, dedup_pool, relative_gap,
};
use cutplane_tools::MemoryTracker;
use tracing::{debug, warn};

use crate::ffi::{
    HighsModel, HighsModelError, HighsOption, HighsStatus, NativeProgress, ProgressSource,
    highs_version,
};
use crate::handle::HighsHandle;
use crate::status::classify;
use crate::translate::{translate, validate};

/// Seconds between progress ticks of a monitored solve. Also the first
/// slice when HiGHS refuses the native callback and a MIP is sliced instead.
pub const DEFAULT_PROGRESS_INTERVAL: f64 = 1.0;

const MIN_SLICE_SECONDS: f64 = 1e-3;
const BINARY_TOLERANCE: f64 = 0.5;

/// Solves models with HiGHS.
///
/// Every call translates the model into a fresh native problem, so one
/// backend value can be shared by concurrent solves.
#[derive(Debug, Clone, Default)]
pub struct HighsBackend {
    config: SolverConfig,
}

struct SolveRun {
    status: HighsStatus,
    stopped: Option<StopReason>,
}

impl HighsBackend {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Translate, configure and solve, keeping the handle for follow-up
    /// rounds.
    fn run(
        &self,
        model: &Model,
        hooks: &mut Hooks<'_, HighsHandle>,
        monitor: &mut SolveMonitor<'_, '_>,
    ) -> Result<(SolverOutput, HighsHandle), SolveError> {
        validate(model)?;

        let solver_version = highs_version().unwrap_or_else(|| "unknown".to_string());
        let mut memory = MemoryTracker::new("solver");
        memory.record("solve_start");
        let started = Instant::now();
        debug!(
            component = "solver",
            operation = "solve",
            status = "start",
            solver = "highs",
            solver_version = %solver_version,
            model = model.name(),
            num_variables = model.num_variables(),
            num_constraints = model.num_constraints(),
            "Starting solve process"
        );

        let mut handle = translate(model, &self.config)?;
        let context = HookContext::new(model);
        hooks.run(HookPoint::AfterModeling, &mut handle, &context)?;
        self.apply_config(&mut handle)?;
        hooks.run(HookPoint::Configuration, &mut handle, &context)?;
        hooks.run(HookPoint::BeforeSolving, &mut handle, &context)?;

        let run = self.native_solve(&mut handle, monitor)?;
        memory.record("solve_end");

        let native = handle.native();
        let has_incumbent = run.status == HighsStatus::Optimal || native.has_primal_solution();
        let status = classify(run.status, has_incumbent);
        let elapsed = started.elapsed();
        debug!(
            component = "solver",
            operation = "solve",
            status = "complete",
            solver = "highs",
            solver_version = %solver_version,
            solver_status = run.status.as_str(),
            simplex_iterations = native.simplex_iteration_count(),
            optimality_gap = native.mip_gap(),
            progress_ticks = monitor.ticks(),
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            rss_delta_bytes = ?memory.last_delta(),
            "HiGHS solve completed"
        );

        if !status.has_solution() {
            let failed = context.with_status(status);
            hooks.run(HookPoint::AfterFailure, &mut handle, &failed)?;
            return Err(failure(status, run));
        }
        if let Some(reason) = run.stopped {
            warn!(
                component = "solver",
                operation = "solve",
                status = "warn",
                solver = "highs",
                reason = reason.as_str(),
                "Solve stopped early; returning best solution found"
            );
        }

        let output = self.extract(&handle, status, elapsed)?;
        output.validate(model.num_variables())?;
        let analyzed = HookContext::new(model).with_status(status);
        hooks.run(HookPoint::AnalyzingSolution, &mut handle, &analyzed)?;
        Ok((output, handle))
    }

    fn apply_config(&self, handle: &mut HighsHandle) -> Result<(), SolveError> {
        let config = &self.config;
        let native = handle.native_mut();
        native.set_log_to_console(config.log_to_console.unwrap_or(false));

        if let Some(limit) = config.time_limit {
            native.set_option("time_limit", HighsOption::Float(limit));
        }
        if let Some(gap) = config.gap {
            native.set_option("mip_rel_gap", HighsOption::Float(gap));
        }
        if let Some(level) = config.verbosity {
            native.set_verbosity(level);
        }
        if let Some(presolve) = config.presolve {
            let presolve_str = if presolve { "on" } else { "off" };
            native.set_option("presolve", HighsOption::Str(presolve_str.to_string()));
        }
        if let Some(threads) = config.threads {
            let threads = i32::try_from(threads).unwrap_or(i32::MAX);
            native.set_option("threads", HighsOption::Int(threads));
        }
        if let Some(tolerance) = config.tolerance {
            native.set_option(
                "primal_feasibility_tolerance",
                HighsOption::Float(tolerance),
            );
            native.set_option("dual_feasibility_tolerance", HighsOption::Float(tolerance));
        }
        for (name, value) in &config.extension {
            handle.set_parameter(name, value.clone())?;
        }
        Ok(())
    }

    /// Solve once, feeding native progress events to `monitor`.
    ///
    /// HiGHS reaches its interrupt points far more often than callers want
    /// to hear from, so after the first event ticks are spaced by the
    /// progress interval. LP events carry no objective and tick as advanced
    /// while the iteration count grows. When HiGHS refuses the callback a MIP
    /// falls back to time slices and an LP to a plain solve.
    fn native_solve(
        &self,
        handle: &mut HighsHandle,
        monitor: &mut SolveMonitor<'_, '_>,
    ) -> Result<SolveRun, SolveError> {
        if !monitor.is_active() {
            return Ok(SolveRun {
                status: handle.native_mut().solve()?,
                stopped: None,
            });
        }
        let interval = Duration::from_secs_f64(self.progress_interval());
        let offset = handle.objective_offset();
        let mut stopped = None;
        let mut last_tick: Option<Instant> = None;
        let mut last_iterations: Option<i64> = None;
        let mut progress = |event: &NativeProgress| {
            let now = Instant::now();
            if last_tick.is_some_and(|at| now.saturating_duration_since(at) < interval) {
                return ControlFlow::Continue(());
            }
            last_tick = Some(now);
            let reason = match event.source {
                ProgressSource::Mip => monitor.tick(event.objective + offset, event.bound + offset),
                ProgressSource::Simplex | ProgressSource::Ipm => {
                    let advanced = last_iterations.is_none_or(|seen| event.iterations > seen);
                    last_iterations = Some(event.iterations);
                    if advanced {
                        monitor.tick_advanced(event.objective, event.bound)
                    } else {
                        monitor.tick(event.objective, event.bound)
                    }
                }
            };
            match reason {
                Some(reason) => {
                    stopped = Some(reason);
                    ControlFlow::Break(())
                }
                None => ControlFlow::Continue(()),
            }
        };
        let result = handle.native_mut().solve_with_progress(&mut progress);
        match result {
            Ok(status) => Ok(SolveRun { status, stopped }),
            Err(HighsModelError::CallbackUnavailable { callback_type }) => {
                warn!(
                    component = "solver",
                    operation = "solve",
                    status = "fallback",
                    callback_type,
                    "Native progress callback unavailable; falling back"
                );
                if handle.native().is_mip() {
                    self.solve_in_slices(handle, monitor)
                } else {
                    Ok(SolveRun {
                        status: handle.native_mut().solve()?,
                        stopped: None,
                    })
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn progress_interval(&self) -> f64 {
        self.config
            .progress_interval
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .unwrap_or(DEFAULT_PROGRESS_INTERVAL)
    }

    /// Solve a MIP in growing time slices, reporting progress after each.
    ///
    /// A slice that ends on the time limit is resumed from its incumbent.
    fn solve_in_slices(
        &self,
        handle: &mut HighsHandle,
        monitor: &mut SolveMonitor<'_, '_>,
    ) -> Result<SolveRun, SolveError> {
        let deadline = self
            .config
            .time_limit
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(Duration::from_secs_f64);
        let mut slice = self.progress_interval();
        let offset = handle.objective_offset();
        let sense = handle.native().sense();

        loop {
            let remaining = deadline.map(|limit| limit.saturating_sub(monitor.elapsed()));
            let this_slice = remaining.map_or(slice, |left| left.as_secs_f64().min(slice));
            let last_slice = remaining.is_some_and(|left| left.as_secs_f64() <= slice);
            let native = handle.native_mut();
            native.set_option(
                "time_limit",
                HighsOption::Float(this_slice.max(MIN_SLICE_SECONDS)),
            );
            let status = native.solve()?;
            if status != HighsStatus::ReachedTimeLimit {
                return Ok(SolveRun {
                    status,
                    stopped: None,
                });
            }

            let has_incumbent = native.has_primal_solution();
            let objective = if has_incumbent {
                native.objective_value()? + offset
            } else {
                worst_value(sense)
            };
            let bound = native
                .mip_dual_bound()
                .filter(|value| value.is_finite())
                .map_or(-worst_value(sense), |value| value + offset);
            if let Some(reason) = monitor.tick(objective, bound) {
                return Ok(SolveRun {
                    status,
                    stopped: Some(reason),
                });
            }
            if last_slice {
                return Ok(SolveRun {
                    status,
                    stopped: None,
                });
            }
            if has_incumbent {
                let start = handle.native_primal_values()?;
                handle.native_mut().set_primal_start(start)?;
            }
            slice *= 2.0;
        }
    }

    fn extract(
        &self,
        handle: &HighsHandle,
        status: SolverStatus,
        elapsed: Duration,
    ) -> Result<SolverOutput, SolveError> {
        let native = handle.native();
        let offset = handle.objective_offset();
        let objective = native.objective_value()? + offset;
        let (bound, gap) = if native.is_mip() {
            let bound = native
                .mip_dual_bound()
                .filter(|value| value.is_finite())
                .map_or(objective, |value| value + offset);
            (bound, relative_gap(objective, bound))
        } else {
            (objective, 0.0)
        };
        let solution = handle.primal_values()?;
        debug!(
            component = "solver",
            operation = "extract_solution",
            status = "success",
            objective_value = objective,
            bound,
            gap,
            num_primal_values = solution.len(),
            "Solution extracted"
        );
        Ok(SolverOutput {
            objective,
            solution,
            elapsed,
            bound,
            gap,
            status,
        })
    }
}

fn worst_value(sense: Sense) -> f64 {
    match sense {
        Sense::Minimize => f64::INFINITY,
        Sense::Maximize => f64::NEG_INFINITY,
    }
}

fn failure(status: SolverStatus, run: SolveRun) -> SolveError {
    match status {
        SolverStatus::Infeasible => SolveError::Infeasible,
        SolverStatus::Unbounded => SolveError::Unbounded,
        _ => match run.stopped {
            Some(reason) => SolveError::Interrupted(format!(
                "stopped ({reason}) before a feasible solution was found"
            )),
            None if run.status.is_limit() => SolveError::Interrupted(format!(
                "{} reached before a feasible solution was found",
                run.status.as_str()
            )),
            None => SolveError::Solving(format!(
                "HiGHS finished with status '{}'",
                run.status.as_str()
            )),
        },
    }
}

/// Exclude one binary assignment: at least one listed binary must flip.
fn add_no_good_row(
    native: &mut HighsModel,
    binaries: &[usize],
    solution: &[f64],
) -> Result<(), SolveError> {
    let mut ones = 0usize;
    let entries: Vec<(usize, f64)> = binaries
        .iter()
        .map(|&column| {
            if solution[column] > BINARY_TOLERANCE {
                ones += 1;
                (column, -1.0)
            } else {
                (column, 1.0)
            }
        })
        .collect();
    native.add_row(1.0 - ones as f64, f64::INFINITY, entries)?;
    Ok(())
}

impl Backend for HighsBackend {
    type Handle = HighsHandle;

    fn name(&self) -> &'static str {
        "highs"
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn solve(
        &self,
        model: &Model,
        hooks: &mut Hooks<'_, HighsHandle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SolverOutput, SolveError> {
        let mut monitor = SolveMonitor::new(&self.config, callback);
        self.run(model, hooks, &mut monitor)
            .map(|(output, _)| output)
    }

    /// Collects alternatives by re-solving with no-good rows over the
    /// binary columns. Models without binaries yield the incumbent alone.
    ///
    /// Every round reports to the same status callback; a stop request ends
    /// the collection after keeping that round's solution, if any.
    fn solve_pool(
        &self,
        model: &Model,
        pool_size: usize,
        hooks: &mut Hooks<'_, HighsHandle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<(SolverOutput, Vec<Vec<f64>>), SolveError> {
        let mut monitor = SolveMonitor::new(&self.config, callback);
        let (output, mut handle) = self.run(model, hooks, &mut monitor)?;
        let binaries: Vec<usize> = model
            .variables()
            .iter()
            .enumerate()
            .filter(|(_, var)| var.kind == VariableKind::Binary)
            .map(|(column, _)| column)
            .collect();

        let mut alternatives = Vec::new();
        let mut last = output.solution.clone();
        while !binaries.is_empty() && alternatives.len() + 1 < pool_size {
            add_no_good_row(handle.native_mut(), &binaries, &last)?;
            let round = self.native_solve(&mut handle, &mut monitor)?;
            let status = round.status;
            let has_incumbent = status == HighsStatus::Optimal || handle.native().has_primal_solution();
            if !classify(status, has_incumbent).has_solution() {
                debug!(
                    component = "solver",
                    operation = "solve_pool",
                    status = "complete",
                    solver_status = status.as_str(),
                    found = alternatives.len() + 1,
                    "No further pool solutions"
                );
                break;
            }
            last = handle.primal_values()?;
            alternatives.push(last.clone());
            if let Some(reason) = round.stopped {
                debug!(
                    component = "solver",
                    operation = "solve_pool",
                    status = "stopped",
                    reason = reason.as_str(),
                    found = alternatives.len() + 1,
                    "Pool collection stopped by progress monitor"
                );
                break;
            }
        }

        let pool = dedup_pool(&output.solution, alternatives, pool_size);
        debug!(
            component = "solver",
            operation = "solve_pool",
            status = "success",
            requested = pool_size,
            returned = pool.len(),
            "Solution pool collected"
        );
        Ok((output, pool))
    }
}
