//! Wrapper around the HiGHS library.
//!
//! Columns, rows and options are staged on the Rust side and a fresh native
//! problem is built for every [`HighsModel::solve`], so the same translated
//! problem can be solved repeatedly (progress slices, pool rounds) and grown
//! with extra rows in between.
//!
//! [`HighsModel::solve_with_progress`] registers a native callback for the
//! simplex, IPM and MIP interrupt points, so a closure sees progress while
//! HiGHS runs and can stop it.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::fmt;
use std::ops::ControlFlow;
use std::panic::{AssertUnwindSafe, catch_unwind};

use cutplane_model::Sense;
use highs::{RowProblem, Sense as HighsSense, SolvedModel};
use tracing::{debug, trace, warn};

/// Native status of the last solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighsStatus {
    Optimal,
    Infeasible,
    Unbounded,
    UnboundedOrInfeasible,
    /// Solver reached time limit (may have feasible solution)
    ReachedTimeLimit,
    /// Solver reached iteration limit (may have feasible solution)
    ReachedIterationLimit,
    /// A progress callback asked HiGHS to stop
    Interrupted,
    Unknown,
}

impl HighsStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HighsStatus::Optimal => "optimal",
            HighsStatus::Infeasible => "infeasible",
            HighsStatus::Unbounded => "unbounded",
            HighsStatus::UnboundedOrInfeasible => "unbounded_or_infeasible",
            HighsStatus::ReachedTimeLimit => "time_limit",
            HighsStatus::ReachedIterationLimit => "iteration_limit",
            HighsStatus::Interrupted => "interrupted",
            HighsStatus::Unknown => "unknown",
        }
    }

    /// Statuses after which HiGHS may hold a usable incumbent.
    pub fn is_limit(self) -> bool {
        matches!(
            self,
            HighsStatus::ReachedTimeLimit
                | HighsStatus::ReachedIterationLimit
                | HighsStatus::Interrupted
        )
    }
}

/// Errors returned by the HiGHS model wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum HighsModelError {
    ColumnIndexOutOfBounds {
        column_index: usize,
        num_columns: usize,
    },
    PrimalStartLengthMismatch {
        expected: usize,
        got: usize,
    },
    SolveRequired {
        operation: &'static str,
    },
    /// HiGHS rejected the problem or failed while solving it.
    Native {
        operation: &'static str,
        message: String,
    },
    /// HiGHS refused to register the progress callback.
    CallbackUnavailable {
        callback_type: c_int,
    },
}

impl fmt::Display for HighsModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighsModelError::ColumnIndexOutOfBounds {
                column_index,
                num_columns,
            } => write!(
                f,
                "column index {} out of bounds (num_columns = {})",
                column_index, num_columns
            ),
            HighsModelError::PrimalStartLengthMismatch { expected, got } => write!(
                f,
                "primal start length must match number of columns (expected {}, got {})",
                expected, got
            ),
            HighsModelError::SolveRequired { operation } => {
                write!(f, "solve must be called before {}", operation)
            }
            HighsModelError::Native { operation, message } => {
                write!(f, "HiGHS {} failed: {}", operation, message)
            }
            HighsModelError::CallbackUnavailable { callback_type } => {
                write!(f, "HiGHS rejected callback type {}", callback_type)
            }
        }
    }
}

impl std::error::Error for HighsModelError {}

const CALLBACK_SIMPLEX_INTERRUPT: c_int = 1;
const CALLBACK_IPM_INTERRUPT: c_int = 2;
const CALLBACK_MIP_INTERRUPT: c_int = 6;

/// Native search that reported progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    Simplex,
    Ipm,
    Mip,
}

/// One progress report from inside a native solve.
///
/// For the MIP search `objective` is the incumbent (infinite until one is
/// found) and `bound` the best dual bound. The simplex and IPM interrupt
/// points carry no objective, so both are NaN there and `iterations` is the
/// only sign of progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeProgress {
    pub source: ProgressSource,
    /// Simplex or IPM iterations, or explored nodes for the MIP search.
    pub iterations: i64,
    pub objective: f64,
    pub bound: f64,
}

/// Closure fed by [`HighsModel::solve_with_progress`]; `Break` interrupts
/// the native solve.
pub type ProgressFn<'a> = dyn FnMut(&NativeProgress) -> ControlFlow<()> + 'a;

struct ProgressRelay<'p, 'a> {
    progress: &'p mut ProgressFn<'a>,
    events: usize,
}

unsafe extern "C" fn relay_progress(
    callback_type: c_int,
    _message: *const c_char,
    data_out: *const highs_sys::HighsCallbackDataOut,
    data_in: *mut highs_sys::HighsCallbackDataIn,
    user_data: *mut c_void,
) {
    if data_out.is_null() || user_data.is_null() {
        return;
    }
    let source = match callback_type {
        CALLBACK_SIMPLEX_INTERRUPT => ProgressSource::Simplex,
        CALLBACK_IPM_INTERRUPT => ProgressSource::Ipm,
        CALLBACK_MIP_INTERRUPT => ProgressSource::Mip,
        _ => return,
    };
    // SAFETY: `user_data` is the relay registered by `HighsModel::run`, which
    // outlives the native solve and is cleared from HiGHS right after it.
    // `data_out` is valid for the duration of this call.
    let (relay, out) = unsafe {
        (
            &mut *user_data.cast::<ProgressRelay<'_, '_>>(),
            &*data_out,
        )
    };
    let event = match source {
        ProgressSource::Mip => NativeProgress {
            source,
            iterations: out.mip_node_count,
            objective: out.mip_primal_bound,
            bound: out.mip_dual_bound,
        },
        ProgressSource::Simplex => NativeProgress {
            source,
            iterations: i64::from(out.simplex_iteration_count),
            objective: f64::NAN,
            bound: f64::NAN,
        },
        ProgressSource::Ipm => NativeProgress {
            source,
            iterations: i64::from(out.ipm_iteration_count),
            objective: f64::NAN,
            bound: f64::NAN,
        },
    };
    relay.events += 1;
    // A panic must not unwind into C++; treat it as a stop request.
    let flow = catch_unwind(AssertUnwindSafe(|| (relay.progress)(&event)))
        .unwrap_or(ControlFlow::Break(()));
    if flow.is_break() && !data_in.is_null() {
        // SAFETY: HiGHS hands a writable input block to interrupt callbacks.
        unsafe { (*data_in).user_interrupt = 1 };
    }
}

fn register_progress(
    model: &mut highs::Model,
    relay: &mut ProgressRelay<'_, '_>,
) -> Result<(), HighsModelError> {
    let highs = model.as_mut_ptr();
    let user_data = (relay as *mut ProgressRelay<'_, '_>).cast::<c_void>();
    let status = unsafe { highs_sys::Highs_setCallback(highs, Some(relay_progress), user_data) };
    if status == highs_sys::STATUS_ERROR {
        return Err(HighsModelError::CallbackUnavailable { callback_type: 0 });
    }
    for callback_type in [
        CALLBACK_SIMPLEX_INTERRUPT,
        CALLBACK_IPM_INTERRUPT,
        CALLBACK_MIP_INTERRUPT,
    ] {
        let status = unsafe {
            highs_sys::Highs_startCallback(highs, highs_sys::HighsInt::from(callback_type))
        };
        if status == highs_sys::STATUS_ERROR {
            unsafe { highs_sys::Highs_setCallback(highs, None, std::ptr::null_mut()) };
            return Err(HighsModelError::CallbackUnavailable { callback_type });
        }
    }
    Ok(())
}

/// Option value types for HiGHS solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum HighsOption {
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(String),
}

/// Snapshot of primal and dual solution values.
#[derive(Debug, Clone, Default)]
pub struct SolutionSnapshot {
    col_values: Vec<f64>,
    col_duals: Vec<f64>,
    row_values: Vec<f64>,
    row_duals: Vec<f64>,
}

impl SolutionSnapshot {
    /// Primal values for variables.
    pub fn col_values(&self) -> &[f64] {
        &self.col_values
    }

    /// Dual values for variables (reduced costs).
    pub fn col_duals(&self) -> &[f64] {
        &self.col_duals
    }

    /// Primal values for constraints.
    pub fn row_values(&self) -> &[f64] {
        &self.row_values
    }

    /// Dual values for constraints (shadow prices).
    pub fn row_duals(&self) -> &[f64] {
        &self.row_duals
    }
}

#[derive(Debug, Clone, Copy)]
struct StagedColumn {
    lower: f64,
    upper: f64,
    cost: f64,
    integer: bool,
}

#[derive(Debug, Clone)]
struct StagedRow {
    lower: f64,
    upper: f64,
    entries: Vec<(usize, f64)>,
}

/// Staged HiGHS problem plus the result of its latest solve.
pub struct HighsModel {
    sense: Sense,
    columns: Vec<StagedColumn>,
    rows: Vec<StagedRow>,
    options: Vec<(String, HighsOption)>,
    log_to_console: bool,
    verbosity: Option<u32>,
    primal_start: Option<Vec<f64>>,
    solved: Option<SolvedModel>,
}

impl HighsModel {
    pub fn new(sense: Sense) -> Self {
        debug!(
            component = "solver",
            operation = "init_highs",
            status = "success",
            sense = sense.as_str(),
            "Creating new HiGHS model"
        );
        HighsModel {
            sense,
            columns: Vec::new(),
            rows: Vec::new(),
            options: Vec::new(),
            log_to_console: false,
            verbosity: None,
            primal_start: None,
            solved: None,
        }
    }

    /// Add a continuous column and return its index.
    pub fn add_col(&mut self, lower: f64, upper: f64, cost: f64) -> usize {
        self.push_col(lower, upper, cost, false)
    }

    /// Add an integer column and return its index.
    pub fn add_integer_col(&mut self, lower: f64, upper: f64, cost: f64) -> usize {
        self.push_col(lower, upper, cost, true)
    }

    fn push_col(&mut self, lower: f64, upper: f64, cost: f64, integer: bool) -> usize {
        trace!(
            lower,
            upper,
            cost,
            integer,
            component = "solver",
            operation = "add_column",
            status = "success",
            "Adding column"
        );
        self.primal_start = None;
        self.columns.push(StagedColumn {
            lower,
            upper,
            cost,
            integer,
        });
        self.columns.len() - 1
    }

    /// Add a row `lower <= sum(coef * x[col]) <= upper` and return its index.
    ///
    /// # Errors
    ///
    /// Returns an error if any column index is out of bounds.
    pub fn add_row(
        &mut self,
        lower: f64,
        upper: f64,
        entries: Vec<(usize, f64)>,
    ) -> Result<usize, HighsModelError> {
        let num_columns = self.columns.len();
        if let Some(&(column_index, _)) = entries.iter().find(|(col, _)| *col >= num_columns) {
            warn!(
                component = "solver",
                operation = "add_row",
                status = "error",
                column_index,
                num_columns,
                "Column index out of bounds for row"
            );
            return Err(HighsModelError::ColumnIndexOutOfBounds {
                column_index,
                num_columns,
            });
        }
        self.rows.push(StagedRow {
            lower,
            upper,
            entries,
        });
        Ok(self.rows.len() - 1)
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Bounds of a staged column.
    pub fn col_bounds(&self, column: usize) -> Option<(f64, f64)> {
        self.columns.get(column).map(|col| (col.lower, col.upper))
    }

    pub fn is_mip(&self) -> bool {
        self.columns.iter().any(|col| col.integer)
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Enable or disable logging to console.
    pub fn set_log_to_console(&mut self, enabled: bool) {
        self.log_to_console = enabled;
    }

    pub fn set_verbosity(&mut self, level: u32) {
        self.verbosity = Some(level);
    }

    /// Set a HiGHS option; a later value for the same name replaces the
    /// earlier one.
    pub fn set_option(&mut self, option: impl Into<String>, value: HighsOption) {
        let option = option.into();
        match self.options.iter_mut().find(|(name, _)| *name == option) {
            Some(entry) => entry.1 = value,
            None => self.options.push((option, value)),
        }
    }

    /// Current value of an option set through [`HighsModel::set_option`].
    pub fn option(&self, option: &str) -> Option<&HighsOption> {
        self.options
            .iter()
            .find(|(name, _)| name == option)
            .map(|(_, value)| value)
    }

    /// Set primal start values for the next solve.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector length does not match the column count.
    pub fn set_primal_start(&mut self, cols: Vec<f64>) -> Result<(), HighsModelError> {
        if cols.len() != self.columns.len() {
            warn!(
                component = "solver",
                operation = "set_primal_start",
                status = "error",
                expected = self.columns.len(),
                got = cols.len(),
                "Primal start length mismatch"
            );
            return Err(HighsModelError::PrimalStartLengthMismatch {
                expected: self.columns.len(),
                got: cols.len(),
            });
        }
        self.primal_start = Some(cols);
        Ok(())
    }

    fn build_problem(&self) -> RowProblem {
        let mut problem = RowProblem::default();
        let cols: Vec<_> = self
            .columns
            .iter()
            .map(|col| {
                if col.integer {
                    problem.add_integer_column(col.cost, col.lower..=col.upper)
                } else {
                    problem.add_column(col.cost, col.lower..=col.upper)
                }
            })
            .collect();
        for row in &self.rows {
            let factors: Vec<_> = row
                .entries
                .iter()
                .map(|&(col, coef)| (cols[col], coef))
                .collect();
            problem.add_row(row.lower..=row.upper, factors);
        }
        problem
    }

    /// Build the native problem from the staged data and solve it.
    ///
    /// # Errors
    ///
    /// Returns an error when HiGHS rejects the problem or the solve call
    /// itself fails.
    pub fn solve(&mut self) -> Result<HighsStatus, HighsModelError> {
        self.run(None)
    }

    /// Like [`HighsModel::solve`], with `progress` called from the native
    /// simplex, IPM and MIP interrupt points.
    ///
    /// When `progress` returns `Break` HiGHS stops and the status is
    /// [`HighsStatus::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns [`HighsModelError::CallbackUnavailable`] before solving when
    /// HiGHS refuses the callback, and the errors of [`HighsModel::solve`].
    pub fn solve_with_progress(
        &mut self,
        progress: &mut ProgressFn<'_>,
    ) -> Result<HighsStatus, HighsModelError> {
        self.run(Some(progress))
    }

    fn run(
        &mut self,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<HighsStatus, HighsModelError> {
        debug!(
            num_cols = self.columns.len(),
            num_rows = self.rows.len(),
            sense = self.sense.as_str(),
            component = "solver",
            operation = "solve",
            status = "start",
            "Solving model"
        );

        let sense = match self.sense {
            Sense::Minimize => HighsSense::Minimise,
            Sense::Maximize => HighsSense::Maximise,
        };
        self.solved = None;

        let mut model = self
            .build_problem()
            .try_optimise(sense)
            .map_err(|status| HighsModelError::Native {
                operation: "build",
                message: format!("{status:?}"),
            })?;
        if self.verbosity.unwrap_or(0) == 0 && !self.log_to_console {
            model.make_quiet();
        }
        if let Some(level) = self.verbosity {
            model.set_option("output_flag", level > 0);
        }
        for (option, value) in &self.options {
            match value {
                HighsOption::Bool(val) => model.set_option(option.as_str(), *val),
                HighsOption::Int(val) => model.set_option(option.as_str(), *val),
                HighsOption::Float(val) => model.set_option(option.as_str(), *val),
                HighsOption::Str(val) => model.set_option(option.as_str(), val.as_str()),
            }
        }
        if self.log_to_console {
            model.set_option("log_to_console", true);
            model.set_option("output_flag", true);
        }
        if let Some(cols) = self.primal_start.as_ref() {
            if let Err(err) = model.try_set_solution(Some(cols), None, None, None) {
                warn!(
                    component = "solver",
                    operation = "set_primal_start",
                    status = "warn",
                    ?err,
                    "Failed to set warm-start solution; continuing without hints"
                );
            }
        }

        let mut relay = progress.map(|progress| ProgressRelay {
            progress,
            events: 0,
        });
        if let Some(relay) = relay.as_mut() {
            register_progress(&mut model, relay).inspect_err(|err| {
                warn!(
                    component = "solver",
                    operation = "register_callback",
                    status = "error",
                    %err,
                    "HiGHS refused the progress callback"
                );
            })?;
        }

        let mut solved = model.try_solve().map_err(|status| HighsModelError::Native {
            operation: "solve",
            message: format!("{status:?}"),
        })?;
        if relay.is_some() {
            // The relay is dropped with this frame.
            unsafe {
                highs_sys::Highs_setCallback(solved.as_mut_ptr(), None, std::ptr::null_mut())
            };
        }
        // `SolvedModel::status` panics on statuses the highs crate does not
        // know, such as an interrupt, so the raw code is mapped here.
        let status = map_status(unsafe { highs_sys::Highs_getModelStatus(solved.as_ptr()) });
        trace!(
            component = "solver",
            operation = "solve",
            status = "success",
            solver_status = status.as_str(),
            progress_events = relay.as_ref().map_or(0, |relay| relay.events),
            "Solution status received"
        );
        self.solved = Some(solved);
        Ok(status)
    }

    /// Objective value of the latest solve.
    ///
    /// # Errors
    ///
    /// Returns an error if the model has not been solved yet.
    pub fn objective_value(&self) -> Result<f64, HighsModelError> {
        let solved = self.solved.as_ref().ok_or(HighsModelError::SolveRequired {
            operation: "objective_value",
        })?;
        Ok(solved.objective_value())
    }

    /// MIP gap of the latest solve (infinite for pure LPs).
    pub fn mip_gap(&self) -> f64 {
        match self.solved.as_ref() {
            Some(solved) => solved.mip_gap(),
            None => f64::NAN,
        }
    }

    /// Best MIP dual bound of the latest solve.
    pub fn mip_dual_bound(&self) -> Option<f64> {
        self.get_double_info("mip_dual_bound")
    }

    /// Whether the latest solve left a feasible primal solution.
    pub fn has_primal_solution(&self) -> bool {
        // HiGHS reports kSolutionStatusFeasible as 2.
        self.get_int_info("primal_solution_status") == Some(2)
    }

    pub fn simplex_iteration_count(&self) -> u64 {
        self.get_int_info("simplex_iteration_count")
            .map_or(0, |value| value.max(0) as u64)
    }

    fn get_int_info(&self, name: &str) -> Option<i64> {
        let solved = self.solved.as_ref()?;
        let c_name = CString::new(name).ok()?;
        let mut value: highs_sys::HighsInt = 0;
        let status = unsafe {
            highs_sys::Highs_getIntInfoValue(solved.as_ptr(), c_name.as_ptr(), &raw mut value)
        };
        if status == highs_sys::STATUS_OK {
            Some(i64::from(value))
        } else {
            debug!(
                component = "solver",
                operation = "solve_info",
                info = name,
                status_code = status,
                "Integer info value not available"
            );
            None
        }
    }

    fn get_double_info(&self, name: &str) -> Option<f64> {
        let solved = self.solved.as_ref()?;
        let c_name = CString::new(name).ok()?;
        let mut value: f64 = 0.0;
        let status = unsafe {
            highs_sys::Highs_getDoubleInfoValue(solved.as_ptr(), c_name.as_ptr(), &raw mut value)
        };
        if status == highs_sys::STATUS_OK {
            Some(value)
        } else {
            debug!(
                component = "solver",
                operation = "solve_info",
                info = name,
                status_code = status,
                "Double info value not available"
            );
            None
        }
    }

    /// Dual ray proving primal infeasibility, one value per native row.
    pub fn dual_ray(&self) -> Option<Vec<f64>> {
        let solved = self.solved.as_ref()?;
        let mut has_ray: highs_sys::HighsInt = 0;
        let mut ray = vec![0.0_f64; self.rows.len().max(1)];
        let status = unsafe {
            highs_sys::Highs_getDualRay(solved.as_ptr(), &raw mut has_ray, ray.as_mut_ptr())
        };
        if status != highs_sys::STATUS_OK || has_ray == 0 {
            debug!(
                component = "solver",
                operation = "dual_ray",
                status = "unavailable",
                status_code = status,
                "No dual ray available"
            );
            return None;
        }
        ray.truncate(self.rows.len());
        Some(ray)
    }

    /// Snapshot of primal and dual solution values.
    ///
    /// # Errors
    ///
    /// Returns an error if the model has not been solved yet.
    pub fn solution_snapshot(&self) -> Result<SolutionSnapshot, HighsModelError> {
        let solved = self.solved.as_ref().ok_or(HighsModelError::SolveRequired {
            operation: "solution_snapshot",
        })?;
        let solution = solved.get_solution();
        Ok(SolutionSnapshot {
            col_values: solution.columns().to_vec(),
            col_duals: solution.dual_columns().to_vec(),
            row_values: solution.rows().to_vec(),
            row_duals: solution.dual_rows().to_vec(),
        })
    }
}

/// Return the HiGHS solver version string, if available.
pub fn highs_version() -> Option<String> {
    unsafe {
        let ptr = highs_sys::Highs_version();
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
        }
    }
}

impl fmt::Debug for HighsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let objective_value = self.solved.as_ref().map(|s| s.objective_value());
        f.debug_struct("HighsModel")
            .field("num_cols", &self.columns.len())
            .field("num_rows", &self.rows.len())
            .field("sense", &self.sense)
            .field("objective_value", &objective_value)
            .finish_non_exhaustive()
    }
}

fn map_status(code: highs_sys::HighsInt) -> HighsStatus {
    match code {
        highs_sys::MODEL_STATUS_OPTIMAL => HighsStatus::Optimal,
        highs_sys::MODEL_STATUS_INFEASIBLE => HighsStatus::Infeasible,
        highs_sys::MODEL_STATUS_UNBOUNDED => HighsStatus::Unbounded,
        highs_sys::MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => HighsStatus::UnboundedOrInfeasible,
        highs_sys::MODEL_STATUS_REACHED_TIME_LIMIT => HighsStatus::ReachedTimeLimit,
        highs_sys::MODEL_STATUS_REACHED_ITERATION_LIMIT => HighsStatus::ReachedIterationLimit,
        highs_sys::MODEL_STATUS_REACHED_INTERRUPT => HighsStatus::Interrupted,
        _ => HighsStatus::Unknown,
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_add_row_rejects_unknown_column() {
        let mut model = HighsModel::new(Sense::Minimize);
        let x = model.add_col(0.0, 1.0, 1.0);
        assert_eq!(model.add_row(0.0, 1.0, vec![(x, 1.0)]), Ok(0));
        let err = model.add_row(0.0, 1.0, vec![(3, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            HighsModelError::ColumnIndexOutOfBounds {
                column_index: 3,
                num_columns: 1
            }
        );
    }

    #[test]
    fn test_set_option_replaces_previous_value() {
        let mut model = HighsModel::new(Sense::Maximize);
        model.set_option("time_limit", HighsOption::Float(1.0));
        model.set_option("time_limit", HighsOption::Float(2.0));
        assert_eq!(model.option("time_limit"), Some(&HighsOption::Float(2.0)));
        assert_eq!(model.sense(), Sense::Maximize);
    }

    #[test]
    fn test_solve_twice_from_staged_data() {
        let mut model = HighsModel::new(Sense::Minimize);
        let x = model.add_col(0.0, 10.0, 1.0);
        model.add_row(2.0, f64::INFINITY, vec![(x, 1.0)]).unwrap();
        assert_eq!(model.solve().unwrap(), HighsStatus::Optimal);
        assert!((model.objective_value().unwrap() - 2.0).abs() < 1e-6);

        model.add_row(3.0, f64::INFINITY, vec![(x, 1.0)]).unwrap();
        assert_eq!(model.solve().unwrap(), HighsStatus::Optimal);
        assert!((model.objective_value().unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_map_status_covers_interrupt() {
        assert_eq!(
            map_status(highs_sys::MODEL_STATUS_REACHED_INTERRUPT),
            HighsStatus::Interrupted
        );
        assert_eq!(map_status(highs_sys::MODEL_STATUS_OPTIMAL), HighsStatus::Optimal);
        assert_eq!(map_status(highs_sys::MODEL_STATUS_NOTSET), HighsStatus::Unknown);
        assert!(HighsStatus::Interrupted.is_limit());
    }

    fn transport_lp() -> HighsModel {
        // 6 supplies x 6 demands; big enough that simplex passes an
        // interrupt point.
        let mut model = HighsModel::new(Sense::Minimize);
        model.set_option("presolve", HighsOption::Str("off".to_string()));
        let size = 6;
        let mut cols = Vec::new();
        for i in 0..size {
            for j in 0..size {
                let cost = 1.0 + ((i * 7 + j * 3) % 11) as f64;
                cols.push(model.add_col(0.0, f64::INFINITY, cost));
            }
        }
        for i in 0..size {
            let entries = (0..size).map(|j| (cols[i * size + j], 1.0)).collect();
            model.add_row(f64::NEG_INFINITY, 10.0, entries).unwrap();
        }
        for j in 0..size {
            let entries = (0..size).map(|i| (cols[i * size + j], 1.0)).collect();
            model.add_row(8.0, f64::INFINITY, entries).unwrap();
        }
        model
    }

    #[test]
    fn test_progress_reaches_lp_solve() {
        let mut model = transport_lp();
        let mut events = Vec::new();
        let status = model
            .solve_with_progress(&mut |event: &NativeProgress| {
                events.push(*event);
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(status, HighsStatus::Optimal);
        assert!(!events.is_empty());
        assert!(events.iter().all(|event| event.source != ProgressSource::Mip));

        // The callback is cleared afterwards; a plain solve still works.
        assert_eq!(model.solve().unwrap(), HighsStatus::Optimal);
    }

    #[test]
    fn test_break_interrupts_lp_solve() {
        let mut model = transport_lp();
        let mut calls = 0;
        let status = model
            .solve_with_progress(&mut |_: &NativeProgress| {
                calls += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(status, HighsStatus::Interrupted);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_panicking_progress_stops_the_solve() {
        let mut model = transport_lp();
        let status = model
            .solve_with_progress(&mut |_: &NativeProgress| panic!("progress closure failed"))
            .unwrap();
        assert_eq!(status, HighsStatus::Interrupted);
    }

    #[test]
    fn test_unsolved_model_reports_solve_required() {
        let model = HighsModel::new(Sense::Minimize);
        assert!(matches!(
            model.objective_value(),
            Err(HighsModelError::SolveRequired { .. })
        ));
        assert!(model.dual_ray().is_none());
    }
}
