//! Traits every solver backend implements.

use cutplane_model::Model;

use crate::config::{ParameterValue, SolverConfig};
use crate::error::SolveError;
use crate::hooks::Hooks;
use crate::output::{DualSolution, SolverOutput};
use crate::progress::StatusCallback;

/// Capabilities of a backend's live native handle, as seen by hooks.
pub trait SolverHandle {
    /// Row duals in original row order after a successful LP solve.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::MissingDuals`] when no dual solution exists.
    fn row_duals(&self) -> Result<DualSolution, SolveError>;

    /// Reduced costs, one per original column.
    fn reduced_costs(&self) -> Result<Vec<f64>, SolveError>;

    /// Set a native parameter by name.
    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<(), SolveError>;

    /// Ask the native solver to keep an infeasibility certificate.
    ///
    /// Returns `false` when the backend has no such capability.
    fn enable_farkas(&mut self) -> bool {
        false
    }

    /// Native Farkas ray in original row order, if one was produced.
    fn farkas_dual(&self) -> Option<DualSolution> {
        None
    }
}

/// A solver backend.
///
/// Every call builds and owns its native environment, so a `Sync` backend
/// value can serve concurrent solves.
pub trait Backend {
    /// Live native handle passed to hooks.
    type Handle: SolverHandle;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    fn config(&self) -> &SolverConfig;

    /// Solve `model`, running `hooks` at their lifecycle points and feeding
    /// progress ticks to `callback`.
    ///
    /// # Errors
    ///
    /// Infeasible and unbounded outcomes are reported as
    /// [`SolveError::Infeasible`] and [`SolveError::Unbounded`].
    fn solve(
        &self,
        model: &Model,
        hooks: &mut Hooks<'_, Self::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SolverOutput, SolveError>;

    /// Solve and return up to `pool_size` distinct solutions, incumbent first.
    ///
    /// Backends without a pool return the incumbent alone.
    fn solve_pool(
        &self,
        model: &Model,
        pool_size: usize,
        hooks: &mut Hooks<'_, Self::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<(SolverOutput, Vec<Vec<f64>>), SolveError> {
        let _ = pool_size;
        let output = self.solve(model, hooks, callback)?;
        let pool = vec![output.solution.clone()];
        Ok((output, pool))
    }
}
