//! Restricted master solves for column generation.
//!
//! The caller owns the loop: solve the LP relaxation of the restricted
//! master, refresh prices through the pipelines, price candidate columns
//! with [`PipelineSet::reduced_cost`], add columns and repeat. The integer
//! master is solved once the column set is final, optionally returning a
//! pool of alternative solutions.

use std::time::Instant;

use cutplane_model::Model;
use cutplane_solver::{
    Backend, DualSolution, HookPoint, Hooks, SolveError, SolverHandle, SolverOutput,
    StatusCallback, dedup_pool,
};
use tracing::{debug, warn};

use crate::error::DecompError;
use crate::export::{DiagnosticsExporter, with_export};
use crate::pipeline::PipelineSet;
use crate::shadow_price::{ShadowPriceKey, ShadowPriceMap};

/// LP relaxation result with its row duals.
#[derive(Debug, Clone, PartialEq)]
pub struct LpOutcome {
    pub output: SolverOutput,
    pub dual: DualSolution,
}

#[derive(Debug)]
pub struct ColumnGenerationSolver<B> {
    backend: B,
    exporter: Option<DiagnosticsExporter>,
}

impl<B: Backend> ColumnGenerationSolver<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            exporter: None,
        }
    }

    pub fn with_exporter(mut self, exporter: DiagnosticsExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Solve the LP relaxation of `model` and capture its row duals.
    pub fn solve_lp(
        &self,
        model: &Model,
        hooks: Hooks<'_, B::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<LpOutcome, SolveError> {
        let started = Instant::now();
        let relaxed = model.relax();
        let mut dual = None;
        let result = with_export(self.exporter.as_ref(), &relaxed, "lp", || {
            let mut all: Hooks<'_, B::Handle> = Hooks::new();
            all.on(HookPoint::AnalyzingSolution, |handle, _| {
                dual = Some(handle.row_duals()?);
                Ok(())
            });
            all.extend(hooks);
            self.backend.solve(&relaxed, &mut all, callback)
        });
        let output = log_result("solve_lp", started, result)?;
        let dual = dual.ok_or_else(|| {
            SolveError::MissingDuals("LP solve captured no row duals".to_string())
        })?;
        Ok(LpOutcome { output, dual })
    }

    /// Solve `model` with its integrality intact.
    pub fn solve_milp(
        &self,
        model: &Model,
        mut hooks: Hooks<'_, B::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SolverOutput, SolveError> {
        let started = Instant::now();
        let result = with_export(self.exporter.as_ref(), model, "milp", || {
            self.backend.solve(model, &mut hooks, callback)
        });
        log_result("solve_milp", started, result)
    }

    /// Solve `model` and return up to `pool_size` distinct solutions with
    /// the incumbent first. A `pool_size` of one or less is a plain solve.
    pub fn solve_milp_pool(
        &self,
        model: &Model,
        pool_size: usize,
        mut hooks: Hooks<'_, B::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<(SolverOutput, Vec<Vec<f64>>), SolveError> {
        if pool_size <= 1 {
            let output = self.solve_milp(model, hooks, callback)?;
            let pool = vec![output.solution.clone()];
            return Ok((output, pool));
        }

        let started = Instant::now();
        let result = with_export(self.exporter.as_ref(), model, "milp_pool", || {
            self.backend.solve_pool(model, pool_size, &mut hooks, callback)
        });
        let (output, candidates) =
            result.inspect_err(|err| log_failure("solve_milp_pool", err))?;
        let pool = dedup_pool(&output.solution, candidates, pool_size);
        debug!(
            component = "column_generation",
            operation = "solve_milp_pool",
            status = "success",
            objective_value = output.objective,
            pool = pool.len(),
            pool_size,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Solution pool collected"
        );
        Ok((output, pool))
    }

    /// Rebuild `map` from the duals of `lp`.
    pub fn refresh_prices<K: ShadowPriceKey, Q: ?Sized>(
        &self,
        pipelines: &PipelineSet<K, Q>,
        map: &mut ShadowPriceMap<K>,
        model: &Model,
        lp: &LpOutcome,
    ) -> Result<(), DecompError> {
        pipelines.refresh_all(map, model, &lp.dual)
    }
}

fn log_result(
    operation: &'static str,
    started: Instant,
    result: Result<SolverOutput, SolveError>,
) -> Result<SolverOutput, SolveError> {
    match &result {
        Ok(output) => debug!(
            component = "column_generation",
            operation,
            status = "success",
            objective_value = output.objective,
            solver_status = output.status.as_str(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Restricted master solved"
        ),
        Err(err) => log_failure(operation, err),
    }
    result
}

fn log_failure(operation: &'static str, err: &SolveError) {
    warn!(
        component = "column_generation",
        operation,
        status = "error",
        error_code = err.code(),
        "Restricted master solve failed"
    );
}
