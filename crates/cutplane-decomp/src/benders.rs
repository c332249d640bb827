//! Benders master and subproblem steps.
//!
//! [`BendersSolver::solve_master`] and [`BendersSolver::solve_sub`] are the
//! two transitions of a decomposition round; the loop around them lives in
//! [`crate::driver`]. A subproblem is solved as the LP relaxation of the
//! caller's model with the master's columns pinned, and answers with an
//! optimality cut built from its row duals or a feasibility cut built from
//! an infeasibility certificate.
//!
//! Row duals follow the convention `y_i = d(objective) / d(rhs_i)`.

use std::collections::HashMap;
use std::time::Instant;

use cutplane_model::{FixedModel, Model, QuadraticTerm, Sense, Sign, Term, VariableId};
use cutplane_solver::{
    Backend, DualSolution, HookPoint, Hooks, SolveError, SolverHandle, SolverOutput,
    StatusCallback,
};
use tracing::{debug, warn};

use crate::cut::{Cut, CutKind};
use crate::export::{DiagnosticsExporter, with_export};

const DUAL_TOLERANCE: f64 = 1e-9;
const CUT_TOLERANCE: f64 = 1e-7;

/// A master column pinned in a subproblem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedVariable {
    /// Column of the subproblem model.
    pub sub: VariableId,
    /// Column of the master model the cut is written over.
    pub master: VariableId,
    pub value: f64,
}

impl FixedVariable {
    pub fn new(sub: VariableId, master: VariableId, value: f64) -> Self {
        Self { sub, master, value }
    }

    /// Pin every `(sub, master)` link at the master column's value in
    /// `master_solution`. Links whose master column lies outside the
    /// solution are skipped with a warning.
    pub fn from_solution(
        links: &[(VariableId, VariableId)],
        master_solution: &[f64],
    ) -> Vec<FixedVariable> {
        links
            .iter()
            .filter_map(|(sub, master)| {
                let Some(&value) = master_solution.get(master.index()) else {
                    warn!(
                        component = "benders",
                        operation = "pin",
                        status = "skipped",
                        master_column = master.index(),
                        solution_len = master_solution.len(),
                        "Link points outside the master solution"
                    );
                    return None;
                };
                Some(FixedVariable::new(*sub, *master, value))
            })
            .collect()
    }
}

/// Result of one subproblem solve.
#[derive(Debug, Clone)]
pub enum SubOutcome {
    Feasible {
        output: SolverOutput,
        dual: DualSolution,
        cuts: Vec<Cut>,
    },
    Infeasible {
        farkas: DualSolution,
        cuts: Vec<Cut>,
    },
}

impl SubOutcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, SubOutcome::Feasible { .. })
    }

    pub fn cuts(&self) -> &[Cut] {
        match self {
            SubOutcome::Feasible { cuts, .. } | SubOutcome::Infeasible { cuts, .. } => cuts,
        }
    }

    pub fn into_cuts(self) -> Vec<Cut> {
        match self {
            SubOutcome::Feasible { cuts, .. } | SubOutcome::Infeasible { cuts, .. } => cuts,
        }
    }

    /// Subproblem objective, for feasible outcomes.
    pub fn objective(&self) -> Option<f64> {
        match self {
            SubOutcome::Feasible { output, .. } => Some(output.objective),
            SubOutcome::Infeasible { .. } => None,
        }
    }
}

/// One subproblem of a concurrent round.
#[derive(Debug, Clone)]
pub struct SubProblem<'m> {
    pub model: &'m Model,
    /// Master column bounding the subproblem objective.
    pub link: Option<VariableId>,
    pub fixed: Vec<FixedVariable>,
}

/// Master and subproblem solves over one backend.
#[derive(Debug)]
pub struct BendersSolver<B> {
    backend: B,
    exporter: Option<DiagnosticsExporter>,
}

impl<B: Backend> BendersSolver<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            exporter: None,
        }
    }

    /// Export every master and fixed subproblem model before solving it.
    pub fn with_exporter(mut self, exporter: DiagnosticsExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn exporter(&self) -> Option<&DiagnosticsExporter> {
        self.exporter.as_ref()
    }

    /// Solve the master. Errors are returned unchanged.
    pub fn solve_master(
        &self,
        model: &Model,
        mut hooks: Hooks<'_, B::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SolverOutput, SolveError> {
        let started = Instant::now();
        let result = with_export(self.exporter.as_ref(), model, "master", || {
            self.backend.solve(model, &mut hooks, callback)
        });
        match &result {
            Ok(output) => debug!(
                component = "benders",
                operation = "solve_master",
                status = "success",
                objective_value = output.objective,
                solver_status = output.status.as_str(),
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Master solved"
            ),
            Err(err) => warn!(
                component = "benders",
                operation = "solve_master",
                status = "error",
                error_code = err.code(),
                "Master solve failed"
            ),
        }
        result
    }

    /// Solve the LP relaxation of `model` with the `fixed` columns pinned.
    ///
    /// A feasible subproblem yields an optimality cut over `link` (none when
    /// `link` is `None`); an infeasible one yields a feasibility cut. Every
    /// other failure is returned as is.
    pub fn solve_sub(
        &self,
        model: &Model,
        link: Option<VariableId>,
        fixed: &[FixedVariable],
        hooks: Hooks<'_, B::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SubOutcome, SolveError> {
        let started = Instant::now();
        let relaxed = model.relax();
        let pins: Vec<(VariableId, f64)> = fixed.iter().map(|pin| (pin.sub, pin.value)).collect();
        let fixed_model = relaxed.fix(&pins)?;

        let result = with_export(self.exporter.as_ref(), fixed_model.model(), "sub", || {
            self.run_sub(&relaxed, &fixed_model, link, fixed, hooks, callback)
        });
        match &result {
            Ok(outcome) => debug!(
                component = "benders",
                operation = "solve_sub",
                status = "success",
                feasible = outcome.is_feasible(),
                cuts = outcome.cuts().len(),
                objective_value = ?outcome.objective(),
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Subproblem solved"
            ),
            Err(err) => warn!(
                component = "benders",
                operation = "solve_sub",
                status = "error",
                error_code = err.code(),
                "Subproblem solve failed"
            ),
        }
        result
    }

    /// Solve several subproblems, concurrently when the `parallel` feature
    /// is enabled. Each gets its own hooks from `hooks_for(index)` and its
    /// own native environment. Results are in input order.
    pub fn solve_subs<'h, F>(
        &self,
        subs: &[SubProblem<'_>],
        hooks_for: F,
    ) -> Vec<Result<SubOutcome, SolveError>>
    where
        B: Sync,
        F: Fn(usize) -> Hooks<'h, B::Handle> + Sync,
    {
        let solve_one = |(index, sub): (usize, &SubProblem<'_>)| {
            self.solve_sub(sub.model, sub.link, &sub.fixed, hooks_for(index), None)
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            subs.par_iter().enumerate().map(solve_one).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            subs.iter().enumerate().map(solve_one).collect()
        }
    }

    fn run_sub(
        &self,
        relaxed: &Model,
        fixed_model: &FixedModel,
        link: Option<VariableId>,
        fixed: &[FixedVariable],
        hooks: Hooks<'_, B::Handle>,
        callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SubOutcome, SolveError> {
        let sub = fixed_model.model();
        let mut dual = None;
        let mut native_farkas = None;
        let result = {
            let mut all: Hooks<'_, B::Handle> = Hooks::new();
            all.on(HookPoint::Configuration, |handle, _| {
                handle.enable_farkas();
                Ok(())
            });
            all.on(HookPoint::AnalyzingSolution, |handle, _| {
                dual = Some(handle.row_duals()?);
                Ok(())
            });
            all.on(HookPoint::AfterFailure, |handle, context| {
                if context.status().is_some_and(|status| status.is_infeasible()) {
                    native_farkas = handle.farkas_dual();
                }
                Ok(())
            });
            all.extend(hooks);
            self.backend.solve(sub, &mut all, callback)
        };

        match result {
            Ok(output) => {
                let dual = dual.ok_or_else(|| {
                    SolveError::MissingDuals("subproblem solve captured no row duals".to_string())
                })?;
                check_dual_len(&dual, sub)?;
                let cuts = link
                    .map(|theta| optimality_cut(fixed_model, fixed, theta, &output, &dual))
                    .into_iter()
                    .collect();
                Ok(SubOutcome::Feasible { output, dual, cuts })
            }
            Err(err) if err.is_infeasible() => {
                let certificate = match native_farkas {
                    Some(ray) if ray.len() == sub.num_constraints() => {
                        feasibility_cut(relaxed, fixed_model, fixed, &ray).map(|cut| (ray, cut))
                    }
                    _ => None,
                };
                let (farkas, cut) = match certificate {
                    Some(found) => found,
                    None => {
                        let ray = self.phase_one_duals(sub)?;
                        let cut = feasibility_cut(relaxed, fixed_model, fixed, &ray).ok_or_else(
                            || {
                                SolveError::MissingDuals(
                                    "phase-one duals do not separate the fixed assignment"
                                        .to_string(),
                                )
                            },
                        )?;
                        (ray, cut)
                    }
                };
                Ok(SubOutcome::Infeasible {
                    farkas,
                    cuts: vec![cut],
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Row duals of the elastic relaxation of an infeasible subproblem.
    fn phase_one_duals(&self, sub: &Model) -> Result<DualSolution, SolveError> {
        let elastic = sub.feasibility_relaxation();
        let mut dual = None;
        let output = {
            let mut hooks: Hooks<'_, B::Handle> = Hooks::new();
            hooks.on(HookPoint::AnalyzingSolution, |handle, _| {
                dual = Some(handle.row_duals()?);
                Ok(())
            });
            self.backend.solve(&elastic, &mut hooks, None)?
        };
        // Some backends report a dual-infeasible (unbounded) LP as infeasible.
        // A feasible elastic relaxation with no violation means the rows are
        // satisfiable, so the subproblem is unbounded instead.
        if output.objective <= CUT_TOLERANCE {
            warn!(
                component = "benders",
                operation = "phase_one",
                status = "error",
                subproblem = sub.name(),
                violation = output.objective,
                "Infeasible subproblem has a zero-violation elastic relaxation"
            );
            return Err(SolveError::Unbounded);
        }
        let dual = dual.ok_or_else(|| {
            SolveError::MissingDuals("elastic relaxation captured no row duals".to_string())
        })?;
        check_dual_len(&dual, sub)?;
        debug!(
            component = "benders",
            operation = "phase_one",
            status = "success",
            violation = output.objective,
            "Certificate taken from elastic relaxation"
        );
        Ok(dual)
    }
}

fn check_dual_len(dual: &DualSolution, model: &Model) -> Result<(), SolveError> {
    if dual.len() == model.num_constraints() {
        Ok(())
    } else {
        Err(SolveError::MissingDuals(format!(
            "expected {} row duals, got {}",
            model.num_constraints(),
            dual.len()
        )))
    }
}

fn master_columns(fixed: &[FixedVariable]) -> HashMap<VariableId, (VariableId, f64)> {
    fixed
        .iter()
        .map(|pin| (pin.sub, (pin.master, pin.value)))
        .collect()
}

/// `theta >= z + sum d_k (x_k - x̂_k) + sum q (x_j x_k - x̂_j x̂_k)` over
/// master columns, `<=` when the subproblem maximizes.
fn optimality_cut(
    fixed_model: &FixedModel,
    fixed: &[FixedVariable],
    theta: VariableId,
    output: &SolverOutput,
    dual: &DualSolution,
) -> Cut {
    let sub = fixed_model.model();
    let masters = master_columns(fixed);

    // d_k = c_k - sum_i y_i a_ik over the pinned columns.
    let mut slopes: HashMap<VariableId, f64> = HashMap::new();
    for term in &sub.objective().terms {
        if masters.contains_key(&term.column) {
            *slopes.entry(term.column).or_insert(0.0) += term.coefficient;
        }
    }
    for (row, constraint) in sub.constraints().iter().enumerate() {
        let price = dual.as_slice()[row];
        if price == 0.0 {
            continue;
        }
        for term in &constraint.terms {
            if masters.contains_key(&term.column) {
                *slopes.entry(term.column).or_insert(0.0) -= price * term.coefficient;
            }
        }
    }

    let mut terms = vec![Term::new(theta, 1.0)];
    let mut rhs = output.objective;
    for (column, slope) in &slopes {
        let (master, value) = masters[column];
        terms.push(Term::new(master, -slope));
        rhs -= slope * value;
    }

    let mut quadratic_terms = Vec::new();
    for cell in fixed_model.substituted() {
        let weight = match cell.row {
            Some(row) => -dual.as_slice()[row.index()] * cell.term.coefficient,
            None => cell.term.coefficient,
        };
        let (Some(&(first, first_value)), Some(&(second, second_value))) =
            (masters.get(&cell.term.first), masters.get(&cell.term.second))
        else {
            continue;
        };
        quadratic_terms.push(QuadraticTerm::new(first, second, -weight));
        rhs -= weight * first_value * second_value;
    }

    let sign = match sub.objective().sense {
        Sense::Minimize => Sign::GreaterEqual,
        Sense::Maximize => Sign::LessEqual,
    };
    Cut::new(CutKind::Optimality, terms, quadratic_terms, sign, rhs)
}

/// Feasibility cut from a certificate `y`, falling back to `-y` when `y`
/// does not separate the pinned point.
fn feasibility_cut(
    relaxed: &Model,
    fixed_model: &FixedModel,
    fixed: &[FixedVariable],
    ray: &DualSolution,
) -> Option<Cut> {
    if let Some((cut, violation)) = separating_cut(relaxed, fixed_model, fixed, ray.as_slice()) {
        debug!(
            component = "benders",
            operation = "feasibility_cut",
            status = "success",
            violation,
            "Feasibility cut built"
        );
        return Some(cut);
    }
    let flipped = ray.negated();
    let (cut, violation) = separating_cut(relaxed, fixed_model, fixed, flipped.as_slice())?;
    warn!(
        component = "benders",
        operation = "feasibility_cut",
        status = "warn",
        violation,
        "Certificate sign flipped to separate the fixed assignment"
    );
    Some(cut)
}

/// Aggregate the rows with weights `y` into `sum_F g_k x_k >= c`, where the
/// free columns are bounded out, and return it with its violation at the
/// pinned point. `None` if `y` gives no valid cut or the cut is not
/// violated.
fn separating_cut(
    relaxed: &Model,
    fixed_model: &FixedModel,
    fixed: &[FixedVariable],
    ray: &[f64],
) -> Option<(Cut, f64)> {
    let masters = master_columns(fixed);
    let mut constant = 0.0;
    let mut weights = vec![0.0; relaxed.num_variables()];

    for (constraint, &price) in relaxed.constraints().iter().zip(ray) {
        if price.abs() <= DUAL_TOLERANCE {
            continue;
        }
        let side = match constraint.sign {
            Sign::Equal => constraint.rhs,
            Sign::GreaterEqual if price > 0.0 => constraint.rhs,
            Sign::LessEqual if price < 0.0 => constraint.rhs,
            _ => return None,
        };
        if !side.is_finite() {
            return None;
        }
        constant += price * side;
        for term in &constraint.terms {
            weights[term.column.index()] += price * term.coefficient;
        }
    }

    let mut terms = Vec::new();
    let mut pinned_lhs = 0.0;
    for (index, (var, weight)) in relaxed.variables().iter().zip(&weights).enumerate() {
        let column = VariableId::new(index as u32);
        if let Some(&(master, value)) = masters.get(&column) {
            terms.push(Term::new(master, *weight));
            pinned_lhs += weight * value;
            continue;
        }
        let reduced = -weight;
        if reduced.abs() <= DUAL_TOLERANCE {
            continue;
        }
        let bound = if reduced < 0.0 {
            var.bounds.upper
        } else {
            var.bounds.lower
        };
        if !bound.is_finite() {
            return None;
        }
        constant += reduced * bound;
    }

    let mut quadratic_terms = Vec::new();
    for cell in fixed_model.substituted() {
        let Some(row) = cell.row else {
            continue;
        };
        let price = ray.get(row.index()).copied().unwrap_or(0.0);
        if price.abs() <= DUAL_TOLERANCE {
            continue;
        }
        let (Some(&(first, first_value)), Some(&(second, second_value))) =
            (masters.get(&cell.term.first), masters.get(&cell.term.second))
        else {
            continue;
        };
        let weight = price * cell.term.coefficient;
        quadratic_terms.push(QuadraticTerm::new(first, second, weight));
        pinned_lhs += weight * first_value * second_value;
    }

    let violation = constant - pinned_lhs;
    if !violation.is_finite() || violation <= CUT_TOLERANCE {
        return None;
    }
    let cut = Cut::new(
        CutKind::Feasibility,
        terms,
        quadratic_terms,
        Sign::GreaterEqual,
        constant,
    );
    Some((cut, violation))
}
