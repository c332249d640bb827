//! Native handle passed to hooks and used for dual extraction.

use cutplane_model::Sense;
use cutplane_solver::{DualSolution, ParameterValue, SolveError, SolverHandle};
use tracing::debug;

use crate::ffi::{HighsModel, HighsModelError, HighsOption, SolutionSnapshot};
use crate::translate::FoldMap;

const BINDING_TOLERANCE: f64 = 1e-7;

impl From<HighsModelError> for SolveError {
    fn from(err: HighsModelError) -> Self {
        match err {
            HighsModelError::Native {
                operation: "solve", ..
            } => SolveError::Solving(err.to_string()),
            HighsModelError::SolveRequired { .. } => SolveError::MissingDuals(err.to_string()),
            _ => SolveError::Modeling(err.to_string()),
        }
    }
}

/// A translated problem together with the bookkeeping that maps native
/// rows and columns back onto the source model.
#[derive(Debug)]
pub struct HighsHandle {
    model: HighsModel,
    num_columns: usize,
    num_rows: usize,
    folds: FoldMap,
    offset: f64,
    has_semi_columns: bool,
    farkas_requested: bool,
}

impl HighsHandle {
    pub(crate) fn new(
        model: HighsModel,
        num_columns: usize,
        num_rows: usize,
        folds: FoldMap,
        offset: f64,
        has_semi_columns: bool,
    ) -> Self {
        Self {
            model,
            num_columns,
            num_rows,
            folds,
            offset,
            has_semi_columns,
            farkas_requested: false,
        }
    }

    /// The staged native problem.
    pub fn native(&self) -> &HighsModel {
        &self.model
    }

    /// Mutable access for hooks that add options or rows.
    pub fn native_mut(&mut self) -> &mut HighsModel {
        &mut self.model
    }

    /// Number of source rows folded into column bounds.
    pub fn num_folded_rows(&self) -> usize {
        self.folds.folded.len()
    }

    /// Objective constant that HiGHS does not see.
    pub fn objective_offset(&self) -> f64 {
        self.offset
    }

    /// Primal values of the source columns from the latest solve.
    pub fn primal_values(&self) -> Result<Vec<f64>, SolveError> {
        let snapshot = self.model.solution_snapshot()?;
        Ok(truncated(snapshot.col_values(), self.num_columns))
    }

    /// Primal values of every native column, auxiliary ones included.
    pub(crate) fn native_primal_values(&self) -> Result<Vec<f64>, SolveError> {
        Ok(self.model.solution_snapshot()?.col_values().to_vec())
    }

    fn folded_row_dual(&self, row: usize, snapshot: &SolutionSnapshot) -> f64 {
        let Some(fold) = self.folds.folded.get(&row) else {
            return 0.0;
        };
        let column = fold.column;
        let (Some(&value), Some(&reduced_cost)) = (
            snapshot.col_values().get(column),
            snapshot.col_duals().get(column),
        ) else {
            return 0.0;
        };
        let Some((lower, upper)) = self.model.col_bounds(column) else {
            return 0.0;
        };

        let at_lower = self.folds.lower_source.get(&column) == Some(&row)
            && (value - lower).abs() <= BINDING_TOLERANCE;
        let at_upper = self.folds.upper_source.get(&column) == Some(&row)
            && (value - upper).abs() <= BINDING_TOLERANCE;
        let binding = match (at_lower, at_upper) {
            (true, true) => true,
            (true, false) | (false, true) => {
                // With a pinned column both sources may be binding; the sign
                // of the reduced cost tells which side is active.
                let other_side = if at_lower {
                    self.folds.upper_source.get(&column)
                } else {
                    self.folds.lower_source.get(&column)
                };
                let both_pinned = (upper - lower).abs() <= BINDING_TOLERANCE
                    && other_side.is_some_and(|other| *other != row);
                if both_pinned {
                    let signed = match self.model.sense() {
                        Sense::Minimize => reduced_cost,
                        Sense::Maximize => -reduced_cost,
                    };
                    (signed >= 0.0) == at_lower
                } else {
                    true
                }
            }
            (false, false) => false,
        };

        if binding {
            reduced_cost / fold.coefficient
        } else {
            0.0
        }
    }
}

fn truncated(values: &[f64], len: usize) -> Vec<f64> {
    values.iter().take(len).copied().collect()
}

impl SolverHandle for HighsHandle {
    fn row_duals(&self) -> Result<DualSolution, SolveError> {
        if self.model.is_mip() {
            return Err(SolveError::MissingDuals(
                "row duals are not defined for a mixed-integer solve".to_string(),
            ));
        }
        let snapshot = self.model.solution_snapshot()?;
        if snapshot.row_duals().len() < self.model.num_rows() {
            return Err(SolveError::MissingDuals(format!(
                "HiGHS returned {} row duals for {} rows",
                snapshot.row_duals().len(),
                self.model.num_rows()
            )));
        }

        let duals = self
            .folds
            .native_rows
            .iter()
            .enumerate()
            .map(|(row, native)| match native {
                Some(index) => snapshot.row_duals()[*index],
                None => self.folded_row_dual(row, &snapshot),
            })
            .collect::<Vec<_>>();
        debug_assert_eq!(duals.len(), self.num_rows);
        Ok(DualSolution::new(duals))
    }

    fn reduced_costs(&self) -> Result<Vec<f64>, SolveError> {
        if self.model.is_mip() {
            return Err(SolveError::MissingDuals(
                "reduced costs are not defined for a mixed-integer solve".to_string(),
            ));
        }
        let snapshot = self.model.solution_snapshot()?;
        Ok(truncated(snapshot.col_duals(), self.num_columns))
    }

    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<(), SolveError> {
        let option = match value {
            ParameterValue::Bool(flag) => HighsOption::Bool(flag),
            ParameterValue::Int(number) => {
                let number = i32::try_from(number).map_err(|_| {
                    SolveError::Modeling(format!(
                        "parameter '{name}' value {number} does not fit a HiGHS integer option"
                    ))
                })?;
                HighsOption::Int(number)
            }
            ParameterValue::Float(number) => HighsOption::Float(number),
            ParameterValue::Str(text) => HighsOption::Str(text),
        };
        self.model.set_option(name, option);
        Ok(())
    }

    fn enable_farkas(&mut self) -> bool {
        self.model
            .set_option("presolve", HighsOption::Str("off".to_string()));
        self.farkas_requested = true;
        true
    }

    fn farkas_dual(&self) -> Option<DualSolution> {
        if !self.farkas_requested || !self.folds.is_empty() || self.has_semi_columns {
            return None;
        }
        let mut ray = self.model.dual_ray()?;
        ray.truncate(self.num_rows);
        if ray.len() != self.num_rows || ray.iter().all(|value| *value == 0.0) {
            return None;
        }
        debug!(
            component = "solver",
            operation = "farkas_dual",
            status = "success",
            num_rows = ray.len(),
            "Extracted dual ray"
        );
        Some(DualSolution::new(ray))
    }
}
