//! Solve results and dual vectors.

use std::time::Duration;

use crate::error::SolveError;
use crate::status::SolverStatus;

/// Result of a backend solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    /// Objective value of the returned solution.
    pub objective: f64,
    /// Primal values, one per model column.
    pub solution: Vec<f64>,
    /// Wall-clock duration of the solve.
    pub elapsed: Duration,
    /// Best proven objective bound (equals `objective` for LPs).
    pub bound: f64,
    /// Relative gap between `objective` and `bound`.
    pub gap: f64,
    pub status: SolverStatus,
}

impl SolverOutput {
    /// Check that a feasible or optimal output covers every column.
    pub fn validate(&self, num_variables: usize) -> Result<(), SolveError> {
        if self.status.has_solution() && self.solution.len() != num_variables {
            return Err(SolveError::Solving(format!(
                "solution has {} values for {} variables",
                self.solution.len(),
                num_variables
            )));
        }
        Ok(())
    }

    /// Value of one column, if present.
    pub fn value(&self, index: usize) -> Option<f64> {
        self.solution.get(index).copied()
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}

/// Row duals of a solved LP, one value per original row in row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DualSolution {
    values: Vec<f64>,
}

impl DualSolution {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn get(&self, row: usize) -> Option<f64> {
        self.values.get(row).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Sum of the duals of several rows; `None` if any row is out of range.
    pub fn price_of(&self, rows: &[usize]) -> Option<f64> {
        rows.iter()
            .try_fold(0.0, |sum, row| self.get(*row).map(|value| sum + value))
    }

    /// Dual vector with every sign flipped.
    pub fn negated(&self) -> DualSolution {
        DualSolution::new(self.values.iter().map(|value| -value).collect())
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }
}

impl From<Vec<f64>> for DualSolution {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Merge a solution pool: the incumbent first, then candidates that are not
/// exactly equal to anything kept so far, up to `pool_size` entries. NaN
/// entries compare equal to NaN entries with the same bit pattern.
pub fn dedup_pool(
    incumbent: &[f64],
    candidates: impl IntoIterator<Item = Vec<f64>>,
    pool_size: usize,
) -> Vec<Vec<f64>> {
    let limit = pool_size.max(1);
    let mut pool = vec![incumbent.to_vec()];
    for candidate in candidates {
        if pool.len() >= limit {
            break;
        }
        if pool.iter().any(|kept| same_solution(kept, &candidate)) {
            continue;
        }
        pool.push(candidate);
    }
    pool
}

fn same_solution(left: &[f64], right: &[f64]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| a == b || a.to_bits() == b.to_bits())
}
