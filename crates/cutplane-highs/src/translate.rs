//! Translation of a [`Model`] into a staged [`HighsModel`].

use std::collections::BTreeMap;

use cutplane_model::{Model, ModelError};
use cutplane_solver::{SolveError, SolverConfig};
use tracing::{debug, trace};

use crate::ffi::HighsModel;
use crate::handle::HighsHandle;
use crate::row_batch::{NativeRow, RowBatchBuilder};

/// Rows per core above which rows are translated on the worker pool.
pub const DEFAULT_PARALLEL_BUILD_FACTOR: usize = 64;

const FOLD_TOLERANCE: f64 = 1e-9;

/// A single-column row represented as a column bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FoldedRow {
    pub column: usize,
    pub coefficient: f64,
}

/// Where every original row went in the native problem.
#[derive(Debug, Clone, Default)]
pub(crate) struct FoldMap {
    /// Native row of each original row; `None` for folded rows.
    pub native_rows: Vec<Option<usize>>,
    pub folded: BTreeMap<usize, FoldedRow>,
    /// Folded row that determines a column's lower bound.
    pub lower_source: BTreeMap<usize, usize>,
    /// Folded row that determines a column's upper bound.
    pub upper_source: BTreeMap<usize, usize>,
}

impl FoldMap {
    fn unfolded(num_rows: usize) -> Self {
        Self {
            native_rows: (0..num_rows).map(Some).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct SemiColumn {
    column: usize,
    lower: f64,
    upper: f64,
}

/// Check that the HiGHS backend can represent `model`.
pub(crate) fn validate(model: &Model) -> Result<(), SolveError> {
    if model.num_variables() == 0 {
        return Err(SolveError::Model(ModelError::EmptyModel));
    }
    if !model.is_linear() {
        return Err(SolveError::Modeling(
            "the HiGHS backend accepts linear constraints and objectives only".to_string(),
        ));
    }
    for var in model.variables() {
        if var.kind.is_semi() && !var.bounds.upper.is_finite() {
            return Err(SolveError::Modeling(format!(
                "semi-continuous column '{}' needs a finite upper bound",
                var.name
            )));
        }
    }
    Ok(())
}

/// Build the native problem for `model`.
pub(crate) fn translate(model: &Model, config: &SolverConfig) -> Result<HighsHandle, SolveError> {
    let sense = model.objective().sense;
    let num_columns = model.num_variables();
    let num_rows = model.num_constraints();

    let mut costs = vec![0.0; num_columns];
    for term in &model.objective().terms {
        costs[term.column.index()] += term.coefficient;
    }

    let mut bounds: Vec<(f64, f64)> = Vec::with_capacity(num_columns);
    let mut semi = Vec::new();
    for (column, var) in model.variables().iter().enumerate() {
        if var.kind.is_semi() {
            semi.push(SemiColumn {
                column,
                lower: var.bounds.lower,
                upper: var.bounds.upper,
            });
            bounds.push((var.bounds.lower.min(0.0), var.bounds.upper));
        } else {
            bounds.push((var.bounds.lower, var.bounds.upper));
        }
    }

    let factor = config
        .parallel_build_factor
        .unwrap_or(DEFAULT_PARALLEL_BUILD_FACTOR);
    let builder = if RowBatchBuilder::exceeds_threshold(num_rows, factor) {
        RowBatchBuilder::new()
    } else {
        RowBatchBuilder::new().with_batch_count(1).with_parallel(false)
    };
    let native_rows = builder.build(model.constraints()).rows;

    let folds = if config.fold_singleton_rows.unwrap_or(false) {
        fold_singleton_rows(model, &native_rows, &mut bounds)
    } else {
        FoldMap::unfolded(num_rows)
    };

    let mut highs = HighsModel::new(sense);
    for (column, var) in model.variables().iter().enumerate() {
        let (lower, upper) = bounds[column];
        if var.kind.is_integral() {
            highs.add_integer_col(lower, upper, costs[column]);
        } else {
            highs.add_col(lower, upper, costs[column]);
        }
    }

    for (row, native) in native_rows.into_iter().enumerate() {
        if folds.native_rows[row].is_some() {
            highs.add_row(native.lower, native.upper, native.entries)?;
        }
    }

    // x <= u * z and x >= l * z over an indicator z, after the original rows.
    for entry in &semi {
        let indicator = highs.add_integer_col(0.0, 1.0, 0.0);
        highs.add_row(
            f64::NEG_INFINITY,
            0.0,
            vec![(entry.column, 1.0), (indicator, -entry.upper)],
        )?;
        highs.add_row(
            0.0,
            f64::INFINITY,
            vec![(entry.column, 1.0), (indicator, -entry.lower)],
        )?;
    }

    if model.variables().iter().any(|var| var.initial.is_some()) {
        highs.set_primal_start(warm_start(model, &semi))?;
    }

    debug!(
        component = "solver",
        operation = "translate",
        status = "success",
        num_cols = highs.num_cols(),
        num_rows = highs.num_rows(),
        folded_rows = folds.folded.len(),
        semi_columns = semi.len(),
        "Translated model for HiGHS"
    );

    Ok(HighsHandle::new(
        highs,
        num_columns,
        num_rows,
        folds,
        model.objective().constant,
        !semi.is_empty(),
    ))
}

/// Fold rows with a single column into that column's bounds.
///
/// Fixed and semi-continuous columns are never folded into, and a fold that
/// would cross the column's bounds is skipped so the row stays explicit.
fn fold_singleton_rows(
    model: &Model,
    rows: &[NativeRow],
    bounds: &mut [(f64, f64)],
) -> FoldMap {
    let mut folds = FoldMap::default();
    let mut next_native = 0;

    for (row, native) in rows.iter().enumerate() {
        let candidate = native.singleton().filter(|(column, coefficient)| {
            let var = &model.variables()[*column];
            *coefficient != 0.0 && !var.bounds.is_fixed() && !var.kind.is_semi()
        });
        let Some((column, coefficient)) = candidate else {
            folds.native_rows.push(Some(next_native));
            next_native += 1;
            continue;
        };

        let (implied_lower, implied_upper) = if coefficient > 0.0 {
            (native.lower / coefficient, native.upper / coefficient)
        } else {
            (native.upper / coefficient, native.lower / coefficient)
        };
        let (lower, upper) = bounds[column];
        let new_lower = lower.max(implied_lower);
        let new_upper = upper.min(implied_upper);
        if new_lower > new_upper + FOLD_TOLERANCE {
            folds.native_rows.push(Some(next_native));
            next_native += 1;
            continue;
        }

        if implied_lower > lower {
            folds.lower_source.insert(column, row);
        }
        if implied_upper < upper {
            folds.upper_source.insert(column, row);
        }
        bounds[column] = (new_lower, new_upper);
        folds.folded.insert(
            row,
            FoldedRow {
                column,
                coefficient,
            },
        );
        folds.native_rows.push(None);
        trace!(
            component = "solver",
            operation = "fold_row",
            status = "success",
            row,
            column,
            lower = new_lower,
            upper = new_upper,
            "Folded singleton row into column bounds"
        );
    }
    folds
}

fn warm_start(model: &Model, semi: &[SemiColumn]) -> Vec<f64> {
    let mut cols: Vec<f64> = model
        .variables()
        .iter()
        .map(|var| {
            var.initial
                .unwrap_or_else(|| default_primal_value(var.bounds.lower, var.bounds.upper))
        })
        .collect();
    let indicators: Vec<f64> = semi
        .iter()
        .map(|entry| {
            if cols[entry.column].abs() > FOLD_TOLERANCE {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    cols.extend(indicators);
    cols
}

fn default_primal_value(lower: f64, upper: f64) -> f64 {
    if lower.is_finite() && upper.is_finite() {
        if lower <= 0.0 && 0.0 <= upper {
            0.0
        } else if 0.0 < lower {
            lower
        } else {
            upper
        }
    } else if lower.is_finite() {
        if 0.0 < lower { lower } else { 0.0 }
    } else if upper.is_finite() {
        if 0.0 > upper { upper } else { 0.0 }
    } else {
        0.0
    }
}
