//! Batched translation of constraint rows into native HiGHS rows.
//!
//! Rows are partitioned into contiguous batches, each batch is translated
//! independently (on the rayon pool when the `parallel` feature is enabled)
//! and the batch results are concatenated in batch order:
//!
//! ```text
//! Rows [r0 r1 r2 r3 r4 r5 r6 r7]
//!    ├─ Batch 0: [r0 r1] ──┐
//!    ├─ Batch 1: [r2 r3] ──┤
//!    ├─ Batch 2: [r4 r5] ──┼─> translate (parallel or sequential)
//!    └─ Batch 3: [r6 r7] ──┘
//!         │
//!         ▼
//! Native rows [n0 n1 n2 n3 n4 n5 n6 n7]   (original order)
//! ```
//!
//! Because batches are contiguous and concatenated in order, rows of one
//! constraint group stay adjacent in the native problem.

use std::time::Instant;

use cutplane_model::{Constraint, Sign};
use tracing::{debug, trace};

/// One translated row: `lower <= sum(coef * x[col]) <= upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeRow {
    pub lower: f64,
    pub upper: f64,
    /// Column-sorted entries with duplicate columns merged.
    pub entries: Vec<(usize, f64)>,
}

impl NativeRow {
    /// Translate one linear constraint.
    pub fn from_constraint(constraint: &Constraint) -> Self {
        let (lower, upper) = match constraint.sign {
            Sign::LessEqual => (f64::NEG_INFINITY, constraint.rhs),
            Sign::Equal => (constraint.rhs, constraint.rhs),
            Sign::GreaterEqual => (constraint.rhs, f64::INFINITY),
        };

        let mut entries: Vec<(usize, f64)> = constraint
            .terms
            .iter()
            .map(|term| (term.column.index(), term.coefficient))
            .collect();
        entries.sort_by_key(|(col, _)| *col);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (col, coef) in entries {
            match merged.last_mut() {
                Some(last) if last.0 == col => last.1 += coef,
                _ => merged.push((col, coef)),
            }
        }
        merged.retain(|(_, coef)| *coef != 0.0);

        NativeRow {
            lower,
            upper,
            entries: merged,
        }
    }

    /// The single column of a one-entry row.
    pub fn singleton(&self) -> Option<(usize, f64)> {
        match self.entries.as_slice() {
            [entry] => Some(*entry),
            _ => None,
        }
    }
}

/// Result of a row translation.
#[derive(Clone, Debug)]
pub struct RowBatchResult {
    pub rows: Vec<NativeRow>,
    pub batches: usize,
    pub duration_ms: f64,
}

/// Translates constraint rows in contiguous batches.
#[derive(Debug, Clone)]
pub struct RowBatchBuilder {
    batch_count: usize,
    use_parallel: bool,
}

impl RowBatchBuilder {
    /// One batch per available core.
    pub fn new() -> Self {
        Self {
            batch_count: num_cpus::get(),
            use_parallel: true,
        }
    }

    pub fn with_batch_count(mut self, count: usize) -> Self {
        self.batch_count = count.max(1);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.use_parallel = parallel;
        self
    }

    /// Whether `num_rows` is large enough to hand to the worker pool.
    pub fn exceeds_threshold(num_rows: usize, factor: usize) -> bool {
        num_rows > num_cpus::get().saturating_mul(factor.max(1))
    }

    /// Translate every constraint, preserving row order.
    pub fn build(&self, constraints: &[Constraint]) -> RowBatchResult {
        let started = Instant::now();
        let batches = self.partition(constraints);

        debug!(
            component = "row_batch",
            operation = "build_rows",
            status = "start",
            num_rows = constraints.len(),
            batches = batches.len(),
            use_parallel = self.use_parallel,
            "Starting batched row build"
        );

        let batch_rows = if self.use_parallel && cfg!(feature = "parallel") {
            #[cfg(feature = "parallel")]
            {
                translate_parallel(&batches)
            }
            #[cfg(not(feature = "parallel"))]
            {
                translate_sequential(&batches)
            }
        } else {
            translate_sequential(&batches)
        };

        let rows: Vec<NativeRow> = batch_rows.into_iter().flatten().collect();
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        debug!(
            component = "row_batch",
            operation = "build_rows",
            status = "complete",
            num_rows = rows.len(),
            duration_ms,
            "Completed batched row build"
        );

        RowBatchResult {
            rows,
            batches: batches.len(),
            duration_ms,
        }
    }

    fn partition<'c>(&self, constraints: &'c [Constraint]) -> Vec<&'c [Constraint]> {
        if constraints.is_empty() {
            return Vec::new();
        }
        let batch_size = constraints.len().div_ceil(self.batch_count);
        constraints.chunks(batch_size.max(1)).collect()
    }
}

impl Default for RowBatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn translate_batch(idx: usize, batch: &[Constraint]) -> Vec<NativeRow> {
    trace!(
        component = "row_batch",
        operation = "translate_batch",
        batch_id = idx,
        batch_size = batch.len(),
        "Translating row batch"
    );
    batch.iter().map(NativeRow::from_constraint).collect()
}

fn translate_sequential(batches: &[&[Constraint]]) -> Vec<Vec<NativeRow>> {
    batches
        .iter()
        .enumerate()
        .map(|(idx, batch)| translate_batch(idx, batch))
        .collect()
}

#[cfg(feature = "parallel")]
fn translate_parallel(batches: &[&[Constraint]]) -> Vec<Vec<NativeRow>> {
    use rayon::prelude::*;

    batches
        .par_iter()
        .enumerate()
        .map(|(idx, batch)| translate_batch(idx, batch))
        .collect()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use cutplane_model::{Term, VariableId};

    use super::*;

    fn row(name: &str, column: u32, rhs: f64) -> Constraint {
        Constraint::new(
            name,
            vec![Term::new(VariableId::new(column), 1.0)],
            Sign::LessEqual,
            rhs,
        )
    }

    #[test]
    fn test_builder_with_config() {
        let builder = RowBatchBuilder::new().with_batch_count(0).with_parallel(false);
        assert_eq!(builder.batch_count, 1);
        assert!(!builder.use_parallel);
    }

    #[test]
    fn test_from_constraint_merges_duplicate_columns() {
        let constraint = Constraint::new(
            "dup",
            vec![
                Term::new(VariableId::new(2), 1.0),
                Term::new(VariableId::new(0), 3.0),
                Term::new(VariableId::new(2), 1.5),
                Term::new(VariableId::new(1), 0.0),
            ],
            Sign::GreaterEqual,
            4.0,
        );
        let native = NativeRow::from_constraint(&constraint);
        assert_eq!(native.entries, vec![(0, 3.0), (2, 2.5)]);
        assert_eq!(native.lower, 4.0);
        assert!(native.upper.is_infinite());
        assert_eq!(native.singleton(), None);
    }

    #[test]
    fn test_batches_preserve_row_order() {
        let constraints: Vec<Constraint> = (0..23)
            .map(|idx| row(&format!("cap_{idx}"), idx % 3, f64::from(idx)))
            .collect();

        for parallel in [false, true] {
            let result = RowBatchBuilder::new()
                .with_batch_count(4)
                .with_parallel(parallel)
                .build(&constraints);
            assert_eq!(result.batches, 4);
            let uppers: Vec<f64> = result.rows.iter().map(|native| native.upper).collect();
            let expected: Vec<f64> = (0..23).map(f64::from).collect();
            assert_eq!(uppers, expected);
        }
    }

    #[test]
    fn test_empty_build() {
        let result = RowBatchBuilder::new().with_batch_count(2).build(&[]);
        assert!(result.rows.is_empty());
        assert_eq!(result.batches, 0);
    }

    #[test]
    fn test_threshold() {
        assert!(!RowBatchBuilder::exceeds_threshold(0, 8));
        assert!(RowBatchBuilder::exceeds_threshold(usize::MAX / 2, 1));
    }
}
