//! Derived copies of a model: LP relaxation, fixed subproblems and elastic
//! feasibility relaxations.

use std::collections::BTreeMap;

use crate::ids::{ConstraintId, VariableId};
use crate::types::{Bounds, Objective, QuadraticTerm, Sense, Sign, Term, Variable, VariableKind};

use super::Model;
use super::error::ModelError;

/// A bilinear cell over two fixed columns that was folded into a constant.
///
/// `row` is `None` when the cell came from the objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubstitutedCell {
    pub row: Option<ConstraintId>,
    pub term: QuadraticTerm,
}

/// A model with some columns pinned to given values.
#[derive(Debug, Clone)]
pub struct FixedModel {
    model: Model,
    values: BTreeMap<VariableId, f64>,
    substituted: Vec<SubstitutedCell>,
}

impl FixedModel {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Value a column was fixed to.
    pub fn value_of(&self, column: VariableId) -> Option<f64> {
        self.values.get(&column).copied()
    }

    pub fn is_fixed(&self, column: VariableId) -> bool {
        self.values.contains_key(&column)
    }

    /// Fixed columns and their values, in column order.
    pub fn fixed_values(&self) -> impl Iterator<Item = (VariableId, f64)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }

    /// Bilinear cells folded into row right-hand sides or the objective constant.
    pub fn substituted(&self) -> &[SubstitutedCell] {
        &self.substituted
    }
}

impl Model {
    /// LP relaxation: integrality is dropped and semi-continuous domains are
    /// widened to the hull `[min(0, l), max(0, u)]`.
    pub fn relax(&self) -> Model {
        let mut relaxed = self.clone();
        for var in &mut relaxed.variables {
            if var.kind.is_semi() {
                var.bounds = Bounds::new(var.bounds.lower.min(0.0), var.bounds.upper.max(0.0));
            }
            var.kind = VariableKind::Continuous;
        }
        tracing::debug!(
            component = "model",
            operation = "relax",
            status = "success",
            variables = relaxed.variables.len(),
            "Built LP relaxation"
        );
        relaxed
    }

    /// Pin columns to values.
    ///
    /// Fixed columns stay in place with `lower = upper = value` so the row
    /// layout and dual vector are unchanged. Bilinear cells over two fixed
    /// columns are folded into constants; a bilinear cell coupling a fixed
    /// column with a free one is rejected.
    pub fn fix(&self, fixed: &[(VariableId, f64)]) -> Result<FixedModel, ModelError> {
        let mut values = BTreeMap::new();
        for (column, value) in fixed {
            self.ensure_variable_exists(*column)?;
            if !value.is_finite() {
                return Err(ModelError::InvalidFixedValue {
                    variable: *column,
                    value: *value,
                });
            }
            values.insert(*column, *value);
        }

        let mut model = self.clone();
        for (column, value) in &values {
            model.variables[column.index()].bounds = Bounds::fixed(*value);
        }

        let mut substituted = Vec::new();
        for (idx, row) in model.constraints.iter_mut().enumerate() {
            let row_id = ConstraintId::new(idx as u32);
            let (kept, constant) =
                split_fixed_products(&row.quadratic_terms, &values, Some(row_id), &mut substituted)?;
            row.quadratic_terms = kept;
            row.rhs -= constant;
        }
        let (kept, constant) = split_fixed_products(
            &model.objective.quadratic_terms,
            &values,
            None,
            &mut substituted,
        )?;
        model.objective.quadratic_terms = kept;
        model.objective.constant += constant;

        tracing::debug!(
            component = "model",
            operation = "fix",
            status = "success",
            fixed = values.len(),
            substituted = substituted.len(),
            "Fixed model columns"
        );

        Ok(FixedModel {
            model,
            values,
            substituted,
        })
    }

    /// Elastic phase-one copy: every row gets slack columns appended after
    /// the original columns and the objective minimizes total slack.
    ///
    /// Row order is preserved, so the duals of this model are aligned with
    /// the rows of `self`.
    pub fn feasibility_relaxation(&self) -> Model {
        let mut elastic = Model {
            name: format!("{}_elastic", self.name),
            variables: self.variables.clone(),
            constraints: self.constraints.clone(),
            objective: Objective::new(Sense::Minimize, Vec::new()),
            groups: self.groups.clone(),
        };

        let mut slack_terms = Vec::new();
        for idx in 0..elastic.constraints.len() {
            let directions: &[(f64, &str)] = match elastic.constraints[idx].sign {
                Sign::LessEqual => &[(-1.0, "neg")],
                Sign::GreaterEqual => &[(1.0, "pos")],
                Sign::Equal => &[(1.0, "pos"), (-1.0, "neg")],
            };
            for (direction, suffix) in directions {
                let column = VariableId::new(elastic.variables.len() as u32);
                let name = format!("{}_elastic_{suffix}", elastic.constraints[idx].name);
                elastic
                    .variables
                    .push(Variable::continuous(name, Bounds::non_negative()));
                elastic.constraints[idx]
                    .terms
                    .push(Term::new(column, *direction));
                slack_terms.push(Term::new(column, 1.0));
            }
        }
        elastic.objective.terms = slack_terms;

        tracing::debug!(
            component = "model",
            operation = "feasibility_relaxation",
            status = "success",
            slacks = elastic.variables.len() - self.variables.len(),
            "Built elastic feasibility relaxation"
        );
        elastic
    }
}

fn split_fixed_products(
    terms: &[QuadraticTerm],
    values: &BTreeMap<VariableId, f64>,
    row: Option<ConstraintId>,
    substituted: &mut Vec<SubstitutedCell>,
) -> Result<(Vec<QuadraticTerm>, f64), ModelError> {
    let mut kept = Vec::with_capacity(terms.len());
    let mut constant = 0.0;
    for term in terms {
        match (values.get(&term.first), values.get(&term.second)) {
            (Some(first), Some(second)) => {
                constant += term.coefficient * first * second;
                substituted.push(SubstitutedCell { row, term: *term });
            }
            (Some(_), None) => {
                return Err(ModelError::UnsupportedQuadraticCoupling {
                    fixed: term.first,
                    free: term.second,
                });
            }
            (None, Some(_)) => {
                return Err(ModelError::UnsupportedQuadraticCoupling {
                    fixed: term.second,
                    free: term.first,
                });
            }
            (None, None) => kept.push(*term),
        }
    }
    Ok((kept, constant))
}
