//! Model builder methods for adding variables, constraints, columns and objectives.

use crate::ids::{ConstraintId, VariableId};
use crate::types::{Constraint, Objective, QuadraticTerm, Term, Variable};

use crate::model::Model;
use crate::model::error::ModelError;

impl Model {
    /// Add a variable to the model.
    pub fn add_variable(&mut self, variable: Variable) -> Result<VariableId, ModelError> {
        if !variable.bounds.is_valid() {
            return Err(ModelError::InvalidVariableBounds {
                lower: variable.bounds.lower,
                upper: variable.bounds.upper,
            });
        }

        let id = VariableId::new(self.variables.len() as u32);
        tracing::trace!(
            component = "model",
            operation = "add_variable",
            status = "success",
            var_id = id.inner(),
            kind = variable.kind.as_str(),
            "Added variable"
        );
        self.variables.push(variable);
        Ok(id)
    }

    /// Add a constraint row to the model.
    ///
    /// A row that names a group must either open a new group or directly
    /// follow the last row of that group.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintId, ModelError> {
        if constraint.rhs.is_nan() {
            return Err(ModelError::InvalidRhs {
                rhs: constraint.rhs,
            });
        }
        self.validate_terms(&constraint.terms)?;
        self.validate_quadratic_terms(&constraint.quadratic_terms)?;

        let row = self.constraints.len();
        if let Some(group) = constraint.group.as_deref() {
            match self.groups.get_mut(group) {
                Some(range) if range.end == row => range.end += 1,
                Some(_) => {
                    return Err(ModelError::GroupNotContiguous {
                        group: group.to_string(),
                        row,
                    });
                }
                None => {
                    self.groups.insert(group.to_string(), row..row + 1);
                }
            }
        }

        self.constraints.push(constraint);
        Ok(ConstraintId::new(row as u32))
    }

    /// Replace the objective function.
    pub fn set_objective(&mut self, objective: Objective) -> Result<(), ModelError> {
        self.validate_terms(&objective.terms)?;
        self.validate_quadratic_terms(&objective.quadratic_terms)?;
        if !objective.constant.is_finite() {
            return Err(ModelError::InvalidCoefficient {
                coefficient: objective.constant,
            });
        }

        tracing::debug!(
            component = "model",
            operation = "set_objective",
            status = "success",
            sense = objective.sense.as_str(),
            terms = objective.terms.len(),
            quadratic_terms = objective.quadratic_terms.len(),
            "Set objective function"
        );
        self.objective = objective;
        Ok(())
    }

    /// Add a coefficient to an existing row.
    pub fn set_coefficient(
        &mut self,
        row: ConstraintId,
        column: VariableId,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        if !coefficient.is_finite() {
            return Err(ModelError::InvalidCoefficient { coefficient });
        }
        self.ensure_variable_exists(column)?;
        let constraint = self
            .constraints
            .get_mut(row.index())
            .ok_or(ModelError::InvalidConstraintId(row))?;
        match constraint.terms.iter_mut().find(|term| term.column == column) {
            Some(term) => term.coefficient = coefficient,
            None => constraint.terms.push(Term::new(column, coefficient)),
        }
        Ok(())
    }

    /// Add a priced column: a new variable with an objective cost and
    /// coefficients in existing rows. This is how a restricted master grows
    /// during column generation.
    pub fn add_column(
        &mut self,
        variable: Variable,
        cost: f64,
        cells: &[(ConstraintId, f64)],
    ) -> Result<VariableId, ModelError> {
        if !cost.is_finite() {
            return Err(ModelError::InvalidCoefficient { coefficient: cost });
        }
        for (row, coefficient) in cells {
            if row.index() >= self.constraints.len() {
                return Err(ModelError::InvalidConstraintId(*row));
            }
            if !coefficient.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: *coefficient,
                });
            }
        }

        let column = self.add_variable(variable)?;
        for (row, coefficient) in cells {
            self.constraints[row.index()]
                .terms
                .push(Term::new(column, *coefficient));
        }
        if cost != 0.0 {
            self.objective.terms.push(Term::new(column, cost));
        }
        tracing::debug!(
            component = "model",
            operation = "add_column",
            status = "success",
            var_id = column.inner(),
            cost,
            nnz = cells.len(),
            "Added priced column"
        );
        Ok(column)
    }

    pub(crate) fn ensure_variable_exists(&self, id: VariableId) -> Result<(), ModelError> {
        if id.index() < self.variables.len() {
            Ok(())
        } else {
            Err(ModelError::InvalidVariableId(id))
        }
    }

    fn validate_terms(&self, terms: &[Term]) -> Result<(), ModelError> {
        for term in terms {
            self.ensure_variable_exists(term.column)?;
            if !term.coefficient.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: term.coefficient,
                });
            }
        }
        Ok(())
    }

    fn validate_quadratic_terms(&self, terms: &[QuadraticTerm]) -> Result<(), ModelError> {
        for term in terms {
            self.ensure_variable_exists(term.first)?;
            self.ensure_variable_exists(term.second)?;
            if !term.coefficient.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: term.coefficient,
                });
            }
        }
        Ok(())
    }
}
