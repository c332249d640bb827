use serde::{Deserialize, Serialize};

use crate::ids::VariableId;

/// Optimization sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Minimize,
    Maximize,
}

impl Sense {
    pub fn as_str(self) -> &'static str {
        match self {
            Sense::Minimize => "minimize",
            Sense::Maximize => "maximize",
        }
    }

    /// Whether `candidate` is strictly better than `incumbent` under this sense.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Sense::Minimize => candidate < incumbent,
            Sense::Maximize => candidate > incumbent,
        }
    }
}

/// Bounds for a variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// `[0, +inf)`
    pub fn non_negative() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    /// `(-inf, +inf)`
    pub fn free() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Degenerate bounds pinning a column to one value.
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    pub fn is_valid(&self) -> bool {
        !self.lower.is_nan() && !self.upper.is_nan() && self.lower <= self.upper
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Binary,
    Integer,
    Continuous,
    /// Either zero or within the bounds.
    SemiContinuous,
    /// Either zero or an integer within the bounds.
    SemiInteger,
}

impl VariableKind {
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            VariableKind::Binary | VariableKind::Integer | VariableKind::SemiInteger
        )
    }

    pub fn is_semi(self) -> bool {
        matches!(self, VariableKind::SemiContinuous | VariableKind::SemiInteger)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariableKind::Binary => "binary",
            VariableKind::Integer => "integer",
            VariableKind::Continuous => "continuous",
            VariableKind::SemiContinuous => "semi_continuous",
            VariableKind::SemiInteger => "semi_integer",
        }
    }
}

/// A decision variable: one column of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub bounds: Bounds,
    /// Warm-start value handed to backends that accept one.
    pub initial: Option<f64>,
}

impl Variable {
    /// Create a binary variable with bounds [0, 1].
    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Binary,
            bounds: Bounds::new(0.0, 1.0),
            initial: None,
        }
    }

    /// Create a continuous variable with specified bounds.
    pub fn continuous(name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Continuous,
            bounds,
            initial: None,
        }
    }

    /// Create an integer variable with specified bounds.
    pub fn integer(name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Integer,
            bounds,
            initial: None,
        }
    }

    /// Create a semi-continuous variable: zero or within `bounds`.
    pub fn semi_continuous(name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::SemiContinuous,
            bounds,
            initial: None,
        }
    }

    pub fn with_initial(mut self, value: f64) -> Self {
        self.initial = Some(value);
        self
    }
}

/// Comparison sign of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterEqual,
}

impl Sign {
    pub fn as_str(self) -> &'static str {
        match self {
            Sign::LessEqual => "<=",
            Sign::Equal => "=",
            Sign::GreaterEqual => ">=",
        }
    }

    /// Row bounds `(lower, upper)` of `lhs <sign> rhs`.
    pub fn row_bounds(self, rhs: f64) -> (f64, f64) {
        match self {
            Sign::LessEqual => (f64::NEG_INFINITY, rhs),
            Sign::Equal => (rhs, rhs),
            Sign::GreaterEqual => (rhs, f64::INFINITY),
        }
    }

    /// Sign obtained after multiplying both sides by a negative number.
    pub fn reversed(self) -> Self {
        match self {
            Sign::LessEqual => Sign::GreaterEqual,
            Sign::Equal => Sign::Equal,
            Sign::GreaterEqual => Sign::LessEqual,
        }
    }

    pub fn is_satisfied(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Sign::LessEqual => lhs <= rhs + tolerance,
            Sign::Equal => (lhs - rhs).abs() <= tolerance,
            Sign::GreaterEqual => lhs >= rhs - tolerance,
        }
    }
}

/// Linear cell: coefficient of one column in a row or the objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub column: VariableId,
    pub coefficient: f64,
}

impl Term {
    pub fn new(column: VariableId, coefficient: f64) -> Self {
        Self {
            column,
            coefficient,
        }
    }
}

/// Bilinear cell: `coefficient * first * second`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadraticTerm {
    pub first: VariableId,
    pub second: VariableId,
    pub coefficient: f64,
}

impl QuadraticTerm {
    pub fn new(first: VariableId, second: VariableId, coefficient: f64) -> Self {
        Self {
            first,
            second,
            coefficient,
        }
    }
}

/// A constraint row. Its cells are owned by the row, so the cells of one
/// row are always contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<Term>,
    pub quadratic_terms: Vec<QuadraticTerm>,
    pub sign: Sign,
    pub rhs: f64,
    /// Name of the pipeline or module that produced this row.
    pub group: Option<String>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, terms: Vec<Term>, sign: Sign, rhs: f64) -> Self {
        Self {
            name: name.into(),
            terms,
            quadratic_terms: Vec::new(),
            sign,
            rhs,
            group: None,
        }
    }

    pub fn with_quadratic_terms(mut self, quadratic_terms: Vec<QuadraticTerm>) -> Self {
        self.quadratic_terms = quadratic_terms;
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn is_linear(&self) -> bool {
        self.quadratic_terms.is_empty()
    }

    /// Left-hand side evaluated at a primal point.
    pub fn activity(&self, values: &[f64]) -> f64 {
        let linear: f64 = self
            .terms
            .iter()
            .map(|term| term.coefficient * value_at(values, term.column))
            .sum();
        let quadratic: f64 = self
            .quadratic_terms
            .iter()
            .map(|term| {
                term.coefficient * value_at(values, term.first) * value_at(values, term.second)
            })
            .sum();
        linear + quadratic
    }
}

/// Objective function with a sense, linear and bilinear cells and a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub sense: Sense,
    pub terms: Vec<Term>,
    pub quadratic_terms: Vec<QuadraticTerm>,
    pub constant: f64,
}

impl Objective {
    pub fn new(sense: Sense, terms: Vec<Term>) -> Self {
        Self {
            sense,
            terms,
            quadratic_terms: Vec::new(),
            constant: 0.0,
        }
    }

    pub fn minimize(terms: Vec<Term>) -> Self {
        Self::new(Sense::Minimize, terms)
    }

    pub fn maximize(terms: Vec<Term>) -> Self {
        Self::new(Sense::Maximize, terms)
    }

    pub fn with_quadratic_terms(mut self, quadratic_terms: Vec<QuadraticTerm>) -> Self {
        self.quadratic_terms = quadratic_terms;
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    pub fn is_linear(&self) -> bool {
        self.quadratic_terms.is_empty()
    }

    /// Objective value at a primal point.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let linear: f64 = self
            .terms
            .iter()
            .map(|term| term.coefficient * value_at(values, term.column))
            .sum();
        let quadratic: f64 = self
            .quadratic_terms
            .iter()
            .map(|term| {
                term.coefficient * value_at(values, term.first) * value_at(values, term.second)
            })
            .sum();
        self.constant + linear + quadratic
    }
}

impl Default for Objective {
    fn default() -> Self {
        Self::minimize(Vec::new())
    }
}

fn value_at(values: &[f64], column: VariableId) -> f64 {
    values.get(column.index()).copied().unwrap_or(0.0)
}
