//! Benders cuts over master columns.

use std::collections::BTreeMap;
use std::fmt;

use cutplane_model::{Constraint, QuadraticTerm, Sign, Term, VariableId};

const ZERO_TOLERANCE: f64 = 1e-12;

/// Why a cut was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutKind {
    /// Bounds the objective-link column from a feasible subproblem.
    Optimality,
    /// Excludes an assignment for which the subproblem is infeasible.
    Feasibility,
}

impl CutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CutKind::Optimality => "optimality",
            CutKind::Feasibility => "feasibility",
        }
    }
}

impl fmt::Display for CutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `terms (sign) rhs` over master columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCut {
    pub kind: CutKind,
    pub terms: Vec<Term>,
    pub sign: Sign,
    pub rhs: f64,
}

/// A cut with bilinear cells, from subproblems with quadratic rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticCut {
    pub kind: CutKind,
    pub terms: Vec<Term>,
    pub quadratic_terms: Vec<QuadraticTerm>,
    pub sign: Sign,
    pub rhs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cut {
    Linear(LinearCut),
    Quadratic(QuadraticCut),
}

impl Cut {
    /// Build a cut, merging repeated cells and dropping zero coefficients.
    /// The result is linear when no bilinear cell survives.
    pub fn new(
        kind: CutKind,
        terms: Vec<Term>,
        quadratic_terms: Vec<QuadraticTerm>,
        sign: Sign,
        rhs: f64,
    ) -> Self {
        let terms = merge_terms(terms);
        let quadratic_terms = merge_quadratic_terms(quadratic_terms);
        if quadratic_terms.is_empty() {
            Cut::Linear(LinearCut {
                kind,
                terms,
                sign,
                rhs,
            })
        } else {
            Cut::Quadratic(QuadraticCut {
                kind,
                terms,
                quadratic_terms,
                sign,
                rhs,
            })
        }
    }

    pub fn kind(&self) -> CutKind {
        match self {
            Cut::Linear(cut) => cut.kind,
            Cut::Quadratic(cut) => cut.kind,
        }
    }

    pub fn sign(&self) -> Sign {
        match self {
            Cut::Linear(cut) => cut.sign,
            Cut::Quadratic(cut) => cut.sign,
        }
    }

    pub fn rhs(&self) -> f64 {
        match self {
            Cut::Linear(cut) => cut.rhs,
            Cut::Quadratic(cut) => cut.rhs,
        }
    }

    pub fn terms(&self) -> &[Term] {
        match self {
            Cut::Linear(cut) => &cut.terms,
            Cut::Quadratic(cut) => &cut.terms,
        }
    }

    pub fn quadratic_terms(&self) -> &[QuadraticTerm] {
        match self {
            Cut::Linear(_) => &[],
            Cut::Quadratic(cut) => &cut.quadratic_terms,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Cut::Linear(_))
    }

    /// Left-hand side at a master point.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let value = |column: VariableId| values.get(column.index()).copied().unwrap_or(0.0);
        let linear: f64 = self
            .terms()
            .iter()
            .map(|term| term.coefficient * value(term.column))
            .sum();
        let quadratic: f64 = self
            .quadratic_terms()
            .iter()
            .map(|term| term.coefficient * value(term.first) * value(term.second))
            .sum();
        linear + quadratic
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.sign()
            .is_satisfied(self.evaluate(values), self.rhs(), tolerance)
    }

    /// How far a master point is on the wrong side, zero when satisfied.
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.evaluate(values);
        let rhs = self.rhs();
        match self.sign() {
            Sign::LessEqual => (lhs - rhs).max(0.0),
            Sign::GreaterEqual => (rhs - lhs).max(0.0),
            Sign::Equal => (lhs - rhs).abs(),
        }
    }

    /// Master row for this cut.
    pub fn to_constraint(&self, name: impl Into<String>, group: Option<&str>) -> Constraint {
        let mut row = Constraint::new(name, self.terms().to_vec(), self.sign(), self.rhs())
            .with_quadratic_terms(self.quadratic_terms().to_vec());
        if let Some(group) = group {
            row = row.in_group(group);
        }
        row
    }
}

impl From<LinearCut> for Cut {
    fn from(cut: LinearCut) -> Self {
        Cut::Linear(cut)
    }
}

impl From<QuadraticCut> for Cut {
    fn from(cut: QuadraticCut) -> Self {
        Cut::Quadratic(cut)
    }
}

/// Split cuts by shape so linear masters can take the linear ones directly.
pub fn partition_cuts(cuts: impl IntoIterator<Item = Cut>) -> (Vec<LinearCut>, Vec<QuadraticCut>) {
    let mut linear = Vec::new();
    let mut quadratic = Vec::new();
    for cut in cuts {
        match cut {
            Cut::Linear(cut) => linear.push(cut),
            Cut::Quadratic(cut) => quadratic.push(cut),
        }
    }
    (linear, quadratic)
}

fn merge_terms(terms: Vec<Term>) -> Vec<Term> {
    let mut merged: BTreeMap<VariableId, f64> = BTreeMap::new();
    for term in terms {
        *merged.entry(term.column).or_insert(0.0) += term.coefficient;
    }
    merged
        .into_iter()
        .filter(|(_, coefficient)| coefficient.abs() > ZERO_TOLERANCE)
        .map(|(column, coefficient)| Term::new(column, coefficient))
        .collect()
}

fn merge_quadratic_terms(terms: Vec<QuadraticTerm>) -> Vec<QuadraticTerm> {
    let mut merged: BTreeMap<(VariableId, VariableId), f64> = BTreeMap::new();
    for term in terms {
        let pair = if term.first <= term.second {
            (term.first, term.second)
        } else {
            (term.second, term.first)
        };
        *merged.entry(pair).or_insert(0.0) += term.coefficient;
    }
    merged
        .into_iter()
        .filter(|(_, coefficient)| coefficient.abs() > ZERO_TOLERANCE)
        .map(|((first, second), coefficient)| QuadraticTerm::new(first, second, coefficient))
        .collect()
}
