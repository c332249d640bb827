//! Solve-lifecycle hooks.
//!
//! A hook is a closure over the backend's live native handle, tagged with
//! the lifecycle point at which it runs. Several hooks may be registered for
//! one point; they run in insertion order and the first failure aborts the
//! solve with [`SolveError::HookFailed`].

use cutplane_model::{Constraint, Model, Variable};

use crate::error::SolveError;
use crate::status::SolverStatus;

/// Lifecycle point at which a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Native model is built, parameters not yet applied.
    AfterModeling,
    /// Parameters from the configuration have been applied.
    Configuration,
    /// Immediately before the native solve.
    BeforeSolving,
    /// After a solve that produced a solution.
    AnalyzingSolution,
    /// After a solve that ended infeasible, unbounded or failed.
    AfterFailure,
}

impl HookPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            HookPoint::AfterModeling => "after_modeling",
            HookPoint::Configuration => "configuration",
            HookPoint::BeforeSolving => "before_solving",
            HookPoint::AnalyzingSolution => "analyzing_solution",
            HookPoint::AfterFailure => "after_failure",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only view handed to every hook.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'m> {
    model: &'m Model,
    status: Option<SolverStatus>,
}

impl<'m> HookContext<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            status: None,
        }
    }

    /// Same context carrying the status of a finished solve.
    pub fn with_status(self, status: SolverStatus) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn variables(&self) -> &'m [Variable] {
        self.model.variables()
    }

    pub fn constraints(&self) -> &'m [Constraint] {
        self.model.constraints()
    }

    /// Solve status, present for post-solve hook points.
    pub fn status(&self) -> Option<SolverStatus> {
        self.status
    }
}

/// Boxed hook body over a native handle `H`.
pub type HookFn<'a, H> =
    Box<dyn FnMut(&mut H, &HookContext<'_>) -> Result<(), SolveError> + 'a>;

/// A hook tagged with the point at which it runs.
pub enum Hook<'a, H> {
    AfterModeling(HookFn<'a, H>),
    Configuration(HookFn<'a, H>),
    BeforeSolving(HookFn<'a, H>),
    AnalyzingSolution(HookFn<'a, H>),
    AfterFailure(HookFn<'a, H>),
}

impl<'a, H> Hook<'a, H> {
    /// Tag a closure with a hook point.
    pub fn at<F>(point: HookPoint, body: F) -> Self
    where
        F: FnMut(&mut H, &HookContext<'_>) -> Result<(), SolveError> + 'a,
    {
        let body: HookFn<'a, H> = Box::new(body);
        match point {
            HookPoint::AfterModeling => Hook::AfterModeling(body),
            HookPoint::Configuration => Hook::Configuration(body),
            HookPoint::BeforeSolving => Hook::BeforeSolving(body),
            HookPoint::AnalyzingSolution => Hook::AnalyzingSolution(body),
            HookPoint::AfterFailure => Hook::AfterFailure(body),
        }
    }

    pub fn point(&self) -> HookPoint {
        match self {
            Hook::AfterModeling(_) => HookPoint::AfterModeling,
            Hook::Configuration(_) => HookPoint::Configuration,
            Hook::BeforeSolving(_) => HookPoint::BeforeSolving,
            Hook::AnalyzingSolution(_) => HookPoint::AnalyzingSolution,
            Hook::AfterFailure(_) => HookPoint::AfterFailure,
        }
    }

    fn body_mut(&mut self) -> &mut HookFn<'a, H> {
        match self {
            Hook::AfterModeling(body)
            | Hook::Configuration(body)
            | Hook::BeforeSolving(body)
            | Hook::AnalyzingSolution(body)
            | Hook::AfterFailure(body) => body,
        }
    }
}

impl<H> std::fmt::Debug for Hook<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Hook").field(&self.point()).finish()
    }
}

/// Ordered collection of hooks for one solve.
pub struct Hooks<'a, H> {
    entries: Vec<Hook<'a, H>>,
}

impl<H> Default for Hooks<'_, H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> std::fmt::Debug for Hooks<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

impl<'a, H> Hooks<'a, H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Hook<'a, H>) -> &mut Self {
        self.entries.push(hook);
        self
    }

    /// Builder-style [`Hooks::push`].
    pub fn with(mut self, hook: Hook<'a, H>) -> Self {
        self.entries.push(hook);
        self
    }

    /// Register a closure at a hook point.
    pub fn on<F>(&mut self, point: HookPoint, body: F) -> &mut Self
    where
        F: FnMut(&mut H, &HookContext<'_>) -> Result<(), SolveError> + 'a,
    {
        self.push(Hook::at(point, body))
    }

    /// Append every hook of `other` after the hooks already registered.
    pub fn extend(&mut self, other: Hooks<'a, H>) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of hooks registered at `point`.
    pub fn count(&self, point: HookPoint) -> usize {
        self.entries
            .iter()
            .filter(|hook| hook.point() == point)
            .count()
    }

    /// Run every hook registered at `point`, in insertion order.
    pub fn run(
        &mut self,
        point: HookPoint,
        handle: &mut H,
        context: &HookContext<'_>,
    ) -> Result<(), SolveError> {
        for hook in self.entries.iter_mut().filter(|hook| hook.point() == point) {
            if let Err(err) = (hook.body_mut())(&mut *handle, context) {
                tracing::warn!(
                    component = "solver",
                    operation = "run_hook",
                    status = "error",
                    point = point.as_str(),
                    error_code = err.code(),
                    "Hook failed"
                );
                return Err(match err {
                    already @ SolveError::HookFailed { .. } => already,
                    other => SolveError::HookFailed {
                        point,
                        message: other.to_string(),
                    },
                });
            }
        }
        Ok(())
    }
}
