//! Solver backend contract for the cutplane decomposition solvers.
//!
//! Backends translate a [`cutplane_model::Model`] into a native problem,
//! run caller [`Hooks`] around the native solve, report progress ticks to a
//! [`StatusCallback`] and map the outcome onto [`SolverOutput`] or
//! [`SolveError`]. [`SerialBackend`] and [`ParallelBackend`] combine several
//! backends into one.

pub mod backend;
pub mod combinator;
pub mod config;
pub mod error;
pub mod hooks;
pub mod output;
pub mod progress;
pub mod status;

pub use backend::{Backend, SolverHandle};
pub use combinator::{DEFAULT_STOP_CODES, ParallelBackend, ParallelMode, SerialBackend};
pub use config::{ParameterValue, SolverConfig};
pub use error::SolveError;
pub use hooks::{Hook, HookContext, HookFn, HookPoint, Hooks};
pub use output::{DualSolution, SolverOutput, dedup_pool};
pub use progress::{SolveMonitor, SolvingStatus, StatusCallback, StopReason, relative_gap};
pub use status::SolverStatus;
