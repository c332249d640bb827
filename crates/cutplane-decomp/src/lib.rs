//! Decomposition solvers over the cutplane backend contract.
//!
//! * [`shadow_price`] and [`pipeline`]: keyed row prices and the pipelines
//!   that contribute rows to a shared model.
//! * [`benders`] and [`driver`]: master/subproblem steps with optimality and
//!   feasibility cuts, and a loop that iterates them.
//! * [`column_generation`]: restricted master LP, MILP and solution pool
//!   solves.

pub mod benders;
pub mod column_generation;
pub mod cut;
pub mod driver;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod shadow_price;
pub mod termination;

pub use benders::{BendersSolver, FixedVariable, SubOutcome, SubProblem};
pub use column_generation::{ColumnGenerationSolver, LpOutcome};
pub use cut::{Cut, CutKind, LinearCut, QuadraticCut, partition_cuts};
pub use driver::{BendersDriver, BendersReport, BoundPoint, CUT_GROUP, LinkedSub};
pub use error::{DecompError, Stage};
pub use export::{DiagnosticsExporter, ExportConfig, ExportError, ExportJobs};
pub use pipeline::{Pipeline, PipelineSet};
pub use shadow_price::{
    KeyedRows, ShadowPrice, ShadowPriceKey, ShadowPriceMap, refresh_by_position,
};
pub use termination::{StopReason, TerminationPolicy, TerminationTracker};
