//! HiGHS backend for the cutplane solver contract.
//!
//! [`HighsBackend`] translates a [`cutplane_model::Model`] into a staged
//! native problem, runs lifecycle hooks against a [`HighsHandle`] and maps
//! the native outcome onto [`cutplane_solver::SolverOutput`]. Progress and
//! interruption go through a native HiGHS callback.

pub mod ffi;
pub mod handle;
pub mod row_batch;
pub mod solver;
mod status;
mod translate;

pub use ffi::{
    HighsModel, HighsModelError, HighsOption, HighsStatus, NativeProgress, ProgressFn,
    ProgressSource, highs_version,
};
pub use handle::HighsHandle;
pub use row_batch::{NativeRow, RowBatchBuilder, RowBatchResult};
pub use solver::{DEFAULT_PROGRESS_INTERVAL, HighsBackend};
pub use translate::DEFAULT_PARALLEL_BUILD_FACTOR;
