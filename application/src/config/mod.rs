//! Application-level configuration.
//!
//! - [`ExecutionParams`]: agent loop control (iterations, parallel dispatch)

pub mod execution_params;

pub use execution_params::ExecutionParams;
