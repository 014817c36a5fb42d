//! Custom error types for the sweep engine.
//!
//! This module defines the primary error type, `SweepError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failure classes the engine distinguishes:
//!
//! - **Configuration errors** (`Configuration`, `NotConfigured`,
//!   `MalformedSweep`, `Graph`, `InvalidState`, `Scheduler`): detected
//!   eagerly, always fatal to the run.
//! - **Value-kind errors** (`ValueKind`): a typed parameter was handed a
//!   value that cannot convert to its declared kind. Fails immediately at
//!   assignment, naming expected vs. given kind.
//! - **Node faults** (`Node`, `Push`, `Refine`): a graph node task, a bound
//!   hardware write, or a refinement callable failed during a run. These
//!   cancel the sibling tasks and surface to the caller.
//! - **Data-integrity defects** (`ShapeMismatch`): a stream's produced point
//!   count disagrees with its descriptor at run completion.
//!
//! Transient measurement failures are deliberately *not* represented here:
//! a failing `Quantity` read is absorbed at its call site and recorded as a
//! missing value, so no error type ever escapes it.

use thiserror::Error;

use crate::experiment::RunState;
use crate::value::ValueKind;

/// Convenience alias for results using the crate error type.
pub type SweepResult<T> = std::result::Result<T, SweepError>;

/// Crate-wide error enum covering every fatal failure class.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Semantic configuration error caught before or between runs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A push or measure was attempted before a method was bound.
    #[error("No {role} method bound for '{name}'")]
    NotConfigured {
        /// Parameter or quantity name.
        name: String,
        /// `"write"` for parameters, `"read"` for quantities.
        role: &'static str,
    },

    /// A sweep registration that can never iterate correctly.
    #[error("Malformed sweep: {0}")]
    MalformedSweep(String),

    /// Graph construction or descriptor propagation failed.
    #[error("Graph error: {0}")]
    Graph(String),

    /// A stream finished a run with the wrong number of points.
    #[error("Stream '{stream}' produced {produced} points but its descriptor declares {declared}")]
    ShapeMismatch {
        /// Stream name (`{source}_TO_{sink}`).
        stream: String,
        /// Points actually enqueued by the producer.
        produced: usize,
        /// Total the descriptor declares (product of axis lengths).
        declared: usize,
    },

    /// An operation was attempted in the wrong lifecycle state.
    #[error("Experiment is {actual}, expected {expected}")]
    InvalidState {
        /// State the operation requires.
        expected: RunState,
        /// State the experiment is actually in.
        actual: RunState,
    },

    /// A typed parameter rejected a non-convertible value.
    #[error("Parameter '{parameter}' given {got} value, expected {expected}")]
    ValueKind {
        /// Name of the rejecting parameter.
        parameter: String,
        /// The parameter's declared kind.
        expected: ValueKind,
        /// Kind of the offending value.
        got: ValueKind,
    },

    /// A graph node task failed during `run()`; fatal to the whole sweep.
    #[error("Node '{node}' failed: {source}")]
    Node {
        /// Name of the failing node.
        node: String,
        /// Underlying fault.
        #[source]
        source: anyhow::Error,
    },

    /// The bound hardware write for a parameter failed.
    #[error("Pushing parameter '{parameter}' failed: {source}")]
    Push {
        /// Parameter whose write callable failed.
        parameter: String,
        /// Underlying fault.
        #[source]
        source: anyhow::Error,
    },

    /// A refinement callable failed while extending a sweep axis.
    #[error("Refinement of axis '{axis}' failed: {source}")]
    Refine {
        /// Axis the refinement was extending.
        axis: String,
        /// Underlying fault.
        #[source]
        source: anyhow::Error,
    },

    /// The per-experiment scheduler runtime could not be built.
    #[error("Scheduler error: {0}")]
    Scheduler(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SweepError::NotConfigured {
            name: "laser_power".to_string(),
            role: "write",
        };
        assert_eq!(err.to_string(), "No write method bound for 'laser_power'");
    }

    #[test]
    fn test_value_kind_names_both_kinds() {
        let err = SweepError::ValueKind {
            parameter: "bias".into(),
            expected: ValueKind::Float,
            got: ValueKind::Bool,
        };
        let msg = err.to_string();
        assert!(msg.contains("float"));
        assert!(msg.contains("bool"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = SweepError::ShapeMismatch {
            stream: "voltage_TO_sink".into(),
            produced: 2,
            declared: 3,
        };
        assert!(err.to_string().contains("voltage_TO_sink"));
    }
}
