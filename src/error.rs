use thiserror::Error;

/// Errors raised while building the graph.
///
/// A failed operation never constructs a node, so the graph is left as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradError {
    /// An operand the operation cannot differentiate through, e.g. a node used as
    /// the exponent of `pow`.
    #[error("invalid operand for `{op}`: {reason}")]
    InvalidOperand { op: &'static str, reason: String },
}
