use crate::error::GradError;

/// Either a raw number or a node handle `N`, as accepted by `pow`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand<N> {
    Scalar(f64),
    Node(N),
}

impl<N> From<f64> for Operand<N> {
    fn from(value: f64) -> Self {
        Operand::Scalar(value)
    }
}

impl<N> From<i32> for Operand<N> {
    fn from(value: i32) -> Self {
        Operand::Scalar(value as f64)
    }
}

impl<N> Operand<N> {
    /// Validate an operand used as the exponent of `pow`.
    pub(crate) fn exponent(self) -> Result<f64, GradError> {
        match self {
            Operand::Scalar(exp) if exp.is_nan() => Err(GradError::InvalidOperand {
                op: "pow",
                reason: "exponent is NaN".into(),
            }),
            Operand::Scalar(exp) => Ok(exp),
            Operand::Node(_) => Err(GradError::InvalidOperand {
                op: "pow",
                reason: "only constant int/float exponents are supported".into(),
            }),
        }
    }
}
