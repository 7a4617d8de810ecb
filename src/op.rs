//! Elementary operations and their local derivatives.
//!
//! Both engines record an [`Op`] per node and dispatch on it during the backward pass
//! instead of storing a closure per node.

use std::fmt::Display;

/// The operation that produced a node. Diagnostic only; the backward pass reads the
/// local derivatives through [`Op::local_grads`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Leaf,
    Add,
    Mul,
    /// Power with a constant exponent.
    Pow(f64),
    Relu,
}

impl Op {
    /// Number of operands the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            Op::Leaf => 0,
            Op::Pow(_) | Op::Relu => 1,
            Op::Add | Op::Mul => 2,
        }
    }

    /// Forward value. `rhs` is ignored by unary operations.
    pub(crate) fn eval(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Op::Leaf => lhs,
            Op::Add => lhs + rhs,
            Op::Mul => lhs * rhs,
            Op::Pow(exp) => lhs.powf(*exp),
            Op::Relu => {
                if lhs < 0. {
                    0.
                } else {
                    lhs
                }
            }
        }
    }

    /// Partial derivatives of the output with respect to `(lhs, rhs)`, evaluated at the
    /// stored forward values. The second element is 0 for unary operations.
    pub(crate) fn local_grads(&self, lhs: f64, rhs: f64, out: f64) -> (f64, f64) {
        match self {
            Op::Leaf => (0., 0.),
            Op::Add => (1., 1.),
            Op::Mul => (rhs, lhs),
            Op::Pow(exp) if *exp == 0. => (0., 0.),
            Op::Pow(exp) => (exp * lhs.powf(exp - 1.), 0.),
            Op::Relu => (if out > 0. { 1. } else { 0. }, 0.),
        }
    }
}

/// Label for an intermediate node, built only with the `expr_name` feature.
#[cfg(feature = "expr_name")]
pub(crate) fn expr_label(f: impl FnOnce() -> String) -> Option<String> {
    Some(f())
}

#[cfg(not(feature = "expr_name"))]
pub(crate) fn expr_label(_f: impl FnOnce() -> String) -> Option<String> {
    None
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Leaf => Ok(()),
            Op::Add => write!(f, "+"),
            Op::Mul => write!(f, "*"),
            Op::Pow(exp) => write!(f, "**{exp}"),
            Op::Relu => write!(f, "ReLU"),
        }
    }
}
