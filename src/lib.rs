//! Reverse-mode automatic differentiation over scalar values.
//!
//! Two graph representations are provided:
//!
//! * [`Value`], reference-counted nodes that can be freely shared and dropped.
//! * [`Tape`] and [`TapeTerm`], an arena where nodes are addressed by index.
//!
//! Both evaluate eagerly while the expression is built and compute every gradient of
//! a chosen output in a single [`Value::backward`] / [`TapeTerm::backward`] pass.

pub mod error;
mod op;
mod operand;
pub mod tape;
mod value;

pub use error::GradError;
pub use op::Op;
pub use operand::Operand;
#[cfg(feature = "macro")]
pub use scalargrad_macro::scalargrad;
pub use tape::{Tape, TapeTerm};
pub use value::Value;
