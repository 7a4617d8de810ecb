//! Implementation of shared memory arena for the nodes, aka a tape.
//! See https://rufflewind.com/2016-12-30/reverse-mode-automatic-differentiation
//!
//! A node can only refer to nodes pushed before it, so the index order of the tape is
//! already a topological order and the backward pass is a single reverse sweep.

use std::cell::RefCell;

use crate::{
    error::GradError,
    op::{expr_label, Op},
    operand::Operand,
};

#[derive(Default, Debug)]
pub struct Tape {
    nodes: RefCell<Vec<TapeNode>>,
}

#[derive(Clone, Debug)]
struct TapeNode {
    label: Option<String>,
    value: TapeValue,
    data: f64,
    grad: f64,
}

#[derive(Clone, Copy, Debug)]
enum TapeValue {
    Value,
    Add(u32, u32),
    Mul(u32, u32),
    Pow(u32, f64),
    Relu(u32),
}

impl TapeValue {
    fn op(&self) -> Op {
        match self {
            Self::Value => Op::Leaf,
            Self::Add(..) => Op::Add,
            Self::Mul(..) => Op::Mul,
            Self::Pow(_, exp) => Op::Pow(*exp),
            Self::Relu(_) => Op::Relu,
        }
    }

    /// Operand indices, `rhs` repeating `lhs` for unary operations.
    fn operands(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Value => None,
            Self::Add(lhs, rhs) | Self::Mul(lhs, rhs) => Some((lhs, rhs)),
            Self::Pow(term, _) | Self::Relu(term) => Some((term, term)),
        }
    }
}

#[derive(Copy, Clone)]
pub struct TapeTerm<'a> {
    tape: &'a Tape,
    idx: u32,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// A named leaf node.
    pub fn term<'a>(&'a self, name: impl Into<String>, init: f64) -> TapeTerm<'a> {
        self.push(Some(name.into()), TapeValue::Value, init)
    }

    /// An unnamed leaf node, used for raw numbers mixed into expressions.
    pub fn constant<'a>(&'a self, init: f64) -> TapeTerm<'a> {
        self.push(None, TapeValue::Value, init)
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    fn push<'a>(&'a self, label: Option<String>, value: TapeValue, data: f64) -> TapeTerm<'a> {
        let mut nodes = self.nodes.borrow_mut();
        let idx = nodes.len();
        nodes.push(TapeNode {
            label,
            value,
            data,
            grad: 0.,
        });
        TapeTerm {
            tape: self,
            idx: idx as u32,
        }
    }

    fn term0<'a>(&'a self, value: TapeValue) -> TapeTerm<'a> {
        let (data, label) = {
            let nodes = self.nodes.borrow();
            let op = value.op();
            let (lhs, rhs) = value.operands().map_or((0., 0.), |(lhs, rhs)| {
                (nodes[lhs as usize].data, nodes[rhs as usize].data)
            });
            let label = expr_label(|| match value {
                TapeValue::Value => String::new(),
                TapeValue::Add(lhs, rhs) | TapeValue::Mul(lhs, rhs) => format!(
                    "({} {op} {})",
                    name(&nodes, lhs),
                    name(&nodes, rhs)
                ),
                TapeValue::Pow(term, _) => format!("{}{op}", name(&nodes, term)),
                TapeValue::Relu(term) => format!("{op}({})", name(&nodes, term)),
            });
            (op.eval(lhs, rhs), label)
        };
        self.push(label, value, data)
    }
}

fn name(nodes: &[TapeNode], idx: u32) -> String {
    let node = &nodes[idx as usize];
    node.label.clone().unwrap_or_else(|| node.data.to_string())
}

impl<'a> TapeTerm<'a> {
    fn node<T>(&self, f: impl FnOnce(&TapeNode) -> T) -> T {
        f(&self.tape.nodes.borrow()[self.idx as usize])
    }

    fn same_tape(&self, other: &Self) {
        debug_assert!(
            std::ptr::eq(self.tape, other.tape),
            "terms belong to different tapes"
        );
    }

    pub fn data(&self) -> f64 {
        self.node(|node| node.data)
    }

    pub fn grad(&self) -> f64 {
        self.node(|node| node.grad)
    }

    pub fn op(&self) -> Op {
        self.node(|node| node.value.op())
    }

    pub fn label(&self) -> Option<String> {
        self.node(|node| node.label.clone())
    }

    /// Position of this term on its tape.
    pub fn index(&self) -> u32 {
        self.idx
    }

    /// Distinct terms this one was computed from.
    pub fn inputs(&self) -> Vec<TapeTerm<'a>> {
        let operands = self.node(|node| node.value.operands());
        let term = |idx| TapeTerm {
            tape: self.tape,
            idx,
        };
        match operands {
            None => vec![],
            Some((lhs, rhs)) if lhs == rhs => vec![term(lhs)],
            Some((lhs, rhs)) => vec![term(lhs), term(rhs)],
        }
    }

    /// `self ** exponent`. Fails with [`GradError::InvalidOperand`] for a term exponent.
    pub fn pow(self, exponent: impl Into<Operand<TapeTerm<'a>>>) -> Result<Self, GradError> {
        let exp = exponent.into().exponent()?;
        Ok(self.tape.term0(TapeValue::Pow(self.idx, exp)))
    }

    pub fn relu(self) -> Self {
        self.tape.term0(TapeValue::Relu(self.idx))
    }

    fn promote(&self, rhs: f64) -> Self {
        self.tape.constant(rhs)
    }

    /// Compute the gradient of `self` with respect to every term it depends on.
    /// Gradients accumulate across passes.
    pub fn backward(&self) {
        let mut nodes = self.tape.nodes.borrow_mut();
        backward(&mut nodes, self.idx);
    }
}

fn backward(nodes: &mut [TapeNode], root: u32) {
    let root = root as usize;
    // Terms after the root cannot be its inputs; terms before it are only touched once
    // a consumer has propagated into them.
    let mut reached = vec![false; root + 1];
    reached[root] = true;
    nodes[root].grad = 1.;
    let mut visited = 0;
    for idx in (0..=root).rev() {
        if !reached[idx] {
            continue;
        }
        visited += 1;
        let (value, data, grad) = {
            let node = &nodes[idx];
            (node.value, node.data, node.grad)
        };
        log::trace!("propagate a{idx} ({:?}) grad {grad}", value.op());
        let Some((lhs, rhs)) = value.operands() else {
            continue;
        };
        let (dlhs, drhs) =
            value
                .op()
                .local_grads(nodes[lhs as usize].data, nodes[rhs as usize].data, data);
        nodes[lhs as usize].grad += dlhs * grad;
        reached[lhs as usize] = true;
        if value.op().arity() == 2 {
            nodes[rhs as usize].grad += drhs * grad;
            reached[rhs as usize] = true;
        }
    }
    log::debug!("backward from a{root}: {visited} nodes");
}

impl<'a> std::ops::Add for TapeTerm<'a> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        self.same_tape(&rhs);
        self.tape.term0(TapeValue::Add(self.idx, rhs.idx))
    }
}

impl<'a> std::ops::Add<f64> for TapeTerm<'a> {
    type Output = Self;
    fn add(self, rhs: f64) -> Self::Output {
        self + self.promote(rhs)
    }
}

impl<'a> std::ops::Add<TapeTerm<'a>> for f64 {
    type Output = TapeTerm<'a>;
    fn add(self, rhs: TapeTerm<'a>) -> Self::Output {
        rhs + self
    }
}

impl<'a> std::ops::Mul for TapeTerm<'a> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.same_tape(&rhs);
        self.tape.term0(TapeValue::Mul(self.idx, rhs.idx))
    }
}

impl<'a> std::ops::Mul<f64> for TapeTerm<'a> {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        self * self.promote(rhs)
    }
}

impl<'a> std::ops::Mul<TapeTerm<'a>> for f64 {
    type Output = TapeTerm<'a>;
    fn mul(self, rhs: TapeTerm<'a>) -> Self::Output {
        rhs * self
    }
}

impl<'a> std::ops::Neg for TapeTerm<'a> {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self * -1.
    }
}

impl<'a> std::ops::Sub for TapeTerm<'a> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        self + -rhs
    }
}

impl<'a> std::ops::Sub<f64> for TapeTerm<'a> {
    type Output = Self;
    fn sub(self, rhs: f64) -> Self::Output {
        self - self.promote(rhs)
    }
}

impl<'a> std::ops::Sub<TapeTerm<'a>> for f64 {
    type Output = TapeTerm<'a>;
    fn sub(self, rhs: TapeTerm<'a>) -> Self::Output {
        rhs.promote(self) + -rhs
    }
}

impl<'a> std::ops::Div for TapeTerm<'a> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        self.same_tape(&rhs);
        self * self.tape.term0(TapeValue::Pow(rhs.idx, -1.))
    }
}

impl<'a> std::ops::Div<f64> for TapeTerm<'a> {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        self / self.promote(rhs)
    }
}

impl<'a> std::ops::Div<TapeTerm<'a>> for f64 {
    type Output = TapeTerm<'a>;
    fn div(self, rhs: TapeTerm<'a>) -> Self::Output {
        rhs.promote(self) * rhs.tape.term0(TapeValue::Pow(rhs.idx, -1.))
    }
}

impl<'a> From<TapeTerm<'a>> for Operand<TapeTerm<'a>> {
    fn from(term: TapeTerm<'a>) -> Self {
        Operand::Node(term)
    }
}

impl<'a> std::fmt::Display for TapeTerm<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (data, grad) = self.node(|node| (node.data, node.grad));
        write!(f, "Value(data={data}, grad={grad})")
    }
}

impl<'a> std::fmt::Debug for TapeTerm<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.node(|node| {
            f.debug_struct("TapeTerm")
                .field("idx", &self.idx)
                .field("label", &node.label)
                .field("op", &node.value.op())
                .field("data", &node.data)
                .field("grad", &node.grad)
                .finish()
        })
    }
}
