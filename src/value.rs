//! Reference-counted scalar graph. Every node is an `Rc` shared by the caller and by
//! all the nodes computed from it; gradients live in a `Cell` so the backward pass can
//! accumulate through shared handles.

use std::{
    cell::Cell,
    collections::HashSet,
    fmt::Display,
    ops::{Add, Div, Mul, Neg, Sub},
    rc::Rc,
};

use crate::{
    error::GradError,
    op::{expr_label, Op},
    operand::Operand,
};

#[derive(Clone, Debug)]
enum Inputs {
    None,
    Unary(Value),
    Binary(Value, Value),
}

#[derive(Debug)]
struct ValuePayload {
    label: Option<String>,
    op: Op,
    inputs: Inputs,
    data: f64,
    grad: Cell<f64>,
}

impl Inputs {
    fn take_into(&mut self, stack: &mut Vec<Value>) {
        match std::mem::replace(self, Inputs::None) {
            Inputs::None => (),
            Inputs::Unary(term) => stack.push(term),
            Inputs::Binary(lhs, rhs) => {
                stack.push(lhs);
                stack.push(rhs);
            }
        }
    }
}

impl Drop for ValuePayload {
    // Long chains would otherwise drop recursively, one frame per node.
    fn drop(&mut self) {
        let mut stack = vec![];
        self.inputs.take_into(&mut stack);
        while let Some(node) = stack.pop() {
            if let Ok(mut payload) = Rc::try_unwrap(node.0) {
                payload.inputs.take_into(&mut stack);
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Value(Rc<ValuePayload>);

impl Value {
    /// A leaf node with no inputs.
    pub fn new(data: f64) -> Self {
        Self::new_payload(None, Op::Leaf, Inputs::None, data)
    }

    pub fn with_label(label: impl Into<String>, data: f64) -> Self {
        Self::new_payload(Some(label.into()), Op::Leaf, Inputs::None, data)
    }

    fn new_payload(label: Option<String>, op: Op, inputs: Inputs, data: f64) -> Self {
        Self(Rc::new(ValuePayload {
            label,
            op,
            inputs,
            data,
            grad: Cell::new(0.),
        }))
    }

    fn binary(op: Op, lhs: &Value, rhs: &Value) -> Self {
        let data = op.eval(lhs.data(), rhs.data());
        let label = expr_label(|| format!("({} {op} {})", lhs.name(), rhs.name()));
        Self::new_payload(label, op, Inputs::Binary(lhs.clone(), rhs.clone()), data)
    }

    fn unary(op: Op, term: &Value) -> Self {
        let data = op.eval(term.data(), 0.);
        let label = expr_label(|| match op {
            Op::Relu => format!("{op}({})", term.name()),
            _ => format!("{}{op}", term.name()),
        });
        Self::new_payload(label, op, Inputs::Unary(term.clone()), data)
    }

    pub fn data(&self) -> f64 {
        self.0.data
    }

    pub fn grad(&self) -> f64 {
        self.0.grad.get()
    }

    pub fn op(&self) -> Op {
        self.0.op
    }

    pub fn label(&self) -> Option<&str> {
        self.0.label.as_deref()
    }

    /// Distinct nodes this one was computed from. `x + x` has a single input.
    pub fn inputs(&self) -> Vec<Value> {
        match &self.0.inputs {
            Inputs::None => vec![],
            Inputs::Unary(term) => vec![term.clone()],
            Inputs::Binary(lhs, rhs) if lhs.ptr_eq(rhs) => vec![lhs.clone()],
            Inputs::Binary(lhs, rhs) => vec![lhs.clone(), rhs.clone()],
        }
    }

    /// Whether both handles point to the same graph node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        let payload = &*self.0;
        payload as *const _ as usize
    }

    fn name(&self) -> String {
        self.0
            .label
            .clone()
            .unwrap_or_else(|| self.0.data.to_string())
    }

    /// `self ** exponent`. The exponent has to be a constant; passing a node fails
    /// with [`GradError::InvalidOperand`].
    pub fn pow(&self, exponent: impl Into<Operand<Value>>) -> Result<Value, GradError> {
        let exp = exponent.into().exponent()?;
        Ok(Self::unary(Op::Pow(exp), self))
    }

    pub fn relu(&self) -> Value {
        Self::unary(Op::Relu, self)
    }

    fn add_grad(&self, grad: f64) {
        self.0.grad.set(self.0.grad.get() + grad);
    }

    /// Nodes reachable from `self`, every node after all of its inputs.
    fn topo_order(&self) -> Vec<Value> {
        let mut topo = vec![];
        let mut visited = HashSet::new();
        // The flag marks a node whose inputs have already been pushed.
        let mut stack = vec![(self.clone(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                topo.push(node);
                continue;
            }
            if !visited.insert(node.id()) {
                continue;
            }
            let inputs = node.inputs();
            stack.push((node, true));
            for input in inputs.into_iter().rev() {
                if !visited.contains(&input.id()) {
                    stack.push((input, false));
                }
            }
        }
        topo
    }

    /// Add this node's contribution into the gradients of its inputs.
    fn propagate(&self) {
        let ValuePayload {
            op, inputs, data, ..
        } = &*self.0;
        let grad = self.grad();
        match inputs {
            Inputs::None => (),
            Inputs::Unary(term) => {
                let (dterm, _) = op.local_grads(term.data(), 0., *data);
                term.add_grad(dterm * grad);
            }
            Inputs::Binary(lhs, rhs) => {
                let (dlhs, drhs) = op.local_grads(lhs.data(), rhs.data(), *data);
                lhs.add_grad(dlhs * grad);
                rhs.add_grad(drhs * grad);
            }
        }
    }

    /// Compute the gradient of `self` with respect to every node it depends on.
    ///
    /// Gradients are added to whatever the nodes already hold, so running a second pass
    /// over shared nodes accumulates into the first one's results.
    pub fn backward(&self) {
        let topo = self.topo_order();
        log::debug!("backward from {}: {} nodes", self.name(), topo.len());
        self.0.grad.set(1.);
        for node in topo.iter().rev() {
            log::trace!("propagate {} ({:?}) grad {}", node.name(), node.op(), node.grad());
            node.propagate();
        }
    }
}

impl From<f64> for Value {
    fn from(data: f64) -> Self {
        Value::new(data)
    }
}

impl From<Value> for Operand<Value> {
    fn from(value: Value) -> Self {
        Operand::Node(value)
    }
}

impl From<&Value> for Operand<Value> {
    fn from(value: &Value) -> Self {
        Operand::Node(value.clone())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value(data={}, grad={})", self.data(), self.grad())
    }
}

impl Add for &Value {
    type Output = Value;
    fn add(self, rhs: Self) -> Self::Output {
        Value::binary(Op::Add, self, rhs)
    }
}

impl Add<f64> for &Value {
    type Output = Value;
    fn add(self, rhs: f64) -> Self::Output {
        self + &Value::from(rhs)
    }
}

impl Add<&Value> for f64 {
    type Output = Value;
    fn add(self, rhs: &Value) -> Self::Output {
        rhs + self
    }
}

impl Mul for &Value {
    type Output = Value;
    fn mul(self, rhs: Self) -> Self::Output {
        Value::binary(Op::Mul, self, rhs)
    }
}

impl Mul<f64> for &Value {
    type Output = Value;
    fn mul(self, rhs: f64) -> Self::Output {
        self * &Value::from(rhs)
    }
}

impl Mul<&Value> for f64 {
    type Output = Value;
    fn mul(self, rhs: &Value) -> Self::Output {
        rhs * self
    }
}

impl Neg for &Value {
    type Output = Value;
    fn neg(self) -> Self::Output {
        self * -1.
    }
}

impl Sub for &Value {
    type Output = Value;
    fn sub(self, rhs: Self) -> Self::Output {
        self + &(-rhs)
    }
}

impl Sub<f64> for &Value {
    type Output = Value;
    fn sub(self, rhs: f64) -> Self::Output {
        self - &Value::from(rhs)
    }
}

impl Sub<&Value> for f64 {
    type Output = Value;
    fn sub(self, rhs: &Value) -> Self::Output {
        &Value::from(self) + &(-rhs)
    }
}

impl Div for &Value {
    type Output = Value;
    fn div(self, rhs: Self) -> Self::Output {
        self * &Value::unary(Op::Pow(-1.), rhs)
    }
}

impl Div<f64> for &Value {
    type Output = Value;
    fn div(self, rhs: f64) -> Self::Output {
        self / &Value::from(rhs)
    }
}

impl Div<&Value> for f64 {
    type Output = Value;
    fn div(self, rhs: &Value) -> Self::Output {
        &Value::from(self) * &Value::unary(Op::Pow(-1.), rhs)
    }
}
