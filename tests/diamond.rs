//! Dependency graph in diamond shape. `a` feeds two branches, so its gradient is the sum
//! of both paths.

use scalargrad::{Tape, Value};

#[test]
fn rc_diamond() {
    let a = Value::with_label("a", 1.);
    let b = Value::with_label("b", 3.);
    let c = Value::with_label("c", 5.);
    let ab = &a + &b;
    let ac = &a + &c;
    let abac = &ab + &ac;

    abac.backward();
    println!("abac: {abac}");
    assert_eq!(abac.data(), 10.);
    assert_eq!(a.grad(), 2.);
    assert_eq!(b.grad(), 1.);
    assert_eq!(c.grad(), 1.);
}

#[test]
fn tape_diamond() {
    let tape = Tape::new();
    let a = tape.term("a", 1.);
    let b = tape.term("b", 3.);
    let c = tape.term("c", 5.);
    let ab = a + b;
    let ac = a + c;
    let abac = ab + ac;

    abac.backward();
    assert_eq!(abac.data(), 10.);
    assert_eq!(a.grad(), 2.);
    assert_eq!(b.grad(), 1.);
    assert_eq!(c.grad(), 1.);
}

#[test]
fn neuron() {
    // relu(w1 * x1 + w2 * x2 + b)
    let x1 = Value::with_label("x1", 2.);
    let x2 = Value::with_label("x2", -1.);
    let w1 = Value::with_label("w1", 0.5);
    let w2 = Value::with_label("w2", 3.);
    let b = Value::with_label("b", 1.);
    let out = (&(&(&w1 * &x1) + &(&w2 * &x2)) + &b).relu();
    assert_eq!(out.data(), 0.);
    out.backward();
    assert_eq!(w1.grad(), 0.);

    let b = Value::with_label("b", 4.);
    let out = (&(&(&w1 * &x1) + &(&w2 * &x2)) + &b).relu();
    assert_eq!(out.data(), 2.);
    out.backward();
    assert_eq!(w1.grad(), 2.);
    assert_eq!(w2.grad(), -1.);
    assert_eq!(x1.grad(), 0.5);
    assert_eq!(b.grad(), 1.);
}
