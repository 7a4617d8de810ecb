//! Dependency graph in diamond shape. It uses the same node twice, so the derivative should add up.
//! Run with `RUST_LOG=trace` to see the backward pass.

use scalargrad::Value;

fn main() {
    env_logger::init();

    let a = Value::with_label("a", 1.);
    let b = Value::with_label("b", 3.);
    let c = Value::with_label("c", 5.);
    let ab = &a + &b;
    let ac = &a + &c;
    let abac = &ab + &ac;

    abac.backward();
    println!("abac: {abac}");
    println!("a: {a}");
    println!("b: {b}");
    println!("c: {c}");
}
