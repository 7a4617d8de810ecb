use scalargrad::Tape;

fn main() {
    env_logger::init();

    let tape = Tape::new();
    let a = tape.term("a", 1.);
    let b = tape.term("b", 3.);
    let c = tape.term("c", 5.);
    let ab = a + b;
    let ac = a + c;
    let abac = ab + ac;

    abac.backward();
    println!("abac: {abac}");
    println!("a: {a:?}");
    println!("b: {b:?}");
    println!("c: {c:?}");
    println!("tape holds {} nodes", tape.len());
}
