use proptest::prelude::*;
use scalargrad::{Tape, Value};

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 1e-9 * (1. + expected.abs())
}

// f(a, b) = (a * b + a) / (b * b + 1)
fn rational_grads(a: f64, b: f64) -> (f64, f64, f64) {
    let den = b * b + 1.;
    let f = (a * b + a) / den;
    let da = (b + 1.) / den;
    let db = (a * den - (a * b + a) * 2. * b) / (den * den);
    (f, da, db)
}

// g(a, b, c) = relu(a - c) * b**2 - c / b
fn mixed(a: f64, b: f64, c: f64) -> f64 {
    (a - c).max(0.) * b * b - c / b
}

fn central_diff(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-5;
    (f(x + h) - f(x - h)) / (2. * h)
}

proptest! {
    #[test]
    fn matches_finite_differences(a in -5f64..5., b in 0.5f64..5., c in -5f64..5.) {
        prop_assume!((a - c).abs() > 1e-3);
        let x = Value::new(a);
        let y = Value::new(b);
        let z = Value::new(c);
        let out = &(&(&x - &z).relu() * &y.pow(2).unwrap()) - &(&z / &y);
        prop_assert!(close(out.data(), mixed(a, b, c)));
        out.backward();

        let da = central_diff(|v| mixed(v, b, c), a);
        let db = central_diff(|v| mixed(a, v, c), b);
        let dc = central_diff(|v| mixed(a, b, v), c);
        prop_assert!((x.grad() - da).abs() <= 1e-4 * (1. + da.abs()));
        prop_assert!((y.grad() - db).abs() <= 1e-4 * (1. + db.abs()));
        prop_assert!((z.grad() - dc).abs() <= 1e-4 * (1. + dc.abs()));
    }

    #[test]
    fn rc_rational(a in -10f64..10., b in -10f64..10.) {
        let (f, da, db) = rational_grads(a, b);
        let x = Value::new(a);
        let y = Value::new(b);
        let num = &(&x * &y) + &x;
        let den = &(&y * &y) + 1.;
        let out = &num / &den;
        prop_assert!(close(out.data(), f));
        out.backward();
        prop_assert!(close(x.grad(), da));
        prop_assert!(close(y.grad(), db));
    }

    #[test]
    fn tape_rational(a in -10f64..10., b in -10f64..10.) {
        let (f, da, db) = rational_grads(a, b);
        let tape = Tape::new();
        let x = tape.term("x", a);
        let y = tape.term("y", b);
        let out = (x * y + x) / (y * y + 1.);
        prop_assert!(close(out.data(), f));
        out.backward();
        prop_assert!(close(x.grad(), da));
        prop_assert!(close(y.grad(), db));
    }

    #[test]
    fn engines_agree(a in -5f64..5., b in 0.5f64..5., c in -5f64..5.) {
        prop_assume!((a - c).abs() > 1e-6);
        let x = Value::new(a);
        let y = Value::new(b);
        let z = Value::new(c);
        let rc = &(&(&x - &z).relu() * &y.pow(2).unwrap()) - &(&z / &y);
        rc.backward();

        let tape = Tape::new();
        let tx = tape.term("x", a);
        let ty = tape.term("y", b);
        let tz = tape.term("z", c);
        let t = (tx - tz).relu() * ty.pow(2).unwrap() - tz / ty;
        t.backward();

        prop_assert!(close(rc.data(), t.data()));
        prop_assert!(close(x.grad(), tx.grad()));
        prop_assert!(close(y.grad(), ty.grad()));
        prop_assert!(close(z.grad(), tz.grad()));
    }

    #[test]
    fn commuted_scalars(a in -100f64..100., k in -100f64..100.) {
        let x = Value::new(a);
        prop_assert_eq!((k + &x).data(), (&x + k).data());
        prop_assert_eq!((k * &x).data(), (&x * k).data());
        prop_assert!(close((k - &x).data(), k - a));
        let y = &(k * &x) + &(&x * k);
        y.backward();
        prop_assert!(close(x.grad(), 2. * k));
    }
}
