use approx::assert_abs_diff_eq;
use scalargrad_macro::scalargrad;

#[test]
fn polynomial() {
    scalargrad! {{
        let x = 3.;
        let y = x * x + x;
    }}
    assert_eq!(y.data(), 12.);
    y.backward();
    assert_eq!(x.grad(), 7.);
    assert_eq!(x.label(), Some("x"));
}

#[test]
fn negation_and_relu() {
    scalargrad! {{
        let a = 2.;
        let b = 5.;
        let c = (-a + b).relu();
        let d = (a - b).relu();
    }}
    assert_eq!(c.data(), 3.);
    assert_eq!(d.data(), 0.);
    c.backward();
    assert_eq!(a.grad(), -1.);
    assert_eq!(b.grad(), 1.);
}

#[test]
fn division_by_literal() {
    scalargrad! {{
        let x = 4.;
        let y = 1. / x;
    }}
    assert_abs_diff_eq!(y.data(), 0.25);
    y.backward();
    assert_abs_diff_eq!(x.grad(), -0.0625);
}

#[test]
fn integer_literals() {
    scalargrad! {{
        let x = 3;
        let y = 2 * x + 1;
    }}
    assert_eq!(x.data(), 3.);
    assert_eq!(y.data(), 7.);
    y.backward();
    assert_eq!(x.grad(), 2.);
}
