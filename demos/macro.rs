use scalargrad_macro::scalargrad;

fn main() -> Result<(), scalargrad::GradError> {
    env_logger::init();

    scalargrad! {{
        let x = 123.;
        let result = 2. * x + 321.;
    }};
    println!("f(x): {}", result.data());
    result.backward();
    println!("df/dx: {}", x.grad());

    let cube = x.pow(3)?;
    cube.backward();
    println!("d(x**3)/dx accumulated onto df/dx: {}", x.grad());
    Ok(())
}
