use gulp_driver::core::domain::{Atom, Structure};
use gulp_driver::engine::calculator::Calculator;
use gulp_driver::engine::lj::LennardJones;

fn main() {
    let mut lj = LennardJones::default();

    println!("# Lennard-Jones dimer scan (epsilon = {}, sigma = {})", lj.epsilon, lj.sigma);
    println!("#        r         energy         |F| on atom 2");

    let mut best = (0.0, f64::INFINITY);
    for step in 0..60 {
        let r = 0.95 + 0.01 * step as f64;
        let structure = Structure::new(
            vec![Atom::new("Ar", 0.0, 0.0, 0.0), Atom::new("Ar", r, 0.0, 0.0)],
            None,
        );

        let energy = lj.potential_energy(&structure).unwrap();
        let forces = lj.forces(&structure).unwrap();
        println!("{:10.4} {:14.8} {:14.8}", r, energy, forces[1].norm());

        if energy < best.1 {
            best = (r, energy);
        }
    }

    println!(
        "# minimum near r = {:.4} (analytic: 2^(1/6) = {:.4})",
        best.0,
        2.0f64.powf(1.0 / 6.0)
    );
}
