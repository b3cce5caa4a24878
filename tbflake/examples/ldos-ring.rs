use tbflake::{FreeformShape, Model, PeriodicLattice};
use tbflake::{calc_spatial_ldos, solve_sparse, SparseSolverParameters, SparseTarget};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // load the lattice definition from the command line argument
    let path = std::env::args().nth(1).expect("expected a command line argument");
    let lattice = PeriodicLattice::from_json(&std::fs::read_to_string(path)?)?;

    // a ring with inner radius 1.4 and outer radius 2.0, the predicate gets
    // points relative to the center of the shape
    let shape = FreeformShape::new(
        |points| points.iter().map(|p| {
            let r = f64::hypot(p[0], p[1]);
            1.4 < r && r < 2.0
        }).collect(),
        [2.0, 2.0, 1.0],
    )?;

    let model = Model::new(&lattice, &shape)?;
    println!("the ring contains {} sites", model.size());

    // compute the states around E = 0.5
    let mut parameters = SparseSolverParameters::new(20);
    parameters.target = SparseTarget::Nearest { energy: 0.5 };
    let result = solve_sparse(model.hamiltonian(), &parameters)?;

    // the local density of states only uses the computed eigenpairs
    let ldos = calc_spatial_ldos(model.sites(), &result, 0.5, 0.05)?;
    println!("x y ldos");
    for (position, value) in ldos.positions().iter().zip(ldos.values()) {
        println!("{} {} {}", position[0], position[1], value);
    }

    Ok(())
}
