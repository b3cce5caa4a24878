use tbflake::{EigenResult, Model, PeriodicLattice, Polygon};
use tbflake::{calc_spatial_ldos, solve_sparse, SparseSolverParameters};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).expect("expected a command line argument");

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    // run the calculation
    let _result = compute_spectrum(&path)?;

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Build a hexagonal flake and compute its lowest states, this is the same
/// kind of calculation as the 'ldos-ring' example
fn compute_spectrum(path: &str) -> Result<EigenResult, Box<dyn std::error::Error>> {
    let lattice = PeriodicLattice::from_json(&std::fs::read_to_string(path)?)?;

    let result = time_graph::spanned!("Full calculation", {
        let shape = Polygon::regular(6, 10.0, 0.0)?;
        let model = Model::new(&lattice, &shape)?;

        let parameters = SparseSolverParameters::new(10);
        let result = solve_sparse(model.hamiltonian(), &parameters)?;
        calc_spatial_ldos(model.sites(), &result, result.eigenvalues()[0], 0.1)?;
        result
    });

    Ok(result)
}
