#![allow(dead_code)]

use tbflake::PeriodicLattice;

/// Carbon-carbon distance in graphene, in nm
pub const A_CC: f64 = 0.142;

pub fn load_lattice(name: &str) -> PeriodicLattice {
    let json = std::fs::read_to_string(format!("tests/data/lattices/{}.json", name))
        .expect("failed to read lattice file");

    PeriodicLattice::from_json(&json).expect("invalid lattice")
}

/// Rectangular graphene flake, 1.6 nm wide and 1.2 nm high
pub fn graphene_rectangle() -> (PeriodicLattice, tbflake::Polygon) {
    let lattice = load_lattice("graphene");
    let shape = tbflake::Polygon::rectangle(1.6, 1.2).expect("invalid polygon");
    return (lattice, shape);
}
