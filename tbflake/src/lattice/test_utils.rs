use crate::Vector3D;
use super::PeriodicLattice;

/// Carbon-carbon distance in graphene, in nm
pub const A_CC: f64 = 0.142;
/// Graphene lattice constant, in nm
pub const A_GRAPHENE: f64 = 0.24595;
/// Nearest neighbor hopping in graphene, in eV
pub const T_GRAPHENE: f64 = -2.8;

pub fn test_lattice(name: &str) -> PeriodicLattice {
    match name {
        "chain" => get_chain(),
        "square" => get_square(),
        "honeycomb" => get_honeycomb(),
        "cubic" => get_cubic(),
        _ => panic!("unknown test lattice {}", name)
    }
}

/// One dimensional chain with unit spacing and unit hopping
fn get_chain() -> PeriodicLattice {
    let mut lattice = PeriodicLattice::new(&[Vector3D::new(1.0, 0.0, 0.0)]).unwrap();
    lattice.add_sublattice("A", Vector3D::zero(), 0.0).unwrap();
    lattice.add_hopping([1, 0, 0], "A", "A", -1.0).unwrap();
    return lattice;
}

/// Square lattice with unit spacing, a single orbital and nearest neighbor
/// hopping
fn get_square() -> PeriodicLattice {
    let mut lattice = PeriodicLattice::new(&[
        Vector3D::new(1.0, 0.0, 0.0),
        Vector3D::new(0.0, 1.0, 0.0),
    ]).unwrap();
    lattice.add_sublattice("A", Vector3D::zero(), 0.0).unwrap();
    lattice.add_hopping([1, 0, 0], "A", "A", -1.0).unwrap();
    lattice.add_hopping([0, 1, 0], "A", "A", -1.0).unwrap();
    return lattice;
}

/// Graphene-like honeycomb lattice, with two sublattices and nearest neighbor
/// hopping
fn get_honeycomb() -> PeriodicLattice {
    let mut lattice = PeriodicLattice::new(&[
        Vector3D::new(A_GRAPHENE, 0.0, 0.0),
        Vector3D::new(0.5 * A_GRAPHENE, 0.5 * f64::sqrt(3.0) * A_GRAPHENE, 0.0),
    ]).unwrap();
    lattice.add_sublattice_cartesian("A", Vector3D::new(0.0, -0.5 * A_CC, 0.0), 0.0).unwrap();
    lattice.add_sublattice_cartesian("B", Vector3D::new(0.0, 0.5 * A_CC, 0.0), 0.0).unwrap();

    lattice.add_hopping([0, 0, 0], "A", "B", T_GRAPHENE).unwrap();
    lattice.add_hopping([1, -1, 0], "A", "B", T_GRAPHENE).unwrap();
    lattice.add_hopping([0, -1, 0], "A", "B", T_GRAPHENE).unwrap();
    return lattice;
}

/// Simple cubic lattice with unit spacing
fn get_cubic() -> PeriodicLattice {
    let mut lattice = PeriodicLattice::new(&[
        Vector3D::new(1.0, 0.0, 0.0),
        Vector3D::new(0.0, 1.0, 0.0),
        Vector3D::new(0.0, 0.0, 1.0),
    ]).unwrap();
    lattice.add_sublattice("A", Vector3D::zero(), 0.0).unwrap();
    lattice.add_hopping([1, 0, 0], "A", "A", -1.0).unwrap();
    lattice.add_hopping([0, 1, 0], "A", "A", -1.0).unwrap();
    lattice.add_hopping([0, 0, 1], "A", "A", -1.0).unwrap();
    return lattice;
}
