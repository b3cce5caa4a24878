use num_complex::Complex64;
use rayon::prelude::*;

use crate::Error;
use crate::lattice::PeriodicLattice;
use super::Sites;

/// A directed bond between two sites of a finite model, corresponding to the
/// Hamiltonian matrix element `H[from, to] = energy`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    /// global index of the first site
    pub from: usize,
    /// global index of the second site
    pub to: usize,
    /// hopping energy associated with this bond
    pub energy: Complex64,
}

/// Get the index of the cell at `sign * by` from `cell`, or `None` if it
/// can not be represented
fn shifted(cell: [i32; 3], by: [i32; 3], sign: i32) -> Option<[i32; 3]> {
    let mut result = [0; 3];
    for ((result, &cell), &by) in result.iter_mut().zip(&cell).zip(&by) {
        *result = cell.checked_add(by.checked_mul(sign)?)?;
    }
    return Some(result);
}

/// Build all the bonds between the `sites`, using the hopping terms of the
/// `lattice`. Hopping terms whose destination is not part of the model are
/// dropped.
///
/// Hopping terms given in a single direction create bonds in both
/// directions, the reverse bond using the complex conjugated energy. The
/// bonds are sorted by source site, and then in hopping term order.
#[time_graph::instrument(name = "build_bonds")]
pub fn build_bonds(lattice: &PeriodicLattice, sites: &Sites) -> Result<Vec<Bond>, Error> {
    let hoppings = lattice.resolved_hoppings()?;

    let bonds = sites.iter().collect::<Vec<_>>()
        .into_par_iter()
        .map(|site| {
            let mut bonds = Vec::new();
            for hopping in &hoppings {
                if hopping.from == site.sublattice {
                    let neighbor = shifted(site.cell, hopping.relative_index, 1)
                        .and_then(|cell| sites.index_of(cell, hopping.to));
                    if let Some(neighbor) = neighbor {
                        bonds.push(Bond {
                            from: site.index,
                            to: neighbor,
                            energy: hopping.energy,
                        });
                    }
                }

                if hopping.one_sided && hopping.to == site.sublattice {
                    let neighbor = shifted(site.cell, hopping.relative_index, -1)
                        .and_then(|cell| sites.index_of(cell, hopping.from));
                    if let Some(neighbor) = neighbor {
                        bonds.push(Bond {
                            from: site.index,
                            to: neighbor,
                            energy: hopping.energy.conj(),
                        });
                    }
                }
            }
            bonds
        })
        .collect::<Vec<_>>();

    return Ok(bonds.into_iter().flatten().collect());
}

/// Count the number of bonds starting on each site
pub(crate) fn count_neighbors(n_sites: usize, bonds: &[Bond]) -> Vec<usize> {
    let mut counts = vec![0; n_sites];
    for bond in bonds {
        if bond.from != bond.to {
            counts[bond.from] += 1;
        }
    }
    return counts;
}
