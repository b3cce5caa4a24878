//! Construction of finite tight-binding models: enumeration of the lattice
//! sites inside a shape, creation of the bonds between them, and assembly of
//! the corresponding Hamiltonian.
use log::{info, warn};

use crate::Error;
use crate::lattice::PeriodicLattice;
use crate::shapes::Shape;

mod sites;
pub use self::sites::{Site, Sites, enumerate_sites};

mod bonds;
pub use self::bonds::{Bond, build_bonds};
use self::bonds::count_neighbors;

mod hamiltonian;
pub use self::hamiltonian::Hamiltonian;

fn default_hermiticity_tolerance() -> f64 {
    1e-12
}

/// Options controlling the construction of a [`Model`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ModelOptions {
    /// Sites with fewer than this number of neighbors are removed from the
    /// model, repeatedly until all remaining sites have at least
    /// `min_neighbors` neighbors. The default (0) keeps all sites.
    #[serde(default)]
    pub min_neighbors: usize,
    /// Relative tolerance used when checking that the Hamiltonian is
    /// Hermitian
    #[serde(default = "default_hermiticity_tolerance")]
    pub hermiticity_tolerance: f64,
}

impl Default for ModelOptions {
    fn default() -> ModelOptions {
        ModelOptions {
            min_neighbors: 0,
            hermiticity_tolerance: default_hermiticity_tolerance(),
        }
    }
}

impl ModelOptions {
    /// Check that these options are valid
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.hermiticity_tolerance >= 0.0) || !self.hermiticity_tolerance.is_finite() {
            return Err(Error::Configuration(format!(
                "hermiticity tolerance must be positive and finite, got {}",
                self.hermiticity_tolerance
            )));
        }
        return Ok(());
    }
}

/// A finite tight-binding model, cut out of an infinite periodic lattice by a
/// shape.
///
/// The model is immutable once built. The lattice is copied into the model,
/// and later modifications of the original lattice do not affect it.
#[derive(Debug, Clone)]
pub struct Model {
    lattice: PeriodicLattice,
    sites: Sites,
    bonds: Vec<Bond>,
    hamiltonian: Hamiltonian,
}

impl Model {
    /// Build the finite model containing all sites of `lattice` inside
    /// `shape`, using the default options.
    pub fn new(lattice: &PeriodicLattice, shape: &dyn Shape) -> Result<Model, Error> {
        return Model::with_options(lattice, shape, ModelOptions::default());
    }

    /// Build the finite model containing all sites of `lattice` inside
    /// `shape`.
    #[time_graph::instrument(name = "Model::with_options")]
    pub fn with_options(lattice: &PeriodicLattice, shape: &dyn Shape, options: ModelOptions) -> Result<Model, Error> {
        lattice.validate()?;
        options.validate()?;

        let mut sites = enumerate_sites(lattice, shape)?;
        let mut bonds = build_bonds(lattice, &sites)?;

        if options.min_neighbors > 0 {
            loop {
                let counts = count_neighbors(sites.len(), &bonds);
                let keep = counts.iter().map(|&c| c >= options.min_neighbors).collect::<Vec<_>>();
                let removed = keep.iter().filter(|&&k| !k).count();
                if removed == 0 {
                    break;
                }

                warn!(
                    "removing {} sites with fewer than {} neighbors",
                    removed, options.min_neighbors
                );
                sites = sites.filter(&keep);
                bonds = build_bonds(lattice, &sites)?;
            }
        }

        let hamiltonian = Hamiltonian::assemble(
            &sites,
            &bonds,
            &lattice.onsite_energies(),
            options.hermiticity_tolerance,
        )?;

        info!(
            "built a model with {} sites, {} bonds and {} non-zero Hamiltonian entries",
            sites.len(), bonds.len(), hamiltonian.nnz()
        );

        return Ok(Model {
            lattice: lattice.clone(),
            sites: sites,
            bonds: bonds,
            hamiltonian: hamiltonian,
        });
    }

    /// Get the lattice used to build this model
    pub fn lattice(&self) -> &PeriodicLattice {
        &self.lattice
    }

    /// Get the sites of this model
    pub fn sites(&self) -> &Sites {
        &self.sites
    }

    /// Get the bonds of this model
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Get the Hamiltonian of this model
    pub fn hamiltonian(&self) -> &Hamiltonian {
        &self.hamiltonian
    }

    /// Get the number of sites in this model
    pub fn size(&self) -> usize {
        self.sites.len()
    }
}
