//! Eigensolvers for the Hamiltonian of finite models.
//!
//! [`solve_dense`] computes the full spectrum of the Hamiltonian, while
//! [`solve_sparse`] uses an iterative Krylov method to compute a few
//! eigenpairs selected by a [`SparseTarget`].
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;

use crate::Error;
use crate::math::HermitianEigen;
use crate::model::Hamiltonian;

mod lanczos;
mod shift_invert;

/// Eigenvalues and eigenvectors of a Hamiltonian
#[derive(Debug, Clone)]
pub struct EigenResult {
    eigenvalues: Array1<f64>,
    eigenvectors: Array2<Complex64>,
}

impl EigenResult {
    pub(crate) fn new(eigenvalues: Array1<f64>, eigenvectors: Array2<Complex64>) -> EigenResult {
        assert_eq!(eigenvalues.len(), eigenvectors.ncols());
        EigenResult { eigenvalues, eigenvectors }
    }

    /// Get the eigenvalues, sorted in increasing order
    pub fn eigenvalues(&self) -> ArrayView1<'_, f64> {
        self.eigenvalues.view()
    }

    /// Get the eigenvectors as an array of shape `(n_sites, n_states)`, each
    /// column containing the normalized eigenvector associated with the
    /// corresponding eigenvalue.
    pub fn eigenvectors(&self) -> ArrayView2<'_, Complex64> {
        self.eigenvectors.view()
    }

    /// Get the eigenvector of the given `state`
    pub fn eigenvector(&self, state: usize) -> ArrayView1<'_, Complex64> {
        self.eigenvectors.column(state)
    }

    /// Get the number of eigenpairs
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Check if this result contains no eigenpair
    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// Get the number of sites, i.e. the size of the eigenvectors
    pub fn n_sites(&self) -> usize {
        self.eigenvectors.nrows()
    }
}

/// Compute all the eigenvalues and eigenvectors of the `hamiltonian`, using
/// a dense Hermitian eigensolver.
#[time_graph::instrument(name = "solve_dense")]
pub fn solve_dense(hamiltonian: &Hamiltonian) -> Result<EigenResult, Error> {
    if hamiltonian.is_empty() {
        return Err(Error::Dimension("can not diagonalize an empty Hamiltonian".into()));
    }

    debug!("dense diagonalization of a {0}x{0} Hamiltonian", hamiltonian.size());
    let eigen = HermitianEigen::new(hamiltonian.to_dense());
    return Ok(EigenResult::new(eigen.eigenvalues, eigen.eigenvectors));
}

/// Which eigenvalues should the sparse eigensolver compute
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(tag = "type")]
pub enum SparseTarget {
    /// The algebraically smallest eigenvalues
    SmallestAlgebraic,
    /// The algebraically largest eigenvalues
    LargestAlgebraic,
    /// The eigenvalues closest to the given energy, computed with shift-invert
    /// iterations
    Nearest {
        /// reference energy
        energy: f64,
    },
}

impl Default for SparseTarget {
    fn default() -> SparseTarget {
        SparseTarget::SmallestAlgebraic
    }
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_max_iterations() -> usize {
    1000
}

/// Parameters for the sparse eigensolver
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SparseSolverParameters {
    /// Number of eigenpairs to compute
    pub count: usize,
    /// Which eigenpairs to compute
    #[serde(default)]
    pub target: SparseTarget,
    /// An eigenpair `(E, v)` is converged when the residual `|H v - E v|`
    /// is below `tolerance * max(1, |E|)`
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Maximal number of Lanczos cycles (each one ending with a restart or
    /// with convergence) before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Size of the Krylov subspace. Defaults to `max(2 * count + 1, 20)`, and
    /// is always limited to the size of the Hamiltonian.
    #[serde(default)]
    pub subspace_size: Option<usize>,
    /// Seed used to generate the starting vector of the iteration
    #[serde(default)]
    pub seed: u64,
}

impl SparseSolverParameters {
    /// Get the default parameters to compute the `count` smallest eigenpairs
    pub fn new(count: usize) -> SparseSolverParameters {
        SparseSolverParameters {
            count: count,
            target: SparseTarget::default(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            subspace_size: None,
            seed: 0,
        }
    }

    /// Check that these parameters are valid
    pub fn validate(&self) -> Result<(), Error> {
        if self.count == 0 {
            return Err(Error::Configuration(
                "the number of eigenpairs to compute must be at least 1".into()
            ));
        }

        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(Error::Configuration(format!(
                "tolerance must be positive and finite, got {}", self.tolerance
            )));
        }

        if self.max_iterations == 0 {
            return Err(Error::Configuration(
                "max_iterations must be at least 1".into()
            ));
        }

        if let Some(size) = self.subspace_size {
            if size <= self.count {
                return Err(Error::Configuration(format!(
                    "subspace size ({}) must be larger than the number of eigenpairs ({})",
                    size, self.count
                )));
            }
        }

        if let SparseTarget::Nearest { energy } = self.target {
            if !energy.is_finite() {
                return Err(Error::Configuration(format!(
                    "target energy must be finite, got {}", energy
                )));
            }
        }

        return Ok(());
    }

    /// Get the size of the Krylov subspace to use for a Hamiltonian with
    /// `size` rows
    pub fn subspace_for(&self, size: usize) -> usize {
        let default = usize::max(2 * self.count + 1, 20);
        return usize::min(self.subspace_size.unwrap_or(default), size);
    }
}

/// Compute some eigenvalues and eigenvectors of the `hamiltonian` with an
/// iterative (thick restart Lanczos) eigensolver.
///
/// For [`SparseTarget::Nearest`], the iterations use `(H - energy)^-1`,
/// applied through a banded LU factorization of the shifted Hamiltonian.
/// Repeated eigenvalues are found by continuing the search orthogonally to
/// the converged eigenvectors, until no better eigenvalue is left.
///
/// The eigenvalues are returned in increasing order, and the eigenvectors
/// are normalized. This returns [`Error::Convergence`] if the requested
/// eigenpairs did not converge within `parameters.max_iterations` cycles.
#[time_graph::instrument(name = "solve_sparse")]
pub fn solve_sparse(hamiltonian: &Hamiltonian, parameters: &SparseSolverParameters) -> Result<EigenResult, Error> {
    parameters.validate()?;

    if hamiltonian.is_empty() {
        return Err(Error::Dimension("can not diagonalize an empty Hamiltonian".into()));
    }

    if parameters.count > hamiltonian.size() {
        return Err(Error::Configuration(format!(
            "requested {} eigenpairs, but the Hamiltonian only has {} rows",
            parameters.count, hamiltonian.size()
        )));
    }

    let (eigenvalues, eigenvectors) = lanczos::thick_restart_lanczos(hamiltonian, parameters)?;
    return Ok(EigenResult::new(eigenvalues, eigenvectors));
}
