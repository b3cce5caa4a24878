//! Thick restart Lanczos iteration with full reorthogonalization, for
//! Hermitian matrices stored in compressed sparse row format.
//!
//! A single Krylov subspace only contains one direction for each eigenspace
//! of the operator, so repeated eigenvalues are found one copy at a time:
//! after the first search converged, the converged eigenvectors are locked
//! and the search continues in their orthogonal complement, until no better
//! eigenvalue can be found there.
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use num_traits::Zero;

use crate::Error;
use crate::math::HermitianEigen;
use crate::model::Hamiltonian;
use super::{SparseSolverParameters, SparseTarget};
use super::shift_invert::ShiftInvert;

/// Deterministic linear congruential generator for the starting vectors
struct LcgRng(u64);

impl LcgRng {
    fn new(seed: u64) -> LcgRng {
        LcgRng(seed.wrapping_add(1))
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    /// Uniform number in [0, 1)
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Normalized vector with random complex components
    fn vector(&mut self, size: usize) -> Array1<Complex64> {
        let mut vector = Array1::from_shape_fn(size, |_| {
            Complex64::new(self.uniform() - 0.5, self.uniform() - 0.5)
        });
        let norm = norm(vector.view());
        vector.mapv_inplace(|v| v / norm);
        return vector;
    }
}

/// The operator generating the Krylov subspace
enum Operator<'a> {
    /// The Hamiltonian itself, for the extremal eigenvalues
    Direct {
        hamiltonian: &'a Hamiltonian,
        largest: bool,
    },
    /// `(H - shift)^-1`, whose eigenvalues with the largest magnitude
    /// correspond to the eigenvalues of H closest to the shift
    ShiftInvert(ShiftInvert),
}

impl<'a> Operator<'a> {
    fn new(hamiltonian: &'a Hamiltonian, target: SparseTarget) -> Result<Operator<'a>, Error> {
        let energy = match target {
            SparseTarget::SmallestAlgebraic => {
                return Ok(Operator::Direct { hamiltonian: hamiltonian, largest: false });
            }
            SparseTarget::LargestAlgebraic => {
                return Ok(Operator::Direct { hamiltonian: hamiltonian, largest: true });
            }
            SparseTarget::Nearest { energy } => energy,
        };

        // if the target energy is an eigenvalue, move the shift slightly.
        // The eigenvalues are always computed from the Hamiltonian itself, so
        // this does not change the result.
        let step = 1e-8 * f64::max(1.0, hamiltonian.norm_bound());
        for attempt in 0..4 {
            let shift = energy + attempt as f64 * step;
            if let Some(factorization) = ShiftInvert::new(hamiltonian, shift) {
                return Ok(Operator::ShiftInvert(factorization));
            }
            debug!("H - {} is singular, moving the shift away from this eigenvalue", shift);
        }

        return Err(Error::Convergence(format!(
            "failed to factorize the Hamiltonian shifted by {}", energy
        )));
    }

    fn apply(&self, vector: ArrayView1<Complex64>) -> Array1<Complex64> {
        match self {
            Operator::Direct { hamiltonian, .. } => hamiltonian.dot(vector),
            Operator::ShiftInvert(factorization) => factorization.solve(vector),
        }
    }

    /// Lower bound on the norm of new Krylov vectors, below which the
    /// subspace is considered invariant
    fn scale(&self) -> f64 {
        match self {
            Operator::Direct { hamiltonian, .. } => hamiltonian.norm_bound(),
            Operator::ShiftInvert(_) => 0.0,
        }
    }

    /// Order the (increasing) eigenvalues of the projected operator from the
    /// best to the worst match of the target
    fn order(&self, values: ArrayView1<f64>) -> Vec<usize> {
        let mut order = (0..values.len()).collect::<Vec<_>>();
        match self {
            Operator::Direct { largest: false, .. } => {}
            Operator::Direct { largest: true, .. } => order.reverse(),
            Operator::ShiftInvert(_) => {
                order.sort_by(|&a, &b| f64::abs(values[b]).total_cmp(&f64::abs(values[a])));
            }
        }
        return order;
    }
}

/// Distance between an eigenvalue and the target, smaller is better
fn distance(target: SparseTarget, value: f64) -> f64 {
    match target {
        SparseTarget::SmallestAlgebraic => value,
        SparseTarget::LargestAlgebraic => -value,
        SparseTarget::Nearest { energy } => f64::abs(value - energy),
    }
}

fn inner(a: ArrayView1<Complex64>, b: ArrayView1<Complex64>) -> Complex64 {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

fn norm(a: ArrayView1<Complex64>) -> f64 {
    f64::sqrt(a.iter().map(|x| x.norm_sqr()).sum::<f64>())
}

/// Remove the components of `vector` along all the (orthonormal) `locked`
/// and `basis` vectors, and return the norm of what remains. Classical
/// Gram-Schmidt is applied twice to keep the basis orthogonal to working
/// precision.
fn orthogonalize(locked: &[Array1<Complex64>], basis: &[Array1<Complex64>], vector: &mut Array1<Complex64>) -> f64 {
    for _ in 0..2 {
        for v in locked.iter().chain(basis) {
            let projection = inner(v.view(), vector.view());
            vector.scaled_add(-projection, v);
        }
    }
    return norm(vector.view());
}

/// Compute `sum_i coefficients[i] * vectors[i]`
fn combine(size: usize, vectors: &[Array1<Complex64>], coefficients: ArrayView1<Complex64>) -> Array1<Complex64> {
    let mut result = Array1::zeros(size);
    for (vector, &coefficient) in vectors.iter().zip(coefficients) {
        result.scaled_add(coefficient, vector);
    }
    return result;
}

/// Compute the Hermitian matrix `P[i, j] = <left_i | right_j>`
fn projection(left: &[Array1<Complex64>], right: &[Array1<Complex64>]) -> Array2<Complex64> {
    let size = left.len();
    let mut projected = Array2::zeros((size, size));
    for i in 0..size {
        for j in 0..size {
            projected[[i, j]] = inner(left[i].view(), right[j].view());
        }
    }

    // remove the rounding errors breaking hermiticity
    for i in 0..size {
        projected[[i, i]] = Complex64::new(projected[[i, i]].re, 0.0);
        for j in (i + 1)..size {
            let value = 0.5 * (projected[[i, j]] + projected[[j, i]].conj());
            projected[[i, j]] = value;
            projected[[j, i]] = value.conj();
        }
    }

    return projected;
}

/// Approximate eigenpairs of the Hamiltonian
#[derive(Default)]
struct RitzPairs {
    values: Vec<f64>,
    vectors: Vec<Array1<Complex64>>,
    residuals: Vec<Array1<Complex64>>,
}

impl RitzPairs {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn push(&mut self, value: f64, vector: Array1<Complex64>, residual: Array1<Complex64>) {
        self.values.push(value);
        self.vectors.push(vector);
        self.residuals.push(residual);
    }

    fn is_converged(&self, i: usize, tolerance: f64) -> bool {
        norm(self.residuals[i].view()) <= tolerance * f64::max(1.0, f64::abs(self.values[i]))
    }

    /// Sort the pairs from the best to the worst match of the `target`, and
    /// only keep the first `count` ones
    fn select(self, target: SparseTarget, count: usize) -> RitzPairs {
        let mut pairs = self.values.into_iter()
            .zip(self.vectors)
            .zip(self.residuals)
            .collect::<Vec<_>>();

        pairs.sort_by(|((a, _), _), ((b, _), _)| {
            distance(target, *a).total_cmp(&distance(target, *b)).then(a.total_cmp(b))
        });
        pairs.truncate(count);

        let mut selected = RitzPairs::default();
        for ((value, vector), residual) in pairs {
            selected.push(value, vector, residual);
        }
        return selected;
    }
}

/// Search for eigenpairs with restarted Lanczos iterations, sharing the
/// random number generator and the iteration budget between searches.
struct Search<'a> {
    hamiltonian: &'a Hamiltonian,
    operator: Operator<'a>,
    parameters: &'a SparseSolverParameters,
    rng: LcgRng,
    iterations: usize,
}

impl Search<'_> {
    /// Add the part of `candidate` orthogonal to the `locked` and `basis`
    /// vectors to the basis, using a random direction if nothing is left.
    /// This returns `false` if the basis and the locked vectors already span
    /// the full space.
    fn expand(
        &mut self,
        locked: &[Array1<Complex64>],
        basis: &mut Vec<Array1<Complex64>>,
        images: &mut Vec<Array1<Complex64>>,
        candidate: Array1<Complex64>,
    ) -> bool {
        let size = self.hamiltonian.size();
        let reference = f64::max(norm(candidate.view()), self.operator.scale());

        let mut next = candidate;
        let mut beta = orthogonalize(locked, basis, &mut next);
        if beta < 1e-10 * reference {
            // the subspace is invariant, continue in a new direction
            next = self.rng.vector(size);
            beta = orthogonalize(locked, basis, &mut next);
            if beta < 1e-8 {
                return false;
            }
        }
        next.mapv_inplace(|v| v / beta);

        // the operator acts on the complement of the locked vectors
        let mut image = self.operator.apply(next.view());
        orthogonalize(locked, &[], &mut image);

        images.push(image);
        basis.push(next);
        return true;
    }

    /// Find the `wanted` eigenpairs matching the target best, in the
    /// orthogonal complement of the `locked` eigenvectors. The returned
    /// boolean indicates if the search explored the full complement, making
    /// the result exact.
    fn run(&mut self, locked: &[Array1<Complex64>], wanted: usize) -> Result<(RitzPairs, bool), Error> {
        let size = self.hamiltonian.size();
        let available = size - locked.len();
        let max_subspace = usize::min(self.parameters.subspace_for(size), available);
        let tolerance = self.parameters.tolerance;

        // orthonormal basis of the current subspace, and the operator applied
        // to each basis vector
        let mut basis = Vec::with_capacity(max_subspace);
        let mut images = Vec::with_capacity(max_subspace);

        let start = self.rng.vector(size);
        let mut exhausted = !self.expand(locked, &mut basis, &mut images, start);

        loop {
            self.iterations += 1;

            while basis.len() < max_subspace && !exhausted {
                let candidate = match images.last() {
                    Some(image) => image.clone(),
                    None => break,
                };
                exhausted = !self.expand(locked, &mut basis, &mut images, candidate);
            }

            let subspace = basis.len();
            let exhaustive = exhausted || subspace == available;

            let ritz = HermitianEigen::new(projection(&basis, &images));
            let order = self.operator.order(ritz.eigenvalues.view());
            let selected = &order[..usize::min(wanted, subspace)];

            let pairs = match self.operator {
                Operator::Direct { .. } => {
                    let mut pairs = RitzPairs::default();
                    for &i in selected {
                        let coefficients = ritz.eigenvectors.column(i);
                        let value = ritz.eigenvalues[i];
                        let vector = combine(size, &basis, coefficients);
                        let mut residual = combine(size, &images, coefficients);
                        residual.scaled_add(Complex64::new(-value, 0.0), &vector);
                        pairs.push(value, vector, residual);
                    }
                    pairs
                }
                Operator::ShiftInvert(_) => {
                    let vectors = selected.iter()
                        .map(|&i| combine(size, &basis, ritz.eigenvectors.column(i)))
                        .collect::<Vec<_>>();
                    rayleigh_ritz(self.hamiltonian, locked, &vectors)
                }
            };

            let n_converged = (0..pairs.len()).filter(|&i| pairs.is_converged(i, tolerance)).count();
            // when the basis spans the full complement, the Ritz pairs are exact
            if n_converged == pairs.len() || exhaustive {
                return Ok((pairs, exhaustive));
            }

            if self.iterations >= self.parameters.max_iterations {
                return Err(Error::Convergence(format!(
                    "the sparse eigensolver did not converge after {} iterations, \
                    try increasing max_iterations or subspace_size, or relaxing the tolerance",
                    self.parameters.max_iterations
                )));
            }

            debug!(
                "sparse eigensolver restart {}: {}/{} eigenpairs converged",
                self.iterations, n_converged, pairs.len()
            );

            // continue from the largest residual of the operator for the
            // wanted Ritz pairs
            let mut next = Array1::zeros(size);
            let mut largest = -1.0;
            for &i in selected {
                let coefficients = ritz.eigenvectors.column(i);
                let mut residual = combine(size, &images, coefficients);
                let vector = combine(size, &basis, coefficients);
                residual.scaled_add(Complex64::new(-ritz.eigenvalues[i], 0.0), &vector);

                let residual_norm = norm(residual.view());
                if residual_norm > largest {
                    largest = residual_norm;
                    next = residual;
                }
            }

            // keep the best Ritz vectors of the operator
            let keep = usize::min(wanted + (subspace - wanted) / 2, subspace - 1);
            let kept_basis = order[..keep].iter()
                .map(|&i| combine(size, &basis, ritz.eigenvectors.column(i)))
                .collect::<Vec<_>>();
            let kept_images = order[..keep].iter()
                .map(|&i| combine(size, &images, ritz.eigenvectors.column(i)))
                .collect::<Vec<_>>();
            basis = kept_basis;
            images = kept_images;

            exhausted = !self.expand(locked, &mut basis, &mut images, next);
        }
    }
}

/// Compute the thick restart Lanczos approximation of the eigenpairs
/// selected by `parameters.target`, returning eigenvalues in increasing order
/// and the corresponding normalized eigenvectors as columns.
pub(super) fn thick_restart_lanczos(
    hamiltonian: &Hamiltonian,
    parameters: &SparseSolverParameters,
) -> Result<(Array1<f64>, Array2<Complex64>), Error> {
    let size = hamiltonian.size();
    let count = parameters.count;
    let target = parameters.target;

    let operator = Operator::new(hamiltonian, target)?;
    if let Operator::ShiftInvert(ref factorization) = operator {
        debug!("using shift-invert iterations around {}", factorization.shift());
    }

    let mut search = Search {
        hamiltonian: hamiltonian,
        operator: operator,
        parameters: parameters,
        rng: LcgRng::new(parameters.seed),
        iterations: 0,
    };

    // converged eigenpairs, from the best to the worst match of the target
    let (pairs, mut complete) = search.run(&[], count)?;
    let mut locked = pairs.select(target, count);

    while !complete && locked.len() < size {
        let (mut candidate, _) = search.run(&locked.vectors, 1)?;

        let (value, worst) = match (candidate.values.first(), locked.values.last()) {
            (Some(&value), Some(&worst)) => (value, worst),
            _ => break,
        };

        let margin = parameters.tolerance * f64::max(1.0, f64::abs(worst));
        if distance(target, value) < distance(target, worst) - margin {
            debug!("found an additional eigenvalue at {} orthogonal to the converged eigenvectors", value);
            locked.push(
                value,
                candidate.vectors.remove(0),
                candidate.residuals.remove(0),
            );
            locked = locked.select(target, count);
        } else {
            complete = true;
        }
    }

    info!(
        "sparse eigensolver converged after {} iterations ({} eigenpairs)",
        search.iterations, count
    );
    return Ok(sorted_result(size, locked));
}

/// Rayleigh-Ritz projection of the Hamiltonian in the space spanned by the
/// orthonormal `vectors`, in the orthogonal complement of the `locked`
/// eigenvectors
fn rayleigh_ritz(hamiltonian: &Hamiltonian, locked: &[Array1<Complex64>], vectors: &[Array1<Complex64>]) -> RitzPairs {
    let size = hamiltonian.size();
    let images = vectors.iter().map(|v| {
        let mut image = hamiltonian.dot(v.view());
        orthogonalize(locked, &[], &mut image);
        image
    }).collect::<Vec<_>>();
    let eigen = HermitianEigen::new(projection(vectors, &images));

    let mut pairs = RitzPairs::default();
    for (i, &value) in eigen.eigenvalues.iter().enumerate() {
        let coefficients = eigen.eigenvectors.column(i);
        let vector = combine(size, vectors, coefficients);
        let mut residual = combine(size, &images, coefficients);
        residual.scaled_add(Complex64::new(-value, 0.0), &vector);
        pairs.push(value, vector, residual);
    }
    return pairs;
}

fn sorted_result(size: usize, pairs: RitzPairs) -> (Array1<f64>, Array2<Complex64>) {
    let mut indexes = (0..pairs.len()).collect::<Vec<_>>();
    indexes.sort_by(|&a, &b| pairs.values[a].total_cmp(&pairs.values[b]));

    let eigenvalues = indexes.iter().map(|&i| pairs.values[i]).collect::<Array1<_>>();
    let mut eigenvectors = Array2::from_elem((size, indexes.len()), Complex64::zero());
    for (column, &i) in indexes.iter().enumerate() {
        let vector = &pairs.vectors[i];
        let norm = norm(vector.view());
        for (row, value) in vector.iter().enumerate() {
            eigenvectors[[row, column]] = *value / norm;
        }
    }

    return (eigenvalues, eigenvectors);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_vectors() {
        let mut first = LcgRng::new(12);
        let mut second = LcgRng::new(12);
        assert_eq!(first.vector(10), second.vector(10));

        let vector = LcgRng::new(3).vector(25);
        approx::assert_relative_eq!(norm(vector.view()), 1.0, epsilon = 1e-14);

        let other = LcgRng::new(4).vector(25);
        assert_ne!(vector, other);
    }

    #[test]
    fn gram_schmidt() {
        let mut rng = LcgRng::new(0);
        let mut locked: Vec<Array1<Complex64>> = Vec::new();
        for _ in 0..2 {
            let mut vector = rng.vector(8);
            let norm = orthogonalize(&[], &locked, &mut vector);
            vector.mapv_inplace(|v| v / norm);
            locked.push(vector);
        }

        let mut basis: Vec<Array1<Complex64>> = Vec::new();
        for _ in 0..4 {
            let mut vector = rng.vector(8);
            let norm = orthogonalize(&locked, &basis, &mut vector);
            vector.mapv_inplace(|v| v / norm);
            basis.push(vector);
        }

        let all = locked.iter().chain(&basis).cloned().collect::<Vec<_>>();
        let overlap = projection(&all, &all);
        for i in 0..6 {
            for j in 0..6 {
                let expected = if i == j { 1.0 } else { 0.0 };
                approx::assert_relative_eq!(overlap[[i, j]].re, expected, epsilon = 1e-14);
                approx::assert_relative_eq!(overlap[[i, j]].im, 0.0, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn select_pairs() {
        let mut pairs = RitzPairs::default();
        for &value in &[0.5, -2.0, 1.2, -0.1] {
            pairs.push(value, Array1::from_elem(2, Complex64::new(value, 0.0)), Array1::zeros(2));
        }

        let nearest = pairs.select(SparseTarget::Nearest { energy: 1.0 }, 3);
        assert_eq!(nearest.values, [1.2, 0.5, -0.1]);
        assert_eq!(nearest.vectors[0][0], Complex64::new(1.2, 0.0));

        let largest = nearest.select(SparseTarget::LargestAlgebraic, 2);
        assert_eq!(largest.values, [1.2, 0.5]);

        let smallest = largest.select(SparseTarget::SmallestAlgebraic, 5);
        assert_eq!(smallest.values, [0.5, 1.2]);
    }

    #[test]
    fn repeated_eigenvalues() {
        // block diagonal matrix with two copies of the same 6x6 chain, so
        // each eigenvalue appears twice
        let mut triplets = Vec::new();
        for block in 0..2 {
            for i in 0..5 {
                let a = 6 * block + i;
                triplets.push((a, a + 1, Complex64::new(-1.0, 0.0)));
                triplets.push((a + 1, a, Complex64::new(-1.0, 0.0)));
            }
        }
        let hamiltonian = Hamiltonian::from_triplets(12, triplets, 1e-12).unwrap();
        let dense = HermitianEigen::new(hamiltonian.to_dense());

        let mut parameters = SparseSolverParameters::new(3);
        parameters.subspace_size = Some(8);
        let (eigenvalues, eigenvectors) = thick_restart_lanczos(&hamiltonian, &parameters).unwrap();

        approx::assert_relative_eq!(eigenvalues[0], dense.eigenvalues[0], epsilon = 1e-8);
        approx::assert_relative_eq!(eigenvalues[1], dense.eigenvalues[1], epsilon = 1e-8);
        approx::assert_relative_eq!(eigenvalues[2], dense.eigenvalues[2], epsilon = 1e-8);
        approx::assert_relative_eq!(eigenvalues[0], eigenvalues[1], epsilon = 1e-8);

        // the two copies are orthogonal
        let overlap = inner(eigenvectors.column(0), eigenvectors.column(1));
        assert!(overlap.norm() < 1e-8);
    }
}
