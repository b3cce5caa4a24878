//! Factorization of a shifted Hamiltonian, used to apply `(H - shift)^-1`
//! in shift-invert iterations.
//!
//! Sites of finite models are indexed cell after cell, so the Hamiltonian is
//! a banded matrix, and we use a banded LU decomposition with partial
//! pivoting. Pivoting makes the upper factor grow to twice the bandwidth of
//! the Hamiltonian, but never outside of it.
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use num_traits::Zero;

use crate::model::Hamiltonian;

/// Pivots smaller than this (relative to the norm of the shifted matrix)
/// indicate that the shift is an eigenvalue of the Hamiltonian
const SINGULAR_PIVOT: f64 = 1e-14;

/// LU decomposition of `H - shift` with partial pivoting
pub(super) struct ShiftInvert {
    shift: f64,
    /// number of non-zero diagonals below (and above) the main diagonal of H
    bandwidth: usize,
    /// `factors[[k, j + bandwidth - k]]` contains the entry at row `k` and
    /// column `j` of the upper factor
    factors: Array2<Complex64>,
    /// `multipliers[[k, r]]` is the multiple of row `k` removed from row
    /// `k + 1 + r` during the `k`-th elimination step
    multipliers: Array2<Complex64>,
    /// row exchanged with row `k` before the `k`-th elimination step
    pivots: Vec<usize>,
}

/// Get the number of non-zero diagonals below the main diagonal of the
/// (Hermitian) `hamiltonian`
fn bandwidth(hamiltonian: &Hamiltonian) -> usize {
    let mut bandwidth = 0;
    for i in 0..hamiltonian.size() {
        for (j, _) in hamiltonian.row(i) {
            if i > j {
                bandwidth = usize::max(bandwidth, i - j);
            }
        }
    }
    return bandwidth;
}

impl ShiftInvert {
    /// Factorize `hamiltonian - shift`. This returns `None` if the shifted
    /// matrix is singular to working precision.
    pub(super) fn new(hamiltonian: &Hamiltonian, shift: f64) -> Option<ShiftInvert> {
        let size = hamiltonian.size();
        let w = bandwidth(hamiltonian);

        // work[[i, j + w - i]] contains the entry at row i and column j, for
        // columns between i - w and i + 2w
        let mut work = Array2::from_elem((size, 3 * w + 1), Complex64::zero());
        for i in 0..size {
            for (j, value) in hamiltonian.row(i) {
                work[[i, j + w - i]] = value;
            }
            work[[i, w]] -= Complex64::new(shift, 0.0);
        }

        let scale = f64::max(hamiltonian.norm_bound() + f64::abs(shift), f64::MIN_POSITIVE);
        let mut multipliers = Array2::from_elem((size, w), Complex64::zero());
        let mut pivots = Vec::with_capacity(size);

        for k in 0..size {
            let last_row = usize::min(k + w, size - 1);
            let last_column = usize::min(k + 2 * w, size - 1);

            let mut pivot = k;
            for i in (k + 1)..=last_row {
                if work[[i, k + w - i]].norm() > work[[pivot, k + w - pivot]].norm() {
                    pivot = i;
                }
            }

            if work[[pivot, k + w - pivot]].norm() <= SINGULAR_PIVOT * scale {
                return None;
            }
            pivots.push(pivot);

            if pivot != k {
                for j in k..=last_column {
                    let value = work[[k, j + w - k]];
                    work[[k, j + w - k]] = work[[pivot, j + w - pivot]];
                    work[[pivot, j + w - pivot]] = value;
                }
            }

            let diagonal = work[[k, w]];
            for i in (k + 1)..=last_row {
                let factor = work[[i, k + w - i]] / diagonal;
                multipliers[[k, i - k - 1]] = factor;
                if factor.is_zero() {
                    continue;
                }

                for j in (k + 1)..=last_column {
                    let update = factor * work[[k, j + w - k]];
                    work[[i, j + w - i]] -= update;
                }
            }
        }

        return Some(ShiftInvert {
            shift: shift,
            bandwidth: w,
            factors: work,
            multipliers: multipliers,
            pivots: pivots,
        });
    }

    /// Get the shift used in this factorization
    pub(super) fn shift(&self) -> f64 {
        self.shift
    }

    /// Compute `(H - shift)^-1 rhs`
    pub(super) fn solve(&self, rhs: ArrayView1<Complex64>) -> Array1<Complex64> {
        let size = self.pivots.len();
        let w = self.bandwidth;
        assert_eq!(rhs.len(), size, "wrong vector size in ShiftInvert::solve");

        let mut x = rhs.to_owned();
        // apply the row exchanges and eliminations in the same order as the
        // factorization
        for k in 0..size {
            x.swap(k, self.pivots[k]);
            let value = x[k];
            let last_row = usize::min(k + w, size - 1);
            for i in (k + 1)..=last_row {
                let update = self.multipliers[[k, i - k - 1]] * value;
                x[i] -= update;
            }
        }

        // back substitution with the upper factor
        for k in (0..size).rev() {
            let last_column = usize::min(k + 2 * w, size - 1);
            let mut sum = x[k];
            for j in (k + 1)..=last_column {
                sum -= self.factors[[k, j + w - k]] * x[j];
            }
            x[k] = sum / self.factors[[k, w]];
        }

        return x;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    use super::*;
    use crate::lattice::test_utils::test_lattice;
    use crate::model::Model;
    use crate::shapes::Polygon;

    fn check_solution(hamiltonian: &Hamiltonian, shift: f64, rhs: &Array1<Complex64>) {
        let factorization = ShiftInvert::new(hamiltonian, shift).unwrap();
        let x = factorization.solve(rhs.view());

        // (H - shift) x = rhs
        let mut product = hamiltonian.dot(x.view());
        product.scaled_add(Complex64::new(-shift, 0.0), &x);
        for (actual, expected) in product.iter().zip(rhs) {
            assert_relative_eq!(actual.re, expected.re, epsilon = 1e-10);
            assert_relative_eq!(actual.im, expected.im, epsilon = 1e-10);
        }
    }

    #[test]
    fn bandwidth_of_models() {
        let lattice = test_lattice("chain");
        let model = Model::new(&lattice, &Polygon::rectangle(10.5, 1.0).unwrap()).unwrap();
        assert_eq!(bandwidth(model.hamiltonian()), 1);

        // 5 sites in each row of the square
        let lattice = test_lattice("square");
        let model = Model::new(&lattice, &Polygon::rectangle(5.0, 5.0).unwrap()).unwrap();
        assert_eq!(model.size(), 25);
        assert_eq!(bandwidth(model.hamiltonian()), 5);

        let diagonal = Hamiltonian::from_triplets(3, vec![
            (0, 0, Complex64::new(1.0, 0.0)),
            (2, 2, Complex64::new(-1.0, 0.0)),
        ], 1e-12).unwrap();
        assert_eq!(bandwidth(&diagonal), 0);
        check_solution(&diagonal, 0.5, &Array1::from_elem(3, Complex64::new(1.0, 2.0)));
    }

    #[test]
    fn solve_shifted_systems() {
        let lattice = test_lattice("honeycomb");
        let model = Model::new(&lattice, &Polygon::regular(6, 0.8, 0.1).unwrap()).unwrap();
        let hamiltonian = model.hamiltonian();

        let rhs = Array1::from_shape_fn(hamiltonian.size(), |i| {
            Complex64::new(f64::sin(i as f64), f64::cos(3.0 * i as f64))
        });

        // shifts inside the spectrum require pivoting
        for &shift in &[0.05, 1.3, -2.1, 10.0] {
            check_solution(hamiltonian, shift, &rhs);
        }
    }

    #[test]
    fn complex_entries() {
        let hamiltonian = Hamiltonian::from_triplets(4, vec![
            (0, 1, Complex64::new(0.0, 1.0)),
            (1, 0, Complex64::new(0.0, -1.0)),
            (1, 3, Complex64::new(0.5, 0.5)),
            (3, 1, Complex64::new(0.5, -0.5)),
            (2, 2, Complex64::new(2.0, 0.0)),
            (2, 3, Complex64::new(-1.0, 0.0)),
            (3, 2, Complex64::new(-1.0, 0.0)),
        ], 1e-12).unwrap();

        let rhs = Array1::from_shape_fn(4, |i| Complex64::new(1.0, i as f64));
        check_solution(&hamiltonian, 0.3, &rhs);
        check_solution(&hamiltonian, -1.7, &rhs);
    }

    #[test]
    fn singular_shift() {
        // eigenvalues of this matrix are -1 and 1
        let hamiltonian = Hamiltonian::from_triplets(2, vec![
            (0, 1, Complex64::new(1.0, 0.0)),
            (1, 0, Complex64::new(1.0, 0.0)),
        ], 1e-12).unwrap();

        assert!(ShiftInvert::new(&hamiltonian, 1.0).is_none());
        assert!(ShiftInvert::new(&hamiltonian, -1.0).is_none());

        let factorization = ShiftInvert::new(&hamiltonian, 0.0).unwrap();
        assert_eq!(factorization.shift(), 0.0);
        check_solution(&hamiltonian, 0.0, &Array1::from_elem(2, Complex64::new(1.0, 0.0)));
    }
}
