// Eigen decomposition of Hermitian matrices. The QL iterations on the real
// tridiagonal matrix are adapted from https://github.com/xasmx/rust-la, which
// is a Rust port of the JAMA implementation
// https://en.wikipedia.org/wiki/JAMA_(numerical_linear_algebra_library)

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use num_traits::Zero;

/// Eigendecomposition of a complex Hermitian matrix into eigenvalues and
/// eigenvectors
#[derive(Debug, Clone)]
pub struct HermitianEigen {
    /// Eigenvalues of the input matrix, sorted in increasing order
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors of the input matrix, stored as columns
    pub eigenvectors: Array2<Complex64>,
}

impl HermitianEigen {
    // Householder reduction of a Hermitian matrix to tridiagonal form. On
    // output, `matrix` is tridiagonal and `transform` contains the unitary
    // matrix Q such that input = Q * matrix * Q^H.
    #[allow(clippy::needless_range_loop)]
    fn tridiagonalize(matrix: &mut Array2<Complex64>, transform: &mut Array2<Complex64>) {
        let n = matrix.nrows();
        let mut u = vec![Complex64::zero(); n];
        let mut p = vec![Complex64::zero(); n];

        for k in 0..n.saturating_sub(2) {
            let norm = f64::sqrt(((k + 1)..n).map(|i| matrix[[i, k]].norm_sqr()).sum::<f64>());
            if norm == 0.0 {
                continue;
            }

            // Householder vector reflecting the column below the diagonal
            // onto alpha * e_{k + 1}
            let x0 = matrix[[k + 1, k]];
            let phase = if x0.norm() > 0.0 { x0 / x0.norm() } else { Complex64::new(1.0, 0.0) };
            let alpha = -phase * norm;

            for i in 0..n {
                u[i] = if i > k { matrix[[i, k]] } else { Complex64::zero() };
            }
            u[k + 1] -= alpha;

            let u_norm = f64::sqrt(u.iter().map(|v| v.norm_sqr()).sum::<f64>());
            if u_norm == 0.0 {
                continue;
            }
            for v in &mut u {
                *v /= u_norm;
            }

            // p = A u, and w = p - (u^H p) u
            for i in k..n {
                let mut sum = Complex64::zero();
                for j in (k + 1)..n {
                    sum += matrix[[i, j]] * u[j];
                }
                p[i] = sum;
            }
            let mut c = Complex64::zero();
            for i in (k + 1)..n {
                c += u[i].conj() * p[i];
            }
            for i in k..n {
                p[i] -= c * u[i];
            }

            // A <- (I - 2 u u^H) A (I - 2 u u^H) = A - 2 u w^H - 2 w u^H
            for i in k..n {
                for j in k..n {
                    let update = u[i] * p[j].conj() + p[i] * u[j].conj();
                    matrix[[i, j]] -= 2.0 * update;
                }
            }

            // Q <- Q (I - 2 u u^H)
            for i in 0..n {
                let mut qu = Complex64::zero();
                for j in (k + 1)..n {
                    qu += transform[[i, j]] * u[j];
                }
                for j in (k + 1)..n {
                    transform[[i, j]] -= 2.0 * qu * u[j].conj();
                }
            }
        }
    }

    // Symmetric tridiagonal QL algorithm, derived from the Algol procedures
    // tql2, by Bowdler, Martin, Reinsch, and Wilkinson, Handbook for Auto.
    // Comp., Vol.ii-Linear Algebra, and the corresponding Fortran subroutine
    // in EISPACK.
    //
    // On input, `diagonal` and `off_diagonal[1..]` contain the real
    // tridiagonal matrix. On output, `diagonal` contains the eigenvalues in
    // increasing order, and the eigenvectors are accumulated into the columns
    // of `rotations`.
    #[allow(clippy::many_single_char_names)]
    fn tridiagonal_ql(diagonal: &mut Array1<f64>, rotations: &mut Array2<f64>, off_diagonal: &mut [f64]) {
        let n = diagonal.len();
        debug_assert_eq!(off_diagonal.len(), n);
        debug_assert_eq!(rotations.len(), n * n);

        for i in 1..n {
            off_diagonal[i - 1] = off_diagonal[i];
        }
        off_diagonal[n - 1] = 0.0;

        let mut f = 0.0;
        let mut scale = 0.0f64;
        for l in 0..n {
            // Find small subdiagonal element
            scale = scale.max(f64::abs(diagonal[l]) + f64::abs(off_diagonal[l]));
            let mut m = l;
            while m < n {
                if f64::abs(off_diagonal[m]) <= (f64::EPSILON * scale) {
                    break;
                }
                m += 1;
            }

            // If m == l, diagonal[l] is an eigenvalue, otherwise, iterate.
            if m > l {
                loop {
                    // Compute implicit shift
                    let mut g = diagonal[l];
                    let mut p = (diagonal[l + 1] - g) / (2.0 * off_diagonal[l]);
                    let mut r = f64::hypot(p, 1.0);
                    if p < 0.0 {
                        r = -r;
                    }
                    diagonal[l] = off_diagonal[l] / (p + r);
                    diagonal[l + 1] = off_diagonal[l] * (p + r);
                    let next_diagonal = diagonal[l + 1];
                    let mut h = g - diagonal[l];
                    for i in (l + 2)..n {
                        diagonal[i] -= h;
                    }
                    f += h;

                    // Implicit QL transformation.
                    p = diagonal[m];
                    let mut c = 1.0;
                    let mut c2 = c;
                    let mut c3 = c;
                    let next_off_diagonal = off_diagonal[l + 1];
                    let mut s = 0.0;
                    let mut s2 = 0.0;
                    for i in (l..m).rev() {
                        c3 = c2;
                        c2 = c;
                        s2 = s;
                        g = c * off_diagonal[i];
                        h = c * p;
                        r = f64::hypot(p, off_diagonal[i]);
                        off_diagonal[i + 1] = s * r;
                        s = off_diagonal[i] / r;
                        c = p / r;
                        p = c * diagonal[i] - s * g;
                        diagonal[i + 1] = h + s * (c * g + s * diagonal[i]);

                        // Accumulate transformation.
                        for k in 0..n {
                            h = rotations[[k, (i + 1)]];
                            rotations[[k, (i + 1)]] = s * rotations[[k, i]] + c * h;
                            rotations[[k, i]] = c * rotations[[k, i]] - s * h;
                        }
                    }
                    p = -s * s2 * c3 * next_off_diagonal * off_diagonal[l] / next_diagonal;
                    off_diagonal[l] = s * p;
                    diagonal[l] = c * p;

                    // Check for convergence.
                    if f64::abs(off_diagonal[l]) <= (f64::EPSILON * scale) {
                        break;
                    }
                }
            }
            diagonal[l] += f;
            off_diagonal[l] = 0.0;
        }

        // Bubble sort eigenvalues and corresponding vectors.
        for i in 0..(n - 1) {
            let mut k = i;
            let mut p = diagonal[i];
            for j in (i + 1)..n {
                if diagonal[j] < p {
                    k = j;
                    p = diagonal[j];
                }
            }
            if k != i {
                // Swap eigenvalues and rotation columns k and i
                diagonal[k] = diagonal[i];
                diagonal[i] = p;
                for j in 0..n {
                    p = rotations[[j, i]];
                    rotations[[j, i]] = rotations[[j, k]];
                    rotations[[j, k]] = p;
                }
            }
        }
    }

    /// Compute the eigendecomposition of a Hermitian complex matrix
    pub fn new(matrix: Array2<Complex64>) -> HermitianEigen {
        assert_eq!(matrix.nrows(), matrix.ncols());

        let n = matrix.ncols();
        if n == 0 {
            return HermitianEigen {
                eigenvalues: Array1::zeros(0),
                eigenvectors: Array2::zeros((0, 0)),
            };
        }

        let mut matrix = matrix;
        let mut transform = Array2::from_diag_elem(n, Complex64::new(1.0, 0.0));
        HermitianEigen::tridiagonalize(&mut matrix, &mut transform);

        // T = D T_real D^H where D is a diagonal matrix of phases making the
        // off-diagonal elements of T_real real and non-negative
        let mut phases = vec![Complex64::new(1.0, 0.0); n];
        let mut eigenvalues = Array1::from_elem(n, 0.0);
        let mut off_diagonal = vec![0.0; n];
        eigenvalues[0] = matrix[[0, 0]].re;
        for i in 1..n {
            let element = matrix[[i, i - 1]];
            let magnitude = element.norm();
            phases[i] = if magnitude > 0.0 {
                phases[i - 1] * element / magnitude
            } else {
                phases[i - 1]
            };
            eigenvalues[i] = matrix[[i, i]].re;
            off_diagonal[i] = magnitude;
        }

        let mut rotations = Array2::from_diag_elem(n, 1.0);
        HermitianEigen::tridiagonal_ql(&mut eigenvalues, &mut rotations, &mut off_diagonal);

        // eigenvectors = Q D Z
        let mut eigenvectors = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                let mut sum = Complex64::zero();
                for l in 0..n {
                    sum += transform[[i, l]] * phases[l] * rotations[[l, j]];
                }
                eigenvectors[[i, j]] = sum;
            }
        }

        HermitianEigen {
            eigenvalues,
            eigenvectors,
        }
    }

    /// Recreate the input matrix from the eigenvalues and eigenvectors
    pub fn recompose(&self) -> Array2<Complex64> {
        let eigenvalues = self.eigenvalues.mapv(|e| Complex64::new(e, 0.0));
        let result = self.eigenvectors.dot(&Array2::from_diag(&eigenvalues));
        return result.dot(&self.eigenvectors.t().mapv(|v| v.conj()));
    }
}
