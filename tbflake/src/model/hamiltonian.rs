use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use num_traits::Zero;

use crate::Error;
use super::{Bond, Sites};

/// Hermitian Hamiltonian of a finite model, stored in compressed sparse row
/// format. Row and column indexes are global site indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct Hamiltonian {
    size: usize,
    /// start of each row in `columns` and `values`, with `size + 1` entries
    row_offsets: Vec<usize>,
    /// column index of the stored entries, sorted within each row
    columns: Vec<usize>,
    values: Vec<Complex64>,
}

impl Hamiltonian {
    /// Create a `size x size` Hamiltonian from `(row, column, value)`
    /// triplets. Values given multiple times for the same entry are summed.
    ///
    /// The resulting matrix must be Hermitian: for each entry, the difference
    /// between `H[i, j]` and `conj(H[j, i])` must be below `tolerance` (relative
    /// to the magnitude of the entry).
    pub fn from_triplets<I>(size: usize, triplets: I, tolerance: f64) -> Result<Hamiltonian, Error>
        where I: IntoIterator<Item = (usize, usize, Complex64)>
    {
        let mut rows = vec![BTreeMap::<usize, Complex64>::new(); size];
        for (i, j, value) in triplets {
            if i >= size || j >= size {
                return Err(Error::Dimension(format!(
                    "entry ({}, {}) is out of bounds for a Hamiltonian of size {}", i, j, size
                )));
            }
            *rows[i].entry(j).or_insert_with(Complex64::zero) += value;
        }

        for (i, row) in rows.iter().enumerate() {
            for (&j, &value) in row {
                let transposed = rows[j].get(&i).copied().unwrap_or_else(Complex64::zero);
                let difference = (value - transposed.conj()).norm();
                if difference > tolerance * f64::max(1.0, value.norm()) {
                    return Err(Error::Configuration(format!(
                        "the Hamiltonian is not Hermitian: H[{}, {}] = {} but H[{}, {}] = {}",
                        i, j, value, j, i, transposed
                    )));
                }
            }
        }

        let mut row_offsets = Vec::with_capacity(size + 1);
        let mut columns = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);
        for row in rows {
            for (j, value) in row {
                columns.push(j);
                values.push(value);
            }
            row_offsets.push(columns.len());
        }

        return Ok(Hamiltonian {
            size: size,
            row_offsets: row_offsets,
            columns: columns,
            values: values,
        });
    }

    /// Assemble the Hamiltonian of a finite model from its `sites`, `bonds`
    /// and the `onsite` energies of each sublattice. Diagonal entries are
    /// always stored, even when the onsite energy is zero.
    #[time_graph::instrument(name = "Hamiltonian::assemble")]
    pub fn assemble(sites: &Sites, bonds: &[Bond], onsite: &[f64], tolerance: f64) -> Result<Hamiltonian, Error> {
        let sublattices = sites.sublattices();
        if let Some(&max) = sublattices.iter().max() {
            if max >= onsite.len() {
                return Err(Error::Dimension(format!(
                    "missing onsite energy for sublattice {}, only {} were given",
                    max, onsite.len()
                )));
            }
        }

        let diagonal = sublattices.into_iter()
            .enumerate()
            .map(|(i, sublattice)| (i, i, Complex64::new(onsite[sublattice], 0.0)));
        let hoppings = bonds.iter().map(|bond| (bond.from, bond.to, bond.energy));

        return Hamiltonian::from_triplets(sites.len(), diagonal.chain(hoppings), tolerance);
    }

    /// Get the number of rows (and columns) of this Hamiltonian
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check if this Hamiltonian has no rows
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the number of explicitly stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterate over the stored `(column, value)` entries of row `i`
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, Complex64)> + '_ {
        let range = self.row_offsets[i]..self.row_offsets[i + 1];
        self.columns[range.clone()].iter().copied().zip(self.values[range].iter().copied())
    }

    /// Get the entry at row `i` and column `j`, which is zero if the entry
    /// is not stored.
    pub fn get(&self, i: usize, j: usize) -> Complex64 {
        let start = self.row_offsets[i];
        let stop = self.row_offsets[i + 1];
        match self.columns[start..stop].binary_search(&j) {
            Ok(position) => self.values[start + position],
            Err(_) => Complex64::zero(),
        }
    }

    /// Get the (real) diagonal of this Hamiltonian
    pub fn diagonal(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.size, |i| self.get(i, i).re)
    }

    /// Get the trace of this Hamiltonian
    pub fn trace(&self) -> f64 {
        self.diagonal().sum()
    }

    /// Compute the matrix-vector product `H x`
    pub fn dot(&self, x: ArrayView1<Complex64>) -> Array1<Complex64> {
        assert_eq!(x.len(), self.size, "wrong vector size in Hamiltonian::dot");
        let mut result = Array1::zeros(self.size);
        for (i, output) in result.iter_mut().enumerate() {
            let mut sum = Complex64::zero();
            for k in self.row_offsets[i]..self.row_offsets[i + 1] {
                sum += self.values[k] * x[self.columns[k]];
            }
            *output = sum;
        }
        return result;
    }

    /// Convert this Hamiltonian to a dense matrix
    pub fn to_dense(&self) -> Array2<Complex64> {
        let mut dense = Array2::zeros((self.size, self.size));
        for i in 0..self.size {
            for (j, value) in self.row(i) {
                dense[[i, j]] = value;
            }
        }
        return dense;
    }

    /// Get an upper bound of the spectral radius of this Hamiltonian, as the
    /// maximal absolute row sum.
    pub fn norm_bound(&self) -> f64 {
        (0..self.size)
            .map(|i| self.row(i).map(|(_, value)| value.norm()).sum::<f64>())
            .fold(0.0, f64::max)
    }
}
