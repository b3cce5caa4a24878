//! The `UnitCell` type represents the repeating unit of a periodic lattice,
//! with one, two or three periodic directions.
use crate::{Error, Matrix3, Vector3D};

/// An `UnitCell` defines the translation vectors of a periodic lattice.
///
/// Lattices with less than three primitive vectors are periodic only along
/// these vectors. The missing directions are filled with unit vectors
/// orthogonal to the periodic ones, so that fractional coordinates along the
/// periodic directions do not depend on the position along the non-periodic
/// directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    /// Unit cell matrix, one lattice vector per row
    matrix: Matrix3,
    /// Transpose of the unit cell matrix, cached from matrix
    transpose: Matrix3,
    /// Inverse of the transpose of the unit cell matrix, cached from matrix
    inverse: Matrix3,
    /// Number of periodic directions, the first `periodic` rows of the matrix
    periodic: usize,
}

impl UnitCell {
    /// Create a new unit cell from one to three primitive lattice vectors
    pub fn from_vectors(vectors: &[Vector3D]) -> Result<UnitCell, Error> {
        if vectors.is_empty() || vectors.len() > 3 {
            return Err(Error::Configuration(format!(
                "expected between 1 and 3 lattice vectors, got {}", vectors.len()
            )));
        }

        for (i, vector) in vectors.iter().enumerate() {
            if !vector.is_finite() || vector.norm2() == 0.0 {
                return Err(Error::Configuration(format!(
                    "lattice vector {} must be finite and non-zero, got {:?}", i, vector
                )));
            }
        }

        let (a, b, c) = match *vectors {
            [a] => {
                // use the cartesian axis least aligned with `a` to build
                // the two orthogonal directions
                let mut axis = 0;
                for i in 1..3 {
                    if f64::abs(a[i]) < f64::abs(a[axis]) {
                        axis = i;
                    }
                }
                let mut e = Vector3D::zero();
                e[axis] = 1.0;

                let b = (a ^ e).normalized();
                let c = (a ^ b).normalized();
                (a, b, c)
            }
            [a, b] => (a, b, (a ^ b).normalized()),
            [a, b, c] => (a, b, c),
            _ => unreachable!(),
        };

        let matrix = Matrix3::from_rows(a, b, c);
        let scale = a.norm() * b.norm() * c.norm();
        if f64::abs(matrix.determinant()) <= 1e-10 * scale {
            return Err(Error::Configuration(
                "lattice vectors are not linearly independent".into()
            ));
        }

        return Ok(UnitCell {
            matrix: matrix,
            transpose: matrix.transposed(),
            inverse: matrix.transposed().inverse(),
            periodic: vectors.len(),
        });
    }

    /// Get the number of periodic directions of this cell
    pub fn periodic_dimensions(&self) -> usize {
        self.periodic
    }

    /// Get the matricial representation of the unit cell, including the
    /// padding vectors for non-periodic directions
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// Get the lattice vector along the given axis
    pub fn vector(&self, axis: usize) -> Vector3D {
        self.matrix[axis].into()
    }

    /// Get the reciprocal (dual) vector of the given axis, such that the
    /// fractional coordinate along `axis` of a point `r` is `dual * r`.
    pub fn dual_vector(&self, axis: usize) -> Vector3D {
        self.inverse[axis].into()
    }

    /// Get the fractional representation of the `vector` in this cell
    pub fn fractional(&self, vector: Vector3D) -> Vector3D {
        // this needs to use the inverse of the transpose of the matrix, since
        // we only have code to multiply a vector by a matrix on the left
        return self.inverse * vector;
    }

    /// Get the Cartesian representation of the `fractional` vector in this
    /// cell
    pub fn cartesian(&self, fractional: Vector3D) -> Vector3D {
        return self.transpose * fractional;
    }

    /// Get the Cartesian displacement corresponding to a translation by the
    /// given integer number of unit cells along each lattice vector.
    pub fn translation(&self, cell: [i32; 3]) -> Vector3D {
        let m = &self.matrix;
        let x = m[0][0] * cell[0] as f64 + m[1][0] * cell[1] as f64 + m[2][0] * cell[2] as f64;
        let y = m[0][1] * cell[0] as f64 + m[1][1] * cell[1] as f64 + m[2][1] * cell[2] as f64;
        let z = m[0][2] * cell[0] as f64 + m[1][2] * cell[1] as f64 + m[2][2] * cell[2] as f64;
        Vector3D::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn invalid_vectors() {
        let error = UnitCell::from_vectors(&[]).unwrap_err();
        assert_eq!(error.to_string(), "configuration error: expected between 1 and 3 lattice vectors, got 0");

        let error = UnitCell::from_vectors(&[Vector3D::zero()]).unwrap_err();
        assert!(error.to_string().contains("must be finite and non-zero"));

        let error = UnitCell::from_vectors(&[
            Vector3D::new(1.0, 0.0, 0.0),
            Vector3D::new(2.0, 0.0, 0.0),
        ]).unwrap_err();
        assert!(error.to_string().contains("not linearly independent"));
    }

    #[test]
    fn padding() {
        let cell = UnitCell::from_vectors(&[Vector3D::new(1.0, 1.0, 0.0)]).unwrap();
        assert_eq!(cell.periodic_dimensions(), 1);
        let a = cell.vector(0);
        let b = cell.vector(1);
        let c = cell.vector(2);
        assert_ulps_eq!(a * b, 0.0);
        assert_ulps_eq!(a * c, 0.0);
        assert_ulps_eq!(b * c, 0.0);
        assert_ulps_eq!(b.norm(), 1.0);
        assert_ulps_eq!(c.norm(), 1.0);

        let cell = UnitCell::from_vectors(&[
            Vector3D::new(1.0, 0.0, 0.0),
            Vector3D::new(0.5, 0.8, 0.0),
        ]).unwrap();
        assert_eq!(cell.periodic_dimensions(), 2);
        assert_eq!(cell.vector(2), Vector3D::new(0.0, 0.0, 1.0));

        // moving along the padding vector does not change the periodic
        // fractional coordinates
        let fractional = cell.fractional(Vector3D::new(0.3, 0.4, 12.0));
        assert_ulps_eq!(fractional[0], 0.05, epsilon = 1e-14);
        assert_ulps_eq!(fractional[1], 0.5, epsilon = 1e-14);
        assert_ulps_eq!(fractional[2], 12.0, epsilon = 1e-14);
    }

    #[test]
    fn fractional_cartesian() {
        let cell = UnitCell::from_vectors(&[
            Vector3D::new(0.24595, 0.0, 0.0),
            Vector3D::new(0.122975, 0.2130, 0.0),
        ]).unwrap();

        let position = Vector3D::new(0.3, -0.2, 0.0);
        let back = cell.cartesian(cell.fractional(position));
        assert_ulps_eq!(back[0], position[0], epsilon = 1e-15);
        assert_ulps_eq!(back[1], position[1], epsilon = 1e-15);
        assert_ulps_eq!(back[2], position[2], epsilon = 1e-15);

        let shift = cell.translation([1, -1, 0]);
        assert_ulps_eq!(shift[0], 0.122975);
        assert_ulps_eq!(shift[1], -0.2130);
        assert_eq!(shift[2], 0.0);

        assert_ulps_eq!(cell.dual_vector(0) * cell.vector(0), 1.0, epsilon = 1e-14);
        assert_ulps_eq!(cell.dual_vector(0) * cell.vector(1), 0.0, epsilon = 1e-15);
    }
}
