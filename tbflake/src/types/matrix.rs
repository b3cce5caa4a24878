use std::ops::{Index, IndexMut, Mul};

use super::Vector3D;

/// A 3x3 matrix type, stored in row major order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3([[f64; 3]; 3]);

impl Matrix3 {
    /// Create a new `Matrix3` from the given rows
    pub const fn new(data: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(data)
    }

    /// Create a matrix with all components set to 0
    pub const fn zero() -> Matrix3 {
        Matrix3([[0.0; 3]; 3])
    }

    /// Create the identity matrix
    pub const fn one() -> Matrix3 {
        Matrix3([
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ])
    }

    /// Create a matrix using the three vectors as rows
    pub fn from_rows(a: Vector3D, b: Vector3D, c: Vector3D) -> Matrix3 {
        Matrix3([a.into(), b.into(), c.into()])
    }

    /// Get the determinant of this matrix
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[2][1] * m[1][2]) -
        m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]) +
        m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Get the transposed matrix
    pub fn transposed(&self) -> Matrix3 {
        let m = &self.0;
        Matrix3([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    /// Compute the inverse of this matrix.
    ///
    /// # Panics
    ///
    /// If the matrix is not invertible
    pub fn inverse(&self) -> Matrix3 {
        let determinant = self.determinant();
        assert!(determinant.abs() > f64::EPSILON, "this matrix is not invertible");

        let m = &self.0;
        let inverse_determinant = 1.0 / determinant;
        let mut res = Matrix3::zero();
        res[0][0] = (m[1][1] * m[2][2] - m[2][1] * m[1][2]) * inverse_determinant;
        res[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inverse_determinant;
        res[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inverse_determinant;
        res[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inverse_determinant;
        res[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inverse_determinant;
        res[1][2] = (m[1][0] * m[0][2] - m[0][0] * m[1][2]) * inverse_determinant;
        res[2][0] = (m[1][0] * m[2][1] - m[2][0] * m[1][1]) * inverse_determinant;
        res[2][1] = (m[2][0] * m[0][1] - m[0][0] * m[2][1]) * inverse_determinant;
        res[2][2] = (m[0][0] * m[1][1] - m[1][0] * m[0][1]) * inverse_determinant;
        return res;
    }
}

impl Index<usize> for Matrix3 {
    type Output = [f64; 3];
    #[inline]
    fn index(&self, index: usize) -> &[f64; 3] {
        &self.0[index]
    }
}

impl IndexMut<usize> for Matrix3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut [f64; 3] {
        &mut self.0[index]
    }
}

impl_arithmetic!(
    Matrix3, Vector3D, Mul, mul, Vector3D,
    self, other,
    Vector3D::new(
        self[0][0] * other[0] + self[0][1] * other[1] + self[0][2] * other[2],
        self[1][0] * other[0] + self[1][1] * other[1] + self[1][2] * other[2],
        self[2][0] * other[0] + self[2][1] * other[1] + self[2][2] * other[2],
    )
);

impl_arithmetic!(
    Matrix3, Matrix3, Mul, mul, Matrix3,
    self, other,
    {
        let mut res = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                res[i][j] = self[i][0] * other[0][j] + self[i][1] * other[1][j] + self[i][2] * other[2][j];
            }
        }
        res
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn determinant() {
        assert_eq!(Matrix3::one().determinant(), 1.0);
        let m = Matrix3::new([
            [2.0, 0.0, 0.0],
            [1.0, 3.0, 0.0],
            [0.0, 0.0, 0.5],
        ]);
        assert_eq!(m.determinant(), 3.0);
    }

    #[test]
    fn inverse() {
        let m = Matrix3::new([
            [2.0, 1.0, 0.0],
            [1.0, 3.0, 0.5],
            [0.0, 0.2, 0.5],
        ]);
        let product = m * m.inverse();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_ulps_eq!(product[i][j], expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    #[should_panic(expected = "this matrix is not invertible")]
    fn singular() {
        let m = Matrix3::new([
            [1.0, 2.0, 0.0],
            [2.0, 4.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        let _ = m.inverse();
    }

    #[test]
    fn vector_product() {
        let m = Matrix3::new([
            [1.0, 2.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 2.0],
        ]);
        let v = Vector3D::new(1.0, 1.0, 1.0);
        assert_eq!(m * v, Vector3D::new(3.0, 1.0, 2.0));
        assert_eq!(m.transposed() * v, Vector3D::new(1.0, 3.0, 2.0));
    }
}
