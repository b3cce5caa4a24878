//! Geometric regions used to cut a finite model out of an infinite lattice.
//!
//! A [`Shape`] provides a bounding box (used to restrict the lattice
//! enumeration) and a batched containment predicate.
use crate::{Error, Vector3D};

mod polygon;
pub use self::polygon::Polygon;

mod freeform;
pub use self::freeform::FreeformShape;

/// Axis-aligned bounding box. Bounds can be infinite along directions where
/// the shape is not limited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// lower corner of the box
    pub min: Vector3D,
    /// upper corner of the box
    pub max: Vector3D,
}

impl BoundingBox {
    /// Create a new bounding box from its lower and upper corners
    pub fn new(min: Vector3D, max: Vector3D) -> BoundingBox {
        BoundingBox { min, max }
    }

    /// Create a new bounding box centered on `center`, extending by
    /// `half_widths` in each direction
    pub fn from_center(center: Vector3D, half_widths: Vector3D) -> BoundingBox {
        BoundingBox {
            min: center - half_widths,
            max: center + half_widths,
        }
    }

    /// Check if the `point` is strictly inside this box. Points on the faces
    /// of the box are outside, which means that a box with zero width along
    /// any axis does not contain any point.
    pub fn contains(&self, point: Vector3D) -> bool {
        (0..3).all(|i| self.min[i] < point[i] && point[i] < self.max[i])
    }

    /// Check if this box can not contain any point
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| !(self.min[i] < self.max[i]))
    }
}

/// Data used to draw a shape, see [`Shape::outline`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    /// Closed polygon in the xy plane
    Polygon {
        /// vertices of the polygon, in order
        vertices: Vec<[f64; 2]>,
    },
    /// The shape is only known through its bounding box and containment
    /// predicate
    Box(BoundingBox),
}

/// A `Shape` selects which sites of an infinite lattice are part of a finite
/// model.
pub trait Shape: Send + Sync {
    /// Get the bounding box of this shape. All points for which `contains`
    /// returns `true` must be strictly inside this box.
    fn bounding_box(&self) -> BoundingBox;

    /// Check if each point in `points` is inside the shape. The returned
    /// vector must have the same length as `points`, and evaluating the same
    /// point multiple times must give the same result.
    fn contains(&self, points: &[Vector3D]) -> Result<Vec<bool>, Error>;

    /// Get the data required to draw this shape
    fn outline(&self) -> Outline;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box() {
        let bbox = BoundingBox::from_center(Vector3D::new(1.0, 0.0, 0.0), Vector3D::new(1.0, 2.0, 0.5));
        assert_eq!(bbox.min, Vector3D::new(0.0, -2.0, -0.5));
        assert_eq!(bbox.max, Vector3D::new(2.0, 2.0, 0.5));
        assert!(!bbox.is_empty());

        assert!(bbox.contains(Vector3D::new(1.5, 1.0, 0.0)));
        assert!(!bbox.contains(Vector3D::new(2.0, 1.0, 0.0)));
        assert!(!bbox.contains(Vector3D::new(1.0, 1.0, -0.6)));

        let flat = BoundingBox::from_center(Vector3D::zero(), Vector3D::new(1.0, 1.0, 0.0));
        assert!(flat.is_empty());
        assert!(!flat.contains(Vector3D::zero()));

        let infinite = BoundingBox::new(
            Vector3D::new(-1.0, -1.0, f64::NEG_INFINITY),
            Vector3D::new(1.0, 1.0, f64::INFINITY),
        );
        assert!(infinite.contains(Vector3D::new(0.0, 0.0, 1e300)));
    }
}
