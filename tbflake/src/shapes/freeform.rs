use std::panic::AssertUnwindSafe;

use crate::{Error, Vector3D};
use crate::errors::panic_message;
use super::{BoundingBox, Outline, Shape};

type Predicate = dyn Fn(&[Vector3D]) -> Vec<bool> + Send + Sync;

/// A shape defined by an arbitrary containment predicate, together with an
/// explicit bounding box.
///
/// The predicate is only ever evaluated on points strictly inside the
/// bounding box. It receives a batch of points, and must return one boolean
/// for each of them.
pub struct FreeformShape {
    contains: Box<Predicate>,
    center: Vector3D,
    half_widths: Vector3D,
}

impl std::fmt::Debug for FreeformShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeformShape")
            .field("center", &self.center)
            .field("half_widths", &self.half_widths)
            .finish_non_exhaustive()
    }
}

impl FreeformShape {
    /// Create a new shape from the `contains` predicate and the half-widths
    /// of the bounding box along x, y and z. The bounding box is centered on
    /// the origin, see [`FreeformShape::with_center`] to change this.
    ///
    /// Half-widths can be infinite if the shape is unbounded along some
    /// direction, but they can not be negative. A zero half-width gives an
    /// empty shape.
    pub fn new<F>(contains: F, half_widths: [f64; 3]) -> Result<FreeformShape, Error>
        where F: Fn(&[Vector3D]) -> Vec<bool> + Send + Sync + 'static
    {
        for (axis, &width) in half_widths.iter().enumerate() {
            if !(width >= 0.0) {
                return Err(Error::Configuration(format!(
                    "bounding box half-width along axis {} must be positive, got {}",
                    axis, width
                )));
            }
        }

        return Ok(FreeformShape {
            contains: Box::new(contains),
            center: Vector3D::zero(),
            half_widths: half_widths.into(),
        });
    }

    /// Create a disk of the given `radius` in the xy plane, unbounded along z
    pub fn circle(radius: f64) -> Result<FreeformShape, Error> {
        let radius2 = radius * radius;
        return FreeformShape::new(
            move |points| points.iter().map(|p| p[0] * p[0] + p[1] * p[1] < radius2).collect(),
            [radius, radius, f64::INFINITY],
        );
    }

    /// Move the center of this shape to `center`. The predicate is called
    /// with coordinates relative to the center.
    pub fn with_center(mut self, center: Vector3D) -> FreeformShape {
        self.center = center;
        self
    }

    /// Get the center of this shape
    pub fn center(&self) -> Vector3D {
        self.center
    }

    /// Get the half-widths of the bounding box of this shape
    pub fn half_widths(&self) -> Vector3D {
        self.half_widths
    }
}

impl Shape for FreeformShape {
    fn bounding_box(&self) -> BoundingBox {
        let mut min = Vector3D::zero();
        let mut max = Vector3D::zero();
        for i in 0..3 {
            // avoid inf - inf when the center is moved along an unbounded axis
            if self.half_widths[i].is_infinite() {
                min[i] = f64::NEG_INFINITY;
                max[i] = f64::INFINITY;
            } else {
                min[i] = self.center[i] - self.half_widths[i];
                max[i] = self.center[i] + self.half_widths[i];
            }
        }
        return BoundingBox::new(min, max);
    }

    fn contains(&self, points: &[Vector3D]) -> Result<Vec<bool>, Error> {
        let bbox = self.bounding_box();

        let mut in_box = Vec::new();
        let mut relative = Vec::new();
        for (i, &point) in points.iter().enumerate() {
            if bbox.contains(point) {
                in_box.push(i);
                relative.push(point - self.center);
            }
        }

        let mut result = vec![false; points.len()];
        if relative.is_empty() {
            return Ok(result);
        }

        let predicate = &self.contains;
        let inside = std::panic::catch_unwind(AssertUnwindSafe(|| predicate(&relative)))
            .map_err(|payload| Error::GeometryEvaluation(format!(
                "containment predicate failed: {}", panic_message(&*payload)
            )))?;

        if inside.len() != relative.len() {
            return Err(Error::GeometryEvaluation(format!(
                "containment predicate returned {} values for {} points",
                inside.len(), relative.len()
            )));
        }

        for (&i, is_inside) in in_box.iter().zip(inside) {
            result[i] = is_inside;
        }

        return Ok(result);
    }

    fn outline(&self) -> Outline {
        Outline::Box(self.bounding_box())
    }
}
