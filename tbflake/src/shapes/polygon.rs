use crate::{Error, Vector3D};
use super::{BoundingBox, Outline, Shape};

/// Relative tolerance used to decide if a point lies on the outline of a
/// polygon
const EDGE_TOLERANCE: f64 = 1e-12;

/// A simple polygon in the xy plane, extruded along z.
///
/// By default the polygon extends infinitely along z, which is appropriate
/// for one and two dimensional lattices. Use [`Polygon::with_thickness`] to
/// limit the extent along z.
///
/// Points on the outline of the polygon are considered to be outside of it.
/// Self-intersecting polygons are not detected, and give unspecified results.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// vertices of the polygon, in order
    vertices: Vec<[f64; 2]>,
    /// lower and upper bounds along z
    z_range: (f64, f64),
}

impl Polygon {
    /// Create a new polygon with the given ordered `vertices`
    pub fn new(vertices: Vec<[f64; 2]>) -> Result<Polygon, Error> {
        if vertices.len() < 3 {
            return Err(Error::Configuration(format!(
                "a polygon needs at least 3 vertices, got {}", vertices.len()
            )));
        }

        if vertices.iter().any(|v| !v[0].is_finite() || !v[1].is_finite()) {
            return Err(Error::Configuration("polygon vertices must be finite".into()));
        }

        let polygon = Polygon {
            vertices: vertices,
            z_range: (f64::NEG_INFINITY, f64::INFINITY),
        };

        let bbox = polygon.bounding_box();
        if !(bbox.min[0] < bbox.max[0] && bbox.min[1] < bbox.max[1]) {
            return Err(Error::Configuration(
                "polygon has a non-positive extent along x or y".into()
            ));
        }

        return Ok(polygon);
    }

    /// Create a rectangle of the given `width` (along x) and `height` (along
    /// y), centered on the origin
    pub fn rectangle(width: f64, height: f64) -> Result<Polygon, Error> {
        let (x, y) = (0.5 * width, 0.5 * height);
        return Polygon::new(vec![[-x, -y], [x, -y], [x, y], [-x, y]]);
    }

    /// Create a regular polygon with `num_sides` sides, with vertices at the
    /// given `radius` from the origin. The first vertex is at `angle`
    /// (in radians) from the x axis.
    pub fn regular(num_sides: usize, radius: f64, angle: f64) -> Result<Polygon, Error> {
        if radius <= 0.0 {
            return Err(Error::Configuration(format!(
                "regular polygon radius must be positive, got {}", radius
            )));
        }

        let vertices = (0..num_sides).map(|i| {
            let theta = angle + 2.0 * std::f64::consts::PI * i as f64 / num_sides as f64;
            [radius * f64::cos(theta), radius * f64::sin(theta)]
        }).collect();

        return Polygon::new(vertices);
    }

    /// Limit the extent of this polygon along z to `z_min < z < z_max`
    pub fn with_thickness(mut self, z_min: f64, z_max: f64) -> Result<Polygon, Error> {
        if !(z_min < z_max) {
            return Err(Error::Configuration(format!(
                "polygon thickness must be positive, got z range [{}, {}]", z_min, z_max
            )));
        }
        self.z_range = (z_min, z_max);
        return Ok(self);
    }

    /// Translate this polygon in the xy plane by `offset`
    pub fn translated(mut self, offset: [f64; 2]) -> Polygon {
        for vertex in &mut self.vertices {
            vertex[0] += offset[0];
            vertex[1] += offset[1];
        }
        self
    }

    /// Get the vertices of this polygon
    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    /// Check if a single point is inside this polygon
    pub fn contains_point(&self, point: Vector3D) -> bool {
        let (z_min, z_max) = self.z_range;
        if !(z_min < point[2] && point[2] < z_max) {
            return false;
        }

        let [x, y] = point.xy();
        if self.on_outline(x, y) {
            return false;
        }

        // ray casting along +x
        let mut inside = false;
        let n = self.vertices.len();
        for i in 0..n {
            let v1 = self.vertices[i];
            let v2 = self.vertices[(i + 1) % n];

            if ((v1[1] > y) != (v2[1] > y)) &&
               (x < (v2[0] - v1[0]) * (y - v1[1]) / (v2[1] - v1[1]) + v1[0]) {
                inside = !inside;
            }
        }

        return inside;
    }

    /// Check if the point `(x, y)` is on one of the edges of the polygon
    fn on_outline(&self, x: f64, y: f64) -> bool {
        let bbox = self.bounding_box();
        let scale = f64::max(bbox.max[0] - bbox.min[0], bbox.max[1] - bbox.min[1]);
        let tolerance = EDGE_TOLERANCE * scale;

        let n = self.vertices.len();
        for i in 0..n {
            let [x1, y1] = self.vertices[i];
            let [x2, y2] = self.vertices[(i + 1) % n];

            let (dx, dy) = (x2 - x1, y2 - y1);
            let length2 = dx * dx + dy * dy;
            let t = if length2 == 0.0 {
                0.0
            } else {
                f64::clamp(((x - x1) * dx + (y - y1) * dy) / length2, 0.0, 1.0)
            };

            let distance = f64::hypot(x - (x1 + t * dx), y - (y1 + t * dy));
            if distance <= tolerance {
                return true;
            }
        }

        return false;
    }
}

impl Shape for Polygon {
    fn bounding_box(&self) -> BoundingBox {
        let mut min = Vector3D::new(f64::INFINITY, f64::INFINITY, self.z_range.0);
        let mut max = Vector3D::new(f64::NEG_INFINITY, f64::NEG_INFINITY, self.z_range.1);
        for &[x, y] in &self.vertices {
            min[0] = f64::min(min[0], x);
            min[1] = f64::min(min[1], y);
            max[0] = f64::max(max[0], x);
            max[1] = f64::max(max[1], y);
        }
        return BoundingBox::new(min, max);
    }

    fn contains(&self, points: &[Vector3D]) -> Result<Vec<bool>, Error> {
        Ok(points.iter().map(|&point| self.contains_point(point)).collect())
    }

    fn outline(&self) -> Outline {
        Outline::Polygon {
            vertices: self.vertices.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid() {
        let error = Polygon::new(vec![[0.0, 0.0], [1.0, 0.0]]).unwrap_err();
        assert_eq!(error.to_string(), "configuration error: a polygon needs at least 3 vertices, got 2");

        let error = Polygon::new(vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]).unwrap_err();
        assert!(error.to_string().contains("non-positive extent"));

        let error = Polygon::new(vec![[0.0, 0.0], [1.0, f64::NAN], [2.0, 1.0]]).unwrap_err();
        assert!(error.to_string().contains("must be finite"));

        let error = Polygon::rectangle(1.0, 1.0).unwrap().with_thickness(1.0, 1.0).unwrap_err();
        assert!(error.to_string().contains("thickness must be positive"));

        assert!(Polygon::regular(6, -1.0, 0.0).is_err());
    }

    #[test]
    fn rectangle() {
        let rectangle = Polygon::rectangle(2.0, 1.0).unwrap();
        let bbox = rectangle.bounding_box();
        assert_eq!(bbox.min, Vector3D::new(-1.0, -0.5, f64::NEG_INFINITY));
        assert_eq!(bbox.max, Vector3D::new(1.0, 0.5, f64::INFINITY));

        let points = [
            Vector3D::new(0.0, 0.0, 0.0),
            Vector3D::new(0.9, 0.4, 25.0),
            Vector3D::new(1.1, 0.0, 0.0),
            Vector3D::new(0.0, -0.6, 0.0),
            // on the outline
            Vector3D::new(1.0, 0.0, 0.0),
            Vector3D::new(-1.0, -0.5, 0.0),
            Vector3D::new(0.3, 0.5, 0.0),
        ];
        let inside = rectangle.contains(&points).unwrap();
        assert_eq!(inside, [true, true, false, false, false, false, false]);

        let thin = rectangle.with_thickness(-0.1, 0.1).unwrap();
        assert!(thin.contains_point(Vector3D::new(0.0, 0.0, 0.05)));
        assert!(!thin.contains_point(Vector3D::new(0.0, 0.0, 0.1)));
    }

    #[test]
    fn concave() {
        // L-shaped polygon
        let polygon = Polygon::new(vec![
            [0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 2.0], [0.0, 2.0]
        ]).unwrap();

        assert!(polygon.contains_point(Vector3D::new(0.5, 0.5, 0.0)));
        assert!(polygon.contains_point(Vector3D::new(1.5, 0.5, 0.0)));
        assert!(polygon.contains_point(Vector3D::new(0.5, 1.5, 0.0)));
        assert!(!polygon.contains_point(Vector3D::new(1.5, 1.5, 0.0)));
    }

    #[test]
    fn regular() {
        let hexagon = Polygon::regular(6, 1.0, 0.0).unwrap();
        assert_eq!(hexagon.vertices().len(), 6);
        assert!(hexagon.contains_point(Vector3D::new(0.0, 0.8, 0.0)));
        assert!(!hexagon.contains_point(Vector3D::new(0.0, 0.9, 0.0)));

        let translated = hexagon.translated([10.0, 0.0]);
        assert!(translated.contains_point(Vector3D::new(10.0, 0.8, 0.0)));
        assert!(!translated.contains_point(Vector3D::new(0.0, 0.0, 0.0)));

        match translated.outline() {
            Outline::Polygon { vertices } => assert_eq!(vertices[0], [11.0, 0.0]),
            Outline::Box(_) => panic!("expected a polygon outline"),
        }
    }
}
