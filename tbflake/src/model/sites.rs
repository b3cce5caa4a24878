use indexmap::IndexSet;
use log::debug;
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::lattice::{PeriodicLattice, Sublattice, UnitCell};
use crate::shapes::{BoundingBox, Shape};

/// Maximal number of candidate sites, we need to use this to prevent a huge
/// memory consumption with a small unit cell and a large shape
const MAX_CANDIDATE_SITES: f64 = 1e8;

/// Number of points given to the containment predicate at once
const PREDICATE_CHUNK_SIZE: usize = 4096;

/// A single site in a finite model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    /// global index of this site in the model
    pub index: usize,
    /// integer translation of the unit cell containing this site
    pub cell: [i32; 3],
    /// index of the sublattice of this site
    pub sublattice: usize,
    /// Cartesian position of the site
    pub position: Vector3D,
}

/// Ordered set of sites retained in a finite model. The position of a site in
/// this set is its global index.
#[derive(Debug, Clone, Default)]
pub struct Sites {
    keys: IndexSet<([i32; 3], usize)>,
    positions: Vec<Vector3D>,
}

impl Sites {
    /// Get the number of sites
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if there are no sites
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Get the positions of all the sites, in global index order
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    /// Get the sublattice index of all the sites, in global index order
    pub fn sublattices(&self) -> Vec<usize> {
        self.keys.iter().map(|&(_, sublattice)| sublattice).collect()
    }

    /// Get the site with the given global `index`
    pub fn get(&self, index: usize) -> Option<Site> {
        let &(cell, sublattice) = self.keys.get_index(index)?;
        Some(Site {
            index: index,
            cell: cell,
            sublattice: sublattice,
            position: self.positions[index],
        })
    }

    /// Iterate over all sites, in global index order
    pub fn iter(&self) -> impl Iterator<Item = Site> + '_ {
        self.keys.iter().zip(&self.positions).enumerate().map(|(index, (&(cell, sublattice), &position))| {
            Site { index, cell, sublattice, position }
        })
    }

    /// Get the global index of the site in the given `cell` and
    /// `sublattice`, or `None` if this site is not part of the model.
    pub fn index_of(&self, cell: [i32; 3], sublattice: usize) -> Option<usize> {
        self.keys.get_index_of(&(cell, sublattice))
    }

    /// Get the index of the site closest to `position`. If multiple sites are
    /// at the same distance, the one with the lowest index is returned.
    pub fn find_nearest(&self, position: Vector3D) -> Option<usize> {
        let mut nearest = None;
        let mut best = f64::INFINITY;
        for (i, &site) in self.positions.iter().enumerate() {
            let distance2 = (site - position).norm2();
            if distance2 < best {
                best = distance2;
                nearest = Some(i);
            }
        }
        return nearest;
    }

    fn push(&mut self, cell: [i32; 3], sublattice: usize, position: Vector3D) {
        let (_, inserted) = self.keys.insert_full((cell, sublattice));
        debug_assert!(inserted, "duplicated site");
        self.positions.push(position);
    }

    /// Create a new set of sites with only the sites for which `keep` is
    /// `true`, preserving their relative order
    pub(crate) fn filter(&self, keep: &[bool]) -> Sites {
        assert_eq!(keep.len(), self.len());
        let mut sites = Sites::default();
        for site in self.iter() {
            if keep[site.index] {
                sites.push(site.cell, site.sublattice, site.position);
            }
        }
        return sites;
    }
}

/// Compute the range of unit cell translations (inclusive on both sides)
/// which can contain sites inside the bounding box.
fn translation_ranges(
    cell: &UnitCell,
    sublattices: &[Sublattice],
    bbox: &BoundingBox,
) -> Result<[(i32, i32); 3], Error> {
    let mut ranges = [(0, 0); 3];
    for axis in 0..cell.periodic_dimensions() {
        // fractional coordinate along this axis is `dual * r`, find its
        // extremal values over the box
        let dual = cell.dual_vector(axis);
        let scale = dual.norm();

        let mut lower = 0.0;
        let mut upper = 0.0;
        for j in 0..3 {
            let b = dual[j];
            if f64::abs(b) <= 1e-12 * scale {
                continue;
            }

            let (min, max) = (bbox.min[j], bbox.max[j]);
            if !min.is_finite() || !max.is_finite() {
                return Err(Error::Configuration(format!(
                    "the shape is unbounded along the periodic lattice direction {}", axis
                )));
            }

            if b > 0.0 {
                lower += b * min;
                upper += b * max;
            } else {
                lower += b * max;
                upper += b * min;
            }
        }

        // a site in cell n has fractional coordinate n + offset
        let offsets = sublattices.iter().map(|s| s.position[axis]);
        let min_offset = offsets.clone().fold(f64::INFINITY, f64::min);
        let max_offset = offsets.fold(f64::NEG_INFINITY, f64::max);

        let start = f64::floor(lower - max_offset);
        let stop = f64::ceil(upper - min_offset);
        if start < i32::MIN as f64 || stop > i32::MAX as f64 {
            return Err(Error::Configuration(format!(
                "the shape is too large for this lattice along direction {}", axis
            )));
        }

        ranges[axis] = (start as i32, stop as i32);
    }

    let n_candidates = ranges.iter()
        .map(|&(start, stop)| (stop as f64 - start as f64 + 1.0))
        .product::<f64>() * sublattices.len() as f64;

    if n_candidates > MAX_CANDIDATE_SITES {
        return Err(Error::Configuration(format!(
            "the shape is too large for this lattice: it would require checking {:e} sites",
            n_candidates
        )));
    }

    return Ok(ranges);
}

/// Find all the sites of the `lattice` that are inside the `shape`.
///
/// Sites are indexed in lexicographic order of their unit cell translation,
/// and then in sublattice order, so the same inputs always give the same
/// indexing.
#[time_graph::instrument(name = "enumerate_sites")]
pub fn enumerate_sites(lattice: &PeriodicLattice, shape: &dyn Shape) -> Result<Sites, Error> {
    let cell = lattice.cell()?;
    let sublattices = lattice.sublattices();
    let bbox = shape.bounding_box();

    let mut sites = Sites::default();
    if bbox.is_empty() || sublattices.is_empty() {
        debug!("empty bounding box or lattice, no site to enumerate");
        return Ok(sites);
    }

    let ranges = translation_ranges(&cell, sublattices, &bbox)?;
    debug!(
        "enumerating unit cells in [{}, {}] x [{}, {}] x [{}, {}]",
        ranges[0].0, ranges[0].1, ranges[1].0, ranges[1].1, ranges[2].0, ranges[2].1,
    );

    let offsets = sublattices.iter()
        .map(|s| cell.cartesian(s.position))
        .collect::<Vec<_>>();

    // only keep candidates inside the bounding box, in enumeration order
    let mut candidates = Vec::new();
    let mut positions = Vec::new();
    for n0 in ranges[0].0..=ranges[0].1 {
        for n1 in ranges[1].0..=ranges[1].1 {
            for n2 in ranges[2].0..=ranges[2].1 {
                let translation = cell.translation([n0, n1, n2]);
                for (sublattice, offset) in offsets.iter().enumerate() {
                    let position = translation + *offset;
                    if bbox.contains(position) {
                        candidates.push(([n0, n1, n2], sublattice));
                        positions.push(position);
                    }
                }
            }
        }
    }
    debug!("{} candidate sites inside the bounding box", candidates.len());

    let inside = positions.par_chunks(PREDICATE_CHUNK_SIZE)
        .map(|chunk| {
            let inside = shape.contains(chunk)?;
            if inside.len() != chunk.len() {
                return Err(Error::GeometryEvaluation(format!(
                    "shape returned {} values for {} points", inside.len(), chunk.len()
                )));
            }
            Ok(inside)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let inside = inside.into_iter().flatten();
    for (((cell, sublattice), position), inside) in candidates.into_iter().zip(positions).zip(inside) {
        if inside {
            sites.push(cell, sublattice, position);
        }
    }

    return Ok(sites);
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::lattice::test_utils::{test_lattice, A_CC};
    use crate::shapes::{FreeformShape, Polygon};

    #[test]
    fn chain() {
        let lattice = test_lattice("chain");
        let shape = Polygon::rectangle(4.5, 1.0).unwrap();
        let sites = enumerate_sites(&lattice, &shape).unwrap();

        assert_eq!(sites.len(), 5);
        let cells = sites.iter().map(|s| s.cell[0]).collect::<Vec<_>>();
        assert_eq!(cells, [-2, -1, 0, 1, 2]);
        for site in sites.iter() {
            assert_eq!(site.cell[1], 0);
            assert_eq!(site.cell[2], 0);
            assert_eq!(site.position, Vector3D::new(site.cell[0] as f64, 0.0, 0.0));
        }

        assert_eq!(sites.index_of([0, 0, 0], 0), Some(2));
        assert_eq!(sites.index_of([3, 0, 0], 0), None);
        assert_eq!(sites.find_nearest(Vector3D::new(0.9, 0.3, 0.0)), Some(3));
        assert_eq!(sites.get(4).unwrap().cell, [2, 0, 0]);
        assert!(sites.get(5).is_none());
    }

    #[test]
    fn square_ordering() {
        let lattice = test_lattice("square");
        let shape = Polygon::rectangle(2.5, 2.5).unwrap();
        let sites = enumerate_sites(&lattice, &shape).unwrap();

        assert_eq!(sites.len(), 9);
        let cells = sites.iter().map(|s| [s.cell[0], s.cell[1]]).collect::<Vec<_>>();
        assert_eq!(cells, [
            [-1, -1], [-1, 0], [-1, 1],
            [0, -1], [0, 0], [0, 1],
            [1, -1], [1, 0], [1, 1],
        ]);
    }

    #[test]
    fn honeycomb_in_polygon() {
        let lattice = test_lattice("honeycomb");
        let shape = Polygon::regular(6, 1.0, 0.0).unwrap();
        let sites = enumerate_sites(&lattice, &shape).unwrap();
        assert!(!sites.is_empty());

        for site in sites.iter() {
            assert!(shape.contains_point(site.position));
            let expected = if site.sublattice == 0 { -0.5 * A_CC } else { 0.5 * A_CC };
            let cell_origin = lattice.cell().unwrap().translation(site.cell);
            assert_relative_eq!(site.position[1] - cell_origin[1], expected, epsilon = 1e-12);
        }

        // both sublattices are present
        let sublattices = sites.sublattices();
        assert!(sublattices.contains(&0));
        assert!(sublattices.contains(&1));
    }

    #[test]
    fn sites_are_inside_freeform_box() {
        let lattice = test_lattice("square");
        let shape = FreeformShape::new(
            |points| points.iter().map(|p| p[0] + p[1] > 0.0).collect(),
            [3.0, 2.0, 1.0],
        ).unwrap().with_center(Vector3D::new(0.5, 0.0, 0.0));

        let sites = enumerate_sites(&lattice, &shape).unwrap();
        let bbox = shape.bounding_box();
        assert!(!sites.is_empty());
        for site in sites.iter() {
            assert!(bbox.contains(site.position));
            assert_eq!(shape.contains(&[site.position]).unwrap(), [true]);
        }
    }

    #[test]
    fn empty_shapes() {
        let lattice = test_lattice("honeycomb");

        let shape = FreeformShape::new(|points| vec![true; points.len()], [1.0, 1.0, 0.0]).unwrap();
        let sites = enumerate_sites(&lattice, &shape).unwrap();
        assert!(sites.is_empty());

        // far away from the origin and too small to contain any site
        let shape = Polygon::rectangle(0.01, 0.01).unwrap().translated([100.0, 100.0]);
        let sites = enumerate_sites(&lattice, &shape).unwrap();
        assert!(sites.is_empty());
    }

    #[test]
    fn unbounded_shapes() {
        let lattice = test_lattice("cubic");
        let shape = Polygon::rectangle(2.5, 2.5).unwrap();
        let error = enumerate_sites(&lattice, &shape).unwrap_err();
        assert_eq!(error.to_string(), "configuration error: the shape is unbounded along the periodic lattice direction 2");

        let shape = shape.with_thickness(-0.5, 1.5).unwrap();
        let sites = enumerate_sites(&lattice, &shape).unwrap();
        // 3 x 3 sites in the planes z = 0 and z = 1
        assert_eq!(sites.len(), 18);

        let lattice = test_lattice("square");
        let shape = Polygon::rectangle(1e6, 1e6).unwrap();
        let error = enumerate_sites(&lattice, &shape).unwrap_err();
        assert!(error.to_string().contains("the shape is too large for this lattice"));
    }

    #[test]
    fn failing_predicate() {
        let lattice = test_lattice("square");
        let shape = FreeformShape::new(|_| panic!("oops"), [2.0, 2.0, 2.0]).unwrap();
        let error = enumerate_sites(&lattice, &shape).unwrap_err();
        assert!(matches!(error, Error::GeometryEvaluation(_)));
    }

    #[test]
    fn filter() {
        let lattice = test_lattice("chain");
        let shape = Polygon::rectangle(4.5, 1.0).unwrap();
        let sites = enumerate_sites(&lattice, &shape).unwrap();

        let filtered = sites.filter(&[true, false, true, false, true]);
        assert_eq!(filtered.len(), 3);
        let cells = filtered.iter().map(|s| s.cell[0]).collect::<Vec<_>>();
        assert_eq!(cells, [-2, 0, 2]);
        assert_eq!(filtered.index_of([0, 0, 0], 0), Some(1));
    }
}
