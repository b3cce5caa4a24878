//! Definition of the infinite periodic lattice from which finite models are
//! cut out: primitive vectors, sublattices (orbitals) with their onsite
//! energies, and hopping terms between sublattices.
use std::collections::BTreeSet;

use num_complex::Complex64;

use crate::{Error, Vector3D};

mod cell;
pub use self::cell::UnitCell;

#[cfg(test)]
pub(crate) mod test_utils;

/// A single sublattice (or orbital) of a periodic lattice
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Sublattice {
    /// Unique name of this sublattice, used to refer to it in hopping terms
    pub name: String,
    /// Position of the sublattice inside the unit cell, in fractional
    /// coordinates of the lattice vectors. Components along non-periodic
    /// directions are Cartesian offsets along the corresponding padding
    /// vectors.
    pub position: Vector3D,
    /// Onsite energy of this sublattice
    #[serde(default)]
    pub onsite: f64,
}

/// A hopping term between two sublattices, possibly in different unit cells
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HoppingTerm {
    /// Translation (in number of unit cells) from the cell containing the
    /// `from` site to the cell containing the `to` site. Components along
    /// non-periodic directions must be zero.
    pub relative_index: [i32; 3],
    /// Name of the source sublattice
    pub from: String,
    /// Name of the destination sublattice
    pub to: String,
    /// Coupling energy of this hopping, as a `[real, imaginary]` pair
    #[schemars(with = "[f64; 2]")]
    pub energy: Complex64,
}

/// A hopping term with sublattice names resolved to indexes
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Hopping {
    pub relative_index: [i32; 3],
    pub from: usize,
    pub to: usize,
    pub energy: Complex64,
    /// Is the conjugated term missing from the lattice definition? If `true`,
    /// the bonds in the reverse direction have to be created from this term.
    pub one_sided: bool,
}

/// Infinite periodic tight-binding lattice.
///
/// The lattice is only an input to the model construction, and is never
/// modified by it.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PeriodicLattice {
    /// Primitive lattice vectors, between one and three of them
    vectors: Vec<Vector3D>,
    /// Sublattices in the unit cell, in orbital order
    #[serde(default)]
    sublattices: Vec<Sublattice>,
    /// Hopping terms. Each term can be given only once (the conjugated term
    /// is then created automatically), or in both directions.
    #[serde(default)]
    hoppings: Vec<HoppingTerm>,
}

impl PeriodicLattice {
    /// Create a new lattice with the given primitive vectors, and no
    /// sublattices or hoppings.
    pub fn new(vectors: &[Vector3D]) -> Result<PeriodicLattice, Error> {
        UnitCell::from_vectors(vectors)?;
        return Ok(PeriodicLattice {
            vectors: vectors.to_vec(),
            sublattices: Vec::new(),
            hoppings: Vec::new(),
        });
    }

    /// Load a lattice from its JSON representation and validate it
    pub fn from_json(json: &str) -> Result<PeriodicLattice, Error> {
        let lattice: PeriodicLattice = serde_json::from_str(json)?;
        lattice.validate()?;
        return Ok(lattice);
    }

    /// Get the JSON representation of this lattice
    pub fn to_json(&self) -> Result<String, Error> {
        return Ok(serde_json::to_string(self)?);
    }

    /// Get the unit cell corresponding to the primitive vectors
    pub fn cell(&self) -> Result<UnitCell, Error> {
        UnitCell::from_vectors(&self.vectors)
    }

    /// Get the primitive vectors of this lattice
    pub fn vectors(&self) -> &[Vector3D] {
        &self.vectors
    }

    /// Get the list of sublattices, in orbital order
    pub fn sublattices(&self) -> &[Sublattice] {
        &self.sublattices
    }

    /// Get the list of hopping terms, as given by the user
    pub fn hoppings(&self) -> &[HoppingTerm] {
        &self.hoppings
    }

    /// Get the index of the sublattice with the given `name`
    pub fn sublattice_index(&self, name: &str) -> Option<usize> {
        self.sublattices.iter().position(|s| s.name == name)
    }

    /// Get the onsite energies of all sublattices, in orbital order
    pub fn onsite_energies(&self) -> Vec<f64> {
        self.sublattices.iter().map(|s| s.onsite).collect()
    }

    /// Add a new sublattice at the given fractional `position` in the unit
    /// cell, with the given `onsite` energy. This returns the index of the
    /// new sublattice.
    pub fn add_sublattice(&mut self, name: &str, position: Vector3D, onsite: f64) -> Result<usize, Error> {
        let sublattice = Sublattice {
            name: name.into(),
            position: position,
            onsite: onsite,
        };
        self.check_sublattice(&sublattice, &self.sublattices)?;
        self.sublattices.push(sublattice);

        return Ok(self.sublattices.len() - 1);
    }

    /// Add a new sublattice at the given Cartesian `position`, relative to
    /// the origin of the unit cell.
    pub fn add_sublattice_cartesian(&mut self, name: &str, position: Vector3D, onsite: f64) -> Result<usize, Error> {
        let fractional = self.cell()?.fractional(position);
        return self.add_sublattice(name, fractional, onsite);
    }

    /// Add a hopping term with the given `energy`, between the `from`
    /// sublattice in the reference cell and the `to` sublattice in the cell
    /// at `relative_index`.
    pub fn add_hopping(
        &mut self,
        relative_index: [i32; 3],
        from: &str,
        to: &str,
        energy: impl Into<Complex64>,
    ) -> Result<(), Error> {
        let hopping = HoppingTerm {
            relative_index: relative_index,
            from: from.into(),
            to: to.into(),
            energy: energy.into(),
        };
        self.check_hopping(&hopping, &self.hoppings)?;
        self.hoppings.push(hopping);

        return Ok(());
    }

    /// Check that the full lattice definition is consistent
    pub fn validate(&self) -> Result<(), Error> {
        self.cell()?;

        if self.sublattices.is_empty() {
            return Err(Error::Configuration(
                "the lattice must contain at least one sublattice".into()
            ));
        }

        for (i, sublattice) in self.sublattices.iter().enumerate() {
            self.check_sublattice(sublattice, &self.sublattices[..i])?;
        }

        for (i, hopping) in self.hoppings.iter().enumerate() {
            self.check_hopping(hopping, &self.hoppings[..i])?;
        }

        return Ok(());
    }

    fn check_sublattice(&self, sublattice: &Sublattice, previous: &[Sublattice]) -> Result<(), Error> {
        if sublattice.name.is_empty() {
            return Err(Error::Configuration("sublattice name can not be empty".into()));
        }

        if previous.iter().any(|s| s.name == sublattice.name) {
            return Err(Error::Configuration(format!(
                "there is already a sublattice named '{}'", sublattice.name
            )));
        }

        if !sublattice.position.is_finite() || !sublattice.onsite.is_finite() {
            return Err(Error::Configuration(format!(
                "position and onsite energy of sublattice '{}' must be finite", sublattice.name
            )));
        }

        return Ok(());
    }

    fn check_hopping(&self, hopping: &HoppingTerm, previous: &[HoppingTerm]) -> Result<(), Error> {
        for name in [&hopping.from, &hopping.to] {
            if self.sublattice_index(name).is_none() {
                return Err(Error::Configuration(format!(
                    "unknown sublattice '{}' in hopping term", name
                )));
            }
        }

        // the reverse hopping uses the opposite relative index
        if hopping.relative_index.contains(&i32::MIN) {
            return Err(Error::Configuration(format!(
                "hopping relative index {:?} is out of range", hopping.relative_index
            )));
        }

        let periodic = self.vectors.len();
        if hopping.relative_index[periodic..].iter().any(|&i| i != 0) {
            return Err(Error::Configuration(format!(
                "hopping relative index {:?} goes along a non-periodic direction \
                of this {}-dimensional lattice",
                hopping.relative_index, periodic
            )));
        }

        if hopping.relative_index == [0, 0, 0] && hopping.from == hopping.to {
            return Err(Error::Configuration(format!(
                "hopping from '{}' to itself in the same cell, use the onsite energy instead",
                hopping.from
            )));
        }

        if !hopping.energy.re.is_finite() || !hopping.energy.im.is_finite() {
            return Err(Error::Configuration(format!(
                "hopping energy must be finite, got {}", hopping.energy
            )));
        }

        let duplicated = previous.iter().any(|other| {
            other.relative_index == hopping.relative_index
                && other.from == hopping.from
                && other.to == hopping.to
        });
        if duplicated {
            return Err(Error::Configuration(format!(
                "hopping from '{}' to '{}' with relative index {:?} is already defined",
                hopping.from, hopping.to, hopping.relative_index
            )));
        }

        return Ok(());
    }

    /// Get the hopping terms with sublattice indexes instead of names, and
    /// determine which terms need to generate their conjugate.
    pub(crate) fn resolved_hoppings(&self) -> Result<Vec<Hopping>, Error> {
        let mut resolved = Vec::with_capacity(self.hoppings.len());
        for term in &self.hoppings {
            let from = self.sublattice_index(&term.from).ok_or_else(|| Error::Configuration(
                format!("unknown sublattice '{}' in hopping term", term.from)
            ))?;
            let to = self.sublattice_index(&term.to).ok_or_else(|| Error::Configuration(
                format!("unknown sublattice '{}' in hopping term", term.to)
            ))?;

            resolved.push(Hopping {
                relative_index: term.relative_index,
                from: from,
                to: to,
                energy: term.energy,
                one_sided: true,
            });
        }

        let all_terms = resolved.iter()
            .map(|h| (h.relative_index, h.from, h.to))
            .collect::<BTreeSet<_>>();

        for hopping in &mut resolved {
            let [x, y, z] = hopping.relative_index;
            let conjugate = ([-x, -y, -z], hopping.to, hopping.from);
            hopping.one_sided = !all_terms.contains(&conjugate);
        }

        return Ok(resolved);
    }
}
