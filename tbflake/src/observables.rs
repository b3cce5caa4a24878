//! Physical observables computed from the eigenpairs of a model: density of
//! states, local density of states and probability densities.
use log::warn;
use ndarray::Array1;
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::model::Sites;
use crate::solvers::EigenResult;

/// A real value associated with each site of a model, together with the
/// positions of the sites.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialObservable {
    positions: Vec<Vector3D>,
    values: Array1<f64>,
}

impl SpatialObservable {
    /// Get the positions of the sites
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    /// Get the value of the observable on each site, in global site index
    /// order
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Get the number of sites
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this observable is defined on zero sites
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the sum of the observable over all sites
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }
}

/// Normalized Gaussian of standard deviation `sigma` evaluated at `x`
fn gaussian(x: f64, sigma: f64) -> f64 {
    let prefactor = 1.0 / (sigma * f64::sqrt(2.0 * std::f64::consts::PI));
    return prefactor * f64::exp(-0.5 * x * x / (sigma * sigma));
}

/// Weight of a state at `distance` from the requested energy. A broadening
/// of zero samples the spectrum exactly.
fn broadened(distance: f64, broadening: f64) -> f64 {
    if broadening == 0.0 {
        if distance == 0.0 { 1.0 } else { 0.0 }
    } else {
        gaussian(distance, broadening)
    }
}

fn check_broadening(broadening: f64) -> Result<(), Error> {
    if !(broadening >= 0.0) || !broadening.is_finite() {
        return Err(Error::Configuration(format!(
            "broadening must be positive or zero, got {}", broadening
        )));
    }

    if broadening == 0.0 {
        warn!("using a zero broadening, only states exactly at the requested energy will contribute");
    }

    return Ok(());
}

fn check_energy(energy: f64) -> Result<(), Error> {
    if !energy.is_finite() {
        return Err(Error::Configuration(format!("energy must be finite, got {}", energy)));
    }
    return Ok(());
}

fn check_sites(sites: &Sites, result: &EigenResult) -> Result<(), Error> {
    if sites.len() != result.n_sites() {
        return Err(Error::Dimension(format!(
            "the eigenvectors have {} components, but there are {} sites",
            result.n_sites(), sites.len()
        )));
    }
    return Ok(());
}

/// Compute `sum_n weights[n] |v_n[i]|^2` for each site `i`
fn weighted_density(result: &EigenResult, weights: &[f64]) -> Array1<f64> {
    let eigenvectors = result.eigenvectors();
    let values = (0..result.n_sites())
        .into_par_iter()
        .map(|site| {
            eigenvectors.row(site).iter()
                .zip(weights)
                .map(|(amplitude, weight)| weight * amplitude.norm_sqr())
                .sum::<f64>()
        })
        .collect::<Vec<_>>();
    return Array1::from(values);
}

/// Compute the local density of states at the given `energy` on all sites.
///
/// The value on site `i` is `sum_n |v_n[i]|^2 g(energy - E_n)`, where the sum
/// runs over all eigenpairs `(E_n, v_n)` in `result`, and `g` is a normalized
/// Gaussian with standard deviation `broadening`. A broadening of zero only
/// accounts for the states with eigenvalue exactly equal to `energy`.
#[time_graph::instrument(name = "calc_spatial_ldos")]
pub fn calc_spatial_ldos(
    sites: &Sites,
    result: &EigenResult,
    energy: f64,
    broadening: f64,
) -> Result<SpatialObservable, Error> {
    check_broadening(broadening)?;
    check_energy(energy)?;
    check_sites(sites, result)?;

    let weights = result.eigenvalues().iter()
        .map(|&eigenvalue| broadened(energy - eigenvalue, broadening))
        .collect::<Vec<_>>();

    return Ok(SpatialObservable {
        positions: sites.positions().to_vec(),
        values: weighted_density(result, &weights),
    });
}

/// Compute the total density of states at each of the `energies`, using a
/// Gaussian of standard deviation `broadening` for each eigenvalue.
pub fn calc_dos(result: &EigenResult, energies: &[f64], broadening: f64) -> Result<Array1<f64>, Error> {
    check_broadening(broadening)?;
    for &energy in energies {
        check_energy(energy)?;
    }

    let eigenvalues = result.eigenvalues();
    let dos = energies.iter().map(|&energy| {
        eigenvalues.iter().map(|&eigenvalue| broadened(energy - eigenvalue, broadening)).sum::<f64>()
    });

    return Ok(dos.collect());
}

/// Compute the local density of states on a single `site`, at each of the
/// `energies`.
pub fn calc_ldos(result: &EigenResult, energies: &[f64], broadening: f64, site: usize) -> Result<Array1<f64>, Error> {
    check_broadening(broadening)?;
    for &energy in energies {
        check_energy(energy)?;
    }

    if site >= result.n_sites() {
        return Err(Error::Dimension(format!(
            "site index {} is out of bounds for a model with {} sites",
            site, result.n_sites()
        )));
    }

    let eigenvalues = result.eigenvalues();
    let densities = result.eigenvectors().row(site).mapv(|amplitude| amplitude.norm_sqr());
    let ldos = energies.iter().map(|&energy| {
        eigenvalues.iter()
            .zip(&densities)
            .map(|(&eigenvalue, density)| density * broadened(energy - eigenvalue, broadening))
            .sum::<f64>()
    });

    return Ok(ldos.collect());
}

/// Compute the probability density `sum_n |v_n[i]|^2` on all sites `i`,
/// summing over the given `states`.
pub fn calc_probability(sites: &Sites, result: &EigenResult, states: &[usize]) -> Result<SpatialObservable, Error> {
    check_sites(sites, result)?;

    let mut weights = vec![0.0; result.len()];
    for &state in states {
        if state >= result.len() {
            return Err(Error::Dimension(format!(
                "state index {} is out of bounds, there are {} states", state, result.len()
            )));
        }
        weights[state] += 1.0;
    }

    return Ok(SpatialObservable {
        positions: sites.positions().to_vec(),
        values: weighted_density(result, &weights),
    });
}
