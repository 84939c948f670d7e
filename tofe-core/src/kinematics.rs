//! Two-body scattering kinematics for recoil and backscatter detection.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Joules per MeV.
pub const JOULE_PER_MEV: f64 = 1e6 / 6.241_509_34e18;

/// Kilograms per atomic mass unit.
pub const KG_PER_AMU: f64 = 1.660_538_921e-27;

/// Converts an energy from MeV to joules.
#[inline]
#[must_use]
pub fn convert_mev_to_joule(energy_mev: f64) -> f64 {
    energy_mev * JOULE_PER_MEV
}

/// Converts a mass from atomic mass units to kilograms.
#[inline]
#[must_use]
pub fn convert_amu_to_kg(mass_amu: f64) -> f64 {
    mass_amu * KG_PER_AMU
}

/// Which reaction product the detector sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DetectionType {
    /// Elastic recoil detection: the target atom is knocked forward.
    Erd,
    /// Rutherford backscattering: the beam ion itself is detected.
    Rbs,
}

impl DetectionType {
    /// Marker string used in selection and cut files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Erd => "ERD",
            Self::Rbs => "RBS",
        }
    }

    /// Parses the file marker string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "ERD" => Some(Self::Erd),
            "RBS" => Some(Self::Rbs),
            _ => None,
        }
    }
}

/// Fraction of the beam energy carried by the detected particle.
///
/// `beam_mass` and `target_mass` may be in any common unit; only their
/// ratio enters. `theta_deg` is the detector angle in degrees.
///
/// # Errors
///
/// Returns [`Error::InvalidKinematics`] when the mass/angle combination
/// has no physical solution: a zero mass sum for ERD, or an RBS geometry
/// where the beam ion cannot scatter to the detector angle.
pub fn kinematic_factor(
    kind: DetectionType,
    beam_mass: f64,
    target_mass: f64,
    theta_deg: f64,
) -> Result<f64> {
    let theta = theta_deg.to_radians();
    let mass_sum = beam_mass + target_mass;
    match kind {
        DetectionType::Erd => {
            if mass_sum == 0.0 {
                return Err(Error::InvalidKinematics(
                    "zero mass sum in recoil factor".to_string(),
                ));
            }
            let cos_theta = theta.cos();
            Ok(4.0 * beam_mass * target_mass * cos_theta * cos_theta / (mass_sum * mass_sum))
        }
        DetectionType::Rbs => {
            let sin_term = beam_mass * theta.sin();
            let radicand = target_mass * target_mass - sin_term * sin_term;
            if radicand <= 0.0 || mass_sum == 0.0 {
                return Err(Error::InvalidKinematics(format!(
                    "no backscatter solution for mass ratio {:.4} at {theta_deg} deg",
                    beam_mass / target_mass
                )));
            }
            let numerator = radicand.sqrt() + beam_mass * theta.cos();
            Ok((numerator / mass_sum) * (numerator / mass_sum))
        }
    }
}

/// Theoretical flight time of the detected particle over `flight_length_m`.
///
/// The particle leaves the scattering with `k * beam_energy_j`, loses
/// `stopping_energy_j` in the timing foil, then coasts. All quantities are
/// SI: energies in joules, masses in kilograms, the result in seconds.
///
/// # Errors
///
/// Returns [`Error::InvalidKinematics`] when the kinematic factor has no
/// solution or the energy after the foil is not positive.
pub fn time_of_flight(
    kind: DetectionType,
    beam_energy_j: f64,
    beam_mass_kg: f64,
    recoil_mass_kg: f64,
    theta_deg: f64,
    flight_length_m: f64,
    stopping_energy_j: f64,
) -> Result<f64> {
    let k = kinematic_factor(kind, beam_mass_kg, recoil_mass_kg, theta_deg)?;
    let energy = k * beam_energy_j - stopping_energy_j;
    if energy <= 0.0 {
        return Err(Error::InvalidKinematics(format!(
            "non-positive particle energy {energy:.3e} J after foil"
        )));
    }
    let mass = match kind {
        DetectionType::Erd => recoil_mass_kg,
        DetectionType::Rbs => beam_mass_kg,
    };
    Ok(flight_length_m * (mass / (2.0 * energy)).sqrt())
}
