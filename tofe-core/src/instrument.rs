//! Beam and detector geometry parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::Element;

/// Incident ion beam.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BeamParams {
    /// Beam ion species.
    pub ion: Element,
    /// Beam energy in MeV.
    pub energy_mev: f64,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            ion: Element::with_isotope("Cl", 35),
            energy_mev: 8.515,
        }
    }
}

/// Time-of-flight telescope geometry.
///
/// The flight length is the gap between the two timing foils; the foil
/// fields describe the first (carbon) foil that the particles traverse and
/// lose energy in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorGeometry {
    /// Detector angle relative to the beam, in degrees.
    pub theta_deg: f64,
    /// Distance from the target to the first timing foil, in mm.
    pub first_foil_mm: f64,
    /// Distance from the target to the second timing foil, in mm.
    pub second_foil_mm: f64,
    /// Thickness of the first timing foil, in nm.
    pub foil_thickness_nm: f64,
    /// Density of the first timing foil, in g/cm³.
    pub foil_density_g_cm3: f64,
}

impl DetectorGeometry {
    /// Flight length between the timing foils, in metres.
    #[inline]
    #[must_use]
    pub fn flight_length_m(&self) -> f64 {
        (self.second_foil_mm - self.first_foil_mm) / 1000.0
    }

    /// Areal density of the first timing foil, in µg/cm².
    #[inline]
    #[must_use]
    pub fn foil_areal_ug_cm2(&self) -> f64 {
        0.1 * self.foil_thickness_nm * self.foil_density_g_cm3
    }
}

impl Default for DetectorGeometry {
    fn default() -> Self {
        Self {
            theta_deg: 41.12,
            first_foil_mm: 420.0,
            second_foil_mm: 942.0,
            foil_thickness_nm: 13.0,
            foil_density_g_cm3: 2.25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flight_length_from_foil_gap() {
        let d = DetectorGeometry::default();
        assert_relative_eq!(d.flight_length_m(), 0.522, epsilon = 1e-12);
    }

    #[test]
    fn areal_density_of_carbon_foil() {
        let d = DetectorGeometry {
            foil_thickness_nm: 13.0,
            foil_density_g_cm3: 2.25,
            ..DetectorGeometry::default()
        };
        assert_relative_eq!(d.foil_areal_ug_cm2(), 2.925, epsilon = 1e-12);
    }
}
