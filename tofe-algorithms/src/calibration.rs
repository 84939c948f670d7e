//! Time-of-flight calibration: leading-edge extraction from cut
//! histograms, theoretical flight times and the channel-to-seconds line.

use log::warn;
use tofe_core::{
    convert_amu_to_kg, convert_mev_to_joule, hist, kinematic_factor, time_of_flight, BeamParams,
    DetectionType, DetectorGeometry, Element, EventPoint, HistogramBin,
};

use crate::fit::{self, ErfEdgeFit};

/// Failure of an external stopping-power lookup.
#[derive(Debug, thiserror::Error)]
#[error("stopping lookup failed for {ion}: {reason}")]
pub struct StoppingError {
    /// Ion the lookup was made for, `"<isotope>-<symbol>"` form.
    pub ion: String,
    /// Tool or parse failure description.
    pub reason: String,
}

/// Source of stopping-energy losses in the timing foil.
///
/// The production implementation shells out to an external stopping-power
/// tool; tests substitute fixed tables.
pub trait StoppingLookup {
    /// Energy lost by `ion` at `energy_mev` in a foil of
    /// `thickness_ug_cm2` areal density, in joules.
    ///
    /// # Errors
    ///
    /// Returns [`StoppingError`] when the lookup cannot produce a value.
    fn stopping_energy(
        &self,
        ion: &Element,
        energy_mev: f64,
        thickness_ug_cm2: f64,
    ) -> Result<f64, StoppingError>;
}

/// A stopping lookup that always reports zero loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStopping;

impl StoppingLookup for NoStopping {
    fn stopping_energy(&self, _: &Element, _: f64, _: f64) -> Result<f64, StoppingError> {
        Ok(0.0)
    }
}

/// ToF histogram of one cut file, prepared for edge fitting.
#[derive(Debug, Clone)]
pub struct CalibrationHistogram {
    /// Underlying fixed-width bins over the ToF column.
    pub bins: Vec<HistogramBin>,
}

impl CalibrationHistogram {
    /// Histograms the ToF channel column of `events` at `width` channels.
    ///
    /// # Errors
    ///
    /// Returns [`tofe_core::Error::InvalidBinWidth`] for a non-positive
    /// width.
    pub fn from_events(events: &[EventPoint], width: f64) -> tofe_core::Result<Self> {
        Ok(Self {
            bins: hist(events, 0, width)?,
        })
    }

    /// Locates the leading edge of the spectrum.
    ///
    /// Scans for the bins where the count first crosses 2.5% and 5% of the
    /// peak. Long spectra (over 50 bins) are searched only in their first
    /// quarter, where the edge of the surface signal sits. A window of
    /// fewer than 3 bins is padded by one bin downward and two upward.
    /// Returns the inclusive bin index range, or `None` for an empty
    /// histogram or a flat one without an edge.
    #[must_use]
    pub fn find_leading_edge(&self) -> Option<(usize, usize)> {
        if self.bins.is_empty() {
            return None;
        }
        let search_len = if self.bins.len() > 50 {
            self.bins.len() / 4
        } else {
            self.bins.len()
        };
        let region = &self.bins[..search_len];
        let peak = region
            .iter()
            .map(|b| b.count)
            .fold(f64::NEG_INFINITY, f64::max);
        if peak <= 0.0 {
            return None;
        }
        let low = 0.025 * peak;
        let high = 0.05 * peak;
        let start = region.iter().position(|b| b.count >= low)?;
        let end = region
            .iter()
            .skip(start)
            .position(|b| b.count >= high)
            .map(|off| start + off)?;
        let (mut start, mut end) = (start, end);
        if end - start + 1 < 3 {
            start = start.saturating_sub(1);
            end = (end + 2).min(self.bins.len() - 1);
        }
        Some((start, end))
    }

    /// Fits the error-function edge model over the leading-edge window.
    ///
    /// Returns `None` when no edge is found, the window holds fewer than
    /// two samples, or the fit does not converge.
    #[must_use]
    pub fn fit_edge(&self) -> Option<ErfEdgeFit> {
        let (start, end) = self.find_leading_edge()?;
        let window = &self.bins[start..=end];
        let xs: Vec<f64> = window.iter().map(|b| b.center).collect();
        let ys: Vec<f64> = window.iter().map(|b| b.count).collect();
        fit::fit_error_function(&xs, &ys)
    }
}

/// One calibration point: a measured ToF channel paired with the
/// theoretical flight time of its cut's particle.
///
/// The seconds value is derived once at construction; afterwards only
/// `point_used` changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TofCalibrationPoint {
    /// Fitted (or manually overridden) ToF channel of the edge.
    pub tof_channel: f64,
    /// Theoretical flight time in seconds.
    pub tof_seconds: f64,
    /// Whether the linear fit should include this point.
    pub point_used: bool,
    /// Display label, e.g. `"35Cl ERD"`.
    pub label: String,
}

impl TofCalibrationPoint {
    /// Builds a calibration point for a cut of `target` atoms.
    ///
    /// For ERD the detected particle is the recoiling `target`; for RBS it
    /// is the beam ion scattered off `target`. The theoretical flight time
    /// over the detector's foil gap accounts for the energy lost in the
    /// first timing foil; a failed stopping lookup degrades to zero loss
    /// with a warning.
    ///
    /// # Errors
    ///
    /// Returns a core error for unknown element masses or an unphysical
    /// mass/angle combination.
    pub fn new(
        tof_channel: f64,
        kind: DetectionType,
        target: &Element,
        beam: &BeamParams,
        detector: &DetectorGeometry,
        stopping: &dyn StoppingLookup,
    ) -> tofe_core::Result<Self> {
        let beam_mass_amu = beam.ion.mass_amu()?;
        let target_mass_amu = target.mass_amu()?;
        let k = kinematic_factor(kind, beam_mass_amu, target_mass_amu, detector.theta_deg)?;

        let detected = match kind {
            DetectionType::Erd => target.clone(),
            DetectionType::Rbs => beam.ion.clone(),
        };
        let particle_energy_mev = k * beam.energy_mev;
        let stop_j = match stopping.stopping_energy(
            &detected,
            particle_energy_mev,
            detector.foil_areal_ug_cm2(),
        ) {
            Ok(v) => v,
            Err(e) => {
                warn!("{e}; assuming zero foil loss");
                0.0
            }
        };

        let tof_seconds = time_of_flight(
            kind,
            convert_mev_to_joule(beam.energy_mev),
            convert_amu_to_kg(beam_mass_amu),
            convert_amu_to_kg(target_mass_amu),
            detector.theta_deg,
            detector.flight_length_m(),
            stop_j,
        )?;

        let label = match kind {
            DetectionType::Erd => format!("{detected} ERD"),
            DetectionType::Rbs => format!("{} RBS ({target})", beam.ion),
        };
        Ok(Self {
            tof_channel,
            tof_seconds,
            point_used: true,
            label,
        })
    }
}

/// The channel-to-seconds calibration line.
///
/// Starts empty; `slope`/`offset` stay `None` until a fit over at least
/// two used points succeeds, and are cleared again whenever the point set
/// changes.
#[derive(Debug, Clone, Default)]
pub struct TofCalibration {
    /// Collected calibration points.
    pub points: Vec<TofCalibrationPoint>,
    /// Seconds per channel, once fitted.
    pub slope: Option<f64>,
    /// Seconds at channel zero, once fitted.
    pub offset: Option<f64>,
}

impl TofCalibration {
    /// Creates an empty calibration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a point and invalidates any previous fit.
    pub fn add_point(&mut self, point: TofCalibrationPoint) {
        self.points.push(point);
        self.slope = None;
        self.offset = None;
    }

    /// Removes the point at `index` and invalidates any previous fit.
    /// Out-of-range indices are ignored.
    pub fn remove_point(&mut self, index: usize) {
        if index < self.points.len() {
            self.points.remove(index);
            self.slope = None;
            self.offset = None;
        }
    }

    /// Fits the line over all points marked `point_used`.
    ///
    /// Fewer than two used points, or degenerate channels, leave the
    /// calibration unfitted and return `None`.
    pub fn fit_linear(&mut self) -> Option<(f64, f64)> {
        let used: Vec<&TofCalibrationPoint> =
            self.points.iter().filter(|p| p.point_used).collect();
        let xs: Vec<f64> = used.iter().map(|p| p.tof_channel).collect();
        let ys: Vec<f64> = used.iter().map(|p| p.tof_seconds).collect();
        let fitted = fit::fit_linear(&xs, &ys);
        match fitted {
            Some((slope, offset)) => {
                self.slope = Some(slope);
                self.offset = Some(offset);
            }
            None => {
                self.slope = None;
                self.offset = None;
            }
        }
        fitted
    }

    /// Converts a ToF channel to seconds with the fitted line, or `None`
    /// when unfitted.
    #[must_use]
    pub fn channel_to_seconds(&self, channel: f64) -> Option<f64> {
        Some(self.slope? * channel + self.offset?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tofe_core::EventPoint;

    fn edge_events() -> Vec<EventPoint> {
        // Counts ramp up across channels 100..160 like a foil edge.
        let mut events = Vec::new();
        let mut n = 0;
        for ch in 100_i64..160 {
            let count = ((ch - 100) * (ch - 100) / 12).min(200);
            for _ in 0..count {
                events.push(EventPoint::new(ch, 50, n));
                n += 1;
            }
        }
        events
    }

    #[test]
    fn leading_edge_window_sits_at_the_onset() {
        let h = CalibrationHistogram::from_events(&edge_events(), 2.0).unwrap();
        let (start, end) = h.find_leading_edge().unwrap();
        assert!(start <= end);
        assert!(end < h.bins.len());
        // The onset is in the lower half of the ramp.
        assert!(h.bins[end].center < 140.0);
    }

    #[test]
    fn empty_histogram_has_no_edge() {
        let h = CalibrationHistogram { bins: Vec::new() };
        assert!(h.find_leading_edge().is_none());
        assert!(h.fit_edge().is_none());
    }

    #[test]
    fn point_construction_derives_seconds() {
        let beam = BeamParams::default();
        let detector = DetectorGeometry::default();
        let target = Element::with_isotope("Si", 28);
        let p = TofCalibrationPoint::new(
            830.0,
            DetectionType::Erd,
            &target,
            &beam,
            &detector,
            &NoStopping,
        )
        .unwrap();
        assert!(p.tof_seconds > 0.0 && p.tof_seconds < 1e-6);
        assert!(p.point_used);
        assert_eq!(p.label, "28Si ERD");
    }

    #[test]
    fn linear_fit_needs_two_used_points() {
        let mut cal = TofCalibration::new();
        cal.add_point(TofCalibrationPoint {
            tof_channel: 100.0,
            tof_seconds: 1e-8,
            point_used: true,
            label: "a".to_string(),
        });
        assert!(cal.fit_linear().is_none());
        assert!(cal.channel_to_seconds(100.0).is_none());

        cal.add_point(TofCalibrationPoint {
            tof_channel: 200.0,
            tof_seconds: 2e-8,
            point_used: false,
            label: "b".to_string(),
        });
        // Second point exists but is not used.
        assert!(cal.fit_linear().is_none());
    }

    #[test]
    fn linear_fit_recovers_line_and_converts() {
        let mut cal = TofCalibration::new();
        for (ch, s) in [(100.0, 1.5e-8), (200.0, 2.5e-8), (300.0, 3.5e-8)] {
            cal.add_point(TofCalibrationPoint {
                tof_channel: ch,
                tof_seconds: s,
                point_used: true,
                label: String::new(),
            });
        }
        let (slope, offset) = cal.fit_linear().unwrap();
        assert_relative_eq!(slope, 1e-10, epsilon = 1e-16);
        assert_relative_eq!(offset, 0.5e-8, epsilon = 1e-14);
        assert_relative_eq!(cal.channel_to_seconds(150.0).unwrap(), 2e-8, epsilon = 1e-14);
    }

    #[test]
    fn adding_a_point_invalidates_the_fit() {
        let mut cal = TofCalibration::new();
        for (ch, s) in [(100.0, 1.0e-8), (200.0, 2.0e-8)] {
            cal.add_point(TofCalibrationPoint {
                tof_channel: ch,
                tof_seconds: s,
                point_used: true,
                label: String::new(),
            });
        }
        cal.fit_linear().unwrap();
        assert!(cal.slope.is_some());
        cal.add_point(TofCalibrationPoint {
            tof_channel: 300.0,
            tof_seconds: 3.0e-8,
            point_used: true,
            label: String::new(),
        });
        assert!(cal.slope.is_none());
    }
}
