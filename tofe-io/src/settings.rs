//! Analysis settings with `.ini` persistence.
//!
//! Loading is tolerant by design: a missing file, a missing key or an
//! unparseable value falls back to the default for that field, never to
//! an error. Settings files travel between machines and versions, and a
//! stale file must not block opening a measurement.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::warn;
use tofe_core::{BeamParams, DetectorGeometry};

use crate::error::Result;

/// Measurement-level settings: beam and detector geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSettings {
    pub beam: BeamParams,
    pub detector: DetectorGeometry,
}

/// Calibration settings: histogram binning and the fitted line.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    /// ToF histogram bin width in channels.
    pub bin_width: f64,
    /// Fitted seconds-per-channel slope, when a calibration exists.
    pub slope: Option<f64>,
    /// Fitted offset in seconds, when a calibration exists.
    pub offset: Option<f64>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            bin_width: 2.0,
            slope: None,
            offset: None,
        }
    }
}

/// Depth profile settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthProfileSettings {
    /// Number of depth steps the tool computes.
    pub step_count: u32,
    /// Depth step size in nm.
    pub step_size_nm: f64,
    /// Cross-section model selector passed to the tool.
    pub cross_section: u32,
}

impl Default for DepthProfileSettings {
    fn default() -> Self {
        Self {
            step_count: 150,
            step_size_nm: 10.0,
            cross_section: 3,
        }
    }
}

/// All settings of one measurement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub measurement: MeasurementSettings,
    pub calibration: CalibrationSettings,
    pub depth_profile: DepthProfileSettings,
}

impl Settings {
    /// Loads settings from an `.ini` file.
    ///
    /// A missing file yields pure defaults. Individual bad values fall
    /// back to their defaults with a warning.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        Self::from_ini(&content)
    }

    /// Parses settings from `.ini` text.
    #[must_use]
    pub fn from_ini(content: &str) -> Self {
        let sections = parse_ini(content);
        let mut settings = Self::default();

        if let Some(section) = sections.get("measurement") {
            read_into(section, "beam_ion", &mut settings.measurement.beam.ion);
            read_into(
                section,
                "beam_energy_mev",
                &mut settings.measurement.beam.energy_mev,
            );
            let d = &mut settings.measurement.detector;
            read_into(section, "detector_theta_deg", &mut d.theta_deg);
            read_into(section, "first_foil_mm", &mut d.first_foil_mm);
            read_into(section, "second_foil_mm", &mut d.second_foil_mm);
            read_into(section, "foil_thickness_nm", &mut d.foil_thickness_nm);
            read_into(section, "foil_density_g_cm3", &mut d.foil_density_g_cm3);
        }
        if let Some(section) = sections.get("calibration") {
            read_into(section, "bin_width", &mut settings.calibration.bin_width);
            settings.calibration.slope = read_opt(section, "slope");
            settings.calibration.offset = read_opt(section, "offset");
        }
        if let Some(section) = sections.get("depth_profile") {
            let d = &mut settings.depth_profile;
            read_into(section, "step_count", &mut d.step_count);
            read_into(section, "step_size_nm", &mut d.step_size_nm);
            read_into(section, "cross_section", &mut d.cross_section);
        }
        settings
    }

    /// Writes the settings as `.ini` text.
    #[must_use]
    pub fn to_ini(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[measurement]");
        let _ = writeln!(out, "beam_ion = {}", self.measurement.beam.ion);
        let _ = writeln!(
            out,
            "beam_energy_mev = {}",
            self.measurement.beam.energy_mev
        );
        let d = &self.measurement.detector;
        let _ = writeln!(out, "detector_theta_deg = {}", d.theta_deg);
        let _ = writeln!(out, "first_foil_mm = {}", d.first_foil_mm);
        let _ = writeln!(out, "second_foil_mm = {}", d.second_foil_mm);
        let _ = writeln!(out, "foil_thickness_nm = {}", d.foil_thickness_nm);
        let _ = writeln!(out, "foil_density_g_cm3 = {}", d.foil_density_g_cm3);
        let _ = writeln!(out);
        let _ = writeln!(out, "[calibration]");
        let _ = writeln!(out, "bin_width = {}", self.calibration.bin_width);
        if let Some(slope) = self.calibration.slope {
            let _ = writeln!(out, "slope = {slope}");
        }
        if let Some(offset) = self.calibration.offset {
            let _ = writeln!(out, "offset = {offset}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "[depth_profile]");
        let p = &self.depth_profile;
        let _ = writeln!(out, "step_count = {}", p.step_count);
        let _ = writeln!(out, "step_size_nm = {}", p.step_size_nm);
        let _ = writeln!(out, "cross_section = {}", p.cross_section);
        out
    }

    /// Saves the settings to `path`.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ini())?;
        Ok(())
    }
}

type IniSections = HashMap<String, HashMap<String, String>>;

fn parse_ini(content: &str) -> IniSections {
    let mut sections: IniSections = HashMap::new();
    let mut current = String::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = name.trim().to_lowercase();
            sections.entry(current.clone()).or_default();
        } else if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }
    sections
}

/// Overwrites `target` with the parsed key value when present and valid.
fn read_into<T: FromStr>(section: &HashMap<String, String>, key: &str, target: &mut T) {
    if let Some(raw) = section.get(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => warn!("settings key '{key}' has unusable value '{raw}', keeping default"),
        }
    }
}

fn read_opt<T: FromStr>(section: &HashMap<String, String>, key: &str) -> Option<T> {
    section.get(key).and_then(|raw| raw.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;
    use tofe_core::Element;

    #[test]
    fn missing_file_gives_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/settings.ini"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn round_trips_through_ini() {
        let mut settings = Settings::default();
        settings.measurement.beam.ion = Element::with_isotope("I", 127);
        settings.measurement.beam.energy_mev = 10.2;
        settings.calibration.slope = Some(1.1e-10);
        settings.calibration.offset = Some(-8.5e-9);
        settings.depth_profile.step_size_nm = 5.0;

        let parsed = Settings::from_ini(&settings.to_ini());
        assert_eq!(parsed, settings);
    }

    #[test]
    fn bad_values_keep_their_defaults() {
        let ini = "[measurement]\nbeam_energy_mev = not-a-number\n\
                   [calibration]\nbin_width = 4.0\nslope = broken\n";
        let settings = Settings::from_ini(ini);
        assert_relative_eq!(
            settings.measurement.beam.energy_mev,
            BeamParams::default().energy_mev
        );
        assert_relative_eq!(settings.calibration.bin_width, 4.0);
        assert_eq!(settings.calibration.slope, None);
    }

    #[test]
    fn save_and_load_agree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("measurement.ini");
        let mut settings = Settings::default();
        settings.measurement.detector.theta_deg = 40.0;
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }
}
