//! Depth profile files written by the external depth tool.
//!
//! The tool emits one `depth.<element>` file per element plus a
//! `depth.total` summary, each a whitespace table of depth bins.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use tofe_core::Element;

use crate::error::{Error, Result};

/// Which depth column of the files to plot against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthUnit {
    /// Column 2, depth in nanometres.
    Nm,
    /// Column 0, areal density in 1e15 atoms/cm².
    AtomsPerCm2,
}

impl DepthUnit {
    fn column(self) -> usize {
        match self {
            Self::AtomsPerCm2 => 0,
            Self::Nm => 2,
        }
    }
}

/// One element's concentration curve over depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthProfile {
    /// Profiled element; `None` for the `depth.total` summary.
    pub element: Option<Element>,
    /// Depth axis in the requested unit.
    pub depths: Vec<f64>,
    /// Concentration per bin, percent.
    pub concentrations: Vec<f64>,
    /// Event count per bin; the total file does not carry one.
    pub events: Vec<f64>,
}

impl DepthProfile {
    /// Parses one `depth.<element>` or `depth.total` file.
    ///
    /// Concentrations come from column 3, scaled to percent. Element
    /// files additionally carry the event count in their last column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] for rows the depth tool should
    /// never emit.
    pub fn from_file(path: &Path, unit: DepthUnit) -> Result<Self> {
        let bad = |reason: String| Error::ExternalTool {
            tool: "depth".to_string(),
            reason: format!("{}: {reason}", path.display()),
        };
        let label = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| bad("file has no element suffix".to_string()))?;
        let element = if label == "total" {
            None
        } else {
            Some(Element::from_string(label).map_err(|e| bad(e.to_string()))?)
        };

        let content = fs::read_to_string(path)?;
        let mut depths = Vec::new();
        let mut concentrations = Vec::new();
        let mut events = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let fields: Vec<f64> = line
                .split_whitespace()
                .map(|f| f.parse().map_err(|_| bad(format!("bad field: {f}"))))
                .collect::<Result<_>>()?;
            if fields.len() < 4 {
                return Err(bad(format!("expected at least 4 columns: {line}")));
            }
            depths.push(fields[unit.column()]);
            concentrations.push(fields[3] * 100.0);
            if element.is_some() {
                events.push(*fields.last().unwrap_or(&0.0));
            }
        }
        Ok(Self {
            element,
            depths,
            concentrations,
            events,
        })
    }
}

/// Loads every depth file in `directory`, total included.
///
/// Files that fail to parse are skipped with a warning so one corrupt
/// element does not hide the rest of the profile.
///
/// # Errors
///
/// Propagates directory read errors.
pub fn load_depth_profiles(directory: &Path, unit: DepthUnit) -> Result<Vec<DepthProfile>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("depth."))
        })
        .collect();
    paths.sort();

    let mut profiles = Vec::with_capacity(paths.len());
    for path in paths {
        match DepthProfile::from_file(&path, unit) {
            Ok(profile) => profiles.push(profile),
            Err(e) => warn!("skipping depth file: {e}"),
        }
    }
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    const ELEMENT_ROWS: &str = "0.1 0.0 5.0 0.25 120\n0.2 0.0 10.0 0.50 240\n";

    #[test]
    fn element_file_reads_all_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("depth.O");
        fs::write(&path, ELEMENT_ROWS).unwrap();
        let profile = DepthProfile::from_file(&path, DepthUnit::Nm).unwrap();
        assert_eq!(profile.element, Some(Element::new("O")));
        assert_relative_eq!(profile.depths[1], 10.0);
        assert_relative_eq!(profile.concentrations[0], 25.0);
        assert_relative_eq!(profile.events[1], 240.0);
    }

    #[test]
    fn unit_selects_the_depth_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("depth.O");
        fs::write(&path, ELEMENT_ROWS).unwrap();
        let profile = DepthProfile::from_file(&path, DepthUnit::AtomsPerCm2).unwrap();
        assert_relative_eq!(profile.depths[0], 0.1);
    }

    #[test]
    fn total_file_has_no_element_or_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("depth.total");
        fs::write(&path, "0.1 0.0 5.0 0.9\n").unwrap();
        let profile = DepthProfile::from_file(&path, DepthUnit::Nm).unwrap();
        assert_eq!(profile.element, None);
        assert!(profile.events.is_empty());
        assert_relative_eq!(profile.concentrations[0], 90.0);
    }

    #[test]
    fn directory_load_skips_corrupt_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("depth.O"), ELEMENT_ROWS).unwrap();
        fs::write(dir.path().join("depth.Si"), "not numbers\n").unwrap();
        fs::write(dir.path().join("other.txt"), "ignored").unwrap();
        let profiles = load_depth_profiles(dir.path(), DepthUnit::Nm).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].element, Some(Element::new("O")));
    }
}
