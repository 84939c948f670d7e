//! Cut files: the events one selection caught, with their provenance
//! header. Immutable once written.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tofe_core::{DetectionType, Element, EventPoint};

use crate::error::{Error, Result};

/// Parsed form of a cut file name.
///
/// Plain cuts are `<measurement>.<element>.<suffix>.<n>.cut`; element-loss
/// splits carry a fifth part, `<measurement>.<element>.<suffix>.<n>.<split>.cut`.
/// `<suffix>` is `ERD`, or `RBS_<scatter>` for scattered-beam cuts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutName {
    pub measurement: String,
    pub element: Element,
    pub suffix: String,
    pub index: u32,
    pub split: Option<u32>,
}

impl CutName {
    /// Parses a cut file path into its name parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCutFile`] when the name does not follow
    /// the cut naming convention.
    pub fn parse(path: &Path) -> Result<Self> {
        let malformed = |reason: &str| Error::MalformedCutFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| malformed("unreadable file name"))?;
        let parts: Vec<&str> = name.split('.').collect();
        if parts.last() != Some(&"cut") || !(5..=6).contains(&parts.len()) {
            return Err(malformed("expected <measurement>.<element>.<suffix>.<n>[.<split>].cut"));
        }
        let element = Element::from_string(parts[1])
            .map_err(|e| malformed(&format!("bad element part: {e}")))?;
        let index = parts[3]
            .parse()
            .map_err(|_| malformed("bad cut number"))?;
        let split = if parts.len() == 6 {
            Some(
                parts[4]
                    .parse()
                    .map_err(|_| malformed("bad split number"))?,
            )
        } else {
            None
        };
        Ok(Self {
            measurement: parts[0].to_string(),
            element,
            suffix: parts[2].to_string(),
            index,
            split,
        })
    }

    /// The file name this cut name spells.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self.split {
            Some(split) => format!(
                "{}.{}.{}.{}.{split}.cut",
                self.measurement, self.element, self.suffix, self.index
            ),
            None => format!(
                "{}.{}.{}.{}.cut",
                self.measurement, self.element, self.suffix, self.index
            ),
        }
    }

    /// Spectrum key: the file name without measurement and extension,
    /// e.g. `"35Cl.ERD.1"` or `"H.ERD.2.0"` for a split.
    #[must_use]
    pub fn key(&self) -> String {
        match self.split {
            Some(split) => format!("{}.{}.{}.{split}", self.element, self.suffix, self.index),
            None => format!("{}.{}.{}", self.element, self.suffix, self.index),
        }
    }
}

/// One cut: header metadata plus the selected events.
#[derive(Debug, Clone, PartialEq)]
pub struct CutFile {
    /// Recoil element of the selection that produced the cut.
    pub element: Element,
    /// ERD or RBS events.
    pub kind: DetectionType,
    /// Scattering target, RBS cuts only.
    pub scatter: Option<Element>,
    /// Statistical weight of the selection.
    pub weight_factor: f64,
    /// Optional reference energy, MeV. Zero when unset.
    pub energy: f64,
    /// Detector angle the measurement was taken at, degrees.
    pub detector_angle: f64,
    /// Whether this cut is an element-loss split product.
    pub is_elem_loss: bool,
    /// Number of splits this cut's family was divided into.
    pub split_count: u32,
    /// The selected events, in measurement order.
    pub events: Vec<EventPoint>,
    /// Name parts, known after a load or save.
    pub name: Option<CutName>,
}

impl CutFile {
    /// Reads and parses a cut file.
    ///
    /// # Errors
    ///
    /// Any header or row that does not follow the format is a
    /// [`Error::MalformedCutFile`]; rows are never skipped silently.
    pub fn load(path: &Path) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedCutFile {
            path: path.to_path_buf(),
            reason,
        };
        let name = CutName::parse(path)?;
        let content = fs::read_to_string(path)?;
        let mut lines = content.lines();

        let mut kind = None;
        let mut scatter = None;
        let mut weight_factor = 1.0;
        let mut energy = 0.0;
        let mut detector_angle = 0.0;
        let mut is_elem_loss = false;
        let mut split_count = 1;
        let mut declared_count: Option<usize> = None;

        for line in lines.by_ref() {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| malformed(format!("header line without separator: {line}")))?;
            let value = value.trim();
            match key.trim() {
                "Count" => {
                    declared_count = Some(
                        value
                            .parse()
                            .map_err(|_| malformed(format!("bad count: {value}")))?,
                    );
                }
                "Type" => {
                    kind = Some(
                        DetectionType::parse(value)
                            .ok_or_else(|| malformed(format!("unknown type: {value}")))?,
                    );
                }
                "Weight Factor" => {
                    weight_factor = value
                        .parse()
                        .map_err(|_| malformed(format!("bad weight factor: {value}")))?;
                }
                "Energy" => {
                    energy = value
                        .parse()
                        .map_err(|_| malformed(format!("bad energy: {value}")))?;
                }
                "Detector Angle" => {
                    detector_angle = value
                        .parse()
                        .map_err(|_| malformed(format!("bad detector angle: {value}")))?;
                }
                "Scatter Element" => {
                    scatter = match value {
                        "" | "None" => None,
                        v => Some(
                            Element::from_string(v)
                                .map_err(|e| malformed(format!("bad scatter element: {e}")))?,
                        ),
                    };
                }
                "Element losses" => {
                    is_elem_loss = match value {
                        "True" => true,
                        "False" => false,
                        v => return Err(malformed(format!("bad element losses flag: {v}"))),
                    };
                }
                "Split count" => {
                    split_count = value
                        .parse()
                        .map_err(|_| malformed(format!("bad split count: {value}")))?;
                }
                // Unknown header keys from newer writers are tolerated.
                _ => {}
            }
        }
        let kind = kind.ok_or_else(|| malformed("missing Type header".to_string()))?;

        // Column comment line.
        match lines.next() {
            Some(line) if line.trim_start().starts_with("ToF") => {}
            other => {
                return Err(malformed(format!(
                    "expected column comment, got {other:?}"
                )))
            }
        }

        let mut events = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(malformed(format!("expected 3 columns: {line}")));
            }
            let parse = |s: &str| {
                s.parse::<i64>()
                    .map_err(|_| malformed(format!("bad event field: {s}")))
            };
            events.push(EventPoint::new(
                parse(fields[0])?,
                parse(fields[1])?,
                parse(fields[2])?,
            ));
        }
        if let Some(declared) = declared_count {
            if declared != events.len() {
                return Err(malformed(format!(
                    "count header says {declared}, file has {} events",
                    events.len()
                )));
            }
        }

        Ok(Self {
            element: name.element.clone(),
            kind,
            scatter,
            weight_factor,
            energy,
            detector_angle,
            is_elem_loss,
            split_count,
            events,
            name: Some(name),
        })
    }

    /// Cut-file suffix from kind and scatter element.
    #[must_use]
    pub fn suffix(&self) -> String {
        match (self.kind, &self.scatter) {
            (DetectionType::Rbs, Some(scatter)) => format!("RBS_{scatter}"),
            (DetectionType::Rbs, None) => "RBS".to_string(),
            (DetectionType::Erd, _) => "ERD".to_string(),
        }
    }

    /// Serializes header and rows to the cut text format.
    #[must_use]
    pub fn to_file_content(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Count: {}", self.events.len());
        let _ = writeln!(out, "Type: {}", self.kind.as_str());
        let _ = writeln!(out, "Weight Factor: {}", self.weight_factor);
        let _ = writeln!(out, "Energy: {}", self.energy);
        let _ = writeln!(out, "Detector Angle: {}", self.detector_angle);
        let scatter = self
            .scatter
            .as_ref()
            .map_or("None".to_string(), ToString::to_string);
        let _ = writeln!(out, "Scatter Element: {scatter}");
        let _ = writeln!(
            out,
            "Element losses: {}",
            if self.is_elem_loss { "True" } else { "False" }
        );
        let _ = writeln!(out, "Split count: {}", self.split_count);
        let _ = writeln!(out);
        let _ = writeln!(out, "ToF, Energy, Event number");
        for e in &self.events {
            let _ = writeln!(out, "{} {} {}", e.tof, e.energy, e.event_number);
        }
        out
    }

    /// Writes the cut into `directory` under the first free index of its
    /// naming family and records the chosen name.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors.
    pub fn save(
        &mut self,
        directory: &Path,
        measurement: &str,
        split: Option<u32>,
    ) -> Result<PathBuf> {
        let suffix = self.suffix();
        let mut index = 1;
        let name = loop {
            let candidate = CutName {
                measurement: measurement.to_string(),
                element: self.element.clone(),
                suffix: suffix.clone(),
                index,
                split,
            };
            if !directory.join(candidate.file_name()).exists() {
                break candidate;
            }
            index += 1;
        };
        let path = directory.join(name.file_name());
        fs::write(&path, self.to_file_content())?;
        self.name = Some(name);
        Ok(path)
    }

    /// Partitions this cut's events by the event-number boundaries of
    /// `reference` divided into `splits` equal slices.
    ///
    /// Boundary `s` is the event number of the last event in the
    /// reference's slice `s`; events past the final boundary are dropped,
    /// mirroring the reference's own truncation under integer division.
    #[must_use]
    pub fn split_by_reference(&self, reference: &Self, splits: u32) -> Vec<Vec<EventPoint>> {
        let splits = splits.max(1) as usize;
        let split_size = reference.events.len() / splits;
        let mut out = vec![Vec::new(); splits];
        if split_size == 0 {
            return out;
        }
        let mut i = 0;
        for (s, slot) in out.iter_mut().enumerate() {
            let boundary = reference.events[(s + 1) * split_size - 1].event_number;
            while i < self.events.len() && self.events[i].event_number <= boundary {
                slot.push(self.events[i]);
                i += 1;
            }
        }
        out
    }
}

/// Removes every `.cut` file directly inside `directory`.
///
/// Classification rewrites the whole cut set, so stale files from the
/// previous selection state must not survive.
///
/// # Errors
///
/// Propagates filesystem errors.
pub fn delete_cut_files(directory: &Path) -> Result<()> {
    if !directory.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "cut") {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_cut() -> CutFile {
        CutFile {
            element: Element::with_isotope("Cl", 35),
            kind: DetectionType::Rbs,
            scatter: Some(Element::with_isotope("Si", 28)),
            weight_factor: 1.5,
            energy: 0.0,
            detector_angle: 41.12,
            is_elem_loss: false,
            split_count: 1,
            events: vec![
                EventPoint::new(100, 200, 0),
                EventPoint::new(110, 210, 3),
                EventPoint::new(120, 220, 9),
            ],
            name: None,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut cut = sample_cut();
        let path = cut.save(dir.path(), "sample", None).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "sample.35Cl.RBS_28Si.1.cut"
        );

        // The scatter element survives the round trip as a real element,
        // not as an opaque string.
        let loaded = CutFile::load(&path).unwrap();
        assert_eq!(loaded.scatter, Some(Element::with_isotope("Si", 28)));
        assert_eq!(loaded.element, cut.element);
        assert_eq!(loaded.events, cut.events);
        assert_eq!(loaded.weight_factor, cut.weight_factor);
        assert_eq!(loaded.name.as_ref().unwrap().key(), "35Cl.RBS_28Si.1");
    }

    #[test]
    fn saving_twice_increments_the_index() {
        let dir = tempdir().unwrap();
        let mut first = sample_cut();
        let mut second = sample_cut();
        first.save(dir.path(), "m", None).unwrap();
        let path = second.save(dir.path(), "m", None).unwrap();
        assert!(path.to_str().unwrap().ends_with("m.35Cl.RBS_28Si.2.cut"));
    }

    #[test]
    fn malformed_rows_are_an_error_not_a_skip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.H.ERD.1.cut");
        fs::write(
            &path,
            "Count: 1\nType: ERD\n\nToF, Energy, Event number\n12 not-a-number 0\n",
        )
        .unwrap();
        assert!(matches!(
            CutFile::load(&path),
            Err(Error::MalformedCutFile { .. })
        ));
    }

    #[test]
    fn count_header_mismatch_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.H.ERD.1.cut");
        fs::write(
            &path,
            "Count: 5\nType: ERD\n\nToF, Energy, Event number\n1 2 0\n",
        )
        .unwrap();
        assert!(CutFile::load(&path).is_err());
    }

    #[test]
    fn split_follows_reference_boundaries() {
        let reference = CutFile {
            events: (0..10).map(|i| EventPoint::new(0, 0, i)).collect(),
            ..sample_cut()
        };
        let cut = CutFile {
            events: vec![
                EventPoint::new(0, 0, 1),
                EventPoint::new(0, 0, 4),
                EventPoint::new(0, 0, 5),
                EventPoint::new(0, 0, 9),
            ],
            ..sample_cut()
        };
        let parts = cut.split_by_reference(&reference, 2);
        assert_eq!(parts.len(), 2);
        // Boundaries are event numbers 4 and 9.
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 2);
    }

    #[test]
    fn delete_only_touches_cut_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("m.H.ERD.1.cut"), "x").unwrap();
        fs::write(dir.path().join("keep.hist"), "x").unwrap();
        delete_cut_files(dir.path()).unwrap();
        assert!(!dir.path().join("m.H.ERD.1.cut").exists());
        assert!(dir.path().join("keep.hist").exists());
    }

    #[test]
    fn split_name_has_five_parts() {
        let name = CutName {
            measurement: "m".to_string(),
            element: Element::new("H"),
            suffix: "ERD".to_string(),
            index: 2,
            split: Some(0),
        };
        assert_eq!(name.file_name(), "m.H.ERD.2.0.cut");
        let parsed = CutName::parse(Path::new("m.H.ERD.2.0.cut")).unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.key(), "H.ERD.2.0");
    }
}
