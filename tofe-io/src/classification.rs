//! Turns classification results into cut files on disk.

use std::path::{Path, PathBuf};

use tofe_algorithms::{ClassifiedCut, Selection};

use crate::cut::{delete_cut_files, CutFile};
use crate::error::Result;

/// Writes one cut file per non-empty classified selection.
///
/// Previously written `.cut` files in `directory` are removed first; the
/// cut set always mirrors the current selection state, never a union
/// with an older one. Selections that caught nothing produce no file.
/// Returns the written paths in selection order.
///
/// # Errors
///
/// Propagates filesystem errors.
pub fn write_cut_files(
    directory: &Path,
    measurement: &str,
    detector_angle: f64,
    selections: &[Selection],
    cuts: &[ClassifiedCut],
) -> Result<Vec<PathBuf>> {
    delete_cut_files(directory)?;
    let mut written = Vec::new();
    for classified in cuts {
        if classified.events.is_empty() {
            continue;
        }
        let selection = &selections[classified.selection_index];
        let mut cut = CutFile {
            element: selection.element.clone(),
            kind: selection.kind,
            scatter: selection.scatter.clone(),
            weight_factor: selection.weight_factor,
            energy: 0.0,
            detector_angle,
            is_elem_loss: false,
            split_count: 1,
            events: classified.events.clone(),
            name: None,
        };
        written.push(cut.save(directory, measurement, None)?);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tofe_algorithms::classify;
    use tofe_core::{DetectionType, Element, EventPoint};

    fn rect(symbol: &str, x0: f64, x1: f64) -> Selection {
        Selection::new(
            DetectionType::Erd,
            Element::new(symbol),
            None,
            1.0,
            "red",
            vec![(x0, 0.0), (x1, 0.0), (x1, 100.0), (x0, 100.0)],
        )
    }

    #[test]
    fn stale_cuts_are_replaced_and_empty_ones_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("m.O.ERD.1.cut"), "stale").unwrap();

        let events = vec![EventPoint::new(5, 50, 0), EventPoint::new(6, 60, 1)];
        let selections = vec![rect("H", 0.0, 10.0), rect("He", 500.0, 510.0)];
        let cuts = classify(&events, &selections);
        let written =
            write_cut_files(dir.path(), "m", 41.12, &selections, &cuts).unwrap();

        assert_eq!(written.len(), 1);
        assert!(!dir.path().join("m.O.ERD.1.cut").exists());
        let reloaded = CutFile::load(&written[0]).unwrap();
        assert_eq!(reloaded.element, Element::new("H"));
        assert_eq!(reloaded.events.len(), 2);
    }
}
