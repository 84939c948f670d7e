//! Selection file (`.selections`) reading and writing.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::warn;
use tofe_algorithms::Selection;

use crate::error::Result;

/// Loads a selections file, one selection per line.
///
/// Unparseable lines are skipped with a warning; a half-broken file still
/// yields the selections it can, matching how measurements get reopened
/// years later.
///
/// # Errors
///
/// Propagates filesystem errors only.
pub fn load_selections(path: &Path) -> Result<Vec<Selection>> {
    let content = fs::read_to_string(path)?;
    let mut selections = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match Selection::from_line(line) {
            Ok(selection) => selections.push(selection),
            Err(e) => warn!("{}: {e}", path.display()),
        }
    }
    Ok(selections)
}

/// Writes selections to `path`, one line each.
///
/// # Errors
///
/// Propagates filesystem errors.
pub fn save_selections(path: &Path, selections: &[Selection]) -> Result<()> {
    let mut content = String::new();
    for selection in selections {
        let _ = writeln!(content, "{}", selection.to_line());
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tofe_core::{DetectionType, Element};

    #[test]
    fn file_round_trips_and_tolerates_junk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.selections");
        let selections = vec![
            Selection::new(
                DetectionType::Erd,
                Element::with_isotope("H", 1),
                None,
                1.0,
                "red",
                vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)],
            ),
            Selection::new(
                DetectionType::Rbs,
                Element::new("Cu"),
                Some(Element::with_isotope("Cl", 35)),
                2.0,
                "blue",
                vec![(100.0, 100.0), (200.0, 100.0), (150.0, 200.0)],
            ),
        ];
        save_selections(&path, &selections).unwrap();

        // Corrupt the file with a junk line in the middle.
        let mut content = fs::read_to_string(&path).unwrap();
        content.insert_str(content.find('\n').unwrap() + 1, "junk line\n");
        fs::write(&path, content).unwrap();

        let loaded = load_selections(&path).unwrap();
        assert_eq!(loaded, selections);
    }
}
