//! Loads raw listmode measurement files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;
use tofe_core::EventPoint;

use crate::error::Result;

/// Reads a whitespace ascii measurement file into events.
///
/// Each line carries a ToF channel and an energy channel; the running
/// index of the accepted lines becomes the event number. Lines that do
/// not parse are skipped and counted, with a single warning at the end;
/// a measurement with a few corrupt lines is still worth analysing.
///
/// # Errors
///
/// Propagates filesystem errors; parse problems never fail the load.
pub fn load_measurement(path: &Path) -> Result<Vec<EventPoint>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    let mut skipped = 0_usize;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        match (
            fields.next().and_then(|f| f.parse::<i64>().ok()),
            fields.next().and_then(|f| f.parse::<i64>().ok()),
        ) {
            (Some(tof), Some(energy)) => {
                #[allow(clippy::cast_possible_wrap)]
                let event_number = events.len() as i64;
                events.push(EventPoint::new(tof, energy, event_number));
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(
            "skipped {skipped} unparseable line(s) in {}",
            path.display()
        );
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_events_with_running_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.asc");
        fs::write(&path, "100 200\n110 210\n\n120 220\n").unwrap();
        let events = load_measurement(&path).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], EventPoint::new(120, 220, 2));
    }

    #[test]
    fn corrupt_lines_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.asc");
        fs::write(&path, "100 200\ngarbage here\n110\n120 220\n").unwrap();
        let events = load_measurement(&path).unwrap();
        assert_eq!(events.len(), 2);
        // Event numbers stay dense despite the skips.
        assert_eq!(events[1].event_number, 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(load_measurement(Path::new("/nonexistent/file.asc")).is_err());
    }
}
