//! ToF-list event tables: the per-event physics rows the converter tool
//! produces from a cut file.

use std::fmt::Write as _;

use tofe_core::Columned;

use crate::error::{Error, Result};

/// One converted event.
///
/// On disk a row is `%5.1f %5.1f %10.5f %3d %8.4f %s %6.3f %d`:
/// raw channels, the derived energy, the particle's mass number, its
/// flight time, the element tag, the statistical weight and the original
/// event number.
#[derive(Debug, Clone, PartialEq)]
pub struct TofListRow {
    /// ToF channel of the source event.
    pub tof_channel: f64,
    /// Energy channel of the source event.
    pub energy_channel: f64,
    /// Calibrated particle energy, MeV.
    pub energy_mev: f64,
    /// Mass number of the detected particle.
    pub mass_number: i64,
    /// Flight time, nanoseconds.
    pub tof_ns: f64,
    /// Element tag, at most three characters (e.g. `"Cl"`).
    pub element: String,
    /// Statistical weight inherited from the selection.
    pub weight: f64,
    /// Event number in the source measurement.
    pub event_number: i64,
}

impl TofListRow {
    /// Parses one whitespace-separated table line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] naming the converter when the line
    /// does not have eight parseable fields.
    pub fn parse(line: &str) -> Result<Self> {
        let bad = |reason: String| Error::ExternalTool {
            tool: "tof_list".to_string(),
            reason,
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 8 {
            return Err(bad(format!(
                "expected 8 fields, got {}: {line}",
                fields.len()
            )));
        }
        let f = |i: usize| {
            fields[i]
                .parse::<f64>()
                .map_err(|_| bad(format!("bad float field {i}: {}", fields[i])))
        };
        let int = |i: usize| {
            fields[i]
                .parse::<i64>()
                .map_err(|_| bad(format!("bad integer field {i}: {}", fields[i])))
        };
        Ok(Self {
            tof_channel: f(0)?,
            energy_channel: f(1)?,
            energy_mev: f(2)?,
            mass_number: int(3)?,
            tof_ns: f(4)?,
            element: fields[5].to_string(),
            weight: f(6)?,
            event_number: int(7)?,
        })
    }

    /// Formats the row the way the converter writes it.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{:5.1} {:5.1} {:10.5} {:3} {:8.4} {} {:6.3} {}",
            self.tof_channel,
            self.energy_channel,
            self.energy_mev,
            self.mass_number,
            self.tof_ns,
            self.element,
            self.weight,
            self.event_number
        )
    }
}

/// Parses a whole converter output, one row per non-empty line.
///
/// # Errors
///
/// Fails on the first malformed line; a corrupt table means the converter
/// run itself went wrong.
pub fn parse_tof_list(text: &str) -> Result<Vec<TofListRow>> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(TofListRow::parse)
        .collect()
}

/// Serializes rows to the on-disk table format.
#[must_use]
pub fn format_tof_list(rows: &[TofListRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(out, "{}", row.to_line());
    }
    out
}

impl Columned for TofListRow {
    #[allow(clippy::cast_precision_loss)]
    fn column(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.tof_channel),
            1 => Some(self.energy_channel),
            2 => Some(self.energy_mev),
            3 => Some(self.mass_number as f64),
            4 => Some(self.tof_ns),
            6 => Some(self.weight),
            7 => Some(self.event_number as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const LINE: &str = " 831.0  412.0    1.52361  35  18.2041 Cl  1.000 1234";

    #[test]
    fn parses_a_converter_line() {
        let row = TofListRow::parse(LINE).unwrap();
        assert_relative_eq!(row.energy_mev, 1.523_61);
        assert_eq!(row.mass_number, 35);
        assert_eq!(row.element, "Cl");
        assert_eq!(row.event_number, 1234);
    }

    #[test]
    fn line_format_reparses_to_the_same_row() {
        let row = TofListRow::parse(LINE).unwrap();
        let again = TofListRow::parse(&row.to_line()).unwrap();
        assert_eq!(again, row);
    }

    #[test]
    fn energy_sits_in_column_two() {
        let row = TofListRow::parse(LINE).unwrap();
        assert_eq!(row.column(2), Some(1.523_61));
        assert_eq!(row.column(6), Some(1.0));
        assert_eq!(row.column(5), None);
    }

    #[test]
    fn short_lines_are_rejected() {
        assert!(TofListRow::parse("1 2 3").is_err());
        assert!(parse_tof_list("1 2 3 4 5 x 7 8\nbroken").is_err());
    }
}
