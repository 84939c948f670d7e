//! Energy spectrum aggregation over a set of cut files.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use rayon::prelude::*;
use tofe_core::{hist, hist_weighted, HistogramBin};

use crate::backend::PhysicsBackend;
use crate::cut::CutName;
use crate::error::Result;
use crate::event_table::format_tof_list;

/// Column of the converted event table holding the particle energy.
const ENERGY_COLUMN: usize = 2;

/// Column holding the per-event detection-efficiency weight.
const WEIGHT_COLUMN: usize = 6;

/// Options of the spectrum computation beyond the calibration line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectraOptions<'a> {
    /// Weight each event by its efficiency column instead of counting it
    /// once.
    pub use_weights: bool,
    /// When set, the converted rows of every cut are also saved here as
    /// `<key>.tof_list`.
    pub tof_list_dir: Option<&'a Path>,
}

/// Computes one energy spectrum per cut file.
///
/// Each cut is converted through the backend with the calibration line,
/// its energy column histogrammed at `channel_width` MeV and the result
/// padded with one zero bin on each side so plots drop to the axis. Keys
/// are the cut names without measurement and extension,
/// `<element>.<suffix>.<n>[.<split>]`.
///
/// A cut whose conversion fails degrades to an empty spectrum under its
/// key with a warning; one broken cut must not take down the whole plot.
#[must_use]
pub fn compute_energy_spectra<B: PhysicsBackend + Sync>(
    backend: &B,
    cut_paths: &[PathBuf],
    slope: f64,
    offset: f64,
    channel_width: f64,
    options: SpectraOptions<'_>,
) -> BTreeMap<String, Vec<HistogramBin>> {
    cut_paths
        .par_iter()
        .map(|path| {
            let key = CutName::parse(path).map_or_else(
                |_| path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
                |name| name.key(),
            );
            let spectrum =
                match spectrum_for_cut(backend, path, &key, slope, offset, channel_width, options)
                {
                    Ok(bins) => bins,
                    Err(e) => {
                        warn!("energy spectrum for {key} failed: {e}");
                        Vec::new()
                    }
                };
            (key, spectrum)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn spectrum_for_cut<B: PhysicsBackend + Sync>(
    backend: &B,
    path: &Path,
    key: &str,
    slope: f64,
    offset: f64,
    channel_width: f64,
    options: SpectraOptions<'_>,
) -> Result<Vec<HistogramBin>> {
    let rows = backend.convert_cut(path, slope, offset)?;
    if let Some(dir) = options.tof_list_dir {
        fs::write(dir.join(format!("{key}.tof_list")), format_tof_list(&rows))?;
    }
    let bins = if options.use_weights {
        hist_weighted(&rows, ENERGY_COLUMN, WEIGHT_COLUMN, channel_width)?
    } else {
        hist(&rows, ENERGY_COLUMN, channel_width)?
    };
    Ok(pad_with_zero_bins(bins, channel_width))
}

/// Adds one zero-count bin before the first and after the last bin.
#[must_use]
pub fn pad_with_zero_bins(bins: Vec<HistogramBin>, width: f64) -> Vec<HistogramBin> {
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        return bins;
    };
    let mut padded = Vec::with_capacity(bins.len() + 2);
    padded.push(HistogramBin {
        center: first.center - width,
        count: 0.0,
    });
    let last_center = last.center;
    padded.extend(bins);
    padded.push(HistogramBin {
        center: last_center + width,
        count: 0.0,
    });
    padded
}

/// Writes every spectrum as `<key>.hist` into `directory`, one
/// `%5.5f %6d` line per bin. Returns the written paths.
///
/// # Errors
///
/// Propagates filesystem errors.
pub fn write_spectra(
    directory: &Path,
    spectra: &BTreeMap<String, Vec<HistogramBin>>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(spectra.len());
    for (key, bins) in spectra {
        let mut content = String::new();
        for bin in bins {
            #[allow(clippy::cast_possible_truncation)]
            let count = bin.count.round() as i64;
            let _ = writeln!(content, "{:5.5} {count:6}", bin.center);
        }
        let path = directory.join(format!("{key}.hist"));
        fs::write(&path, content)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CoincParams, EspeParams};
    use crate::error::Error;
    use crate::event_table::{parse_tof_list, TofListRow};
    use tempfile::tempdir;
    use tofe_core::Element;

    struct FakeBackend;

    impl PhysicsBackend for FakeBackend {
        fn convert_cut(&self, path: &Path, _: f64, _: f64) -> Result<Vec<TofListRow>> {
            if path.to_string_lossy().contains("broken") {
                return Err(Error::ExternalTool {
                    tool: "tof_list".to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok([1.0, 1.0, 1.2, 1.5]
                .iter()
                .zip(0_i64..)
                .map(|(&energy_mev, event_number)| TofListRow {
                    tof_channel: 100.0,
                    energy_channel: 50.0,
                    energy_mev,
                    mass_number: 1,
                    tof_ns: 20.0,
                    element: "H".to_string(),
                    weight: 2.0,
                    event_number,
                })
                .collect())
        }

        fn stopping_energy(&self, _: &Element, _: f64, _: f64) -> Result<f64> {
            Ok(0.0)
        }

        fn coincidence_filter(&self, _: &Path, _: &Path, _: &CoincParams) -> Result<usize> {
            Ok(0)
        }

        fn simulate_spectrum(&self, _: &[(f64, f64)], _: &EspeParams) -> Result<Vec<(f64, f64)>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn spectra_are_keyed_and_zero_padded() {
        let paths = vec![PathBuf::from("m.1H.ERD.1.cut")];
        let spectra =
            compute_energy_spectra(&FakeBackend, &paths, 1e-10, 0.0, 0.1, SpectraOptions::default());
        let bins = &spectra["1H.ERD.1"];
        assert_eq!(bins.first().unwrap().count, 0.0);
        assert_eq!(bins.last().unwrap().count, 0.0);
        let total: f64 = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn efficiency_weights_scale_the_counts() {
        let paths = vec![PathBuf::from("m.1H.ERD.1.cut")];
        let options = SpectraOptions {
            use_weights: true,
            ..SpectraOptions::default()
        };
        let spectra = compute_energy_spectra(&FakeBackend, &paths, 1e-10, 0.0, 0.1, options);
        // Every fake event carries weight 2, so the weighted spectrum
        // holds twice the plain event count.
        let total: f64 = spectra["1H.ERD.1"].iter().map(|b| b.count).sum();
        assert_eq!(total, 8.0);
    }

    #[test]
    fn converted_rows_can_be_saved_as_tof_lists() {
        let dir = tempdir().unwrap();
        let paths = vec![PathBuf::from("m.1H.ERD.1.cut")];
        let options = SpectraOptions {
            tof_list_dir: Some(dir.path()),
            ..SpectraOptions::default()
        };
        compute_energy_spectra(&FakeBackend, &paths, 1e-10, 0.0, 0.1, options);
        let saved = fs::read_to_string(dir.path().join("1H.ERD.1.tof_list")).unwrap();
        let rows = parse_tof_list(&saved).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].element, "H");
        assert_eq!(rows[3].event_number, 3);
    }

    #[test]
    fn broken_cut_degrades_to_an_empty_spectrum() {
        let paths = vec![
            PathBuf::from("m.1H.ERD.1.cut"),
            PathBuf::from("broken.B.ERD.1.cut"),
        ];
        let spectra =
            compute_energy_spectra(&FakeBackend, &paths, 1e-10, 0.0, 0.1, SpectraOptions::default());
        assert_eq!(spectra.len(), 2);
        assert!(spectra["B.ERD.1"].is_empty());
        assert!(!spectra["1H.ERD.1"].is_empty());
    }

    #[test]
    fn hist_files_land_on_disk() {
        let dir = tempdir().unwrap();
        let mut spectra = BTreeMap::new();
        spectra.insert(
            "1H.ERD.1".to_string(),
            vec![
                HistogramBin { center: 0.95, count: 0.0 },
                HistogramBin { center: 1.05, count: 3.0 },
            ],
        );
        let written = write_spectra(dir.path(), &spectra).unwrap();
        assert_eq!(written.len(), 1);
        let content = fs::read_to_string(&written[0]).unwrap();
        assert!(content.contains("1.05000"));
        assert!(content.lines().count() == 2);
    }
}
