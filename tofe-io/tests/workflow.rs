//! Whole-pipeline test: raw measurement to cut files to energy spectra
//! and element losses, with a fake physics backend.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tempfile::tempdir;
use tofe_algorithms::{classify, Selection};
use tofe_core::{DetectionType, Element};
use tofe_io::{
    compute_energy_spectra, element_losses, load_measurement, load_selections, save_selections,
    write_cut_files, write_spectra, CoincParams, CutFile, EspeParams, PhysicsBackend, Result,
    SpectraOptions, TofListRow,
};

struct ChannelBackend;

impl PhysicsBackend for ChannelBackend {
    /// Pretends every energy channel is worth 10 keV.
    fn convert_cut(&self, path: &Path, _: f64, _: f64) -> Result<Vec<TofListRow>> {
        let cut = CutFile::load(path)?;
        Ok(cut
            .events
            .iter()
            .map(|e| {
                #[allow(clippy::cast_precision_loss)]
                let energy_channel = e.energy as f64;
                #[allow(clippy::cast_precision_loss)]
                let tof_channel = e.tof as f64;
                TofListRow {
                    tof_channel,
                    energy_channel,
                    energy_mev: energy_channel * 0.01,
                    mass_number: 1,
                    tof_ns: 20.0,
                    element: cut.element.symbol.clone(),
                    weight: cut.weight_factor,
                    event_number: e.event_number,
                }
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

fn rect(symbol: &str, x0: f64, x1: f64, y0: f64, y1: f64) -> Selection {
    Selection::new(
        DetectionType::Erd,
        Element::new(symbol),
        None,
        1.0,
        "red",
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
    )
}

#[test]
fn measurement_to_spectra_and_losses() {
    let dir = tempdir().unwrap();

    // Raw measurement: hydrogen band around channel 100, silicon band
    // around channel 600.
    let mut raw = String::new();
    for i in 0..40 {
        let _ = writeln!(raw, "{} {}", 100 + i % 5, 150 + i % 7);
    }
    for i in 0..20 {
        let _ = writeln!(raw, "{} {}", 600 + i % 3, 420 + i % 4);
    }
    let measurement_path = dir.path().join("sample.asc");
    fs::write(&measurement_path, raw).unwrap();
    let events = load_measurement(&measurement_path).unwrap();
    assert_eq!(events.len(), 60);

    // Selections survive their file format.
    let selections = vec![
        rect("H", 90.0, 110.0, 140.0, 160.0),
        rect("Si", 590.0, 610.0, 410.0, 430.0),
    ];
    let selections_path = dir.path().join("sample.selections");
    save_selections(&selections_path, &selections).unwrap();
    let selections = load_selections(&selections_path).unwrap();

    // Classification writes one cut per non-empty selection.
    let classified = classify(&events, &selections);
    let cut_paths =
        write_cut_files(dir.path(), "sample", 41.12, &selections, &classified).unwrap();
    assert_eq!(cut_paths.len(), 2);

    // Energy spectra per cut, keyed by element.
    let spectra = compute_energy_spectra(
        &ChannelBackend,
        &cut_paths,
        1e-10,
        0.0,
        0.05,
        SpectraOptions::default(),
    );
    assert_eq!(spectra.len(), 2);
    let hydrogen = &spectra["H.ERD.1"];
    let total: f64 = hydrogen.iter().map(|b| b.count).sum();
    assert_eq!(total, 40.0);

    let written = write_spectra(dir.path(), &spectra).unwrap();
    assert_eq!(written.len(), 2);
    assert!(dir.path().join("Si.ERD.1.hist").exists());

    // Element losses of hydrogen against the silicon reference.
    let cuts: Vec<CutFile> = cut_paths.iter().map(|p| CutFile::load(p).unwrap()).collect();
    let reference = cuts
        .iter()
        .find(|c| c.element == Element::new("Si"))
        .unwrap();
    let losses = element_losses(reference, &cuts, 4);
    assert_eq!(losses.len(), 1);
    let counts = &losses["H.ERD.1"];
    assert_eq!(counts.len(), 4);
    // The hydrogen events all precede the silicon ones in the
    // measurement, so every one of them falls into the first slice.
    assert_eq!(counts[0], 40);
    assert_eq!(counts.iter().sum::<usize>(), 40);
}
