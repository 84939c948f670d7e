//!
//! Command-line driver for the tofe recoil spectrometry toolkit.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use tofe_algorithms::{
    area_between_curves, classify, form_box_recoil, pick_final_solutions, prepare_measured,
    sum_abs_difference, CalibrationHistogram, NoStopping, Nsga2, Nsga2Config, StoppingLookup,
    SpectrumEvaluator, TofCalibration, TofCalibrationPoint,
};
use tofe_core::DetectionType;
use tofe_io::{
    compute_energy_spectra, element_losses, load_depth_profiles, load_measurement,
    load_selections, save_split_cuts, write_cut_files, write_spectra, CutFile, DepthUnit,
    EspeParams, ExternalBackend, PhysicsBackend, SessionStore, Settings, SpectraOptions,
};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    TofeIo(#[from] tofe_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] tofe_core::Error),

    #[error("{0}")]
    Analysis(String),
}

fn analysis(msg: impl Into<String>) -> CliError {
    CliError::Analysis(msg.into())
}

/// Depth axis unit selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DepthAxis {
    /// Depth in nanometres
    Nm,
    /// Areal density in 1e15 atoms/cm²
    Atoms,
}

/// Time-of-flight elastic recoil detection analysis.
#[derive(Parser)]
#[command(name = "tofe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify measurement events into cut files using a selections file
    Classify {
        /// Raw listmode measurement file
        measurement: PathBuf,

        /// Selections file drawn over the (ToF, Energy) histogram
        selections: PathBuf,

        /// Directory the cut files are written into
        #[arg(short, long)]
        output: PathBuf,

        /// Measurement name used in cut file names (defaults to the
        /// measurement file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Settings file for the detector angle
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Session store to record the used selections file in
        #[arg(long)]
        session: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Fit the ToF channel-to-seconds calibration from cut files
    Calibrate {
        /// Cut files, one calibration point each
        #[arg(required = true)]
        cuts: Vec<PathBuf>,

        /// Settings file for beam and detector parameters; the fitted
        /// line is written back into it
        #[arg(short, long)]
        settings: PathBuf,

        /// ToF histogram bin width in channels
        #[arg(long)]
        bin_width: Option<f64>,

        /// Directory holding the external helper binaries; foil losses
        /// are assumed zero without it
        #[arg(long)]
        tool_dir: Option<PathBuf>,
    },

    /// Compute energy spectra from cut files
    Spectrum {
        /// Cut files to convert and histogram
        #[arg(required = true)]
        cuts: Vec<PathBuf>,

        /// Directory holding the external helper binaries
        #[arg(long)]
        tool_dir: PathBuf,

        /// Settings file carrying the fitted calibration line
        #[arg(short, long)]
        settings: PathBuf,

        /// Spectrum channel width in MeV
        #[arg(long, default_value = "0.025")]
        width: f64,

        /// Weight each event by its detection efficiency instead of
        /// counting it once
        #[arg(long)]
        weighted: bool,

        /// Also save the converted event tables into this directory
        #[arg(long)]
        tof_list_dir: Option<PathBuf>,

        /// Directory the .hist files are written into
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Count element losses across reference slices
    Losses {
        /// Reference cut file whose event numbers define the slices
        reference: PathBuf,

        /// Cut files to count per slice
        #[arg(required = true)]
        cuts: Vec<PathBuf>,

        /// Number of slices
        #[arg(long, default_value = "4")]
        splits: u32,

        /// Also write the split cut files into this directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },

    /// Summarize depth profile files produced by the depth tool
    Depth {
        /// Directory holding depth.<element> files
        directory: PathBuf,

        /// Depth axis unit
        #[arg(long, value_enum, default_value = "nm")]
        unit: DepthAxis,
    },

    /// Optimize a box recoil distribution against a measured spectrum
    Optimize {
        /// Measured energy spectrum (.hist file)
        measured: PathBuf,

        /// Directory holding the external helper binaries
        #[arg(long)]
        tool_dir: PathBuf,

        /// Settings file for beam and detector parameters
        #[arg(short, long)]
        settings: PathBuf,

        /// Population size
        #[arg(long, default_value = "100")]
        pop_size: usize,

        /// Number of generations
        #[arg(long, default_value = "40")]
        generations: usize,

        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Ion fluence of the measurement
        #[arg(long, default_value = "1e12")]
        fluence: f64,
    },

    /// Show information about a measurement file
    Info {
        /// Raw listmode measurement file
        measurement: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            measurement,
            selections,
            output,
            name,
            settings,
            session,
            verbose,
        } => {
            let name = name.unwrap_or_else(|| {
                measurement
                    .file_stem()
                    .map_or_else(|| "measurement".to_string(), |s| s.to_string_lossy().into_owned())
            });
            let settings = settings.map_or_else(Settings::default, |p| Settings::load(&p));

            let start = Instant::now();
            let events = load_measurement(&measurement)?;
            let selection_list = load_selections(&selections)?;
            if verbose {
                eprintln!("{} events, {} selections", events.len(), selection_list.len());
            }

            let classified = classify(&events, &selection_list);
            fs::create_dir_all(&output)?;
            let written = write_cut_files(
                &output,
                &name,
                settings.measurement.detector.theta_deg,
                &selection_list,
                &classified,
            )?;

            if let Some(session_path) = session {
                let mut store = SessionStore::load(&session_path)?;
                let entry = store.entry(&name);
                entry.selection_file = Some(selections.display().to_string());
                entry.checked_cuts = written
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                store.save(&session_path)?;
            }

            println!(
                "Classified {} events into {} cut file(s) in {:.2}s",
                events.len(),
                written.len(),
                start.elapsed().as_secs_f64()
            );
            for path in &written {
                println!("  {}", path.display());
            }
        }

        Commands::Calibrate {
            cuts,
            settings,
            bin_width,
            tool_dir,
        } => {
            let mut config = Settings::load(&settings);
            let bin_width = bin_width.unwrap_or(config.calibration.bin_width);
            let backend = tool_dir.map(ExternalBackend::new);
            let stopping: &dyn StoppingLookup = match &backend {
                Some(b) => b,
                None => &NoStopping,
            };

            let mut calibration = TofCalibration::new();
            for path in &cuts {
                let cut = CutFile::load(path)?;
                let histogram = CalibrationHistogram::from_events(&cut.events, bin_width)?;
                let Some(edge) = histogram.fit_edge() else {
                    eprintln!("no usable edge in {}, skipping", path.display());
                    continue;
                };
                let target = match (cut.kind, &cut.scatter) {
                    (DetectionType::Rbs, Some(scatter)) => scatter.clone(),
                    _ => cut.element.clone(),
                };
                let point = TofCalibrationPoint::new(
                    edge.x0,
                    cut.kind,
                    &target,
                    &config.measurement.beam,
                    &config.measurement.detector,
                    stopping,
                )?;
                println!(
                    "{:<16} channel {:8.2} -> {:.4e} s",
                    point.label, point.tof_channel, point.tof_seconds
                );
                calibration.add_point(point);
            }

            let (slope, offset) = calibration
                .fit_linear()
                .ok_or_else(|| analysis("calibration needs at least two fitted points"))?;
            println!("slope  = {:.6e} s/channel", slope);
            println!("offset = {:.6e} s", offset);

            config.calibration.slope = Some(slope);
            config.calibration.offset = Some(offset);
            config.save(&settings)?;
        }

        Commands::Spectrum {
            cuts,
            tool_dir,
            settings,
            width,
            weighted,
            tof_list_dir,
            output,
        } => {
            let config = Settings::load(&settings);
            let (Some(slope), Some(offset)) =
                (config.calibration.slope, config.calibration.offset)
            else {
                return Err(analysis("settings carry no calibration; run calibrate first"));
            };

            if let Some(dir) = &tof_list_dir {
                fs::create_dir_all(dir)?;
            }
            let options = SpectraOptions {
                use_weights: weighted,
                tof_list_dir: tof_list_dir.as_deref(),
            };
            let backend = ExternalBackend::new(tool_dir);
            let spectra = compute_energy_spectra(&backend, &cuts, slope, offset, width, options);
            fs::create_dir_all(&output)?;
            let written = write_spectra(&output, &spectra)?;
            println!("Wrote {} spectrum file(s)", written.len());
            for (key, bins) in &spectra {
                let total: f64 = bins.iter().map(|b| b.count).sum();
                println!("  {:<24} {:8.0} counts", key, total);
            }
        }

        Commands::Losses {
            reference,
            cuts,
            splits,
            save_dir,
        } => {
            let reference = CutFile::load(&reference)?;
            let cuts: Vec<CutFile> = cuts
                .iter()
                .map(|p| CutFile::load(p))
                .collect::<tofe_io::Result<_>>()?;

            let losses = element_losses(&reference, &cuts, splits);
            for (key, counts) in &losses {
                let formatted: Vec<String> = counts.iter().map(ToString::to_string).collect();
                println!("{:<24} {}", key, formatted.join(" "));
            }

            if let Some(dir) = save_dir {
                fs::create_dir_all(&dir)?;
                let measurement = reference
                    .name
                    .as_ref()
                    .map_or("measurement", |n| n.measurement.as_str());
                let written = save_split_cuts(&dir, measurement, &reference, &cuts, splits)?;
                println!("Wrote {} split cut file(s)", written.len());
            }
        }

        Commands::Depth { directory, unit } => {
            let unit = match unit {
                DepthAxis::Nm => DepthUnit::Nm,
                DepthAxis::Atoms => DepthUnit::AtomsPerCm2,
            };
            let profiles = load_depth_profiles(&directory, unit)?;
            if profiles.is_empty() {
                return Err(analysis("no depth files found"));
            }
            for profile in &profiles {
                let label = profile
                    .element
                    .as_ref()
                    .map_or_else(|| "total".to_string(), ToString::to_string);
                let peak = profile
                    .concentrations
                    .iter()
                    .fold(0.0_f64, |a, &b| a.max(b));
                println!(
                    "{:<8} {:4} bins, peak concentration {:6.2}%",
                    label,
                    profile.depths.len(),
                    peak
                );
            }
        }

        Commands::Optimize {
            measured,
            tool_dir,
            settings,
            pop_size,
            generations,
            seed,
            fluence,
        } => {
            let config = Settings::load(&settings);
            let measured_spectrum = prepare_measured(&read_hist(&measured)?);
            if measured_spectrum.is_empty() {
                return Err(analysis("measured spectrum is empty"));
            }

            let evaluator = RecoilEvaluator {
                backend: ExternalBackend::new(tool_dir),
                measured: measured_spectrum,
                params: EspeParams {
                    beam_ion: config.measurement.beam.ion.to_string(),
                    energy_mev: config.measurement.beam.energy_mev,
                    theta_deg: config.measurement.detector.theta_deg,
                    channel_width_mev: 0.025,
                    fluence,
                },
            };

            // Genes: box edge depth in nm and plateau concentration.
            let mut optimizer_config =
                Nsga2Config::new(pop_size, generations, vec![1.0, 0.0001], vec![110.0, 1.0]);
            optimizer_config.seed = seed;

            let start = Instant::now();
            let front = Nsga2::new(optimizer_config).run(&evaluator);
            let [min_area, median, min_distance] = pick_final_solutions(&front)
                .ok_or_else(|| analysis("optimizer produced no solutions"))?;
            println!(
                "Optimized {} candidate(s) in {:.1}s, front size {}",
                pop_size * generations,
                start.elapsed().as_secs_f64(),
                front.len()
            );
            for (tag, solution) in [
                ("min-area", &min_area),
                ("median", &median),
                ("min-distance", &min_distance),
            ] {
                println!(
                    "{:<12} genes {:?}  objectives [{:.4}, {:.4}]",
                    tag, solution.genes, solution.objectives[0], solution.objectives[1]
                );
            }
        }

        Commands::Info { measurement } => {
            let events = load_measurement(&measurement)?;
            println!("File: {}", measurement.display());
            println!("Events: {}", events.len());
            if let (Some(first), Some(last)) = (events.first(), events.last()) {
                let tof_max = events.iter().map(|e| e.tof).max().unwrap_or(first.tof);
                let tof_min = events.iter().map(|e| e.tof).min().unwrap_or(first.tof);
                let energy_max = events.iter().map(|e| e.energy).max().unwrap_or(first.energy);
                println!("ToF channels: {} - {}", tof_min, tof_max);
                println!("Energy channel max: {}", energy_max);
                println!("Last event number: {}", last.event_number);
            }
        }
    }

    Ok(())
}

/// Simulates a candidate box distribution and scores it against the
/// measured spectrum.
struct RecoilEvaluator {
    backend: ExternalBackend,
    measured: Vec<(f64, f64)>,
    params: EspeParams,
}

impl SpectrumEvaluator for RecoilEvaluator {
    fn evaluate(&self, genes: &[f64]) -> Option<[f64; 2]> {
        let recoil = form_box_recoil(genes)?;
        let simulated = self.backend.simulate_spectrum(&recoil, &self.params).ok()?;
        if simulated.is_empty() {
            return None;
        }
        let width = self.params.channel_width_mev;
        Some([
            area_between_curves(&simulated, &self.measured, width)?,
            sum_abs_difference(&simulated, &self.measured, width)?,
        ])
    }
}

/// Reads a `.hist` file back into (center, count) pairs.
fn read_hist(path: &Path) -> Result<Vec<(f64, f64)>> {
    let content = fs::read_to_string(path)?;
    let mut points = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields = line.split_whitespace();
        let pair = fields
            .next()
            .and_then(|x| x.parse::<f64>().ok())
            .zip(fields.next().and_then(|y| y.parse::<f64>().ok()));
        match pair {
            Some(point) => points.push(point),
            None => return Err(analysis(format!("bad histogram line: {line}"))),
        }
    }
    Ok(points)
}
