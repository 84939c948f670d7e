//! External physics tools behind one trait seam.
//!
//! The production pipeline leans on small compiled helpers: `tof_list`
//! converts cut events into physical quantities, `get_stop` reports
//! stopping powers, `coinc` turns raw ADC data into coincident event
//! lists and `get_espe` simulates an energy spectrum from a recoil
//! distribution. Everything above this module talks to the
//! [`PhysicsBackend`] trait so tests can substitute fakes.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tofe_algorithms::{StoppingError, StoppingLookup};
use tofe_core::Element;

use crate::error::{Error, Result};
use crate::event_table::{parse_tof_list, TofListRow};

/// Electron volts to joules.
const J_PER_EV: f64 = 1.602_176_5e-19;

/// Atomic mass unit in kilograms, matching the kinematics constant.
const AMU_KG: f64 = 1.660_538_921e-27;

/// Parameters of a coincidence search over raw ADC data.
#[derive(Debug, Clone)]
pub struct CoincParams {
    /// Header lines to skip in the input.
    pub skip_lines: u64,
    /// Size of the search table.
    pub table_size: u64,
    /// Trigger ADC index.
    pub trigger: u32,
    /// Number of ADCs in the data.
    pub adc_count: u32,
    /// Accepted timing difference window `(low, high)` per ADC; the tool
    /// gets one `--low=<adc>,<value>` / `--high=<adc>,<value>` pair for
    /// each entry.
    pub timing: BTreeMap<u32, (i64, i64)>,
    /// Maximum events to emit; zero means all.
    pub max_events: u64,
    /// Which stdout columns make up an output line, in order.
    pub columns: Vec<usize>,
}

/// Parameters of an energy-spectrum simulation.
#[derive(Debug, Clone)]
pub struct EspeParams {
    /// Beam ion in `"<isotope><symbol>"` form.
    pub beam_ion: String,
    /// Beam energy, MeV.
    pub energy_mev: f64,
    /// Detector angle, degrees.
    pub theta_deg: f64,
    /// Spectrum channel width, MeV.
    pub channel_width_mev: f64,
    /// Ion fluence of the measurement.
    pub fluence: f64,
}

/// The external collaborators of the analysis pipeline.
pub trait PhysicsBackend {
    /// Converts a cut file into physical per-event rows using the ToF
    /// calibration line `seconds = slope * channel + offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] when the converter fails or emits
    /// unparseable rows.
    fn convert_cut(&self, cut_path: &Path, slope: f64, offset: f64) -> Result<Vec<TofListRow>>;

    /// Energy lost by `ion` at `energy_mev` in a carbon foil of the given
    /// areal density, in joules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] when the lookup tool fails.
    fn stopping_energy(
        &self,
        ion: &Element,
        energy_mev: f64,
        thickness_ug_cm2: f64,
    ) -> Result<f64>;

    /// Runs the coincidence search over `input` and writes the selected
    /// columns of each event line to `output`. Returns the number of
    /// events written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] or an I/O error.
    fn coincidence_filter(
        &self,
        input: &Path,
        output: &Path,
        params: &CoincParams,
    ) -> Result<usize>;

    /// Simulates the energy spectrum of a recoil distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] when the simulator fails.
    fn simulate_spectrum(
        &self,
        recoil: &[(f64, f64)],
        params: &EspeParams,
    ) -> Result<Vec<(f64, f64)>>;
}

/// Runs the real helper binaries found in one directory.
#[derive(Debug, Clone)]
pub struct ExternalBackend {
    tool_dir: PathBuf,
}

impl ExternalBackend {
    /// Creates a backend running tools from `tool_dir`.
    #[must_use]
    pub fn new(tool_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool_dir: tool_dir.into(),
        }
    }

    fn run(&self, tool: &str, args: &[String], stdin: Option<&str>) -> Result<String> {
        let fail = |reason: String| Error::ExternalTool {
            tool: tool.to_string(),
            reason,
        };
        let mut command = Command::new(self.tool_dir.join(tool));
        command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if stdin.is_some() {
            command.stdin(Stdio::piped());
        }
        let mut child = command.spawn().map_err(|e| fail(e.to_string()))?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .map_err(|e| fail(e.to_string()))?;
        }
        let output = child.wait_with_output().map_err(|e| fail(e.to_string()))?;
        if !output.status.success() {
            return Err(fail(format!(
                "exit status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout).map_err(|e| fail(e.to_string()))
    }

    /// `"<isotope>-<symbol>"` tag the stopping tool expects; unpinned
    /// elements get their most common isotope.
    fn ion_tag(ion: &Element) -> Result<String> {
        let pinned = match ion.isotope {
            Some(_) => ion.clone(),
            None => ion.most_common_isotope()?,
        };
        Ok(format!(
            "{}-{}",
            pinned.isotope.unwrap_or_default(),
            pinned.symbol
        ))
    }
}

impl PhysicsBackend for ExternalBackend {
    fn convert_cut(&self, cut_path: &Path, slope: f64, offset: f64) -> Result<Vec<TofListRow>> {
        let stdout = self.run(
            "tof_list",
            &[
                cut_path.display().to_string(),
                slope.to_string(),
                offset.to_string(),
            ],
            None,
        )?;
        parse_tof_list(&stdout)
    }

    fn stopping_energy(
        &self,
        ion: &Element,
        energy_mev: f64,
        thickness_ug_cm2: f64,
    ) -> Result<f64> {
        let tag = Self::ion_tag(ion)?;
        let stdout = self.run(
            "get_stop",
            &[tag, "C".to_string(), energy_mev.to_string()],
            None,
        )?;
        let ev_per_unit: f64 = stdout.trim().parse().map_err(|_| Error::ExternalTool {
            tool: "get_stop".to_string(),
            reason: format!("unparseable stopping value: {}", stdout.trim()),
        })?;
        // The tool reports eV per 1e15 atoms/cm²; scale by the foil's
        // atom count (carbon, mass 12 u) and convert to joules.
        let units = thickness_ug_cm2 * 1e-9 / (12.0 * AMU_KG) / 1e15;
        Ok(ev_per_unit * units * J_PER_EV)
    }

    fn coincidence_filter(
        &self,
        input: &Path,
        output: &Path,
        params: &CoincParams,
    ) -> Result<usize> {
        let mut args = vec![
            "--silent".to_string(),
            format!("--skip={}", params.skip_lines),
            format!("--tablesize={}", params.table_size),
            format!("--trigger={}", params.trigger),
            format!("--nadc={}", params.adc_count),
            "--timediff".to_string(),
        ];
        for (adc, (low, high)) in &params.timing {
            args.push(format!("--low={adc},{low}"));
            args.push(format!("--high={adc},{high}"));
        }
        args.push(format!("--nevents={}", params.max_events));
        args.push(input.display().to_string());
        let stdout = self.run("coinc", &args, None)?;

        let mut selected = String::new();
        let mut count = 0_usize;
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let picked: Option<Vec<&str>> = params
                .columns
                .iter()
                .map(|&c| fields.get(c).copied())
                .collect();
            let Some(picked) = picked else {
                return Err(Error::ExternalTool {
                    tool: "coinc".to_string(),
                    reason: format!("line has too few columns: {line}"),
                });
            };
            selected.push_str(&picked.join(" "));
            selected.push('\n');
            count += 1;
        }
        fs::write(output, selected)?;
        Ok(count)
    }

    fn simulate_spectrum(
        &self,
        recoil: &[(f64, f64)],
        params: &EspeParams,
    ) -> Result<Vec<(f64, f64)>> {
        let mut stdin = String::new();
        for (depth, concentration) in recoil {
            stdin.push_str(&format!("{depth} {concentration}\n"));
        }
        let args = vec![
            format!("--beam={}", params.beam_ion),
            format!("--energy={}", params.energy_mev),
            format!("--theta={}", params.theta_deg),
            format!("--ch={}", params.channel_width_mev),
            format!("--fluence={}", params.fluence),
        ];
        let stdout = self.run("get_espe", &args, Some(&stdin))?;

        let mut spectrum = Vec::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            let mut fields = line.split_whitespace();
            let pair = fields
                .next()
                .and_then(|x| x.parse::<f64>().ok())
                .zip(fields.next().and_then(|y| y.parse::<f64>().ok()));
            match pair {
                Some((x, y)) => spectrum.push((x, y)),
                None => {
                    return Err(Error::ExternalTool {
                        tool: "get_espe".to_string(),
                        reason: format!("unparseable spectrum line: {line}"),
                    })
                }
            }
        }
        Ok(spectrum)
    }
}

impl StoppingLookup for ExternalBackend {
    fn stopping_energy(
        &self,
        ion: &Element,
        energy_mev: f64,
        thickness_ug_cm2: f64,
    ) -> std::result::Result<f64, StoppingError> {
        PhysicsBackend::stopping_energy(self, ion, energy_mev, thickness_ug_cm2).map_err(|e| {
            StoppingError {
                ion: ion.to_string(),
                reason: e.to_string(),
            }
        })
    }
}
