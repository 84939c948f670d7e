//! tofe-io: File formats and external collaborators of the analysis
//! pipeline.
//!
//! Raw measurement loading, cut files, selection files, converted event
//! tables, the external physics tools behind the [`PhysicsBackend`]
//! trait, the spectrum/loss/depth aggregators, `.ini` settings and the
//! per-session state store.

pub mod backend;
pub mod classification;
pub mod cut;
pub mod depth;
mod error;
pub mod event_table;
pub mod losses;
pub mod reader;
pub mod selections;
pub mod session;
pub mod settings;
pub mod spectra;

pub use backend::{CoincParams, EspeParams, ExternalBackend, PhysicsBackend};
pub use classification::write_cut_files;
pub use cut::{delete_cut_files, CutFile, CutName};
pub use depth::{load_depth_profiles, DepthProfile, DepthUnit};
pub use error::{Error, Result};
pub use event_table::{format_tof_list, parse_tof_list, TofListRow};
pub use losses::{element_losses, save_split_cuts};
pub use reader::load_measurement;
pub use selections::{load_selections, save_selections};
pub use session::{MeasurementSession, SessionStore};
pub use settings::{CalibrationSettings, DepthProfileSettings, MeasurementSettings, Settings};
pub use spectra::{compute_energy_spectra, pad_with_zero_bins, write_spectra, SpectraOptions};
