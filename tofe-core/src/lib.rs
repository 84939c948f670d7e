//! tofe-core: Data model and recoil kinematics for time-of-flight elastic
//! recoil detection analysis.
//!
//! This crate provides the foundational types shared by the analysis
//! pipeline: element identities backed by an embedded nuclide table, raw
//! listmode events, the fixed-width histogram builder, two-body scattering
//! kinematics, and beam/detector geometry parameters.

pub mod element;
pub mod error;
pub mod event;
pub mod histogram;
pub mod instrument;
pub mod kinematics;
pub mod masses;

pub use element::Element;
pub use error::{Error, Result};
pub use event::{Columned, EventPoint};
pub use histogram::{hist, hist_weighted, HistogramBin};
pub use instrument::{BeamParams, DetectorGeometry};
pub use kinematics::{
    convert_amu_to_kg, convert_mev_to_joule, kinematic_factor, time_of_flight, DetectionType,
};
