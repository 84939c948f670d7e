//! tofe-algorithms: Numerical machinery of the analysis pipeline.
//!
//! Covers the time-of-flight calibration engine (error-function edge
//! fitting and the channel-to-seconds line), selection geometry with the
//! event classifier, spectrum comparison objectives and the NSGA-II
//! optimizer for recoil distributions.

pub mod calibration;
pub mod classifier;
pub mod fit;
pub mod nsga2;
pub mod objectives;
pub mod recoil;
pub mod selection;

pub use calibration::{
    CalibrationHistogram, NoStopping, StoppingError, StoppingLookup, TofCalibration,
    TofCalibrationPoint,
};
pub use classifier::{classify, ClassifiedCut};
pub use fit::{fit_error_function, fit_linear, ErfEdgeFit};
pub use nsga2::{
    crowding_distance, dominates, fast_nondominated_sort, pick_final_solutions, Nsga2,
    Nsga2Config, Solution, SpectrumEvaluator,
};
pub use objectives::{area_between_curves, prepare_measured, sum_abs_difference, uniform_spectra};
pub use recoil::form_box_recoil;
pub use selection::{point_inside_polygon, AxesLimits, Selection, SelectionParseError};
