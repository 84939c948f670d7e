//! Error types for tofe-core.

use thiserror::Error;

/// Result type alias for tofe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for tofe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Mass/angle combination with no physical solution.
    #[error("no physical solution for kinematics: {0}")]
    InvalidKinematics(String),

    /// Element symbol not present in the embedded nuclide table.
    #[error("unknown element symbol: {0}")]
    UnknownElement(String),

    /// String could not be parsed into an element.
    #[error("could not parse element from '{0}'")]
    ElementParse(String),

    /// Element has no isotope with the requested mass number.
    #[error("element {symbol} has no isotope with mass number {mass_number}")]
    UnknownIsotope { symbol: String, mass_number: u32 },

    /// Histogram bin width must be strictly positive.
    #[error("invalid bin width: {0}")]
    InvalidBinWidth(f64),
}
