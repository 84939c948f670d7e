//! Element identity with optional isotope selection.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::masses;

/// A chemical element, optionally pinned to a specific isotope.
///
/// Parsed from compact strings like `"H"`, `"4He"` or `"35Cl"`: up to two
/// leading digits select the isotope, the remainder is the symbol. The
/// `Display` impl reproduces the same form, so parsing round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Element {
    /// Chemical symbol, e.g. `"He"`.
    pub symbol: String,
    /// Mass number when a specific isotope is meant.
    pub isotope: Option<u32>,
}

impl Element {
    /// Creates an element for a bare symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            isotope: None,
        }
    }

    /// Creates an element pinned to an isotope.
    pub fn with_isotope(symbol: impl Into<String>, isotope: u32) -> Self {
        Self {
            symbol: symbol.into(),
            isotope: Some(isotope),
        }
    }

    /// Parses an element from a compact `"4He"`-style string.
    ///
    /// Accepts zero to two digits followed by one or two ascii letters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementParse`] when the string does not match that
    /// shape.
    pub fn from_string(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
        let rest = &s[digits.len()..];
        let valid_symbol = !rest.is_empty()
            && rest.len() <= 2
            && rest.chars().all(|c| c.is_ascii_alphabetic());
        if digits.len() > 2 || !valid_symbol {
            return Err(Error::ElementParse(s.to_string()));
        }
        let isotope = if digits.is_empty() {
            None
        } else {
            Some(
                digits
                    .parse::<u32>()
                    .map_err(|_| Error::ElementParse(s.to_string()))?,
            )
        };
        Ok(Self {
            symbol: rest.to_string(),
            isotope,
        })
    }

    /// Returns the mass in atomic mass units.
    ///
    /// The isotope mass when an isotope is pinned, otherwise the standard
    /// atomic mass of the symbol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownElement`] for symbols missing from the
    /// embedded table and [`Error::UnknownIsotope`] for mass numbers the
    /// table does not list.
    pub fn mass_amu(&self) -> Result<f64> {
        let record = masses::element_record(&self.symbol)
            .ok_or_else(|| Error::UnknownElement(self.symbol.clone()))?;
        match self.isotope {
            None => Ok(record.standard_mass),
            Some(n) => record
                .isotopes
                .iter()
                .find(|i| i.mass_number == n)
                .map(|i| i.mass_amu)
                .ok_or_else(|| Error::UnknownIsotope {
                    symbol: self.symbol.clone(),
                    mass_number: n,
                }),
        }
    }

    /// Returns the standard atomic mass of the symbol, ignoring any pinned
    /// isotope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownElement`] for symbols missing from the table.
    pub fn standard_mass_amu(&self) -> Result<f64> {
        masses::standard_mass(&self.symbol)
            .ok_or_else(|| Error::UnknownElement(self.symbol.clone()))
    }

    /// Returns a copy pinned to the naturally most abundant isotope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownElement`] for symbols missing from the table.
    pub fn most_common_isotope(&self) -> Result<Self> {
        let iso = masses::most_common_isotope(&self.symbol)
            .ok_or_else(|| Error::UnknownElement(self.symbol.clone()))?;
        Ok(Self::with_isotope(self.symbol.clone(), iso.mass_number))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.isotope {
            Some(n) => write!(f, "{n}{}", self.symbol),
            None => write!(f, "{}", self.symbol),
        }
    }
}

impl FromStr for Element {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}
