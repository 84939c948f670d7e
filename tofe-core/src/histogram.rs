//! Fixed-width histogram builder over columned row data.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::Columned;

/// One histogram bucket.
///
/// `center` is the bin label `floor(value / width) * width - width / 2`;
/// consecutive bins are exactly one width apart. `count` is a float so the
/// same type carries weighted histograms and smoothed spectra.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramBin {
    /// Bin label.
    pub center: f64,
    /// Number of samples (or summed weights) in the bin.
    pub count: f64,
}

/// Builds a fixed-width histogram over one column of `rows`.
///
/// Values are bucketed into `[a, a + width)` intervals aligned to
/// `a = floor(min / width) * width`; interior empty bins are kept so the
/// coverage is contiguous, but no empty bins are emitted before the first
/// or after the last sample. Rows without the requested column are ignored,
/// so an out-of-range column index yields an empty histogram.
///
/// # Errors
///
/// Returns [`Error::InvalidBinWidth`] when `width` is not a positive,
/// finite number.
pub fn hist<T: Columned>(rows: &[T], column: usize, width: f64) -> Result<Vec<HistogramBin>> {
    let samples: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| r.column(column).map(|v| (v, 1.0)))
        .collect();
    bucket(samples, width)
}

/// Weighted variant of [`hist`]: each row contributes the value of
/// `weight_column` instead of 1. Rows missing either column are ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidBinWidth`] when `width` is not a positive,
/// finite number.
pub fn hist_weighted<T: Columned>(
    rows: &[T],
    column: usize,
    weight_column: usize,
    width: f64,
) -> Result<Vec<HistogramBin>> {
    let samples: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.column(column)?, r.column(weight_column)?)))
        .collect();
    bucket(samples, width)
}

fn bucket(mut samples: Vec<(f64, f64)>, width: f64) -> Result<Vec<HistogramBin>> {
    if !(width.is_finite() && width > 0.0) {
        return Err(Error::InvalidBinWidth(width));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bins = Vec::new();
    let mut lower = (samples[0].0 / width).floor() * width;
    let mut i = 0;
    while i < samples.len() {
        let upper = lower + width;
        let mut count = 0.0;
        while i < samples.len() && samples[i].0 < upper {
            count += samples[i].1;
            i += 1;
        }
        bins.push(HistogramBin {
            center: lower - width / 2.0,
            count,
        });
        lower = upper;
    }
    Ok(bins)
}
