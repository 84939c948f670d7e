//! Spectrum comparison objectives for the optimizer.

/// Smooths a measured spectrum for comparison against simulated ones.
///
/// Pads a zero point at each end, one channel outside the data, then
/// replaces the point list with the midpoints of consecutive pairs. The
/// padding pulls the curve to zero where the measurement ends instead of
/// cutting it off mid-count.
#[must_use]
pub fn prepare_measured(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let Some((&first, &last)) = points.first().zip(points.last()) else {
        return Vec::new();
    };
    let dx_front = if points.len() > 1 {
        points[1].0 - first.0
    } else {
        1.0
    };
    let dx_back = if points.len() > 1 {
        last.0 - points[points.len() - 2].0
    } else {
        1.0
    };

    let mut padded = Vec::with_capacity(points.len() + 2);
    padded.push((first.0 - dx_front, 0.0));
    padded.extend_from_slice(points);
    padded.push((last.0 + dx_back, 0.0));

    padded
        .windows(2)
        .map(|w| ((w[0].0 + w[1].0) / 2.0, (w[0].1 + w[1].1) / 2.0))
        .collect()
}

/// Samples two spectra onto a shared uniform grid.
///
/// The grid spans the union of both x ranges at `channel_width` steps;
/// each spectrum is linearly interpolated inside its own range and zero
/// outside it. Returns `None` when either spectrum is empty or the width
/// is not positive.
#[must_use]
pub fn uniform_spectra(
    a: &[(f64, f64)],
    b: &[(f64, f64)],
    channel_width: f64,
) -> Option<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    if a.is_empty() || b.is_empty() || !(channel_width.is_finite() && channel_width > 0.0) {
        return None;
    }
    let start = a[0].0.min(b[0].0);
    let end = a[a.len() - 1].0.max(b[b.len() - 1].0);
    if end < start {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = ((end - start) / channel_width).ceil() as usize + 1;
    let xs: Vec<f64> = (0..steps)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let x = start + i as f64 * channel_width;
            x
        })
        .collect();
    let ya: Vec<f64> = xs.iter().map(|&x| interpolate(a, x)).collect();
    let yb: Vec<f64> = xs.iter().map(|&x| interpolate(b, x)).collect();
    Some((xs, ya, yb))
}

/// Linear interpolation over a spectrum sorted by x; zero outside its
/// range.
fn interpolate(spectrum: &[(f64, f64)], x: f64) -> f64 {
    if x < spectrum[0].0 || x > spectrum[spectrum.len() - 1].0 {
        return 0.0;
    }
    let upper = spectrum.partition_point(|p| p.0 < x);
    if upper == 0 {
        return spectrum[0].1;
    }
    if upper >= spectrum.len() {
        return spectrum[spectrum.len() - 1].1;
    }
    let (x0, y0) = spectrum[upper - 1];
    let (x1, y1) = spectrum[upper];
    if x1 == x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Area between two spectra: trapezoid integral of their absolute
/// difference over the shared grid.
#[must_use]
pub fn area_between_curves(a: &[(f64, f64)], b: &[(f64, f64)], channel_width: f64) -> Option<f64> {
    let (_, ya, yb) = uniform_spectra(a, b, channel_width)?;
    let mut area = 0.0;
    for i in 1..ya.len() {
        let d0 = (ya[i - 1] - yb[i - 1]).abs();
        let d1 = (ya[i] - yb[i]).abs();
        area += (d0 + d1) / 2.0 * channel_width;
    }
    Some(area)
}

/// Summed absolute per-channel difference over the shared grid.
#[must_use]
pub fn sum_abs_difference(a: &[(f64, f64)], b: &[(f64, f64)], channel_width: f64) -> Option<f64> {
    let (_, ya, yb) = uniform_spectra(a, b, channel_width)?;
    Some(ya.iter().zip(&yb).map(|(p, q)| (p - q).abs()).sum())
}
