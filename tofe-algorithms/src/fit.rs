//! Curve fitting primitives: the error function, a small dense
//! Levenberg-Marquardt solver and closed-form linear least squares.

/// Error function, Abramowitz & Stegun 7.1.26 rational approximation.
///
/// Maximum absolute error about 1.5e-7, which is far below the channel
/// noise of the histograms this gets fitted to.
#[must_use]
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Edge model `A * (erf((x - x0) / k) + 1) / 2` evaluated at `x`.
#[must_use]
pub fn erf_edge(x: f64, x0: f64, amplitude: f64, width: f64) -> f64 {
    amplitude * (erf((x - x0) / width) + 1.0) / 2.0
}

/// Result of an error-function edge fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErfEdgeFit {
    /// Edge midpoint, the calibrated channel position.
    pub x0: f64,
    /// Plateau height.
    pub amplitude: f64,
    /// Edge width parameter.
    pub width: f64,
}

/// Fits `erf_edge` to `(xs, ys)` by Levenberg-Marquardt.
///
/// Seeded with the last sample as midpoint and plateau and a width of 10
/// channels. Returns `None` for fewer than two samples or when the solver
/// fails to converge to finite parameters.
#[must_use]
pub fn fit_error_function(xs: &[f64], ys: &[f64]) -> Option<ErfEdgeFit> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    let seed = [*xs.last()?, *ys.last()?, 10.0];
    let params = levenberg_marquardt(
        |x, p| erf_edge(x, p[0], p[1], p[2]),
        xs,
        ys,
        &seed,
        100,
    )?;
    Some(ErfEdgeFit {
        x0: params[0],
        amplitude: params[1],
        width: params[2],
    })
}

/// Fits `y = slope * x + offset` by ordinary least squares.
///
/// Returns `None` for fewer than two points or degenerate x values.
#[must_use]
pub fn fit_linear(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx == 0.0 || !sxx.is_finite() {
        return None;
    }
    let slope = sxy / sxx;
    let offset = mean_y - slope * mean_x;
    if slope.is_finite() && offset.is_finite() {
        Some((slope, offset))
    } else {
        None
    }
}

/// Damped least-squares fit of `model(x, params)` to `(xs, ys)`.
///
/// Uses a forward-difference Jacobian and multiplicative damping. Stops
/// when the relative cost improvement vanishes or no damping value yields
/// an improving step, and returns the best parameters seen; `None` means
/// the cost or the parameters went non-finite.
pub fn levenberg_marquardt<F>(
    model: F,
    xs: &[f64],
    ys: &[f64],
    initial: &[f64],
    max_iter: usize,
) -> Option<Vec<f64>>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let n_params = initial.len();
    let mut params = initial.to_vec();
    let mut cost = sum_squares(&model, xs, ys, &params)?;
    let mut lambda = 1e-3;

    for _ in 0..max_iter {
        // Forward-difference Jacobian and gradient.
        let mut jtj = vec![vec![0.0; n_params]; n_params];
        let mut jtr = vec![0.0; n_params];
        let steps: Vec<f64> = params
            .iter()
            .map(|p| (p.abs() * 1e-6).max(1e-8))
            .collect();
        for (&x, &y) in xs.iter().zip(ys) {
            let f0 = model(x, &params);
            let residual = y - f0;
            let mut row = vec![0.0; n_params];
            for j in 0..n_params {
                let mut bumped = params.clone();
                bumped[j] += steps[j];
                row[j] = (model(x, &bumped) - f0) / steps[j];
            }
            for j in 0..n_params {
                jtr[j] += row[j] * residual;
                for k in 0..n_params {
                    jtj[j][k] += row[j] * row[k];
                }
            }
        }

        let mut improved = false;
        for _ in 0..10 {
            let mut damped = jtj.clone();
            for (j, row) in damped.iter_mut().enumerate() {
                row[j] += lambda * jtj[j][j].max(1e-12);
            }
            let mut rhs = jtr.clone();
            let Some(delta) = solve(&mut damped, &mut rhs) else {
                lambda *= 10.0;
                continue;
            };
            let trial: Vec<f64> = params.iter().zip(&delta).map(|(p, d)| p + d).collect();
            match sum_squares(&model, xs, ys, &trial) {
                Some(trial_cost) if trial_cost < cost => {
                    let converged = (cost - trial_cost) < 1e-12 * (cost + 1e-12);
                    params = trial;
                    cost = trial_cost;
                    lambda = (lambda / 10.0).max(1e-12);
                    improved = true;
                    if converged {
                        return Some(params);
                    }
                    break;
                }
                _ => lambda *= 10.0,
            }
        }
        if !improved {
            break;
        }
    }
    params.iter().all(|p| p.is_finite()).then_some(params)
}

fn sum_squares<F>(model: &F, xs: &[f64], ys: &[f64], params: &[f64]) -> Option<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut cost = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let r = y - model(x, params);
        cost += r * r;
    }
    cost.is_finite().then_some(cost)
}

/// Solves `a * x = b` in place by Gaussian elimination with partial
/// pivoting. Sized for the 2-3 parameter systems the fits produce.
fn solve(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
