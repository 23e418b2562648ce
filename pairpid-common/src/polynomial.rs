//! Power-series helpers shared by band models and residual calibrations

/// Bisection depth at which a piece that still cannot be shown positive is
/// reported as non-positive
const MAX_DEPTH: u32 = 48;

/// Upper bound on pieces examined by `first_non_positive`
const MAX_PIECES: usize = 1 << 16;

/// `Σ c_i x^i` by Horner's rule
pub fn eval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Coefficients of the derivative series
fn derivative(coefficients: &[f64]) -> Vec<f64> {
    coefficients
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, c)| i as f64 * c)
        .collect()
}

/// Bound on |Σ c_i x^i| for |x| ≤ `x_max`
fn magnitude_bound(coefficients: &[f64], x_max: f64) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .map(|(i, c)| c.abs() * x_max.powi(i as i32))
        .sum()
}

/// First point of `[low, high]` where the series cannot be shown positive
///
/// The interval is bisected. On a piece of half-width `h` around `m` the
/// series is at least `p(m) - |p'(m)|·h - M₂·h²/2`, with `M₂` bounding the
/// second derivative over the whole interval; a piece is accepted once that
/// is positive. A zero, negative or non-finite midpoint is returned at
/// once, as is the midpoint of a piece still undecided at the depth limit,
/// so a series that only touches zero is rejected too. `None` means the
/// series is positive everywhere on the interval.
pub fn first_non_positive(coefficients: &[f64], low: f64, high: f64) -> Option<f64> {
    if !(low.is_finite() && high.is_finite() && low <= high) {
        return Some(low);
    }
    let x_max = low.abs().max(high.abs());
    let slope = derivative(coefficients);
    let curvature = magnitude_bound(&derivative(&slope), x_max);

    let mut pieces = vec![(low, high, 0u32)];
    let mut examined = 0usize;
    while let Some((a, b, depth)) = pieces.pop() {
        examined += 1;
        let mid = 0.5 * (a + b);
        let value = eval(coefficients, mid);
        if !(value.is_finite() && value > 0.0) {
            return Some(mid);
        }
        let h = 0.5 * (b - a);
        let lower = value - eval(&slope, mid).abs() * h - 0.5 * curvature * h * h;
        if lower > 0.0 {
            continue;
        }
        if depth >= MAX_DEPTH || examined >= MAX_PIECES {
            return Some(mid);
        }
        pieces.push((mid, b, depth + 1));
        pieces.push((a, mid, depth + 1));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_horner() {
        // 1 + 2x + 3x² at x = 2
        assert_eq!(eval(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(eval(&[], 3.0), 0.0);
    }

    #[test]
    fn test_constant_and_linear() {
        assert_eq!(first_non_positive(&[0.1], 0.0, 100.0), None);
        assert!(first_non_positive(&[-0.1], 0.0, 1.0).is_some());
        // 0.1 - 0.02 x crosses zero at x = 5
        assert_eq!(first_non_positive(&[0.1, -0.02], 0.05, 4.9), None);
        let x = first_non_positive(&[0.1, -0.02], 0.05, 20.0).unwrap();
        assert!(x >= 5.0, "x = {x}");
    }

    #[test]
    fn test_narrow_dip_between_grid_points() {
        // (x - 1.2345)² - 1e-8 is negative only for |x - 1.2345| < 1e-4
        let x0: f64 = 1.2345;
        let dip = [x0 * x0 - 1e-8, -2.0 * x0, 1.0];
        let x = first_non_positive(&dip, 0.2, 5.0).unwrap();
        assert!((x - x0).abs() < 1e-4, "x = {x}");

        let lifted = [x0 * x0 + 1e-3, -2.0 * x0, 1.0];
        assert_eq!(first_non_positive(&lifted, 0.2, 5.0), None);
    }

    #[test]
    fn test_touching_zero_is_rejected() {
        // (x - 1)² is zero at x = 1
        assert!(first_non_positive(&[1.0, -2.0, 1.0], 0.0, 2.0).is_some());
    }
}
