//! Text format of residual calibration tables
//!
//! Whitespace-separated tokens; lines starting with `#` are comments.
//!
//! ```text
//! isUsed                       # 1/0 or true/false
//! nMean nSigma
//! <4 × nMean mean coefficients>   (phi,+) (phi,-) (z,+) (z,-)
//! <4 × nSigma sigma coefficients> (phi,+) (phi,-) (z,+) (z,-)
//! ```
//!
//! A table whose flag reports unused selects the fallback and nothing after
//! the flag is read.

use super::{Curve, DetectorCalibration, ResidualFit};
use pairpid_common::{Detector, Error, Result};
use std::path::Path;

/// Upper bound on coefficients per curve; anything larger is a corrupt header
const MAX_COEFFICIENTS: usize = 16;

struct Tokens<'a, I: Iterator<Item = &'a str>> {
    inner: I,
    path: &'a Path,
    consumed: usize,
}

impl<'a, I: Iterator<Item = &'a str>> Tokens<'a, I> {
    fn error(&self, detail: String) -> Error {
        Error::CalibrationFormat {
            path: self.path.to_path_buf(),
            detail,
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str> {
        let token = self.inner.next().ok_or_else(|| {
            self.error(format!(
                "truncated after {} tokens, expected {}",
                self.consumed, what
            ))
        })?;
        self.consumed += 1;
        Ok(token)
    }

    fn flag(&mut self) -> Result<bool> {
        let token = self.next("isUsed flag")?;
        match token.to_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(self.error(format!("isUsed flag must be 0/1/true/false, got '{other}'"))),
        }
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let token = self.next(what)?;
        let n: usize = token
            .parse()
            .map_err(|_| self.error(format!("{what} must be a non-negative integer, got '{token}'")))?;
        if n == 0 || n > MAX_COEFFICIENTS {
            return Err(self.error(format!(
                "{what} must be between 1 and {MAX_COEFFICIENTS}, got {n}"
            )));
        }
        Ok(n)
    }

    fn number(&mut self, what: &str) -> Result<f64> {
        let token = self.next(what)?;
        let value: f64 = token
            .parse()
            .map_err(|_| self.error(format!("{what}: '{token}' is not a number")))?;
        if !value.is_finite() {
            return Err(self.error(format!("{what}: '{token}' is not finite")));
        }
        Ok(value)
    }

    fn curves(&mut self, n: usize, what: &str) -> Result<[Curve; 4]> {
        let mut out: [Vec<f64>; 4] = Default::default();
        for (i, coefficients) in out.iter_mut().enumerate() {
            for j in 0..n {
                coefficients.push(self.number(&format!("{what} coefficient {j} of block {i}"))?);
            }
        }
        Ok(out.map(Curve::new))
    }
}

/// Parse the contents of a calibration table
pub fn parse_calibration(
    content: &str,
    path: &Path,
    detector: Detector,
    pt_floor: f64,
    pt_ceiling: f64,
) -> Result<DetectorCalibration> {
    let inner = content
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace);
    let mut tokens = Tokens {
        inner,
        path,
        consumed: 0,
    };

    if !tokens.flag()? {
        return Ok(DetectorCalibration::Fallback);
    }

    let n_mean = tokens.count("nMeanParams")?;
    let n_sigma = tokens.count("nSigmaParams")?;
    let mean = tokens.curves(n_mean, "mean")?;
    let sigma = tokens.curves(n_sigma, "sigma")?;

    if let Some(extra) = tokens.inner.next() {
        return Err(tokens.error(format!(
            "unexpected trailing token '{extra}' after {} coefficients",
            4 * (n_mean + n_sigma)
        )));
    }

    let fit = ResidualFit::new(detector, mean, sigma, pt_floor, pt_ceiling)?;
    Ok(DetectorCalibration::Fitted(fit))
}

/// Read and parse a calibration table from disk
pub fn load_calibration_file(
    path: &Path,
    detector: Detector,
    pt_floor: f64,
    pt_ceiling: f64,
) -> Result<DetectorCalibration> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::CalibrationFormat {
        path: path.to_path_buf(),
        detail: format!("cannot read: {e}"),
    })?;
    parse_calibration(&content, path, detector, pt_floor, pt_ceiling)
}
