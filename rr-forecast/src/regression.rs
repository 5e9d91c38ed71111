//! Ordinary least squares of flow on the daily weather regressors.
//!
//! Regressor columns are centred and orthonormalised one at a time
//! (modified Gram-Schmidt); a column that is constant, or a linear
//! combination of the columns before it, is left out of the fit.

use crate::arma::FitError;
use ndarray::{Array1, Array2, Axis};

/// A centred column shorter than this fraction of its original norm is
/// treated as collinear with the columns already kept.
const COLLINEAR_TOL: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    /// One coefficient per entry of `kept`
    pub coefficients: Vec<f64>,
    /// Indices of the regressor columns that entered the fit
    pub kept: Vec<usize>,
    width: usize,
}

impl LinearFit {
    /// Fit `y = intercept + exog·β`, one row of `exog` per observation.
    pub fn fit(y: &[f64], exog: &Array2<f64>) -> Result<Self, FitError> {
        let n = y.len();
        if exog.nrows() != n {
            return Err(FitError::ShapeMismatch);
        }
        if y.iter().chain(exog.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite);
        }
        let y = Array1::from(y.to_vec());
        let (Some(y_mean), Some(means)) = (y.mean(), exog.mean_axis(Axis(0))) else {
            return Err(FitError::TooShort { needed: 1, got: 0 });
        };
        let centered = exog - &means;

        let mut basis: Vec<Array1<f64>> = Vec::new();
        // r[i][j]: upper-triangular factor, row i over kept columns j >= i
        let mut r: Vec<Vec<f64>> = Vec::new();
        let mut kept = Vec::new();
        for c in 0..exog.ncols() {
            let mut v = centered.column(c).to_owned();
            let scale = v.dot(&v).sqrt();
            let mut projections = Vec::with_capacity(basis.len());
            for q in &basis {
                let p = q.dot(&v);
                v.scaled_add(-p, q);
                projections.push(p);
            }
            let norm = v.dot(&v).sqrt();
            if scale <= COLLINEAR_TOL * means[c].abs().max(1.0) || norm <= COLLINEAR_TOL * scale {
                log::debug!("regression: dropping regressor column {}", c);
                continue;
            }
            for (row, p) in r.iter_mut().zip(projections) {
                row.push(p);
            }
            let mut row = vec![0.0; kept.len()];
            row.push(norm);
            r.push(row);
            basis.push(v / norm);
            kept.push(c);
        }

        let y_centered = &y - y_mean;
        let z: Vec<f64> = basis.iter().map(|q| q.dot(&y_centered)).collect();
        let mut coefficients = vec![0.0; kept.len()];
        for i in (0..kept.len()).rev() {
            let tail: f64 = ((i + 1)..kept.len()).map(|j| r[i][j] * coefficients[j]).sum();
            coefficients[i] = (z[i] - tail) / r[i][i];
        }
        let intercept = y_mean
            - kept
                .iter()
                .zip(&coefficients)
                .map(|(&c, b)| b * means[c])
                .sum::<f64>();

        if !intercept.is_finite() || coefficients.iter().any(|b| !b.is_finite()) {
            return Err(FitError::NonFinite);
        }
        Ok(LinearFit {
            intercept,
            coefficients,
            kept,
            width: exog.ncols(),
        })
    }

    /// Fitted values for each row of `exog`, laid out as at fit time.
    pub fn predict(&self, exog: &Array2<f64>) -> Result<Vec<f64>, FitError> {
        if exog.ncols() != self.width {
            return Err(FitError::ShapeMismatch);
        }
        Ok(exog
            .rows()
            .into_iter()
            .map(|row| {
                self.intercept
                    + self
                        .kept
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(&c, b)| b * row[c])
                        .sum::<f64>()
            })
            .collect())
    }

    pub fn residuals(&self, y: &[f64], exog: &Array2<f64>) -> Result<Vec<f64>, FitError> {
        if exog.nrows() != y.len() {
            return Err(FitError::ShapeMismatch);
        }
        Ok(y.iter().zip(self.predict(exog)?).map(|(v, f)| v - f).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Noise;

    #[test]
    fn test_recovers_coefficients() {
        let mut noise = Noise::new(3);
        let n = 200;
        let exog = Array2::from_shape_fn((n, 2), |_| noise.normal());
        let y: Vec<f64> = (0..n)
            .map(|t| 10.0 + 2.0 * exog[[t, 0]] - exog[[t, 1]] + 0.1 * noise.normal())
            .collect();
        let fit = LinearFit::fit(&y, &exog).unwrap();
        assert_eq!(fit.kept, vec![0, 1]);
        assert!((fit.intercept - 10.0).abs() < 0.05, "intercept {}", fit.intercept);
        assert!((fit.coefficients[0] - 2.0).abs() < 0.05);
        assert!((fit.coefficients[1] + 1.0).abs() < 0.05);
    }

    #[test]
    fn test_exact_line() {
        let exog = Array2::from_shape_fn((5, 1), |(r, _)| r as f64);
        let y: Vec<f64> = (0..5).map(|r| 1.0 + 2.0 * r as f64).collect();
        let fit = LinearFit::fit(&y, &exog).unwrap();
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
        let residuals = fit.residuals(&y, &exog).unwrap();
        assert!(residuals.iter().all(|e| e.abs() < 1e-9));
    }

    #[test]
    fn test_constant_and_duplicate_columns_are_dropped() {
        let mut noise = Noise::new(5);
        let n = 100;
        let base: Vec<f64> = (0..n).map(|_| noise.normal()).collect();
        let exog = Array2::from_shape_fn((n, 3), |(r, c)| match c {
            0 => 3.0,
            1 => base[r],
            _ => 2.0 * base[r],
        });
        let y: Vec<f64> = base.iter().map(|x| 5.0 + x).collect();
        let fit = LinearFit::fit(&y, &exog).unwrap();
        assert_eq!(fit.kept, vec![1]);
        let predicted = fit.predict(&exog).unwrap();
        assert!(predicted.iter().zip(&y).all(|(p, v)| (p - v).abs() < 1e-9));
    }

    #[test]
    fn test_all_constant_regressors_fit_the_mean() {
        let exog = Array2::from_elem((4, 2), 7.0);
        let fit = LinearFit::fit(&[1.0, 2.0, 3.0, 6.0], &exog).unwrap();
        assert!(fit.kept.is_empty());
        assert!((fit.intercept - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_shape_errors() {
        let exog = Array2::<f64>::zeros((3, 2));
        assert_eq!(LinearFit::fit(&[1.0, 2.0], &exog), Err(FitError::ShapeMismatch));
        assert_eq!(LinearFit::fit(&[], &Array2::<f64>::zeros((0, 2))), Err(FitError::TooShort { needed: 1, got: 0 }));

        let fit = LinearFit::fit(&[1.0, 2.0, 4.0], &Array2::from_shape_fn((3, 2), |(r, c)| (r * (c + 1)) as f64)).unwrap();
        assert_eq!(fit.predict(&Array2::zeros((2, 3))), Err(FitError::ShapeMismatch));
        assert_eq!(
            LinearFit::fit(&[1.0, f64::NAN, 2.0], &Array2::zeros((3, 1))),
            Err(FitError::NonFinite)
        );
    }
}
