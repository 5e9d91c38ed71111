//! ARMA(p, q) models on a daily series, fitted with `anofox_forecast`.
//!
//! The engine removes the weather regression first, so the series here is
//! the regression residual. Orders are compared by AIC; forecasts come with
//! the model's own 95% prediction intervals.

use anofox_forecast::core::TimeSeries;
use anofox_forecast::models::arima::ARIMA;
use anofox_forecast::models::Forecaster;
use chrono::NaiveDate;
use rr_utils::dates::midnight_utc;
use serde::Serialize;
use std::fmt;

/// Coverage of the forecast intervals.
pub const INTERVAL_LEVEL: f64 = 0.95;

/// Why a candidate model could not be fitted or forecast.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("series too short: need {needed} observations, got {got}")]
    TooShort { needed: usize, got: usize },
    #[error("residual variance is degenerate")]
    DegenerateVariance,
    #[error("non-finite value in model or forecast")]
    NonFinite,
    #[error("input shapes do not match")]
    ShapeMismatch,
    #[error("forecast interval does not contain its mean")]
    InvalidInterval,
    #[error("no candidate order could be fitted")]
    NoCandidate,
    #[error("model error: {0}")]
    Model(String),
}

fn model_error<E: fmt::Display>(e: E) -> FitError {
    FitError::Model(e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArmaOrder {
    pub p: usize,
    pub q: usize,
}

impl ArmaOrder {
    /// Shortest series a candidate of this order is fitted on.
    pub fn min_length(&self) -> usize {
        2 * (self.p + self.q) + 4
    }
}

impl fmt::Display for ArmaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARMA({},{})", self.p, self.q)
    }
}

/// A forecast value with its prediction interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastInterval {
    pub low: f64,
    pub mean: f64,
    pub high: f64,
}

impl ForecastInterval {
    pub fn shifted(self, offset: f64) -> Self {
        ForecastInterval {
            low: self.low + offset,
            mean: self.mean + offset,
            high: self.high + offset,
        }
    }
}

pub struct ArmaModel {
    pub order: ArmaOrder,
    pub aic: f64,
    model: ARIMA,
}

impl fmt::Debug for ArmaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmaModel")
            .field("order", &self.order)
            .field("aic", &self.aic)
            .finish()
    }
}

fn daily_series(days: &[NaiveDate], values: &[f64]) -> Result<TimeSeries, FitError> {
    let timestamps = days.iter().map(|d| midnight_utc(*d)).collect();
    TimeSeries::univariate(timestamps, values.to_vec()).map_err(model_error)
}

/// Fit ARMA(`order`) with a constant to `values`, observed on `days`.
pub fn fit(days: &[NaiveDate], values: &[f64], order: ArmaOrder) -> Result<ArmaModel, FitError> {
    if days.len() != values.len() {
        return Err(FitError::ShapeMismatch);
    }
    let needed = order.min_length();
    if values.len() < needed {
        return Err(FitError::TooShort {
            needed,
            got: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let mut model = ARIMA::new(order.p, 0, order.q);
    model.fit(&daily_series(days, values)?).map_err(model_error)?;
    let aic = model.aic().filter(|a| a.is_finite()).ok_or(FitError::NonFinite)?;
    Ok(ArmaModel { order, aic, model })
}

/// Fit every `p ∈ 0..=max_ar`, `q ∈ 0..=max_ma` and keep the lowest AIC.
/// Candidates that fail are skipped; [`FitError::NoCandidate`] when none fits.
pub fn select_order(days: &[NaiveDate], values: &[f64], max_ar: usize, max_ma: usize) -> Result<ArmaModel, FitError> {
    let mut best: Option<ArmaModel> = None;
    for p in 0..=max_ar {
        for q in 0..=max_ma {
            let order = ArmaOrder { p, q };
            match fit(days, values, order) {
                Ok(model) => {
                    if best.as_ref().map_or(true, |b| model.aic < b.aic) {
                        best = Some(model);
                    }
                }
                Err(e) => log::debug!("arma: {} rejected: {}", order, e),
            }
        }
    }
    best.ok_or(FitError::NoCandidate)
}

impl ArmaModel {
    /// Forecast `horizon` days past the end of the fitted series.
    pub fn forecast(&self, horizon: usize) -> Result<Vec<ForecastInterval>, FitError> {
        let forecast = self
            .model
            .predict_with_intervals(horizon, INTERVAL_LEVEL)
            .map_err(model_error)?;
        let mean = forecast.primary().to_vec();
        let lower = forecast.lower_series(0).map_err(model_error)?.to_vec();
        let upper = forecast.upper_series(0).map_err(model_error)?.to_vec();
        if mean.len() < horizon || lower.len() < horizon || upper.len() < horizon {
            return Err(FitError::Model(format!("expected {} forecast steps, got {}", horizon, mean.len())));
        }

        (0..horizon)
            .map(|h| {
                let interval = ForecastInterval {
                    low: lower[h],
                    mean: mean[h],
                    high: upper[h],
                };
                if !(interval.low.is_finite() && interval.mean.is_finite() && interval.high.is_finite()) {
                    Err(FitError::NonFinite)
                } else if interval.low > interval.mean || interval.mean > interval.high {
                    Err(FitError::InvalidInterval)
                } else {
                    Ok(interval)
                }
            })
            .collect()
    }
}
