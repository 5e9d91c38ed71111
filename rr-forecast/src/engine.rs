//! Per-run forecasting: order selection, model fit, and the persistence
//! fallback.

use crate::{
    aggregate::DailyFeatureRow,
    arma::{self, ArmaOrder, FitError, ForecastInterval},
    config::ForecastConfig,
    regression::LinearFit,
};
use chrono::NaiveDate;
use ndarray::Array2;
use rr_core::prediction::Prediction;
use rr_utils::{
    dates::DayRange,
    numeric::{mean, round1},
};
use serde::Serialize;
use std::fmt;

/// Residual variance at or below this fraction of `max(1, mean(flow²))`
/// means the weather regression explains the flow exactly.
const VARIANCE_EPS: f64 = 1e-10;

/// Where the fitted path gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FallbackStage {
    OrderSelection,
    ModelFit,
}

impl fmt::Display for FallbackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackStage::OrderSelection => write!(f, "order selection"),
            FallbackStage::ModelFit => write!(f, "model fit"),
        }
    }
}

/// How the forecast values were produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Fitted { order: ArmaOrder, aic: f64 },
    Fallback { stage: FallbackStage, reason: FitError },
}

impl fmt::Display for ForecastOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastOutcome::Fitted { order, aic } => write!(f, "fitted {} (AIC {:.1})", order, aic),
            ForecastOutcome::Fallback { stage, reason } => write!(f, "fallback at {}: {}", stage, reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointKind {
    Historical,
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub day: NaiveDate,
    pub kind: PointKind,
    pub low: f64,
    pub mean: f64,
    pub high: f64,
}

/// Observed context days followed by forecast days, ascending.
#[derive(Debug, Clone)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
    pub outcome: ForecastOutcome,
}

impl ForecastResult {
    pub fn forecast_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.kind == PointKind::Forecast)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, ForecastOutcome::Fallback { .. })
    }

    /// Rows to persist for `run_id`, values rounded to one decimal.
    pub fn to_predictions(&self, run_id: i64) -> Vec<Prediction> {
        self.points
            .iter()
            .map(|p| Prediction {
                run_id,
                day: p.day,
                forecast_low: round1(p.low),
                forecast_mean: round1(p.mean),
                forecast_high: round1(p.high),
            })
            .collect()
    }
}

/// Persistence forecast: the last observed flow for every step, with no
/// interval.
pub fn naive_forecast(last_flow: f64, horizon: usize) -> Vec<ForecastInterval> {
    vec![
        ForecastInterval {
            low: last_flow,
            mean: last_flow,
            high: last_flow,
        };
        horizon
    ]
}

pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        ForecastEngine { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Future regressors: mean temperature and precipitation of the
    /// trailing window, repeated for every forecast day.
    fn future_regressors(&self, rows: &[DailyFeatureRow], horizon: usize) -> Array2<f64> {
        let window = (self.config.exog_window_days as usize).clamp(1, rows.len());
        let recent = &rows[rows.len() - window..];
        let temps: Vec<f64> = recent.iter().map(|r| r.temp).collect();
        let precips: Vec<f64> = recent.iter().map(|r| r.precip).collect();
        let temp = mean(&temps).unwrap_or_default();
        let precip = mean(&precips).unwrap_or_default();
        Array2::from_shape_fn((horizon, 2), |(_, c)| if c == 0 { temp } else { precip })
    }

    /// Regression with ARMA errors: flow on the weather regressors by
    /// least squares, then the best ARMA order on the residuals.
    fn fit_and_forecast(
        &self,
        rows: &[DailyFeatureRow],
        horizon: usize,
    ) -> Result<(ArmaOrder, f64, Vec<ForecastInterval>), (FallbackStage, FitError)> {
        let n = rows.len();
        if n < self.config.min_observations {
            return Err((
                FallbackStage::OrderSelection,
                FitError::TooShort {
                    needed: self.config.min_observations,
                    got: n,
                },
            ));
        }
        let flow: Vec<f64> = rows.iter().map(|r| r.flow).collect();
        let days: Vec<NaiveDate> = rows.iter().map(|r| r.day).collect();
        let exog = Array2::from_shape_fn((n, 2), |(r, c)| if c == 0 { rows[r].temp } else { rows[r].precip });

        let weather = LinearFit::fit(&flow, &exog).map_err(|e| (FallbackStage::ModelFit, e))?;
        let residuals = weather.residuals(&flow, &exog).map_err(|e| (FallbackStage::ModelFit, e))?;
        let squares: Vec<f64> = flow.iter().map(|v| v * v).collect();
        let residual_squares: Vec<f64> = residuals.iter().map(|e| e * e).collect();
        let scale = mean(&squares).unwrap_or_default().max(1.0);
        if mean(&residual_squares).unwrap_or_default() <= VARIANCE_EPS * scale {
            return Err((FallbackStage::OrderSelection, FitError::DegenerateVariance));
        }

        let (max_ar, max_ma) = self.config.order_bounds();
        let model =
            arma::select_order(&days, &residuals, max_ar, max_ma).map_err(|e| (FallbackStage::OrderSelection, e))?;

        let regression = weather
            .predict(&self.future_regressors(rows, horizon))
            .map_err(|e| (FallbackStage::ModelFit, e))?;
        let intervals = model
            .forecast(horizon)
            .map_err(|e| (FallbackStage::ModelFit, e))?
            .into_iter()
            .zip(regression)
            .map(|(f, offset)| f.shifted(offset))
            .collect();
        Ok((model.order, model.aic, intervals))
    }

    /// Forecast the days after the last row of a gap-free, ascending series.
    ///
    /// Never fails on model trouble; that yields a
    /// [`ForecastOutcome::Fallback`]. Only an empty series is an error.
    pub fn forecast(&self, rows: &[DailyFeatureRow]) -> anyhow::Result<ForecastResult> {
        let Some(last) = rows.last() else {
            anyhow::bail!("cannot forecast an empty series");
        };
        let horizon = self.config.horizon_days as usize;

        let (outcome, intervals) = match self.fit_and_forecast(rows, horizon) {
            Ok((order, aic, intervals)) => (ForecastOutcome::Fitted { order, aic }, intervals),
            Err((stage, reason)) => {
                log::debug!("engine: {} failed ({}), using last flow {}", stage, reason, last.flow);
                (ForecastOutcome::Fallback { stage, reason }, naive_forecast(last.flow, horizon))
            }
        };

        let history_len = (self.config.history_days as usize).min(rows.len());
        let mut points: Vec<ForecastPoint> = rows[rows.len() - history_len..]
            .iter()
            .map(|r| ForecastPoint {
                day: r.day,
                kind: PointKind::Historical,
                low: r.flow,
                mean: r.flow,
                high: r.flow,
            })
            .collect();
        points.extend(
            DayRange::following(last.day, self.config.horizon_days)
                .zip(intervals)
                .map(|(day, f)| ForecastPoint {
                    day,
                    kind: PointKind::Forecast,
                    low: f.low,
                    mean: f.mean,
                    high: f.high,
                }),
        );

        Ok(ForecastResult { points, outcome })
    }
}
