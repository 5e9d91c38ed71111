use serde::Deserialize;

/// Largest AR or MA order the order search will try.
pub const MAX_ORDER: usize = 5;

/// Tuning knobs for the forecast pipeline.
///
/// Every field has a default, so a TOML file only needs the keys it
/// overrides:
///
/// ```toml
/// max_ar = 2
/// lookback_days = 730
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days of raw measurements requested per run
    pub lookback_days: u32,
    /// Days forecast past the last observed day
    pub horizon_days: u32,
    /// Observed days prepended to the forecast for context
    pub history_days: u32,
    /// Trailing rows averaged into the future exogenous inputs
    pub exog_window_days: u32,
    pub max_ar: usize,
    pub max_ma: usize,
    /// Longest run of missing days that is interpolated rather than cut
    pub max_gap_days: u32,
    /// Shortest series a model is fitted to
    pub min_observations: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            lookback_days: 1460,
            horizon_days: 7,
            history_days: 21,
            exog_window_days: 7,
            max_ar: 4,
            max_ma: 2,
            max_gap_days: 3,
            min_observations: 5,
        }
    }
}

impl ForecastConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: ForecastConfig = toml::from_str(s)?;
        if config.horizon_days == 0 {
            anyhow::bail!("horizon_days must be at least 1");
        }
        Ok(config)
    }

    /// The `(max_ar, max_ma)` search bounds, capped at [`MAX_ORDER`].
    pub fn order_bounds(&self) -> (usize, usize) {
        (self.max_ar.min(MAX_ORDER), self.max_ma.min(MAX_ORDER))
    }
}
