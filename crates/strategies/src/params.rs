//! Strategy parameter sets.
//!
//! Each struct carries sensible defaults and can be overridden from a flat
//! key/value map, which is how an external configuration layer feeds
//! thresholds in without this crate owning any file parsing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurtleParams {
    /// Stop distance in ATR multiples below the close.
    pub stop_loss_atr: f64,
    /// Fraction of account value risked per unit.
    pub risk_fraction: f64,
    pub min_price: f64,
    pub min_volume: f64,
    pub min_periods: usize,
}

impl Default for TurtleParams {
    fn default() -> Self {
        Self {
            stop_loss_atr: 2.0,
            risk_fraction: 0.01,
            min_price: 10.0,
            min_volume: 500_000.0,
            min_periods: 60,
        }
    }
}

impl TurtleParams {
    pub fn from_params(params: &HashMap<String, toml::Value>) -> Self {
        let d = Self::default();
        Self {
            stop_loss_atr: param_f64(params, "stop_loss_atr", d.stop_loss_atr),
            risk_fraction: param_f64(params, "risk_fraction", d.risk_fraction),
            min_price: param_f64(params, "min_price", d.min_price),
            min_volume: param_f64(params, "min_volume", d.min_volume),
            min_periods: param_usize(params, "min_periods", d.min_periods),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BnfParams {
    /// Deviation-rate trigger; negative fraction (e.g. -0.20 = 20% below
    /// the 25-day average).
    pub deviation_threshold: f64,
    pub min_price: f64,
    pub min_volume: f64,
    pub min_periods: usize,
}

impl Default for BnfParams {
    fn default() -> Self {
        Self {
            deviation_threshold: -0.20,
            min_price: 10.0,
            min_volume: 500_000.0,
            min_periods: 30,
        }
    }
}

impl BnfParams {
    pub fn from_params(params: &HashMap<String, toml::Value>) -> Self {
        let d = Self::default();
        Self {
            deviation_threshold: param_f64(params, "deviation_threshold", d.deviation_threshold),
            min_price: param_f64(params, "min_price", d.min_price),
            min_volume: param_f64(params, "min_volume", d.min_volume),
            min_periods: param_usize(params, "min_periods", d.min_periods),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoiledSpringParams {
    /// Minimum 60-day high/low spread (as a fraction of the high).
    pub volatility_threshold: f64,
    /// Short-window stdev must fall below this fraction of the long one.
    pub volatility_contract_ratio: f64,
    /// Short-window volume average must fall below this fraction of the
    /// long one.
    pub volume_contract_ratio: f64,
    /// Up-day count over the trend window must exceed this.
    pub trend_days_threshold: f64,
    /// Trend window length; also the denominator for up-day strength.
    pub trend_period: usize,
    pub min_price: f64,
    pub min_volume: f64,
    pub min_periods: usize,
}

impl Default for CoiledSpringParams {
    fn default() -> Self {
        Self {
            volatility_threshold: 0.3,
            volatility_contract_ratio: 0.5,
            volume_contract_ratio: 0.55,
            trend_days_threshold: 60.0,
            trend_period: 120,
            min_price: 10.0,
            min_volume: 500_000.0,
            min_periods: 120,
        }
    }
}

impl CoiledSpringParams {
    pub fn from_params(params: &HashMap<String, toml::Value>) -> Self {
        let d = Self::default();
        Self {
            volatility_threshold: param_f64(params, "volatility_threshold", d.volatility_threshold),
            volatility_contract_ratio: param_f64(
                params,
                "volatility_contract_ratio",
                d.volatility_contract_ratio,
            ),
            volume_contract_ratio: param_f64(
                params,
                "volume_contract_ratio",
                d.volume_contract_ratio,
            ),
            trend_days_threshold: param_f64(params, "trend_days_threshold", d.trend_days_threshold),
            trend_period: param_usize(params, "trend_period", d.trend_period),
            min_price: param_f64(params, "min_price", d.min_price),
            min_volume: param_f64(params, "min_volume", d.min_volume),
            min_periods: param_usize(params, "min_periods", d.min_periods),
        }
    }
}

/// Parameter sets for the whole closed strategy family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyParams {
    #[serde(default)]
    pub turtle: TurtleParams,
    #[serde(default)]
    pub bnf: BnfParams,
    #[serde(default)]
    pub coiled_spring: CoiledSpringParams,
}

fn param_f64(params: &HashMap<String, toml::Value>, key: &str, default: f64) -> f64 {
    params
        .get(key)
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .unwrap_or(default)
}

fn param_usize(params: &HashMap<String, toml::Value>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|v| v.as_integer())
        .map(|v| v as usize)
        .unwrap_or(default)
}
