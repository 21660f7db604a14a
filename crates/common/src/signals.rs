use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The closed set of strategies the screener knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    Turtle,
    Bnf,
    CoiledSpring,
}

impl StrategyName {
    pub const ALL: [StrategyName; 3] = [
        StrategyName::Turtle,
        StrategyName::Bnf,
        StrategyName::CoiledSpring,
    ];
}

impl std::fmt::Display for StrategyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyName::Turtle => write!(f, "turtle"),
            StrategyName::Bnf => write!(f, "bnf"),
            StrategyName::CoiledSpring => write!(f, "coiled_spring"),
        }
    }
}

impl std::str::FromStr for StrategyName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "turtle" => Ok(StrategyName::Turtle),
            "bnf" => Ok(StrategyName::Bnf),
            "coiled_spring" | "coiled-spring" => Ok(StrategyName::CoiledSpring),
            other => Err(Error::Config(format!("unknown strategy '{other}'"))),
        }
    }
}

/// Which of the two turtle breakout systems produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurtleSystem {
    System1,
    System2,
}

impl std::fmt::Display for TurtleSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurtleSystem::System1 => write!(f, "system1_entry"),
            TurtleSystem::System2 => write!(f, "system2_entry"),
        }
    }
}

/// Breakout entry signal from one of the two turtle systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurtleSignal {
    pub symbol: String,
    pub system: TurtleSystem,
    pub date: NaiveDate,
    pub price: f64,
    pub atr: f64,
    /// Position size in whole units derived from account value and ATR.
    pub unit_size: i64,
    pub stop_loss_price: f64,
    pub breakout_high: f64,
    /// Entry window length of the system that fired (20 or 55).
    pub entry_window: usize,
    pub volume: f64,
    pub volume_ratio: f64,
    pub price_change_pct: f64,
    pub momentum_5d: f64,
    pub breakout_score: f64,
    pub volume_score: f64,
    pub momentum_score: f64,
    pub total_score: f64,
}

/// Mean-reversion buy signal: close far enough below the 25-day average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BnfSignal {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
    pub sma_25: f64,
    pub deviation_rate: f64,
    pub volume: f64,
    pub volume_ratio: f64,
    pub deviation_score: f64,
    pub volume_score: f64,
    pub total_score: f64,
}

/// Consolidation-before-breakout signal; fires only when all five setup
/// conditions hold simultaneously on the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoiledSpringSignal {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
    pub volatility_10d: f64,
    pub volatility_60d: f64,
    pub ema_20: f64,
    pub sma_50: f64,
    pub sma_100: f64,
    /// Short-window over long-window volume average.
    pub volume_ratio: f64,
    /// Fraction of up-days over the trend window.
    pub up_trend_strength: f64,
    pub volatility_score: f64,
    pub trend_score: f64,
    pub volume_score: f64,
    pub history_score: f64,
    pub total_score: f64,
}

/// A scored signal emitted by one strategy for one instrument on one date.
///
/// Signals are transient pipeline output; they are never written back into
/// the bar store. For every variant the named sub-scores sum to
/// `total_score` and the total lies in 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Signal {
    Turtle(TurtleSignal),
    Bnf(BnfSignal),
    CoiledSpring(CoiledSpringSignal),
}

impl Signal {
    pub fn strategy(&self) -> StrategyName {
        match self {
            Signal::Turtle(_) => StrategyName::Turtle,
            Signal::Bnf(_) => StrategyName::Bnf,
            Signal::CoiledSpring(_) => StrategyName::CoiledSpring,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Signal::Turtle(s) => &s.symbol,
            Signal::Bnf(s) => &s.symbol,
            Signal::CoiledSpring(s) => &s.symbol,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Signal::Turtle(s) => s.date,
            Signal::Bnf(s) => s.date,
            Signal::CoiledSpring(s) => s.date,
        }
    }

    /// Reference price the signal was evaluated at (latest close).
    pub fn reference_price(&self) -> f64 {
        match self {
            Signal::Turtle(s) => s.price,
            Signal::Bnf(s) => s.price,
            Signal::CoiledSpring(s) => s.price,
        }
    }

    pub fn total_score(&self) -> f64 {
        match self {
            Signal::Turtle(s) => s.total_score,
            Signal::Bnf(s) => s.total_score,
            Signal::CoiledSpring(s) => s.total_score,
        }
    }

    /// Sum of the named sub-scores; equals `total_score` for any signal
    /// built by the strategy layer.
    pub fn sub_score_sum(&self) -> f64 {
        match self {
            Signal::Turtle(s) => s.breakout_score + s.volume_score + s.momentum_score,
            Signal::Bnf(s) => s.deviation_score + s.volume_score,
            Signal::CoiledSpring(s) => {
                s.volatility_score + s.trend_score + s.volume_score + s.history_score
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_name_round_trips_through_str() {
        for name in StrategyName::ALL {
            let parsed: StrategyName = name.to_string().parse().unwrap();
            assert_eq!(parsed, name);
        }
    }

    #[test]
    fn unknown_strategy_name_is_a_config_error() {
        let err = "momentum".parse::<StrategyName>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
