//! BNF mean-reversion strategy: buy when the close has fallen far enough
//! below its 25-day moving average. Buy signals only.

use common::{BnfSignal, EnrichedBar, Signal, StrategyName};

use crate::{BnfParams, Strategy};

pub struct BnfStrategy {
    params: BnfParams,
}

impl BnfStrategy {
    pub fn new(params: BnfParams) -> Self {
        Self { params }
    }
}

impl Strategy for BnfStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Bnf
    }

    fn describe(&self) -> &'static str {
        "Buy on deep negative deviation from the 25-day moving average"
    }

    fn min_periods(&self) -> usize {
        self.params.min_periods
    }

    fn detect(&self, bars: &[EnrichedBar], _account_value: f64) -> Vec<Signal> {
        if bars.len() < self.params.min_periods.max(1) {
            return Vec::new();
        }
        let last = bars.last().expect("non-empty checked above");

        if last.bar.close < self.params.min_price || last.bar.volume < self.params.min_volume {
            return Vec::new();
        }
        let (Some(sma_25), Some(deviation_rate)) =
            (last.indicators.sma_25, last.indicators.deviation_rate)
        else {
            return Vec::new();
        };
        if deviation_rate > self.params.deviation_threshold {
            return Vec::new();
        }

        let volume_ratio = last.indicators.volume_ratio.unwrap_or(1.0);
        let deviation_score = deviation_score(deviation_rate);
        let volume_score = volume_score(volume_ratio);

        vec![Signal::Bnf(BnfSignal {
            symbol: last.bar.symbol.clone(),
            date: last.bar.date,
            price: last.bar.close,
            sma_25,
            deviation_rate,
            volume: last.bar.volume,
            volume_ratio,
            deviation_score,
            volume_score,
            total_score: deviation_score + volume_score,
        })]
    }
}

/// Deviation depth, 60 points max; deeper below the average scores more.
fn deviation_score(deviation_rate: f64) -> f64 {
    if deviation_rate <= -0.25 {
        60.0
    } else if deviation_rate <= -0.23 {
        50.0
    } else if deviation_rate <= -0.21 {
        40.0
    } else if deviation_rate <= -0.20 {
        30.0
    } else {
        0.0
    }
}

/// Volume participation, 40 points max.
fn volume_score(ratio: f64) -> f64 {
    if ratio >= 2.0 {
        40.0
    } else if ratio >= 1.5 {
        30.0
    } else if ratio >= 1.2 {
        20.0
    } else if ratio >= 1.0 {
        10.0
    } else {
        5.0
    }
}
