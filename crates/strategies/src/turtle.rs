//! Turtle breakout strategy: two parallel entry systems (20-day and
//! 55-day) with ATR-derived position sizing and stops.

use common::{EnrichedBar, Signal, StrategyName, TurtleSignal, TurtleSystem};

use crate::{Strategy, TurtleParams};

pub struct TurtleStrategy {
    params: TurtleParams,
}

impl TurtleStrategy {
    pub fn new(params: TurtleParams) -> Self {
        Self { params }
    }

    fn build_signal(
        &self,
        last: &EnrichedBar,
        system: TurtleSystem,
        entry_window: usize,
        breakout_high: f64,
        atr: f64,
        account_value: f64,
    ) -> Signal {
        let bar = &last.bar;
        let ind = &last.indicators;

        let unit_size = (account_value * self.params.risk_fraction / atr).floor() as i64;
        let stop_loss_price = bar.close - self.params.stop_loss_atr * atr;

        let pct_above = (bar.close - breakout_high) / breakout_high * 100.0;
        let volume_ratio = ind.volume_ratio.unwrap_or(1.0);
        let momentum_5d = ind.momentum_5d.unwrap_or(0.0);

        let breakout_score = breakout_score(pct_above);
        let volume_score = volume_score(volume_ratio);
        let momentum_score = momentum_score(momentum_5d);

        Signal::Turtle(TurtleSignal {
            symbol: bar.symbol.clone(),
            system,
            date: bar.date,
            price: bar.close,
            atr,
            unit_size,
            stop_loss_price,
            breakout_high,
            entry_window,
            volume: bar.volume,
            volume_ratio,
            price_change_pct: ind.momentum_20d.unwrap_or(0.0) * 100.0,
            momentum_5d,
            breakout_score,
            volume_score,
            momentum_score,
            total_score: breakout_score + volume_score + momentum_score,
        })
    }
}

impl Strategy for TurtleStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Turtle
    }

    fn describe(&self) -> &'static str {
        "Dual breakout systems (20-day and 55-day entries) with ATR position sizing"
    }

    fn min_periods(&self) -> usize {
        self.params.min_periods
    }

    fn detect(&self, bars: &[EnrichedBar], account_value: f64) -> Vec<Signal> {
        let mut signals = Vec::new();
        if bars.len() < self.params.min_periods.max(1) {
            return signals;
        }
        let last = bars.last().expect("non-empty checked above");

        if last.bar.close < self.params.min_price || last.bar.volume < self.params.min_volume {
            return signals;
        }
        let atr = match last.indicators.atr {
            Some(atr) if atr > 0.0 => atr,
            _ => return signals,
        };

        let systems = [
            (TurtleSystem::System1, 20usize, last.indicators.high_20),
            (TurtleSystem::System2, 55usize, last.indicators.high_55),
        ];
        for (system, window, level) in systems {
            if let Some(breakout_high) = level {
                if breakout_high > 0.0 && last.bar.close > breakout_high {
                    signals.push(self.build_signal(
                        last,
                        system,
                        window,
                        breakout_high,
                        atr,
                        account_value,
                    ));
                }
            }
        }
        signals
    }
}

// Score bands are fixed tiers, not continuous formulas; a value landing
// exactly on a boundary takes the higher tier.

/// Breakout strength, 40 points max. A close just above the level is the
/// strongest entry; chasing an extended move scores low.
fn breakout_score(pct_above: f64) -> f64 {
    if pct_above <= 2.0 {
        40.0
    } else if pct_above <= 5.0 {
        30.0
    } else if pct_above <= 10.0 {
        15.0
    } else {
        5.0
    }
}

/// Volume expansion, 35 points max.
fn volume_score(ratio: f64) -> f64 {
    if ratio >= 2.0 {
        35.0
    } else if ratio >= 1.5 {
        28.0
    } else if ratio >= 1.2 {
        20.0
    } else {
        12.0
    }
}

/// 5-day momentum, 25 points max.
fn momentum_score(momentum: f64) -> f64 {
    if momentum >= 0.05 {
        25.0
    } else if momentum >= 0.03 {
        20.0
    } else if momentum >= 0.01 {
        15.0
    } else if momentum > 0.0 {
        8.0
    } else {
        0.0
    }
}
