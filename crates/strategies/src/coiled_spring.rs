//! Coiled-spring strategy: volatile names that have gone quiet inside a
//! bullish trend. All five setup conditions must hold on the latest bar;
//! four of five never fires.

use common::{CoiledSpringSignal, EnrichedBar, Signal, StrategyName};

use crate::{CoiledSpringParams, Strategy};

pub struct CoiledSpringStrategy {
    params: CoiledSpringParams,
}

impl CoiledSpringStrategy {
    pub fn new(params: CoiledSpringParams) -> Self {
        Self { params }
    }
}

impl Strategy for CoiledSpringStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::CoiledSpring
    }

    fn describe(&self) -> &'static str {
        "Volatility and volume contraction inside a bullish moving-average alignment"
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

        let ind = &last.indicators;
        let (
            Some(ema_20),
            Some(sma_50),
            Some(sma_100),
            Some(sd_10),
            Some(sd_60),
            Some(vol_ma_10),
            Some(vol_ma_60),
            Some(range_pct_60),
            Some(up_days),
        ) = (
            ind.ema_20,
            ind.sma_50,
            ind.sma_100,
            ind.sd_10,
            ind.sd_60,
            ind.vol_ma_10,
            ind.vol_ma_60,
            ind.range_pct_60,
            ind.up_days_120,
        )
        else {
            return Vec::new();
        };

        // The five setup conditions, all strict.
        let volatile_past = range_pct_60 > self.params.volatility_threshold;
        let price_contracting = sd_10 < sd_60 * self.params.volatility_contract_ratio;
        let aligned = ema_20 > sma_50 && sma_50 > sma_100;
        let trending_up = up_days > self.params.trend_days_threshold;
        let volume_contracting = vol_ma_10 < vol_ma_60 * self.params.volume_contract_ratio;

        if !(volatile_past && price_contracting && aligned && trending_up && volume_contracting) {
            return Vec::new();
        }

        let up_trend_strength = up_days / self.params.trend_period as f64;
        let volume_ratio = if vol_ma_60 > 0.0 {
            vol_ma_10 / vol_ma_60
        } else {
            1.0
        };

        let volatility_score = volatility_score(sd_10);
        let trend_score = trend_score(aligned, up_trend_strength);
        let volume_score = volume_score(volume_ratio);
        let history_score = history_score(sd_60);

        vec![Signal::CoiledSpring(CoiledSpringSignal {
            symbol: last.bar.symbol.clone(),
            date: last.bar.date,
            price: last.bar.close,
            volatility_10d: sd_10,
            volatility_60d: sd_60,
            ema_20,
            sma_50,
            sma_100,
            volume_ratio,
            up_trend_strength,
            volatility_score,
            trend_score,
            volume_score,
            history_score,
            total_score: volatility_score + trend_score + volume_score + history_score,
        })]
    }
}

/// Current quietness, 40 points max: the tighter the 10-day stdev, the
/// more coiled the spring.
fn volatility_score(sd_10: f64) -> f64 {
    if sd_10 <= 0.01 {
        40.0
    } else if sd_10 <= 0.02 {
        30.0
    } else if sd_10 <= 0.03 {
        20.0
    } else if sd_10 <= 0.05 {
        10.0
    } else {
        0.0
    }
}

/// Trend quality, 30 points max: alignment flag plus up-day ratio tiers.
fn trend_score(aligned: bool, up_trend_strength: f64) -> f64 {
    let mut score = 0.0;
    if aligned {
        score += 15.0;
    }
    if up_trend_strength >= 0.6 {
        score += 15.0;
    } else if up_trend_strength >= 0.55 {
        score += 10.0;
    } else if up_trend_strength >= 0.5 {
        score += 5.0;
    }
    score
}

/// Volume dry-up, 20 points max.
fn volume_score(ratio: f64) -> f64 {
    if ratio <= 0.4 {
        20.0
    } else if ratio <= 0.5 {
        15.0
    } else if ratio <= 0.6 {
        10.0
    } else if ratio <= 0.7 {
        5.0
    } else {
        0.0
    }
}

/// Proof the name can move, 10 points max, from the 60-day stdev alone.
fn history_score(sd_60: f64) -> f64 {
    if sd_60 >= 0.4 {
        10.0
    } else if sd_60 >= 0.3 {
        5.0
    } else {
        0.0
    }
}
