//! Score composition holds for any signal any strategy can emit.

use chrono::NaiveDate;
use common::{DailyBar, EnrichedBar, IndicatorSet};
// Named imports: proptest's prelude exports its own `Strategy` trait,
// which would shadow ours.
use proptest::{prop_assert, prop_assert_eq, proptest};
use strategies::{
    BnfStrategy, CoiledSpringStrategy, Strategy, StrategyParams, TurtleStrategy,
};

fn series_with_last(ind: IndicatorSet, close: f64, volume: f64) -> Vec<EnrichedBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut bars: Vec<EnrichedBar> = (0..130)
        .map(|i| {
            EnrichedBar::raw(DailyBar {
                symbol: "PROP".into(),
                date: start + chrono::Days::new(i as u64),
                open: 99.0,
                high: 101.0,
                low: 98.0,
                close: 100.0,
                volume: 1_000_000.0,
            })
        })
        .collect();
    let last = bars.last_mut().unwrap();
    last.bar.close = close;
    last.bar.high = close + 1.0;
    last.bar.volume = volume;
    last.indicators = ind;
    bars
}

proptest! {
    #[test]
    fn every_emitted_signal_composes_exactly(
        atr in 0.1f64..50.0,
        high_20 in 50.0f64..200.0,
        high_55 in 50.0f64..200.0,
        volume_ratio in 0.0f64..4.0,
        momentum_5d in -0.2f64..0.2,
        sma_25 in 50.0f64..200.0,
        deviation_rate in -0.5f64..0.1,
        sd_10 in 0.0f64..1.0,
        sd_60 in 0.0f64..1.0,
        close in 10.0f64..300.0,
        volume in 500_000.0f64..5_000_000.0,
        vol_ma_10 in 100_000.0f64..2_000_000.0,
        vol_ma_60 in 100_000.0f64..2_000_000.0,
        up_days in 0.0f64..120.0,
        range_pct in 0.0f64..1.0,
    ) {
        let ind = IndicatorSet {
            atr: Some(atr),
            high_20: Some(high_20),
            high_55: Some(high_55),
            volume_20: Some(1_000_000.0),
            volume_ratio: Some(volume_ratio),
            momentum_5d: Some(momentum_5d),
            momentum_20d: Some(momentum_5d * 2.0),
            sma_25: Some(sma_25),
            deviation_rate: Some(deviation_rate),
            ema_20: Some(close),
            sma_50: Some(close * 0.97),
            sma_100: Some(close * 0.94),
            sd_10: Some(sd_10),
            sd_60: Some(sd_60),
            vol_ma_10: Some(vol_ma_10),
            vol_ma_60: Some(vol_ma_60),
            high_60: Some(close * 1.2),
            low_60: Some(close * 0.7),
            range_pct_60: Some(range_pct),
            up_days_120: Some(up_days),
            ..IndicatorSet::default()
        };
        let bars = series_with_last(ind, close, volume);

        let params = StrategyParams::default();
        let evaluators: Vec<Box<dyn Strategy>> = vec![
            Box::new(TurtleStrategy::new(params.turtle.clone())),
            Box::new(BnfStrategy::new(params.bnf.clone())),
            Box::new(CoiledSpringStrategy::new(params.coiled_spring.clone())),
        ];

        for evaluator in &evaluators {
            for signal in evaluator.detect(&bars, 100_000.0) {
                prop_assert_eq!(signal.sub_score_sum(), signal.total_score());
                prop_assert!((0.0..=100.0).contains(&signal.total_score()));
            }
        }
    }
}
