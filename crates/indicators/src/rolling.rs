//! Rolling-window primitives over plain `f64` slices.
//!
//! Every function returns a vector aligned with its input; positions whose
//! window is not yet full hold `None`.

/// Simple moving average over `period` values.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "SMA period must be >= 1");
    let mut out = vec![None; values.len()];
    if values.len() < period {
        return out;
    }
    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// values (same convention as TA-Lib).
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "EMA period must be >= 1");
    let mut out = vec![None; values.len()];
    if values.len() < period {
        return out;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut current: f64 = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(current);
    for i in period..values.len() {
        current = values[i] * k + current * (1.0 - k);
        out[i] = Some(current);
    }
    out
}

/// Rolling maximum over the `period` values ending at each position
/// (inclusive of the current value).
pub fn rolling_max(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "rolling window must be >= 1");
    let mut out = vec![None; values.len()];
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = Some(window.iter().copied().fold(f64::MIN, f64::max));
    }
    out
}

/// Rolling minimum, inclusive of the current value.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "rolling window must be >= 1");
    let mut out = vec![None; values.len()];
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = Some(window.iter().copied().fold(f64::MAX, f64::min));
    }
    out
}

/// Rolling maximum over the `period` values strictly *before* each
/// position. Used for breakout levels: a close is compared against the
/// high of the prior N days, never against its own day's high.
pub fn rolling_max_prior(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "rolling window must be >= 1");
    let mut out = vec![None; values.len()];
    for i in period..values.len() {
        let window = &values[i - period..i];
        out[i] = Some(window.iter().copied().fold(f64::MIN, f64::max));
    }
    out
}

/// Rolling minimum over the `period` values strictly before each position.
pub fn rolling_min_prior(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "rolling window must be >= 1");
    let mut out = vec![None; values.len()];
    for i in period..values.len() {
        let window = &values[i - period..i];
        out[i] = Some(window.iter().copied().fold(f64::MAX, f64::min));
    }
    out
}

/// Rolling sample standard deviation (ddof = 1, the pandas default).
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 2, "std window must be >= 2");
    let mut out = vec![None; values.len()];
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        out[i] = Some(var.sqrt());
    }
    out
}

/// Rolling sum over a full window of `period` values.
pub fn rolling_sum(values: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 1, "rolling window must be >= 1");
    let mut out = vec![None; values.len()];
    if values.len() < period {
        return out;
    }
    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum);
    }
    out
}

/// Fractional change versus the value `n` positions earlier.
pub fn pct_change(values: &[f64], n: usize) -> Vec<Option<f64>> {
    assert!(n >= 1, "pct_change offset must be >= 1");
    let mut out = vec![None; values.len()];
    for i in n..values.len() {
        let base = values[i - n];
        if base != 0.0 {
            out[i] = Some((values[i] - base) / base);
        }
    }
    out
}

/// True range per bar: `max(high-low, |high-prev_close|, |low-prev_close|)`.
/// The first bar has no previous close and falls back to `high - low`.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(highs.len());
    for i in 0..highs.len() {
        let hl = highs[i] - lows[i];
        let tr = if i == 0 {
            hl
        } else {
            let prev = closes[i - 1];
            hl.max((highs[i] - prev).abs()).max((lows[i] - prev).abs())
        };
        out.push(tr);
    }
    out
}

/// Full-series RSI using Wilder's smoothing. `None` until `period` price
/// changes have accumulated.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    assert!(period >= 2, "RSI period must be >= 2");
    let mut out = vec![None; closes.len()];
    if closes.len() < period + 1 {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let mut avg_gain = changes[..period]
        .iter()
        .filter(|&&c| c > 0.0)
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = changes[..period]
        .iter()
        .filter(|&&c| c < 0.0)
        .map(|c| c.abs())
        .sum::<f64>()
        / period as f64;

    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period..changes.len() {
        let gain = changes[i].max(0.0);
        let loss = (-changes[i]).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
