pub mod clean;
pub mod validate;

pub use clean::clean;
pub use validate::{validate, ValidationReport};

use serde::{Deserialize, Serialize};

/// Thresholds for the soft (warning-level) data-quality checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Single-day close move beyond this fraction is flagged (0.5 = 50%).
    pub max_price_deviation: f64,
    /// Volume beyond this many standard deviations of the series mean is
    /// flagged as an outlier.
    pub volume_outlier_sigma: f64,
    /// Calendar gaps longer than this many days are flagged.
    pub max_gap_days: i64,
    /// Closes below this are flagged as suspiciously low quotes.
    pub min_close: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_price_deviation: 0.5,
            volume_outlier_sigma: 5.0,
            max_gap_days: 3,
            min_close: 1e-6,
        }
    }
}
