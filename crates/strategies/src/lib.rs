pub mod bnf;
pub mod coiled_spring;
pub mod params;
pub mod turtle;

pub use bnf::BnfStrategy;
pub use coiled_spring::CoiledSpringStrategy;
pub use params::{BnfParams, CoiledSpringParams, StrategyParams, TurtleParams};
pub use turtle::TurtleStrategy;

use std::collections::HashSet;

use tracing::info;

use common::{EnrichedBar, Signal, StrategyName};

/// Capability surface every evaluator exposes. The set of implementations
/// is closed (`StrategyName`) and dispatched explicitly through
/// [`build_strategies`]; no dynamic lookup by string beyond name parsing.
///
/// Evaluators are pure: a series that fails a pre-check (too few rows, or
/// the latest row under the price/volume floor) yields zero signals, never
/// an error. Only the most recent row is examined for emission.
pub trait Strategy: Send + Sync {
    fn name(&self) -> StrategyName;

    /// One-line human description for logs and reports.
    fn describe(&self) -> &'static str;

    /// Minimum row count required before the evaluator will even look.
    fn min_periods(&self) -> usize;

    /// Evaluate one instrument's enriched series (sorted by date
    /// ascending) and emit any signals for the latest row.
    fn detect(&self, bars: &[EnrichedBar], account_value: f64) -> Vec<Signal>;
}

/// Instantiate the requested strategies, deduplicating repeated names
/// while preserving the caller's order.
pub fn build_strategies(
    names: &[StrategyName],
    params: &StrategyParams,
) -> Vec<Box<dyn Strategy>> {
    let mut seen = HashSet::new();
    let mut out: Vec<Box<dyn Strategy>> = Vec::new();
    for &name in names {
        if !seen.insert(name) {
            continue;
        }
        let strategy: Box<dyn Strategy> = match name {
            StrategyName::Turtle => Box::new(TurtleStrategy::new(params.turtle.clone())),
            StrategyName::Bnf => Box::new(BnfStrategy::new(params.bnf.clone())),
            StrategyName::CoiledSpring => {
                Box::new(CoiledSpringStrategy::new(params.coiled_spring.clone()))
            }
        };
        info!(strategy = %name, "registered strategy");
        out.push(strategy);
    }
    out
}
