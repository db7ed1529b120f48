//! Settlement cost model.

/// Default flat rate in USD per token.
pub const DEFAULT_UNIT_COST_USD: f64 = 0.000002;

/// Flat per-token pricing applied to the provider's reported total.
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    unit_cost_usd: f64,
}

impl CostModel {
    /// Create a cost model with the given per-token rate.
    pub fn new(unit_cost_usd: f64) -> Self {
        Self { unit_cost_usd }
    }

    /// Settlement cost for a number of tokens.
    pub fn cost_for(&self, total_tokens: u64) -> f64 {
        total_tokens as f64 * self.unit_cost_usd
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_COST_USD)
    }
}
