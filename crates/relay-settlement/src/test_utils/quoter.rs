use std::sync::{PoisonError, RwLock};

use alloy_primitives::{map::HashMap, Bytes, U256};

use crate::{constants::PRICE_PRECISION, PoolQuoter, QuotePath};

/// Quotes registered paths at fixed rates (output units per `1e18` input units).
#[derive(Debug, Default)]
pub struct StaticQuoter {
    rates: RwLock<HashMap<Bytes, U256>>,
}

impl StaticQuoter {
    /// Quotes `path` at `rate`.
    pub fn with_rate(self, path: &QuotePath, rate: U256) -> Self {
        self.rates.write().unwrap_or_else(PoisonError::into_inner).insert(path.encode(), rate);
        self
    }
}

impl PoolQuoter for StaticQuoter {
    fn quote_exact_input(&self, path: &QuotePath, amount_in: U256) -> Option<U256> {
        let rates = self.rates.read().unwrap_or_else(PoisonError::into_inner);
        let rate = rates.get(&path.encode())?;
        Some(amount_in.checked_mul(*rate)? / PRICE_PRECISION)
    }
}
