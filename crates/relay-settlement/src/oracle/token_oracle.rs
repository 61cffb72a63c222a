use std::sync::{Arc, PoisonError, RwLock};

use alloy_primitives::{map::HashMap, Address, Bytes, U256};
use tracing::debug;

use crate::{constants::PRICE_PRECISION, OracleError, PoolQuoter, PriceOracle, QuotePath};

/// A conversion path with its weight in the average.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedPath {
    /// Path from the wrapped settlement unit to the priced token
    pub path: QuotePath,
    /// Relative weight
    pub weight: u64,
}

/// Administrator-managed oracle.
///
/// A fixed price, when set, wins. Otherwise the answer is the weighted average of quotes along
/// every registered path.
#[derive(derive_more::Debug)]
pub struct TokenPriceOracle {
    owner: Address,
    /// Token units per `1e18` settlement units.
    fixed_prices: RwLock<HashMap<Address, U256>>,
    paths: RwLock<HashMap<Address, Vec<WeightedPath>>>,
    #[debug(ignore)]
    quoter: Option<Arc<dyn PoolQuoter>>,
}

impl TokenPriceOracle {
    /// Creates an oracle administered by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            fixed_prices: RwLock::new(HashMap::default()),
            paths: RwLock::new(HashMap::default()),
            quoter: None,
        }
    }

    /// Uses `quoter` to price registered paths.
    pub fn with_quoter(mut self, quoter: Arc<dyn PoolQuoter>) -> Self {
        self.quoter = Some(quoter);
        self
    }

    /// The administrator.
    pub const fn owner(&self) -> Address {
        self.owner
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), OracleError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(OracleError::NotOwner)
        }
    }

    /// Sets the fixed price of `token` in token units per `1e18` settlement units. A zero price
    /// clears it.
    pub fn set_fixed_price(
        &self,
        caller: Address,
        token: Address,
        price: U256,
    ) -> Result<(), OracleError> {
        self.ensure_owner(caller)?;
        let mut prices = self.fixed_prices.write().unwrap_or_else(PoisonError::into_inner);
        if price.is_zero() {
            prices.remove(&token);
        } else {
            prices.insert(token, price);
        }
        debug!(target: "relay_settlement::oracle", %token, %price, "fixed price set");
        Ok(())
    }

    /// The fixed price of `token`, if any.
    pub fn fixed_price(&self, token: Address) -> Option<U256> {
        self.fixed_prices.read().unwrap_or_else(PoisonError::into_inner).get(&token).copied()
    }

    /// Registers packed conversion paths for `token`, each with weight one.
    pub fn add_token_price_paths(
        &self,
        caller: Address,
        token: Address,
        paths: &[&[u8]],
    ) -> Result<(), OracleError> {
        let weighted = paths
            .iter()
            .map(|data| Ok(WeightedPath { path: QuotePath::decode(data)?, weight: 1 }))
            .collect::<Result<Vec<_>, OracleError>>()?;
        self.add_weighted_paths(caller, token, weighted)
    }

    /// Registers weighted conversion paths for `token`. Every path must end in `token`.
    pub fn add_weighted_paths(
        &self,
        caller: Address,
        token: Address,
        paths: Vec<WeightedPath>,
    ) -> Result<(), OracleError> {
        self.ensure_owner(caller)?;
        for weighted in &paths {
            if weighted.weight == 0 {
                return Err(OracleError::ZeroWeight);
            }
            if weighted.path.output() != token {
                return Err(OracleError::InvalidPath("path must end in the priced token"));
            }
        }
        self.paths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(token)
            .or_default()
            .extend(paths);
        Ok(())
    }

    /// The packed paths registered for `token`.
    pub fn token_price_paths(&self, token: Address) -> Vec<Bytes> {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&token)
            .map(|paths| paths.iter().map(|weighted| weighted.path.encode()).collect())
            .unwrap_or_default()
    }

    fn quote_paths(&self, token: Address, amount: U256) -> Result<U256, OracleError> {
        let paths = self.paths.read().unwrap_or_else(PoisonError::into_inner);
        let Some(paths) = paths.get(&token).filter(|paths| !paths.is_empty()) else {
            return Err(OracleError::NoPrice(token));
        };
        let quoter = self.quoter.as_ref().ok_or(OracleError::NoPrice(token))?;

        let mut weighted_sum = U256::ZERO;
        let mut total_weight = U256::ZERO;
        for weighted in paths {
            let quote = quoter
                .quote_exact_input(&weighted.path, amount)
                .ok_or(OracleError::QuoteFailed(token))?;
            let weight = U256::from(weighted.weight);
            weighted_sum = quote
                .checked_mul(weight)
                .and_then(|value| weighted_sum.checked_add(value))
                .ok_or(OracleError::Overflow)?;
            total_weight += weight;
        }
        Ok(weighted_sum / total_weight)
    }
}

impl PriceOracle for TokenPriceOracle {
    fn token_value_of(&self, token: Address, amount: U256) -> Result<U256, OracleError> {
        if let Some(price) = self.fixed_price(token) {
            return amount
                .checked_mul(price)
                .map(|value| value / PRICE_PRECISION)
                .ok_or(OracleError::Overflow);
        }
        self.quote_paths(token, amount)
    }
}
