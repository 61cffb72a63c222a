//! Price oracle adapter: converts settlement-unit amounts into fee-token amounts.

use core::fmt::Debug;

use alloy_primitives::{Address, U256};
use auto_impl::auto_impl;

use crate::OracleError;

mod path;
pub use path::*;

mod token_oracle;
pub use token_oracle::*;

/// Converts a settlement-unit amount into the equivalent amount of a fee token.
///
/// The fee payer treats the answer as authoritative. Implementations must be pure: the same
/// query against the same configuration returns the same amount.
#[auto_impl(&, Box, Arc)]
pub trait PriceOracle: Debug + Send + Sync {
    /// Returns how many units of `token` are worth `amount` settlement units.
    fn token_value_of(&self, token: Address, amount: U256) -> Result<U256, OracleError>;
}

/// Quotes swaps along a multi-hop pool path.
#[auto_impl(&, Box, Arc)]
pub trait PoolQuoter: Debug + Send + Sync {
    /// Returns the output of swapping `amount_in` of the first token of `path` for its last
    /// token, or `None` when a pool on the path cannot quote.
    fn quote_exact_input(&self, path: &QuotePath, amount_in: U256) -> Option<U256>;
}
