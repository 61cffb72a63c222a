//! Fee-payer token accounting.
//!
//! A [`TokenPaymaster`] sponsors operations whose senders pay in an ERC-20 token. It keeps its
//! own settlement-unit deposit in the [`DepositLedger`](crate::DepositLedger) to cover the
//! prefund, and charges each sender in tokens, either from a locked token deposit or directly
//! from the sender's approved balance.

use std::sync::Arc;

use alloy_primitives::{map::HashMap, Address, U256};
use tracing::debug;

use crate::{PaymasterConfig, PaymasterError, PriceOracle};

mod deposits;
pub use deposits::*;

mod sponsorship;
pub use sponsorship::*;

/// A fee payer billing senders in registered tokens.
#[derive(Debug, Clone)]
pub struct TokenPaymaster {
    address: Address,
    owner: Address,
    oracles: HashMap<Address, Arc<dyn PriceOracle>>,
    config: PaymasterConfig,
}

impl TokenPaymaster {
    /// Creates a fee payer at `address` controlled by `owner`.
    pub fn new(address: Address, owner: Address, config: PaymasterConfig) -> Self {
        Self { address, owner, oracles: HashMap::default(), config }
    }

    /// Address of the fee payer.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The controller.
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Configuration.
    pub const fn config(&self) -> &PaymasterConfig {
        &self.config
    }

    pub(crate) fn ensure_owner(&self, caller: Address) -> Result<(), PaymasterError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(PaymasterError::NotOwner)
        }
    }

    /// Registers `token` with the oracle pricing it.
    pub fn add_token(
        &mut self,
        caller: Address,
        token: Address,
        oracle: Arc<dyn PriceOracle>,
    ) -> Result<(), PaymasterError> {
        self.ensure_owner(caller)?;
        if self.oracles.contains_key(&token) {
            return Err(PaymasterError::TokenAlreadySet(token));
        }
        self.oracles.insert(token, oracle);
        debug!(target: "relay_settlement::paymaster", paymaster = %self.address, %token, "token added");
        Ok(())
    }

    /// Deregisters `token`. Existing deposits stay withdrawable.
    pub fn remove_token(&mut self, caller: Address, token: Address) -> Result<(), PaymasterError> {
        self.ensure_owner(caller)?;
        self.oracles.remove(&token).ok_or(PaymasterError::UnsupportedToken(token))?;
        debug!(target: "relay_settlement::paymaster", paymaster = %self.address, %token, "token removed");
        Ok(())
    }

    /// Whether `token` is registered.
    pub fn supports(&self, token: Address) -> bool {
        self.oracles.contains_key(&token)
    }

    /// The oracle pricing `token`.
    pub fn oracle(&self, token: Address) -> Option<&Arc<dyn PriceOracle>> {
        self.oracles.get(&token)
    }

    /// Converts `amount` settlement units into `token` units.
    pub fn token_value_of(&self, token: Address, amount: U256) -> Result<U256, PaymasterError> {
        let oracle = self.oracle(token).ok_or(PaymasterError::UnsupportedToken(token))?;
        Ok(oracle.token_value_of(token, amount)?)
    }
}
