use core::mem;
use std::sync::Arc;

use alloy_primitives::{map::HashMap, Address, Bytes, U256};
use tracing::trace;

use crate::{
    AccountFactory, BlockEnv, CallError, EntryPointConfig, GasMeter, TokenPaymaster, WorldState,
};

/// Everything a call executing inside the entry point can reach.
///
/// Forwarded calls, factory deployments and account validation all run against a
/// `CallContext`; each [`call`](Self::call) is its own checkpoint, so a failing call leaves no
/// trace.
#[derive(Debug)]
pub struct CallContext<'a> {
    /// World state
    pub state: &'a mut WorldState,
    /// Fee payers by address
    pub paymasters: &'a HashMap<Address, TokenPaymaster>,
    /// Account factories by address
    pub factories: &'a HashMap<Address, Arc<dyn AccountFactory>>,
    /// Entry point configuration
    pub config: &'a EntryPointConfig,
    /// Current block
    pub env: &'a BlockEnv,
    /// Gas meter of the current phase
    pub gas: GasMeter,
}

impl<'a> CallContext<'a> {
    /// Creates a context metering against `gas`.
    pub const fn new(
        state: &'a mut WorldState,
        paymasters: &'a HashMap<Address, TokenPaymaster>,
        factories: &'a HashMap<Address, Arc<dyn AccountFactory>>,
        config: &'a EntryPointConfig,
        env: &'a BlockEnv,
        gas: GasMeter,
    ) -> Self {
        Self { state, paymasters, factories, config, env, gas }
    }

    /// Address of the entry point.
    pub const fn entry_point(&self) -> Address {
        self.config.address
    }

    /// Charges `gas` to the current meter.
    pub fn charge(&mut self, gas: u64) -> Result<(), CallError> {
        self.gas.charge(gas).map_err(|_| CallError::OutOfGas)
    }

    /// Runs `f` against a fresh meter of `limit` gas and returns its result with the gas used.
    pub fn with_gas_limit<R>(&mut self, limit: u64, f: impl FnOnce(&mut Self) -> R) -> (R, u64) {
        let outer = mem::replace(&mut self.gas, GasMeter::new(limit));
        let result = f(self);
        let used = mem::replace(&mut self.gas, outer).used();
        (result, used)
    }

    /// Calls `to` from `from` with `value` and `data`. On failure every effect of the call,
    /// including the value transfer, is discarded.
    pub fn call(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        data: &Bytes,
    ) -> Result<Bytes, CallError> {
        self.charge(self.config.gas.call_cost(data.len(), !value.is_zero()))?;
        let checkpoint = self.state.checkpoint();
        let result = self
            .state
            .native
            .transfer(from, to, value)
            .map_err(CallError::from)
            .and_then(|()| self.dispatch(from, to, value, data));
        match &result {
            Ok(_) => self.state.checkpoint_commit(checkpoint),
            Err(err) => {
                trace!(target: "relay_settlement::call", %from, %to, %err, "call reverted");
                self.state.checkpoint_revert(checkpoint);
            }
        }
        result
    }
}
