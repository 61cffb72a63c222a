//! Block environment and engine configuration.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{self, DEFAULT_CHAIN_ID, DEFAULT_ENTRY_POINT_ADDRESS},
    GasSchedule,
};

/// The block the engine is currently settling in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockEnv {
    /// Block height
    pub number: u64,
    /// Block timestamp in seconds
    pub timestamp: u64,
    /// Base fee per gas
    pub basefee: U256,
}

impl Default for BlockEnv {
    fn default() -> Self {
        Self { number: 1, timestamp: 1, basefee: U256::from(1_000_000_000u64) }
    }
}

impl BlockEnv {
    /// Advances the clock by `seconds` without producing a block.
    pub const fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }

    /// Produces `blocks` new blocks, one second apart. Saturates at `u64::MAX`.
    pub const fn mine(&mut self, blocks: u64) {
        self.number = self.number.saturating_add(blocks);
        self.timestamp = self.timestamp.saturating_add(blocks);
    }
}

/// Entry point configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntryPointConfig {
    /// Address of the entry point; it holds all deposits and stakes.
    pub address: Address,
    /// Chain id mixed into operation hashes.
    pub chain_id: u64,
    /// Gas schedule for metered steps.
    pub gas: GasSchedule,
}

impl Default for EntryPointConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ENTRY_POINT_ADDRESS,
            chain_id: DEFAULT_CHAIN_ID,
            gas: GasSchedule::default(),
        }
    }
}

/// Fee-payer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymasterConfig {
    /// Blocks between `unlockTokenDeposit` and the first permitted withdrawal. Zero allows
    /// withdrawing in the unlocking block.
    pub token_unlock_delay_blocks: u64,
    /// Gas reserved for post-op settlement.
    pub cost_of_post: u64,
}

impl Default for PaymasterConfig {
    fn default() -> Self {
        Self { token_unlock_delay_blocks: 0, cost_of_post: constants::gas::COST_OF_POST }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EntryPointConfig =
            serde_json::from_value(json!({ "chainId": 5, "gas": { "call": 1 } })).unwrap();
        assert_eq!(config.address, DEFAULT_ENTRY_POINT_ADDRESS);
        assert_eq!(config.chain_id, 5);
        assert_eq!(config.gas.call, 1);
        assert_eq!(config.gas.storage_write, GasSchedule::default().storage_write);

        let config: PaymasterConfig =
            serde_json::from_value(json!({ "tokenUnlockDelayBlocks": 3 })).unwrap();
        assert_eq!(config.token_unlock_delay_blocks, 3);
        assert_eq!(config.cost_of_post, constants::gas::COST_OF_POST);
    }

    #[test]
    fn test_mine_advances_clock() {
        let mut env = BlockEnv::default();
        env.mine(2);
        env.advance_time(10);
        assert_eq!((env.number, env.timestamp), (3, 13));
    }

    #[test]
    fn test_clock_saturates() {
        let mut env =
            BlockEnv { number: u64::MAX - 1, timestamp: u64::MAX - 1, ..Default::default() };
        env.mine(5);
        env.advance_time(u64::MAX);
        assert_eq!((env.number, env.timestamp), (u64::MAX, u64::MAX));
    }
}
