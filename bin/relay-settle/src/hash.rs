//! Hash module for inspecting a single operation.

use std::path::PathBuf;

use alloy_primitives::{Address, B256, U256};
use clap::Parser;
use relay_settlement::{
    constants::{DEFAULT_CHAIN_ID, DEFAULT_ENTRY_POINT_ADDRESS},
    UserOperation,
};
use serde::Serialize;

use crate::common::{load_json, write_json, Result};

/// Compute the hash and gas requirements of an operation
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Operation file (JSON). If '-' is specified, the operation is read from stdin
    #[arg(value_name = "OP")]
    pub op: PathBuf,

    /// Entry point the operation is bound to
    #[arg(long = "entry-point", default_value_t = DEFAULT_ENTRY_POINT_ADDRESS)]
    pub entry_point: Address,

    /// Chain id the operation is bound to
    #[arg(long = "chain-id", env = "RELAY_CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,
}

/// What the entry point derives from an operation before validating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpSummary {
    /// Hash the sender signs
    pub user_op_hash: B256,
    /// The sender
    pub sender: Address,
    /// Nonce key
    pub nonce_key: U256,
    /// Sequence number within the key
    pub nonce_sequence: u64,
    /// Whether a fee payer sponsors the operation
    pub sponsored: bool,
    /// Factory deploying the sender, if any
    pub factory: Option<Address>,
    /// Gas reserved up front
    pub required_gas: U256,
    /// Prefund reserved from the funder's deposit
    pub required_prefund: U256,
    /// Whether every gas value fits the allowed range
    pub gas_values_in_range: bool,
}

impl Cmd {
    /// Execute the hash command
    pub fn run(&self) -> Result<()> {
        let op: UserOperation = load_json(&self.op)?;
        write_json(&self.summarize(&op), None)
    }

    /// Summarizes `op` for the configured entry point and chain.
    pub fn summarize(&self, op: &UserOperation) -> OpSummary {
        OpSummary {
            user_op_hash: op.hash(self.entry_point, self.chain_id),
            sender: op.sender,
            nonce_key: op.nonce_key(),
            nonce_sequence: op.nonce_sequence(),
            sponsored: op.is_sponsored(),
            factory: op.factory(),
            required_gas: op.required_gas(),
            required_prefund: op.required_prefund(),
            gas_values_in_range: op.gas_values_in_range(),
        }
    }
}
