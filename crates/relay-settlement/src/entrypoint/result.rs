use alloy_primitives::{Address, Bytes, Log, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{SponsorshipContext, StakeInfo, ValidationData};

/// Who fronts the cost of an operation, decided once during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Funding {
    /// The sender's own deposit pays.
    SelfFunded,
    /// A fee payer's deposit pays and bills the sender in tokens.
    Sponsored(SponsorshipContext),
}

impl Funding {
    /// The fee payer, if any.
    pub fn paymaster(&self) -> Option<Address> {
        match self {
            Self::SelfFunded => None,
            Self::Sponsored(context) => Some(context.paymaster),
        }
    }

    /// The depositor whose deposit reserves the prefund.
    pub fn funder(&self, sender: Address) -> Address {
        self.paymaster().unwrap_or(sender)
    }
}

/// The outcome of the validation phase of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOp {
    /// Operation hash
    pub user_op_hash: B256,
    /// Prefund reserved from the funder's deposit
    pub prefund: U256,
    /// Effective gas price
    pub gas_price: U256,
    /// Gas used by validation plus the pre-verification gas
    pub pre_op_gas: U256,
    /// Who pays
    pub funding: Funding,
    /// Outcome of the account's check
    pub account_validation: ValidationData,
    /// Outcome of the fee payer's check
    pub paymaster_validation: ValidationData,
    /// Factory used to deploy the sender, if deployed by this operation
    pub factory: Option<Address>,
}

/// Settlement record of an included operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpReceipt {
    /// Operation hash
    pub user_op_hash: B256,
    /// Sender account
    pub sender: Address,
    /// Fee payer, if sponsored
    pub paymaster: Option<Address>,
    /// Nonce consumed
    pub nonce: U256,
    /// Whether the forwarded call succeeded
    pub success: bool,
    /// Cost charged to the funder and credited to the beneficiary
    pub actual_gas_cost: U256,
    /// Gas charged
    pub actual_gas_used: U256,
    /// Token cost charged by the fee payer, if sponsored
    pub token_cost: Option<U256>,
    /// Logs emitted by the operation
    pub logs: Vec<Log>,
}

/// Validation outcome reported by dry-run validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnInfo {
    /// Gas used by validation plus the pre-verification gas
    pub pre_op_gas: U256,
    /// Required prefund
    pub prefund: U256,
    /// Whether a signature check failed
    pub sig_failed: bool,
    /// Start of the combined validity window
    pub valid_after: u64,
    /// End of the combined validity window
    pub valid_until: u64,
    /// Context handed from fee payer validation to settlement
    pub paymaster_context: Option<SponsorshipContext>,
}

/// Result of [`EntryPoint::simulate_validation`](crate::EntryPoint::simulate_validation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Gas, prefund and validity of the operation
    pub return_info: ReturnInfo,
    /// Stake of the sender
    pub sender_info: StakeInfo,
    /// Stake of the factory, if the operation deploys the sender
    pub factory_info: Option<StakeInfo>,
    /// Stake of the fee payer, if sponsored
    pub paymaster_info: Option<StakeInfo>,
}

/// Result of [`EntryPoint::simulate_handle_op`](crate::EntryPoint::simulate_handle_op).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Gas used by validation plus the pre-verification gas
    pub pre_op_gas: U256,
    /// Cost that would be charged
    pub paid: U256,
    /// Start of the combined validity window
    pub valid_after: u64,
    /// End of the combined validity window
    pub valid_until: u64,
    /// Whether the call to the target succeeded; false without a target
    pub target_success: bool,
    /// Return or revert data of the target call
    pub target_result: Bytes,
}
