//! JSON report of a scenario run.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Log, U256};
use relay_settlement::{
    BalanceError, BlockEnv, CallError, DepositInfo, FailedOp, LedgerError, OpReceipt,
    PaymasterError, RejectKind, TokenError,
};
use serde::Serialize;
use serde_json::Value;

use crate::common::SettleError;

/// Outcome of every step plus the final state of the watched addresses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Entry point the scenario ran against
    pub entry_point: Address,
    /// Chain id the operations were bound to
    pub chain_id: u64,
    /// Block environment after the last step
    pub block: BlockEnv,
    /// One entry per step, in order
    pub steps: Vec<StepReport>,
    /// Final state of each watched address
    pub accounts: BTreeMap<Address, AccountReport>,
}

impl Report {
    /// Number of steps that failed.
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.error.is_some()).count()
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    /// Position in the scenario
    pub index: usize,
    /// Action name
    pub action: &'static str,
    /// Return value of a successful step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Why the step failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    /// Logs emitted by the step
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<Log>,
}

/// A failed step or a rejected operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    /// Machine-readable code
    pub code: String,
    /// Class of an operation rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RejectKind>,
    /// Human-readable message
    pub message: String,
}

impl Failure {
    fn new(code: &str, message: impl ToString) -> Self {
        Self { code: code.to_string(), kind: None, message: message.to_string() }
    }
}

impl From<BalanceError> for Failure {
    fn from(err: BalanceError) -> Self {
        Self::new("INSUFFICIENT_NATIVE_BALANCE", err)
    }
}

impl From<TokenError> for Failure {
    fn from(err: TokenError) -> Self {
        Self::new("TOKEN_TRANSFER_FAILED", err)
    }
}

impl From<LedgerError> for Failure {
    fn from(err: LedgerError) -> Self {
        Self::new(err.code(), err)
    }
}

impl From<PaymasterError> for Failure {
    fn from(err: PaymasterError) -> Self {
        Self::new(err.code(), err)
    }
}

impl From<CallError> for Failure {
    fn from(err: CallError) -> Self {
        Self::new("CALL_FAILED", err)
    }
}

impl From<FailedOp> for Failure {
    fn from(err: FailedOp) -> Self {
        Self { kind: Some(err.reason.kind()), ..Self::new(err.code(), err.reason) }
    }
}

impl From<SettleError> for Failure {
    fn from(err: SettleError) -> Self {
        Self::new("INVALID_INPUT", err)
    }
}

/// Outcome of one operation of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OpOutcome {
    /// The operation was settled
    Included(OpReceipt),
    /// The operation was rejected and left no trace
    #[serde(rename_all = "camelCase")]
    Rejected {
        /// Position in the batch
        op_index: usize,
        /// Why it was rejected
        error: Failure,
    },
}

impl From<Result<OpReceipt, FailedOp>> for OpOutcome {
    fn from(result: Result<OpReceipt, FailedOp>) -> Self {
        match result {
            Ok(receipt) => Self::Included(receipt),
            Err(err) => Self::Rejected { op_index: err.op_index, error: err.into() },
        }
    }
}

/// Final state of a watched address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    /// Native balance
    pub balance: U256,
    /// Deposit and stake at the entry point
    pub deposit: DepositInfo,
    /// Next nonce for key zero
    pub nonce: U256,
    /// Whether an account is deployed at the address
    pub deployed: bool,
    /// Balance in each scenario token
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tokens: BTreeMap<Address, U256>,
}
