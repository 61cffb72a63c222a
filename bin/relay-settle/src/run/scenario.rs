//! Scenario file format.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use relay_settlement::{BlockEnv, EntryPointConfig, PaymasterConfig, SimpleAccount, UserOperation};
use serde::{Deserialize, Serialize};

use crate::common::{Result, SettleError};

/// A complete run: engine configuration, registered contracts and the steps to execute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Scenario {
    /// Entry point address, chain id and gas schedule
    pub entry_point: EntryPointConfig,
    /// Block the run starts in
    pub block: BlockEnv,
    /// Account factories to register
    pub factories: Vec<Address>,
    /// ERC-20 tokens to deploy
    pub tokens: Vec<Address>,
    /// Token fee payers to register
    pub paymasters: Vec<PaymasterSetup>,
    /// Addresses whose balances, deposits and nonces are reported after the run
    pub watch: Vec<Address>,
    /// Steps executed in order
    pub steps: Vec<Step>,
}

/// A token fee payer and the tokens it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterSetup {
    /// Fee payer address
    pub address: Address,
    /// Controller of the fee payer and of its oracle
    pub owner: Address,
    /// Fee payer configuration
    #[serde(default)]
    pub config: PaymasterConfig,
    /// Accepted tokens with their fixed prices
    #[serde(default)]
    pub tokens: Vec<TokenPrice>,
}

/// A fixed token price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPrice {
    /// The token
    pub token: Address,
    /// Token units per `1e18` settlement units
    pub price: U256,
}

/// One step of a scenario. The `action` field selects the variant.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Mints native currency to `account`
    Fund { account: Address, amount: U256 },
    /// Mints `token` to `account`
    MintTokens { token: Address, account: Address, amount: U256 },
    /// `owner` approves `spender` for `amount` of `token`
    Approve { token: Address, owner: Address, spender: Address, amount: U256 },
    /// `caller` deposits `amount` for `account` at the entry point
    DepositTo { caller: Address, account: Address, amount: U256 },
    /// `caller` withdraws `amount` of its deposit to `destination`
    WithdrawTo { caller: Address, destination: Address, amount: U256 },
    /// `caller` stakes `amount`
    AddStake { caller: Address, unstake_delay_sec: u32, amount: U256 },
    /// `caller` starts its unstake delay
    UnlockStake { caller: Address },
    /// `caller` withdraws its unlocked stake to `destination`
    WithdrawStake { caller: Address, destination: Address },
    /// `caller` deploys the account of `(owner, salt)` through `factory`
    CreateAccount {
        caller: Address,
        factory: Address,
        owner: Address,
        #[serde(default)]
        salt: U256,
    },
    /// `caller` deposits `amount` of `token` for `payer` at `paymaster`
    AddTokenDeposit { caller: Address, paymaster: Address, token: Address, payer: Address, amount: U256 },
    /// `caller` locks its token deposits at `paymaster`
    LockTokenDeposit { caller: Address, paymaster: Address },
    /// `caller` unlocks its token deposits at `paymaster`
    UnlockTokenDeposit { caller: Address, paymaster: Address },
    /// `caller` withdraws `amount` of its unlocked `token` deposit to `target`
    WithdrawTokens { caller: Address, paymaster: Address, token: Address, target: Address, amount: U256 },
    /// `caller` funds the settlement-unit deposit of `paymaster`
    PaymasterDeposit { caller: Address, paymaster: Address, amount: U256 },
    /// Mines blocks and moves the clock forward
    Advance {
        #[serde(default)]
        blocks: u64,
        #[serde(default)]
        seconds: u64,
    },
    /// Submits a batch of operations
    HandleOps { beneficiary: Address, ops: Vec<ScenarioOp> },
    /// Dry-runs validation of one operation
    SimulateValidation { op: ScenarioOp },
    /// Dry-runs one operation, optionally followed by a call to `target`
    SimulateHandleOp {
        op: ScenarioOp,
        #[serde(default)]
        target: Option<Address>,
        #[serde(default)]
        target_call_data: Bytes,
    },
}

impl Step {
    /// The action name, as written in scenario files.
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Fund { .. } => "fund",
            Self::MintTokens { .. } => "mintTokens",
            Self::Approve { .. } => "approve",
            Self::DepositTo { .. } => "depositTo",
            Self::WithdrawTo { .. } => "withdrawTo",
            Self::AddStake { .. } => "addStake",
            Self::UnlockStake { .. } => "unlockStake",
            Self::WithdrawStake { .. } => "withdrawStake",
            Self::CreateAccount { .. } => "createAccount",
            Self::AddTokenDeposit { .. } => "addTokenDeposit",
            Self::LockTokenDeposit { .. } => "lockTokenDeposit",
            Self::UnlockTokenDeposit { .. } => "unlockTokenDeposit",
            Self::WithdrawTokens { .. } => "withdrawTokens",
            Self::PaymasterDeposit { .. } => "paymasterDeposit",
            Self::Advance { .. } => "advance",
            Self::HandleOps { .. } => "handleOps",
            Self::SimulateValidation { .. } => "simulateValidation",
            Self::SimulateHandleOp { .. } => "simulateHandleOp",
        }
    }
}

/// An operation as written in a scenario. When `signingKey` is present the operation is signed
/// for the scenario's entry point and chain before submission, replacing `signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOp {
    /// The operation
    #[serde(flatten)]
    pub op: UserOperation,
    /// Private key of the sender's owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<B256>,
    /// Validity window committed to by the signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<ValidityWindow>,
}

/// Timestamps bounding when an operation may be included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    /// Earliest timestamp
    #[serde(default)]
    pub valid_after: u64,
    /// Latest timestamp; zero means no expiry
    #[serde(default)]
    pub valid_until: u64,
}

impl ScenarioOp {
    /// The operation ready for submission to the entry point described by `config`.
    pub fn resolve(&self, config: &EntryPointConfig) -> Result<UserOperation> {
        let Some(key) = self.signing_key else {
            return Ok(self.op.clone());
        };
        let signer = PrivateKeySigner::from_bytes(&key)
            .map_err(|err| SettleError::InvalidSigningKey(err.to_string()))?;
        let window = self.window.map(|window| (window.valid_until, window.valid_after));
        let op = self.op.clone();
        SimpleAccount::sign_user_op(op, &signer, config.address, config.chain_id, window)
            .map_err(|err| SettleError::InvalidSigningKey(err.to_string()))
    }
}
