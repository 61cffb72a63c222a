//! Error types for the settlement engine.
//!
//! Every component reports failures through its own enum. The orchestrator folds them into a
//! [`RejectReason`] whose [`code`](RejectReason::code) is stable and machine-readable, so callers
//! can branch on the code without matching message strings.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{Revert, SolError};
use serde::{Deserialize, Serialize};

/// Native balance errors of the execution substrate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    /// The account cannot cover the transfer.
    #[error("insufficient balance of {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The account being debited
        account: Address,
        /// The requested amount
        requested: U256,
        /// The available balance
        available: U256,
    },
    /// The credit overflows the recipient's balance.
    #[error("balance overflow for {0}")]
    Overflow(Address),
}

/// Stake and deposit ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Withdrawal or debit larger than the deposit on record.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The requested amount
        requested: U256,
        /// The deposit on record
        available: U256,
    },
    /// `addStake` with a zero unstake delay.
    #[error("must specify unstake delay")]
    ZeroUnstakeDelay,
    /// `addStake` with a delay shorter than the current one.
    #[error("cannot decrease unstake time")]
    UnstakeDelayDecreased {
        /// The delay on record
        current: u32,
        /// The requested delay
        requested: u32,
    },
    /// `addStake` resulting in an empty stake.
    #[error("no stake specified")]
    NoStake,
    /// The stake does not fit in 112 bits.
    #[error("stake overflow")]
    StakeOverflow,
    /// The deposit overflows.
    #[error("deposit overflow")]
    DepositOverflow,
    /// `unlockStake` without an active stake.
    #[error("not staked")]
    NotStaked,
    /// `unlockStake` while an unlock is already pending.
    #[error("already unstaking")]
    AlreadyUnstaking,
    /// `withdrawStake` before `unlockStake`.
    #[error("must call unlockStake() first")]
    NotUnlocked,
    /// `withdrawStake` before the unstake delay elapsed.
    #[error("Stake withdrawal is not due")]
    NotDue {
        /// Earliest withdrawal time
        withdraw_time: u64,
        /// Current time
        now: u64,
    },
    /// Moving native value failed.
    #[error(transparent)]
    Balance(#[from] BalanceError),
}

impl LedgerError {
    /// Machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::ZeroUnstakeDelay => "ZERO_UNSTAKE_DELAY",
            Self::UnstakeDelayDecreased { .. } => "UNSTAKE_DELAY_DECREASED",
            Self::NoStake => "NO_STAKE",
            Self::StakeOverflow => "STAKE_OVERFLOW",
            Self::DepositOverflow => "DEPOSIT_OVERFLOW",
            Self::NotStaked => "NOT_STAKED",
            Self::AlreadyUnstaking => "ALREADY_UNSTAKING",
            Self::NotUnlocked => "NOT_UNLOCKED",
            Self::NotDue { .. } => "NOT_DUE",
            Self::Balance(_) => "INSUFFICIENT_NATIVE_BALANCE",
        }
    }
}

/// ERC-20 book errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No token contract at this address.
    #[error("unknown token {0}")]
    UnknownToken(Address),
    /// The holder cannot cover the transfer.
    #[error("ERC20: transfer amount exceeds balance")]
    InsufficientBalance {
        /// Token holder
        owner: Address,
        /// Requested amount
        requested: U256,
        /// Available balance
        available: U256,
    },
    /// The spender's allowance cannot cover the transfer.
    #[error("ERC20: insufficient allowance")]
    InsufficientAllowance {
        /// Token holder
        owner: Address,
        /// Spender
        spender: Address,
        /// Requested amount
        requested: U256,
        /// Current allowance
        allowance: U256,
    },
    /// The credit overflows the recipient's balance.
    #[error("ERC20: balance overflow")]
    Overflow,
}

/// Price oracle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The caller is not the oracle's administrator.
    #[error("Ownable: caller is not the owner")]
    NotOwner,
    /// Neither a fixed price nor a conversion path is registered for the token.
    #[error("no price for token {0}")]
    NoPrice(Address),
    /// A conversion path is malformed or does not end in the priced token.
    #[error("invalid price path: {0}")]
    InvalidPath(&'static str),
    /// A conversion path weight of zero.
    #[error("price path weight must be non-zero")]
    ZeroWeight,
    /// The external quoter could not quote a registered path.
    #[error("quote failed for token {0}")]
    QuoteFailed(Address),
    /// Conversion overflowed.
    #[error("price conversion overflow")]
    Overflow,
}

/// Fee-payer token accounting errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymasterError {
    /// No fee payer is registered at this address.
    #[error("paymaster not deployed at {0}")]
    UnknownPaymaster(Address),
    /// The caller is not the fee payer's controller.
    #[error("Ownable: caller is not the owner")]
    NotOwner,
    /// `addToken` for a token that already has an oracle.
    #[error("Token already set")]
    TokenAlreadySet(Address),
    /// The token has no registered oracle.
    #[error("unsupported token {0}")]
    UnsupportedToken(Address),
    /// The fee-payer descriptor does not name a fee token.
    #[error("paymasterAndData must specify token")]
    MissingToken,
    /// The verification gas limit cannot cover post-op settlement.
    #[error("gas too low for postOp")]
    GasTooLowForPostOp,
    /// Neither the locked deposit nor the payer's direct token balance covers the cost.
    #[error("insufficient collateral: required {required}, deposit {deposit}, locked {locked}")]
    InsufficientCollateral {
        /// Maximum token cost of the operation
        required: U256,
        /// The payer's token deposit
        deposit: U256,
        /// Whether the deposit is locked (eligible as collateral)
        locked: bool,
    },
    /// Withdrawal before `unlockTokenDeposit`.
    #[error("must unlockTokenDeposit first")]
    MustUnlockFirst,
    /// Withdrawal before the configured unlock delay elapsed.
    #[error("token withdrawal is not due until block {unlock_block}")]
    WithdrawalNotDue {
        /// Block from which withdrawal is allowed
        unlock_block: u64,
        /// Current block
        current: u64,
    },
    /// Withdrawal or debit larger than the token deposit.
    #[error("insufficient token deposit: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Requested amount
        requested: U256,
        /// Token deposit on record
        available: U256,
    },
    /// Price conversion failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),
    /// Token movement failed.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Native stake or deposit management failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PaymasterError {
    /// Machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownPaymaster(_) => "PAYMASTER_NOT_DEPLOYED",
            Self::NotOwner => "NOT_OWNER",
            Self::TokenAlreadySet(_) => "TOKEN_ALREADY_SET",
            Self::UnsupportedToken(_) => "UNSUPPORTED_TOKEN",
            Self::MissingToken => "MISSING_TOKEN",
            Self::GasTooLowForPostOp => "GAS_TOO_LOW_FOR_POST_OP",
            Self::InsufficientCollateral { .. } => "INSUFFICIENT_COLLATERAL",
            Self::MustUnlockFirst => "MUST_UNLOCK_FIRST",
            Self::WithdrawalNotDue { .. } => "TOKEN_WITHDRAWAL_NOT_DUE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::Oracle(_) => "ORACLE_FAILURE",
            Self::Token(_) => "TOKEN_TRANSFER_FAILED",
            Self::Ledger(err) => err.code(),
        }
    }
}

/// Errors raised by an account's authorization check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// The signature is not 65 bytes (or 77 bytes with a validity window).
    #[error("ECDSA: invalid signature length {0}")]
    InvalidSignatureLength(usize),
    /// The signature cannot be recovered.
    #[error("ECDSA: invalid signature")]
    InvalidSignature,
    /// The operation has no verification gas.
    #[error("zero verification gas limit")]
    ZeroVerificationGasLimit,
    /// Validation ran out of verification gas.
    #[error("out of gas")]
    OutOfGas,
}

/// Errors raised by a forwarded call. A failing forwarded call is not a protocol error; it is
/// reported through the settlement event's success flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// The call exhausted its gas limit.
    #[error("out of gas")]
    OutOfGas,
    /// `executeBatch` with target and payload arrays of different lengths.
    #[error("wrong array lengths")]
    WrongArrayLengths,
    /// The account was called by someone other than its owner or the entry point.
    #[error("account: not Owner or EntryPoint")]
    NotOwnerOrEntryPoint,
    /// The payload does not match any function of the target.
    #[error("unknown selector {0}")]
    UnknownSelector(Bytes),
    /// The payload could not be decoded.
    #[error("invalid call data: {0}")]
    InvalidCallData(String),
    /// Native value transfer failed.
    #[error(transparent)]
    Balance(#[from] BalanceError),
    /// The stake manager rejected the call.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// A fee payer rejected the call.
    #[error(transparent)]
    Paymaster(#[from] PaymasterError),
    /// A token rejected the call.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// An account factory could not deploy.
    #[error("create failed: {0}")]
    CreateFailed(String),
}

impl CallError {
    /// ABI-encodes the error as `Error(string)` revert data.
    pub fn revert_data(&self) -> Bytes {
        Revert { reason: self.to_string() }.abi_encode().into()
    }
}

/// Why an operation was rejected.
///
/// The `AA` codes follow the entry point convention: `AA1x` sender creation, `AA2x` sender
/// validation, `AA3x` fee payer validation, `AA4x` gas, `AA5x` post execution, `AA9x` input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// Deployment payload present but the sender already has code.
    #[error("AA10 sender already constructed")]
    SenderAlreadyConstructed,
    /// The factory failed or ran out of gas.
    #[error("AA13 initCode failed or OOG: {0}")]
    InitCodeFailed(String),
    /// The factory deployed to an address other than the declared sender.
    #[error("AA14 initCode must return sender")]
    InitCodeMustReturnSender {
        /// Address produced by the factory
        deployed: Address,
    },
    /// The factory returned without deploying code at the sender address.
    #[error("AA15 initCode must create sender")]
    InitCodeMustCreateSender,
    /// The sender has no code and no deployment payload.
    #[error("AA20 account not deployed")]
    AccountNotDeployed,
    /// The sender's deposit does not cover the prefund.
    #[error("AA21 didn't pay prefund")]
    DidNotPayPrefund {
        /// Required prefund
        required: U256,
        /// Sender deposit
        deposit: U256,
    },
    /// The account's validity window does not contain the current time.
    #[error("AA22 expired or not due")]
    ExpiredOrNotDue,
    /// The account's authorization check reverted.
    #[error("AA23 reverted: {0}")]
    AccountValidationReverted(AccountError),
    /// The signature does not match.
    #[error("AA24 signature error")]
    SignatureError,
    /// The nonce does not match the sender's sequence for its key.
    #[error("AA25 invalid account nonce")]
    InvalidAccountNonce,
    /// The fee-payer descriptor names an unknown fee payer.
    #[error("AA30 paymaster not deployed")]
    PaymasterNotDeployed(Address),
    /// The fee payer's settlement-unit deposit does not cover the prefund.
    #[error("AA31 paymaster deposit too low")]
    PaymasterDepositTooLow {
        /// Required prefund
        required: U256,
        /// Fee payer deposit
        deposit: U256,
    },
    /// The fee payer's validity window does not contain the current time.
    #[error("AA32 paymaster expired or not due")]
    PaymasterExpiredOrNotDue,
    /// The fee payer's sponsorship validation reverted.
    #[error("AA33 reverted: {0}")]
    PaymasterValidationReverted(PaymasterError),
    /// Sender validation exceeded the verification gas limit.
    #[error("AA40 over verificationGasLimit")]
    OverVerificationGasLimit,
    /// Fee payer validation exceeded the verification gas limit.
    #[error("AA41 too little verificationGas")]
    PaymasterOverVerificationGasLimit,
    /// Post-op settlement failed in every mode.
    #[error("AA50 postOp reverted: {0}")]
    PostOpReverted(PaymasterError),
    /// The actual cost exceeds the reserved prefund.
    #[error("AA51 prefund below actualGasCost")]
    PrefundBelowActualGasCost,
    /// Settlement against the ledger failed.
    #[error("AA52 settlement failed: {0}")]
    SettlementFailed(LedgerError),
    /// Zero beneficiary.
    #[error("AA90 invalid beneficiary")]
    InvalidBeneficiary,
    /// Malformed fee-payer descriptor.
    #[error("AA93 invalid paymasterAndData")]
    InvalidPaymasterAndData,
    /// A gas value does not fit in 120 bits.
    #[error("AA94 gas values overflow")]
    GasValuesOverflow,
    /// The fee token has no registered oracle.
    #[error("AA95 unsupported token {0}")]
    UnsupportedToken(Address),
}

impl RejectReason {
    /// Machine-readable rejection code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SenderAlreadyConstructed => "AA10",
            Self::InitCodeFailed(_) => "AA13",
            Self::InitCodeMustReturnSender { .. } => "AA14",
            Self::InitCodeMustCreateSender => "AA15",
            Self::AccountNotDeployed => "AA20",
            Self::DidNotPayPrefund { .. } => "AA21",
            Self::ExpiredOrNotDue => "AA22",
            Self::AccountValidationReverted(_) => "AA23",
            Self::SignatureError => "AA24",
            Self::InvalidAccountNonce => "AA25",
            Self::PaymasterNotDeployed(_) => "AA30",
            Self::PaymasterDepositTooLow { .. } => "AA31",
            Self::PaymasterExpiredOrNotDue => "AA32",
            Self::PaymasterValidationReverted(_) => "AA33",
            Self::OverVerificationGasLimit => "AA40",
            Self::PaymasterOverVerificationGasLimit => "AA41",
            Self::PostOpReverted(_) => "AA50",
            Self::PrefundBelowActualGasCost => "AA51",
            Self::SettlementFailed(_) => "AA52",
            Self::InvalidBeneficiary => "AA90",
            Self::InvalidPaymasterAndData => "AA93",
            Self::GasValuesOverflow => "AA94",
            Self::UnsupportedToken(_) => "AA95",
        }
    }

    /// The broad class of the rejection.
    pub const fn kind(&self) -> RejectKind {
        match self {
            Self::InvalidBeneficiary |
            Self::InvalidPaymasterAndData |
            Self::GasValuesOverflow |
            Self::UnsupportedToken(_) |
            Self::PaymasterNotDeployed(_) => RejectKind::Input,
            Self::AccountValidationReverted(_) |
            Self::SignatureError |
            Self::InvalidAccountNonce |
            Self::ExpiredOrNotDue |
            Self::PaymasterExpiredOrNotDue => RejectKind::Authorization,
            Self::DidNotPayPrefund { .. } |
            Self::PaymasterDepositTooLow { .. } |
            Self::PaymasterValidationReverted(_) |
            Self::PrefundBelowActualGasCost |
            Self::SettlementFailed(_) => RejectKind::Solvency,
            Self::SenderAlreadyConstructed |
            Self::InitCodeFailed(_) |
            Self::InitCodeMustReturnSender { .. } |
            Self::InitCodeMustCreateSender |
            Self::AccountNotDeployed => RejectKind::StateOrder,
            Self::OverVerificationGasLimit |
            Self::PaymasterOverVerificationGasLimit |
            Self::PostOpReverted(_) => RejectKind::Gas,
        }
    }

    /// Whether the rejection leaves the sender's nonce consumed.
    pub const fn consumes_nonce(&self) -> bool {
        matches!(
            self,
            Self::PostOpReverted(_) | Self::PrefundBelowActualGasCost | Self::SettlementFailed(_)
        )
    }
}

/// Broad classes of rejections, by propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// Malformed input, rejected before any state mutation.
    Input,
    /// Signature, nonce or validity window failure.
    Authorization,
    /// A party cannot cover the cost.
    Solvency,
    /// A required prior step is missing.
    StateOrder,
    /// Gas limits exceeded.
    Gas,
}

/// A rejected operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("FailedOp({op_index}, {reason})")]
pub struct FailedOp {
    /// Index of the operation in the submitted batch
    pub op_index: usize,
    /// Why it was rejected
    pub reason: RejectReason,
}

impl FailedOp {
    /// Creates a new [`FailedOp`].
    pub const fn new(op_index: usize, reason: RejectReason) -> Self {
        Self { op_index, reason }
    }

    /// Machine-readable rejection code.
    pub const fn code(&self) -> &'static str {
        self.reason.code()
    }
}
