//! Constants for the settlement engine.
//!
//! Gas figures are grouped in [`gas`]; they are the defaults of [`GasSchedule`](crate::GasSchedule)
//! and can be overridden through configuration.

use alloy_primitives::{address, Address, U256};

/// Gas constants used by the default [`GasSchedule`](crate::GasSchedule).
pub mod gas {
    /// Gas charged for an account's `validateUserOp` (signature recovery and bookkeeping).
    pub const VALIDATE_USER_OP_GAS: u64 = 30_000;
    /// Gas charged for deploying an account through its factory.
    pub const ACCOUNT_DEPLOYMENT_GAS: u64 = 150_000;
    /// Gas charged for the fee payer's sponsorship validation.
    pub const PAYMASTER_VALIDATION_GAS: u64 = 40_000;
    /// Gas reserved for the fee payer's post-execution settlement. The verification gas limit of
    /// a sponsored operation must exceed it.
    pub const COST_OF_POST: u64 = 35_000;
    /// Gas charged by the entry point for consuming the nonce.
    pub const NONCE_UPDATE_GAS: u64 = 5_000;
    /// Base gas for every forwarded call.
    pub const CALL_GAS: u64 = 2_600;
    /// Additional gas for a forwarded call that carries value.
    pub const CALL_VALUE_GAS: u64 = 9_000;
    /// Gas per byte of forwarded call data.
    pub const CALLDATA_BYTE_GAS: u64 = 16;
    /// Gas for each storage write performed by a dispatched call.
    pub const STORAGE_WRITE_GAS: u64 = 20_000;
    /// Multiplier applied to the verification gas limit when a fee payer is present: account
    /// validation, fee-payer validation and post-op settlement are each bounded by it.
    pub const PAYMASTER_VERIFICATION_GAS_MULTIPLIER: u64 = 3;
}

/// The default address of the entry point.
pub const DEFAULT_ENTRY_POINT_ADDRESS: Address =
    address!("0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// The default chain id used in operation hashes.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Gas values of an operation must fit in 120 bits.
pub const MAX_GAS_VALUE: U256 = U256::from_limbs([u64::MAX, (1 << 56) - 1, 0, 0]);

/// Deposits and stakes must fit in 112 bits.
pub const MAX_DEPOSIT_VALUE: U256 = U256::from_limbs([u64::MAX, (1 << 48) - 1, 0, 0]);

/// Fixed oracle prices are expressed as token units per `1e18` settlement units.
pub const PRICE_PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Number of low bits of a nonce holding the sequence; the upper 192 bits are the key.
pub const NONCE_SEQUENCE_BITS: usize = 64;

/// The largest `validUntil` representable in packed validation data (48 bits).
pub const MAX_VALID_UNTIL: u64 = (1 << 48) - 1;

/// Authorizer value in packed validation data signalling a signature failure.
pub const SIG_VALIDATION_FAILED: Address = address!("0x0000000000000000000000000000000000000001");
