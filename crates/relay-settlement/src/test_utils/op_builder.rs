use alloy_primitives::{Address, Bytes, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;

use crate::{
    constants::DEFAULT_CHAIN_ID, encode_nonce, interfaces::IAccount, FeePayerDescriptor,
    SimpleAccount, UserOperation,
};

use super::ENTRY_POINT;

/// Builds operations with sensible gas defaults.
#[derive(Debug, Clone)]
pub struct UserOpBuilder {
    op: UserOperation,
}

impl UserOpBuilder {
    /// Starts an operation from `sender` with nonce zero and no call.
    pub fn new(sender: Address) -> Self {
        Self {
            op: UserOperation {
                sender,
                nonce: U256::ZERO,
                call_gas_limit: U256::from(200_000),
                verification_gas_limit: U256::from(250_000),
                pre_verification_gas: U256::from(21_000),
                max_fee_per_gas: U256::from(1_000_000_000u64),
                max_priority_fee_per_gas: U256::from(1_000_000_000u64),
                ..Default::default()
            },
        }
    }

    /// Sets the nonce.
    pub fn nonce(mut self, key: u64, sequence: u64) -> Self {
        self.op.nonce = encode_nonce(U256::from(key), sequence);
        self
    }

    /// Sets the deployment payload.
    pub fn init_code(mut self, init_code: Bytes) -> Self {
        self.op.init_code = init_code;
        self
    }

    /// Sets the raw call payload.
    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.op.call_data = call_data;
        self
    }

    /// Makes the sender call `dest` with `value` and `func`.
    pub fn execute(self, dest: Address, value: U256, func: Bytes) -> Self {
        self.call_data(IAccount::executeCall { dest, value, func }.abi_encode().into())
    }

    /// Sets the three gas limits.
    pub fn gas(mut self, call: u64, verification: u64, pre_verification: u64) -> Self {
        self.op.call_gas_limit = U256::from(call);
        self.op.verification_gas_limit = U256::from(verification);
        self.op.pre_verification_gas = U256::from(pre_verification);
        self
    }

    /// Sets both fee fields.
    pub fn fees(mut self, max_fee: u64, max_priority_fee: u64) -> Self {
        self.op.max_fee_per_gas = U256::from(max_fee);
        self.op.max_priority_fee_per_gas = U256::from(max_priority_fee);
        self
    }

    /// Sponsors the operation through `paymaster`, billed in `token`.
    pub fn paymaster(mut self, paymaster: Address, token: Address) -> Self {
        self.op.paymaster_and_data = FeePayerDescriptor::encode(paymaster, token);
        self
    }

    /// Sets the raw fee-payer descriptor.
    pub fn paymaster_and_data(mut self, data: Bytes) -> Self {
        self.op.paymaster_and_data = data;
        self
    }

    /// Returns the unsigned operation.
    pub fn build(self) -> UserOperation {
        self.op
    }

    /// Signs for the default entry point and chain.
    pub fn sign(self, signer: &PrivateKeySigner) -> UserOperation {
        sign_op(self.op, signer, None)
    }

    /// Signs with a validity window.
    pub fn sign_with_window(
        self,
        signer: &PrivateKeySigner,
        valid_after: u64,
        valid_until: u64,
    ) -> UserOperation {
        sign_op(self.op, signer, Some((valid_until, valid_after)))
    }
}

/// Signs `op` for the default entry point and chain, optionally within a
/// `(valid_until, valid_after)` window.
pub fn sign_op(
    op: UserOperation,
    signer: &PrivateKeySigner,
    window: Option<(u64, u64)>,
) -> UserOperation {
    SimpleAccount::sign_user_op(op, signer, ENTRY_POINT, DEFAULT_CHAIN_ID, window)
        .expect("signing succeeds")
}
