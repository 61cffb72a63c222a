use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::constants::{
    gas::PAYMASTER_VERIFICATION_GAS_MULTIPLIER, MAX_GAS_VALUE, NONCE_SEQUENCE_BITS,
};

/// A signed request to execute a call through a sender account, optionally sponsored by a fee
/// payer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// The account executing the call
    pub sender: Address,
    /// Replay protection: `key << 64 | sequence`
    pub nonce: U256,
    /// Factory address followed by the factory call; empty once the sender is deployed
    #[serde(default)]
    pub init_code: Bytes,
    /// Payload forwarded to the sender
    #[serde(default)]
    pub call_data: Bytes,
    /// Gas available to the forwarded call
    pub call_gas_limit: U256,
    /// Gas available to each validation step
    pub verification_gas_limit: U256,
    /// Gas paid for outside metered execution
    pub pre_verification_gas: U256,
    /// Maximum total fee per gas
    pub max_fee_per_gas: U256,
    /// Maximum priority fee per gas
    pub max_priority_fee_per_gas: U256,
    /// Empty, or fee payer address, fee token address and extra data
    #[serde(default)]
    pub paymaster_and_data: Bytes,
    /// Authorization proof checked by the sender account
    #[serde(default)]
    pub signature: Bytes,
}

impl UserOperation {
    /// Hash of every field except the signature, with dynamic fields pre-hashed.
    pub fn packed_hash(&self) -> B256 {
        let packed = (
            self.sender,
            self.nonce,
            keccak256(&self.init_code),
            keccak256(&self.call_data),
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
            keccak256(&self.paymaster_and_data),
        )
            .abi_encode();
        keccak256(packed)
    }

    /// The hash the sender signs, bound to an entry point and chain.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        keccak256((self.packed_hash(), entry_point, U256::from(chain_id)).abi_encode())
    }

    /// The gas price paid for this operation under the given base fee.
    pub fn gas_price(&self, basefee: U256) -> U256 {
        if self.max_fee_per_gas == self.max_priority_fee_per_gas {
            return self.max_fee_per_gas;
        }
        self.max_fee_per_gas.min(self.max_priority_fee_per_gas.saturating_add(basefee))
    }

    /// Whether the operation names a fee payer.
    pub fn is_sponsored(&self) -> bool {
        !self.paymaster_and_data.is_empty()
    }

    /// Whether every gas field fits in 120 bits.
    pub fn gas_values_in_range(&self) -> bool {
        [
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
        ]
        .iter()
        .all(|value| *value <= MAX_GAS_VALUE)
    }

    /// Worst-case gas of the operation. With a fee payer the verification limit bounds account
    /// validation, fee payer validation and post-op settlement separately.
    pub fn required_gas(&self) -> U256 {
        let mul = if self.is_sponsored() { PAYMASTER_VERIFICATION_GAS_MULTIPLIER } else { 1 };
        self.call_gas_limit +
            self.verification_gas_limit * U256::from(mul) +
            self.pre_verification_gas
    }

    /// Worst-case cost reserved before execution.
    pub fn required_prefund(&self) -> U256 {
        self.required_gas() * self.max_fee_per_gas
    }

    /// The nonce key (upper 192 bits).
    pub fn nonce_key(&self) -> U256 {
        self.nonce >> NONCE_SEQUENCE_BITS
    }

    /// The nonce sequence (lower 64 bits).
    pub fn nonce_sequence(&self) -> u64 {
        self.nonce.as_limbs()[0]
    }

    /// The factory named in the deployment payload, if the payload is long enough to name one.
    pub fn factory(&self) -> Option<Address> {
        (self.init_code.len() >= 20).then(|| Address::from_slice(&self.init_code[..20]))
    }
}

/// Builds a nonce from a key and a sequence.
pub fn encode_nonce(key: U256, sequence: u64) -> U256 {
    (key << NONCE_SEQUENCE_BITS) | U256::from(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes};

    fn sample() -> UserOperation {
        UserOperation {
            sender: address!("0x1000000000000000000000000000000000000001"),
            nonce: encode_nonce(U256::from(7), 3),
            call_data: bytes!("deadbeef"),
            call_gas_limit: U256::from(100_000),
            verification_gas_limit: U256::from(200_000),
            pre_verification_gas: U256::from(21_000),
            max_fee_per_gas: U256::from(10),
            max_priority_fee_per_gas: U256::from(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_nonce_split() {
        let op = sample();
        assert_eq!(op.nonce_key(), U256::from(7));
        assert_eq!(op.nonce_sequence(), 3);
    }

    #[test]
    fn test_prefund_multiplier() {
        let mut op = sample();
        assert_eq!(op.required_prefund(), U256::from(321_000 * 10));
        op.paymaster_and_data = Bytes::from(vec![1u8; 40]);
        assert_eq!(op.required_prefund(), U256::from((100_000 + 600_000 + 21_000) * 10));
    }

    #[test]
    fn test_gas_price_capped_by_max_fee() {
        let op = sample();
        assert_eq!(op.gas_price(U256::from(5)), U256::from(7));
        assert_eq!(op.gas_price(U256::from(50)), U256::from(10));
    }

    #[test]
    fn test_hash_ignores_signature_but_binds_chain() {
        let op = sample();
        let mut signed = op.clone();
        signed.signature = bytes!("01");
        let entry_point = address!("0x2000000000000000000000000000000000000002");
        assert_eq!(op.hash(entry_point, 1), signed.hash(entry_point, 1));
        assert_ne!(op.hash(entry_point, 1), op.hash(entry_point, 2));
    }

    #[test]
    fn test_gas_values_overflow() {
        let mut op = sample();
        assert!(op.gas_values_in_range());
        op.pre_verification_gas = MAX_GAS_VALUE + U256::from(1);
        assert!(!op.gas_values_in_range());
    }
}
