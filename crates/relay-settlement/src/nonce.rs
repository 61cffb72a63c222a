//! Keyed nonces.
//!
//! A nonce is `key << 64 | sequence`. Each sender has an independent sequence per key, so
//! operations using different keys can be submitted in any order.

use alloy_primitives::{Address, U256};

use crate::{constants::NONCE_SEQUENCE_BITS, encode_nonce, JournaledMap};

/// Sequence numbers per `(sender, key)`.
#[derive(Debug, Default)]
pub struct NonceManager {
    sequences: JournaledMap<(Address, U256), u64>,
}

impl NonceManager {
    /// The next valid nonce of `sender` for `key`.
    pub fn get_nonce(&self, sender: Address, key: U256) -> U256 {
        encode_nonce(key, self.sequence(sender, key))
    }

    fn sequence(&self, sender: Address, key: U256) -> u64 {
        self.sequences.get(&(sender, key)).copied().unwrap_or_default()
    }

    /// Consumes `nonce` if it is the next one for its key. Returns whether it was valid.
    pub fn validate_and_update(&mut self, sender: Address, nonce: U256) -> bool {
        let key = nonce >> NONCE_SEQUENCE_BITS;
        let sequence = nonce.as_limbs()[0];
        let current = self.sequence(sender, key);
        if current != sequence {
            return false;
        }
        match current.checked_add(1) {
            Some(next) => {
                self.sequences.insert((sender, key), next);
                true
            }
            None => false,
        }
    }

    /// Skips one sequence number of `sender` for `key`.
    pub fn increment_nonce(&mut self, sender: Address, key: U256) {
        let next = self.sequence(sender, key).saturating_add(1);
        self.sequences.insert((sender, key), next);
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.sequences.checkpoint()
    }

    pub(crate) fn revert_to(&mut self, checkpoint: usize) {
        self.sequences.revert_to(checkpoint);
    }

    pub(crate) fn clear_journal(&mut self) {
        self.sequences.clear_journal();
    }
}
