use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_VALID_UNTIL, SIG_VALIDATION_FAILED};

/// Outcome of an authorization check: a signature flag and a validity window.
///
/// Packed as `authorizer | validUntil << 160 | validAfter << 208`, where authorizer `1` signals a
/// signature failure and `validUntil == 0` means no expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationData {
    /// The signature did not match
    pub sig_failed: bool,
    /// First valid timestamp
    pub valid_after: u64,
    /// Last valid timestamp
    pub valid_until: u64,
}

impl Default for ValidationData {
    fn default() -> Self {
        Self { sig_failed: false, valid_after: 0, valid_until: MAX_VALID_UNTIL }
    }
}

impl ValidationData {
    /// A successful check without a window.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A signature failure without a window.
    pub fn sig_failed() -> Self {
        Self { sig_failed: true, ..Self::default() }
    }

    /// A check bounded by a window. `valid_until == 0` means no expiry.
    pub fn with_window(sig_failed: bool, valid_after: u64, valid_until: u64) -> Self {
        let valid_until = if valid_until == 0 { MAX_VALID_UNTIL } else { valid_until };
        Self { sig_failed, valid_after, valid_until }
    }

    /// Packs into the 256-bit word format.
    pub fn pack(&self) -> U256 {
        let authorizer =
            if self.sig_failed { SIG_VALIDATION_FAILED } else { Address::ZERO };
        let valid_until = if self.valid_until == MAX_VALID_UNTIL { 0 } else { self.valid_until };
        U256::from_be_slice(authorizer.as_slice()) |
            (U256::from(valid_until) << 160) |
            (U256::from(self.valid_after) << 208)
    }

    /// Unpacks the 256-bit word format.
    pub fn parse(packed: U256) -> Self {
        let authorizer = Address::from_word(B256::from(packed));
        let mask = U256::from(MAX_VALID_UNTIL);
        let valid_until = ((packed >> 160usize) & mask).to::<u64>();
        let valid_after = ((packed >> 208usize) & mask).to::<u64>();
        Self::with_window(authorizer != Address::ZERO, valid_after, valid_until)
    }

    /// Combines the account's and the fee payer's outcome: both must hold.
    pub fn intersect(self, other: Self) -> Self {
        Self {
            sig_failed: self.sig_failed || other.sig_failed,
            valid_after: self.valid_after.max(other.valid_after),
            valid_until: self.valid_until.min(other.valid_until),
        }
    }

    /// Whether `timestamp` falls outside the window.
    pub const fn is_out_of_range(&self, timestamp: u64) -> bool {
        timestamp > self.valid_until || timestamp < self.valid_after
    }
}
