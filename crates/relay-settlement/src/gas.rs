//! Gas schedule and metering.

use serde::{Deserialize, Serialize};

use crate::constants::gas;

/// Gas charged by the engine for each metered step.
///
/// The execution substrate is not a general virtual machine; forwarded calls and validation
/// hooks are charged from this schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GasSchedule {
    /// See [`gas::VALIDATE_USER_OP_GAS`].
    pub validate_user_op: u64,
    /// See [`gas::ACCOUNT_DEPLOYMENT_GAS`].
    pub account_deployment: u64,
    /// See [`gas::PAYMASTER_VALIDATION_GAS`].
    pub paymaster_validation: u64,
    /// See [`gas::NONCE_UPDATE_GAS`].
    pub nonce_update: u64,
    /// See [`gas::CALL_GAS`].
    pub call: u64,
    /// See [`gas::CALL_VALUE_GAS`].
    pub call_value: u64,
    /// See [`gas::CALLDATA_BYTE_GAS`].
    pub calldata_byte: u64,
    /// See [`gas::STORAGE_WRITE_GAS`].
    pub storage_write: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            validate_user_op: gas::VALIDATE_USER_OP_GAS,
            account_deployment: gas::ACCOUNT_DEPLOYMENT_GAS,
            paymaster_validation: gas::PAYMASTER_VALIDATION_GAS,
            nonce_update: gas::NONCE_UPDATE_GAS,
            call: gas::CALL_GAS,
            call_value: gas::CALL_VALUE_GAS,
            calldata_byte: gas::CALLDATA_BYTE_GAS,
            storage_write: gas::STORAGE_WRITE_GAS,
        }
    }
}

impl GasSchedule {
    /// Gas for forwarding a call with `data_len` bytes of payload.
    pub const fn call_cost(&self, data_len: usize, with_value: bool) -> u64 {
        let cost = self.call.saturating_add(self.calldata_byte.saturating_mul(data_len as u64));
        if with_value {
            cost.saturating_add(self.call_value)
        } else {
            cost
        }
    }
}

/// The meter ran out of gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfGas;

/// Tracks gas consumed against a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Creates a meter with the given limit.
    pub const fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// The gas limit.
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas consumed so far.
    pub const fn used(&self) -> u64 {
        self.used
    }

    /// Gas left.
    pub const fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Charges `amount`. On failure the meter is exhausted, mirroring an out-of-gas halt.
    pub fn charge(&mut self, amount: u64) -> Result<(), OutOfGas> {
        match self.used.checked_add(amount) {
            Some(used) if used <= self.limit => {
                self.used = used;
                Ok(())
            }
            _ => {
                self.used = self.limit;
                Err(OutOfGas)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_exhausts_on_overcharge() {
        let mut meter = GasMeter::new(100);
        assert!(meter.charge(60).is_ok());
        assert_eq!(meter.remaining(), 40);
        assert_eq!(meter.charge(41), Err(OutOfGas));
        assert_eq!(meter.used(), 100);
    }

    #[test]
    fn test_call_cost() {
        let schedule = GasSchedule::default();
        assert_eq!(schedule.call_cost(0, false), gas::CALL_GAS);
        assert_eq!(
            schedule.call_cost(4, true),
            gas::CALL_GAS + 4 * gas::CALLDATA_BYTE_GAS + gas::CALL_VALUE_GAS
        );
    }

    #[test]
    fn test_call_cost_saturates() {
        let schedule = GasSchedule { calldata_byte: u64::MAX, ..Default::default() };
        assert_eq!(schedule.call_cost(2, true), u64::MAX);
    }
}
