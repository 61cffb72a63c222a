//! Stake manager operations of the entry point.
//!
//! Each operation runs after the call's value has reached the entry point, so crediting the
//! ledger never moves native value, while withdrawals pay out of the entry point's balance.

use alloy_primitives::{Address, U256};
use tracing::debug;

use crate::{interfaces::IEntryPoint, CallContext, DepositInfo, LedgerError};

impl CallContext<'_> {
    /// Credits `amount`, already held by the entry point, to the deposit of `account`.
    pub fn deposit_to(&mut self, account: Address, amount: U256) -> Result<U256, LedgerError> {
        let total = self.state.ledger.increment_deposit(account, amount)?;
        let entry_point = self.entry_point();
        self.state.emit(entry_point, &IEntryPoint::Deposited { account, totalDeposit: total });
        debug!(target: "relay_settlement::ledger", %account, %amount, %total, "deposited");
        Ok(total)
    }

    /// Pays `amount` of the deposit of `account` out to `destination`.
    pub fn withdraw_to(
        &mut self,
        account: Address,
        destination: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.state.ledger.debit(account, amount)?;
        let entry_point = self.entry_point();
        self.state.native.transfer(entry_point, destination, amount)?;
        self.state.emit(
            entry_point,
            &IEntryPoint::Withdrawn { account, withdrawAddress: destination, amount },
        );
        debug!(target: "relay_settlement::ledger", %account, %destination, %amount, "withdrawn");
        Ok(())
    }

    /// Adds `amount`, already held by the entry point, to the stake of `account`.
    pub fn add_stake(
        &mut self,
        account: Address,
        unstake_delay_sec: u32,
        amount: U256,
    ) -> Result<DepositInfo, LedgerError> {
        let info = self.state.ledger.add_stake(account, unstake_delay_sec, amount)?;
        let entry_point = self.entry_point();
        self.state.emit(
            entry_point,
            &IEntryPoint::StakeLocked {
                account,
                totalStaked: info.stake,
                unstakeDelaySec: U256::from(unstake_delay_sec),
            },
        );
        debug!(target: "relay_settlement::ledger", %account, stake = %info.stake, unstake_delay_sec, "stake locked");
        Ok(info)
    }

    /// Starts the unstake delay of `account`.
    pub fn unlock_stake(&mut self, account: Address) -> Result<u64, LedgerError> {
        let withdraw_time = self.state.ledger.unlock_stake(account, self.env.timestamp)?;
        let entry_point = self.entry_point();
        self.state.emit(
            entry_point,
            &IEntryPoint::StakeUnlocked { account, withdrawTime: U256::from(withdraw_time) },
        );
        debug!(target: "relay_settlement::ledger", %account, withdraw_time, "stake unlocked");
        Ok(withdraw_time)
    }

    /// Pays the unlocked stake of `account` out to `destination`.
    pub fn withdraw_stake(
        &mut self,
        account: Address,
        destination: Address,
    ) -> Result<U256, LedgerError> {
        let stake = self.state.ledger.withdraw_stake(account, self.env.timestamp)?;
        let entry_point = self.entry_point();
        self.state.native.transfer(entry_point, destination, stake)?;
        self.state.emit(
            entry_point,
            &IEntryPoint::StakeWithdrawn { account, withdrawAddress: destination, amount: stake },
        );
        debug!(target: "relay_settlement::ledger", %account, %destination, %stake, "stake withdrawn");
        Ok(stake)
    }
}
