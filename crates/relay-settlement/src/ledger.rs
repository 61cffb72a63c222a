//! Stake and deposit ledger.
//!
//! One [`DepositInfo`] per depositor, shared by accounts and fee payers. The ledger only does the
//! accounting; moving the native value in and out of the entry point is the caller's job (see
//! the stake manager operations on [`EntryPoint`](crate::EntryPoint)).

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{constants::MAX_DEPOSIT_VALUE, JournaledMap, LedgerError};

/// Deposit and stake of one depositor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInfo {
    /// Balance available as prefund collateral
    pub deposit: U256,
    /// Whether a stake is held and not yet withdrawn
    pub staked: bool,
    /// Anti-abuse collateral, separate from the deposit
    pub stake: U256,
    /// Minimum delay between `unlockStake` and `withdrawStake`
    pub unstake_delay_sec: u32,
    /// Earliest stake withdrawal time, zero while the stake is locked
    pub withdraw_time: u64,
}

/// Stake of an entity, as reported by dry-run validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeInfo {
    /// Staked amount
    pub stake: U256,
    /// Unstake delay in seconds
    pub unstake_delay_sec: u32,
}

/// The ledger of every depositor's [`DepositInfo`].
#[derive(Debug, Default)]
pub struct DepositLedger {
    deposits: JournaledMap<Address, DepositInfo>,
}

impl DepositLedger {
    /// Deposit and stake of `account`.
    pub fn deposit_info(&self, account: Address) -> DepositInfo {
        self.deposits.get(&account).cloned().unwrap_or_default()
    }

    /// Deposit of `account`.
    pub fn balance_of(&self, account: Address) -> U256 {
        self.deposits.get(&account).map(|info| info.deposit).unwrap_or_default()
    }

    /// Stake of `account`.
    pub fn stake_info(&self, account: Address) -> StakeInfo {
        let info = self.deposit_info(account);
        StakeInfo { stake: info.stake, unstake_delay_sec: info.unstake_delay_sec }
    }

    /// Credits `amount` to the deposit of `account` and returns the new total.
    pub fn increment_deposit(&mut self, account: Address, amount: U256) -> Result<U256, LedgerError> {
        let mut info = self.deposit_info(account);
        let total = info.deposit.checked_add(amount).ok_or(LedgerError::DepositOverflow)?;
        if total > MAX_DEPOSIT_VALUE {
            return Err(LedgerError::DepositOverflow);
        }
        info.deposit = total;
        self.deposits.insert(account, info);
        trace!(target: "relay_settlement::ledger", %account, %amount, %total, "deposit credited");
        Ok(total)
    }

    /// Debits `amount` from the deposit of `account` and returns the remainder.
    pub fn debit(&mut self, account: Address, amount: U256) -> Result<U256, LedgerError> {
        let mut info = self.deposit_info(account);
        if amount > info.deposit {
            return Err(LedgerError::InsufficientFunds { requested: amount, available: info.deposit });
        }
        info.deposit -= amount;
        let remaining = info.deposit;
        self.deposits.insert(account, info);
        trace!(target: "relay_settlement::ledger", %account, %amount, %remaining, "deposit debited");
        Ok(remaining)
    }

    /// Adds `amount` to the stake of `account`, setting its unstake delay. Re-locks a stake that
    /// is being unlocked.
    pub fn add_stake(
        &mut self,
        account: Address,
        unstake_delay_sec: u32,
        amount: U256,
    ) -> Result<DepositInfo, LedgerError> {
        let mut info = self.deposit_info(account);
        if unstake_delay_sec == 0 {
            return Err(LedgerError::ZeroUnstakeDelay);
        }
        if unstake_delay_sec < info.unstake_delay_sec {
            return Err(LedgerError::UnstakeDelayDecreased {
                current: info.unstake_delay_sec,
                requested: unstake_delay_sec,
            });
        }
        let stake = info.stake.checked_add(amount).ok_or(LedgerError::StakeOverflow)?;
        if stake.is_zero() {
            return Err(LedgerError::NoStake);
        }
        if stake > MAX_DEPOSIT_VALUE {
            return Err(LedgerError::StakeOverflow);
        }
        info.stake = stake;
        info.staked = true;
        info.unstake_delay_sec = unstake_delay_sec;
        info.withdraw_time = 0;
        self.deposits.insert(account, info.clone());
        Ok(info)
    }

    /// Starts the unstake delay of `account` and returns the earliest withdrawal time.
    pub fn unlock_stake(&mut self, account: Address, now: u64) -> Result<u64, LedgerError> {
        let mut info = self.deposit_info(account);
        if !info.staked {
            return Err(LedgerError::NotStaked);
        }
        if info.withdraw_time != 0 {
            return Err(LedgerError::AlreadyUnstaking);
        }
        let withdraw_time = now.saturating_add(u64::from(info.unstake_delay_sec));
        info.withdraw_time = withdraw_time;
        self.deposits.insert(account, info);
        Ok(withdraw_time)
    }

    /// Clears the stake of `account` once its unstake delay elapsed and returns the former stake.
    pub fn withdraw_stake(&mut self, account: Address, now: u64) -> Result<U256, LedgerError> {
        let mut info = self.deposit_info(account);
        if info.withdraw_time == 0 {
            return Err(LedgerError::NotUnlocked);
        }
        if now < info.withdraw_time {
            return Err(LedgerError::NotDue { withdraw_time: info.withdraw_time, now });
        }
        let stake = info.stake;
        info.stake = U256::ZERO;
        info.staked = false;
        info.unstake_delay_sec = 0;
        info.withdraw_time = 0;
        self.deposits.insert(account, info);
        Ok(stake)
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.deposits.checkpoint()
    }

    pub(crate) fn revert_to(&mut self, checkpoint: usize) {
        self.deposits.revert_to(checkpoint);
    }

    pub(crate) fn clear_journal(&mut self) {
        self.deposits.clear_journal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use rstest::rstest;

    const ALICE: Address = address!("0x000000000000000000000000000000000000a11c");

    #[test]
    fn test_debit_never_goes_negative() {
        let mut ledger = DepositLedger::default();
        ledger.increment_deposit(ALICE, U256::from(5)).unwrap();
        assert_eq!(
            ledger.debit(ALICE, U256::from(6)),
            Err(LedgerError::InsufficientFunds { requested: U256::from(6), available: U256::from(5) })
        );
        assert_eq!(ledger.debit(ALICE, U256::from(5)), Ok(U256::ZERO));
        assert_eq!(ledger.balance_of(ALICE), U256::ZERO);
    }

    #[test]
    fn test_stake_lifecycle() {
        let mut ledger = DepositLedger::default();
        assert_eq!(ledger.add_stake(ALICE, 0, U256::from(1)), Err(LedgerError::ZeroUnstakeDelay));
        assert_eq!(ledger.add_stake(ALICE, 10, U256::ZERO), Err(LedgerError::NoStake));
        assert_eq!(ledger.unlock_stake(ALICE, 0), Err(LedgerError::NotStaked));

        ledger.add_stake(ALICE, 10, U256::from(7)).unwrap();
        assert_eq!(
            ledger.add_stake(ALICE, 9, U256::from(1)),
            Err(LedgerError::UnstakeDelayDecreased { current: 10, requested: 9 })
        );
        assert_eq!(ledger.withdraw_stake(ALICE, 100), Err(LedgerError::NotUnlocked));

        assert_eq!(ledger.unlock_stake(ALICE, 100), Ok(110));
        assert_eq!(ledger.unlock_stake(ALICE, 101), Err(LedgerError::AlreadyUnstaking));
        assert!(ledger.deposit_info(ALICE).staked);
        assert_eq!(
            ledger.withdraw_stake(ALICE, 109),
            Err(LedgerError::NotDue { withdraw_time: 110, now: 109 })
        );
        assert_eq!(ledger.withdraw_stake(ALICE, 110), Ok(U256::from(7)));
        assert_eq!(ledger.deposit_info(ALICE), DepositInfo::default());
    }

    #[test]
    fn test_add_stake_relocks() {
        let mut ledger = DepositLedger::default();
        ledger.add_stake(ALICE, 10, U256::from(1)).unwrap();
        ledger.unlock_stake(ALICE, 5).unwrap();
        let info = ledger.add_stake(ALICE, 20, U256::from(1)).unwrap();
        assert_eq!(info.withdraw_time, 0);
        assert_eq!(info.stake, U256::from(2));
        assert_eq!(ledger.withdraw_stake(ALICE, 1_000), Err(LedgerError::NotUnlocked));
    }

    #[rstest]
    #[case::below_cap(MAX_DEPOSIT_VALUE - U256::from(1), U256::from(1), true)]
    #[case::above_cap(MAX_DEPOSIT_VALUE, U256::from(1), false)]
    #[case::wrapping(U256::MAX, U256::MAX, false)]
    fn test_deposit_cap(#[case] first: U256, #[case] second: U256, #[case] accepted: bool) {
        let mut ledger = DepositLedger::default();
        let first_result = ledger.increment_deposit(ALICE, first);
        let result = first_result.and_then(|_| ledger.increment_deposit(ALICE, second));
        assert_eq!(result.is_ok(), accepted);
        if !accepted {
            assert_eq!(result, Err(LedgerError::DepositOverflow));
        }
    }
}
