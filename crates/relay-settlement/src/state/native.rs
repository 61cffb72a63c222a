use alloy_primitives::{Address, U256};

use crate::{BalanceError, JournaledMap};

/// Native-currency balances.
#[derive(Debug, Default)]
pub struct NativeBalances {
    balances: JournaledMap<Address, U256>,
}

impl NativeBalances {
    /// Balance of `account`.
    pub fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Credits `amount` out of thin air. Used to fund accounts at genesis.
    pub fn mint(&mut self, account: Address, amount: U256) -> Result<(), BalanceError> {
        let balance =
            self.balance(account).checked_add(amount).ok_or(BalanceError::Overflow(account))?;
        self.balances.insert(account, balance);
        Ok(())
    }

    /// Moves `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), BalanceError> {
        let available = self.balance(from);
        if available < amount {
            return Err(BalanceError::InsufficientBalance {
                account: from,
                requested: amount,
                available,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }
        let credited = self.balance(to).checked_add(amount).ok_or(BalanceError::Overflow(to))?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.balances.checkpoint()
    }

    pub(crate) fn revert_to(&mut self, checkpoint: usize) {
        self.balances.revert_to(checkpoint);
    }

    pub(crate) fn clear_journal(&mut self) {
        self.balances.clear_journal();
    }
}
