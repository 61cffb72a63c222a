use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    interfaces::ITokenPaymaster, BlockEnv, JournaledMap, PaymasterError, TokenError, TokenPaymaster,
    WorldState,
};

/// Token deposit of one payer at one fee payer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDepositInfo {
    /// Deposited amount
    pub amount: U256,
    /// Zero while locked; otherwise the unlock marker, which is the first block withdrawal is
    /// allowed when an unlock delay is configured
    pub unlock_block: u64,
}

/// Token deposits of every fee payer, keyed by `(paymaster, token, payer)`, and the unlock
/// marker of every payer, keyed by `(paymaster, payer)`.
#[derive(Debug, Default)]
pub struct TokenDepositBook {
    amounts: JournaledMap<(Address, Address, Address), U256>,
    unlock_blocks: JournaledMap<(Address, Address), u64>,
}

impl TokenDepositBook {
    /// Deposited amount of `payer` in `token` at `paymaster`.
    pub fn amount(&self, paymaster: Address, token: Address, payer: Address) -> U256 {
        self.amounts.get(&(paymaster, token, payer)).copied().unwrap_or_default()
    }

    /// Unlock marker of `payer` at `paymaster`.
    pub fn unlock_block(&self, paymaster: Address, payer: Address) -> u64 {
        self.unlock_blocks.get(&(paymaster, payer)).copied().unwrap_or_default()
    }

    fn credit(
        &mut self,
        paymaster: Address,
        token: Address,
        payer: Address,
        amount: U256,
    ) -> Result<U256, PaymasterError> {
        let total = self
            .amount(paymaster, token, payer)
            .checked_add(amount)
            .ok_or(PaymasterError::Token(TokenError::Overflow))?;
        self.amounts.insert((paymaster, token, payer), total);
        Ok(total)
    }

    fn debit(
        &mut self,
        paymaster: Address,
        token: Address,
        payer: Address,
        amount: U256,
    ) -> Result<U256, PaymasterError> {
        let available = self.amount(paymaster, token, payer);
        let remaining = available
            .checked_sub(amount)
            .ok_or(PaymasterError::InsufficientFunds { requested: amount, available })?;
        self.amounts.insert((paymaster, token, payer), remaining);
        Ok(remaining)
    }

    fn set_unlock_block(&mut self, paymaster: Address, payer: Address, block: u64) {
        self.unlock_blocks.insert((paymaster, payer), block);
    }

    pub(crate) fn checkpoint(&self) -> (usize, usize) {
        (self.amounts.checkpoint(), self.unlock_blocks.checkpoint())
    }

    pub(crate) fn revert_to(&mut self, (amounts, unlock_blocks): (usize, usize)) {
        self.amounts.revert_to(amounts);
        self.unlock_blocks.revert_to(unlock_blocks);
    }

    pub(crate) fn clear_journal(&mut self) {
        self.amounts.clear_journal();
        self.unlock_blocks.clear_journal();
    }
}

impl TokenPaymaster {
    /// Token deposit of `payer` in `token`.
    pub fn deposit_info(&self, state: &WorldState, token: Address, payer: Address) -> TokenDepositInfo {
        TokenDepositInfo {
            amount: state.token_deposits.amount(self.address(), token, payer),
            unlock_block: state.token_deposits.unlock_block(self.address(), payer),
        }
    }

    /// Pulls `amount` of `token` from `caller` and credits it to `payer`. A payer depositing for
    /// itself also locks its deposit.
    pub fn add_deposit_for(
        &self,
        state: &mut WorldState,
        caller: Address,
        token: Address,
        payer: Address,
        amount: U256,
    ) -> Result<(), PaymasterError> {
        if !self.supports(token) {
            return Err(PaymasterError::UnsupportedToken(token));
        }
        state.token_transfer_from(token, self.address(), caller, self.address(), amount)?;
        let total = state.token_deposits.credit(self.address(), token, payer, amount)?;
        state.emit(self.address(), &ITokenPaymaster::TokenDepositAdded { token, account: payer, amount });
        if caller == payer {
            self.lock_token_deposit(state, caller);
        }
        debug!(target: "relay_settlement::paymaster", %token, %payer, %amount, %total, "token deposit added");
        Ok(())
    }

    /// Makes the deposits of `caller` eligible as collateral again and blocks withdrawal.
    pub fn lock_token_deposit(&self, state: &mut WorldState, caller: Address) {
        state.token_deposits.set_unlock_block(self.address(), caller, 0);
        state.emit(self.address(), &ITokenPaymaster::TokenDepositLocked { account: caller });
    }

    /// Withdraws the deposits of `caller` from collateral and starts the unlock delay. Returns the
    /// unlock marker, never zero.
    pub fn unlock_token_deposit(&self, state: &mut WorldState, env: &BlockEnv, caller: Address) -> u64 {
        let unlock_block =
            env.number.saturating_add(self.config().token_unlock_delay_blocks).max(1);
        state.token_deposits.set_unlock_block(self.address(), caller, unlock_block);
        state.emit(
            self.address(),
            &ITokenPaymaster::TokenDepositUnlocked {
                account: caller,
                unlockBlock: U256::from(unlock_block),
            },
        );
        unlock_block
    }

    /// Transfers `amount` of the unlocked `token` deposit of `caller` to `target`.
    pub fn withdraw_tokens_to(
        &self,
        state: &mut WorldState,
        env: &BlockEnv,
        caller: Address,
        token: Address,
        target: Address,
        amount: U256,
    ) -> Result<(), PaymasterError> {
        let unlock_block = state.token_deposits.unlock_block(self.address(), caller);
        if unlock_block == 0 {
            return Err(PaymasterError::MustUnlockFirst);
        }
        // Without a delay the marker may be clamped past the unlocking block; it is due anyway.
        let delay = self.config().token_unlock_delay_blocks;
        if delay != 0 && env.number < unlock_block {
            return Err(PaymasterError::WithdrawalNotDue { unlock_block, current: env.number });
        }
        state.token_deposits.debit(self.address(), token, caller, amount)?;
        state.token_transfer(token, self.address(), target, amount)?;
        state.emit(
            self.address(),
            &ITokenPaymaster::TokensWithdrawn { token, account: caller, target, amount },
        );
        Ok(())
    }

    pub(crate) fn charge_deposit(
        &self,
        state: &mut WorldState,
        token: Address,
        payer: Address,
        amount: U256,
    ) -> Result<(), PaymasterError> {
        state.token_deposits.debit(self.address(), token, payer, amount)?;
        Ok(())
    }

    pub(crate) fn credit_deposit(
        &self,
        state: &mut WorldState,
        token: Address,
        payer: Address,
        amount: U256,
    ) -> Result<(), PaymasterError> {
        state.token_deposits.credit(self.address(), token, payer, amount)?;
        Ok(())
    }
}
