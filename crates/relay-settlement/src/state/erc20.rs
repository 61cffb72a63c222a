use alloy_primitives::{map::HashSet, Address, U256};

use crate::{interfaces::IERC20, JournaledMap, TokenError, WorldState};

/// Undo log positions of [`Erc20Books`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Erc20Checkpoint {
    balances: usize,
    allowances: usize,
}

/// Balances and allowances of every registered ERC-20 token.
#[derive(Debug, Default)]
pub struct Erc20Books {
    tokens: HashSet<Address>,
    balances: JournaledMap<(Address, Address), U256>,
    allowances: JournaledMap<(Address, Address, Address), U256>,
}

impl Erc20Books {
    /// Registers a token contract at `token`.
    pub fn register(&mut self, token: Address) {
        self.tokens.insert(token);
    }

    /// Whether a token contract exists at `token`.
    pub fn is_token(&self, token: Address) -> bool {
        self.tokens.contains(&token)
    }

    /// Balance of `holder` in `token`.
    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances.get(&(token, holder)).copied().unwrap_or_default()
    }

    /// Allowance granted by `owner` to `spender` in `token`.
    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(token, owner, spender)).copied().unwrap_or_default()
    }

    fn ensure_token(&self, token: Address) -> Result<(), TokenError> {
        if self.is_token(token) {
            Ok(())
        } else {
            Err(TokenError::UnknownToken(token))
        }
    }

    fn move_balance(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(token, from);
        let remaining = available.checked_sub(amount).ok_or(TokenError::InsufficientBalance {
            owner: from,
            requested: amount,
            available,
        })?;
        self.balances.insert((token, from), remaining);
        let credited =
            self.balance_of(token, to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.balances.insert((token, to), credited);
        Ok(())
    }

    pub(crate) fn checkpoint(&self) -> Erc20Checkpoint {
        Erc20Checkpoint {
            balances: self.balances.checkpoint(),
            allowances: self.allowances.checkpoint(),
        }
    }

    pub(crate) fn revert_to(&mut self, checkpoint: Erc20Checkpoint) {
        self.balances.revert_to(checkpoint.balances);
        self.allowances.revert_to(checkpoint.allowances);
    }

    pub(crate) fn clear_journal(&mut self) {
        self.balances.clear_journal();
        self.allowances.clear_journal();
    }
}

impl WorldState {
    /// Mints `amount` of `token` to `to`.
    pub fn token_mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        self.tokens.ensure_token(token)?;
        let credited =
            self.tokens.balance_of(token, to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.tokens.balances.insert((token, to), credited);
        self.emit(token, &IERC20::Transfer { from: Address::ZERO, to, value: amount });
        Ok(())
    }

    /// `transfer` called by `from`.
    pub fn token_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        self.tokens.ensure_token(token)?;
        self.tokens.move_balance(token, from, to, amount)?;
        self.emit(token, &IERC20::Transfer { from, to, value: amount });
        Ok(())
    }

    /// `approve` called by `owner`.
    pub fn token_approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        self.tokens.ensure_token(token)?;
        self.tokens.allowances.insert((token, owner, spender), amount);
        self.emit(token, &IERC20::Approval { owner, spender, value: amount });
        Ok(())
    }

    /// `transferFrom` called by `spender`. An unlimited allowance is not decreased.
    pub fn token_transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        self.tokens.ensure_token(token)?;
        if spender != from {
            let allowance = self.tokens.allowance(token, from, spender);
            if allowance < amount {
                return Err(TokenError::InsufficientAllowance {
                    owner: from,
                    spender,
                    requested: amount,
                    allowance,
                });
            }
            if allowance != U256::MAX {
                self.tokens.allowances.insert((token, from, spender), allowance - amount);
            }
        }
        self.tokens.move_balance(token, from, to, amount)?;
        self.emit(token, &IERC20::Transfer { from, to, value: amount });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TOKEN: Address = address!("0x0000000000000000000000000000000000007011");
    const ALICE: Address = address!("0x000000000000000000000000000000000000a11c");
    const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

    fn state() -> WorldState {
        let mut state = WorldState::new();
        state.tokens.register(TOKEN);
        state.token_mint(TOKEN, ALICE, U256::from(100)).unwrap();
        state
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut state = state();
        state.token_approve(TOKEN, ALICE, BOB, U256::from(30)).unwrap();
        state.token_transfer_from(TOKEN, BOB, ALICE, BOB, U256::from(20)).unwrap();

        assert_eq!(state.tokens.allowance(TOKEN, ALICE, BOB), U256::from(10));
        assert_eq!(state.tokens.balance_of(TOKEN, BOB), U256::from(20));
        assert!(matches!(
            state.token_transfer_from(TOKEN, BOB, ALICE, BOB, U256::from(11)),
            Err(TokenError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_unknown_token_and_overdraft() {
        let mut state = state();
        assert_eq!(
            state.token_transfer(BOB, ALICE, BOB, U256::from(1)),
            Err(TokenError::UnknownToken(BOB))
        );
        assert!(matches!(
            state.token_transfer(TOKEN, ALICE, BOB, U256::from(101)),
            Err(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(state.tokens.balance_of(TOKEN, ALICE), U256::from(100));
    }
}
