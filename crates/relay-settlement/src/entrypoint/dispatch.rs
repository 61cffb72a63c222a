//! Routing of calls to the entry point, fee payers, tokens, factories and accounts.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolInterface, SolValue};

use crate::{
    interfaces::{
        IAccountFactory::IAccountFactoryCalls, IEntryPoint::IEntryPointCalls,
        IERC20::IERC20Calls, ITokenPaymaster::ITokenPaymasterCalls,
    },
    CallContext, CallError, TokenPaymaster,
};

fn unknown_selector(data: &Bytes) -> CallError {
    CallError::UnknownSelector(data.slice(..data.len().min(4)))
}

impl CallContext<'_> {
    /// Executes a call whose value has already been transferred to `to`.
    pub(crate) fn dispatch(
        &mut self,
        caller: Address,
        to: Address,
        value: U256,
        data: &Bytes,
    ) -> Result<Bytes, CallError> {
        if to == self.entry_point() {
            return self.dispatch_entry_point(caller, value, data);
        }
        let paymasters = self.paymasters;
        if let Some(paymaster) = paymasters.get(&to) {
            return self.dispatch_paymaster(paymaster, caller, data);
        }
        if self.state.tokens.is_token(to) {
            return self.dispatch_token(to, caller, data);
        }
        let factories = self.factories;
        if let Some(factory) = factories.get(&to) {
            if data.is_empty() {
                return Ok(Bytes::new());
            }
            return match IAccountFactoryCalls::abi_decode(data, true)
                .map_err(|_| unknown_selector(data))?
            {
                IAccountFactoryCalls::createAccount(call) => {
                    Ok(factory.deploy(self, call.owner, call.salt)?.abi_encode().into())
                }
                IAccountFactoryCalls::getAddress(call) => {
                    Ok(factory.deterministic_address(call.owner, call.salt).abi_encode().into())
                }
            };
        }
        if let Some(account) = self.state.accounts.get(to) {
            return account.execute(self, caller, data);
        }
        // No code: a plain value transfer.
        Ok(Bytes::new())
    }

    fn dispatch_entry_point(
        &mut self,
        caller: Address,
        value: U256,
        data: &Bytes,
    ) -> Result<Bytes, CallError> {
        if data.is_empty() {
            self.deposit_to(caller, value)?;
            return Ok(Bytes::new());
        }
        let call = IEntryPointCalls::abi_decode(data, true).map_err(|_| unknown_selector(data))?;
        match call {
            IEntryPointCalls::balanceOf(call) => {
                return Ok(self.state.ledger.balance_of(call.account).abi_encode().into());
            }
            IEntryPointCalls::getNonce(call) => {
                let nonce = self.state.nonces.get_nonce(call.sender, U256::from(call.key));
                return Ok(nonce.abi_encode().into());
            }
            _ => {}
        }

        self.charge(self.config.gas.storage_write)?;
        match call {
            IEntryPointCalls::depositTo(call) => {
                self.deposit_to(call.account, value)?;
            }
            IEntryPointCalls::withdrawTo(call) => {
                self.withdraw_to(caller, call.withdrawAddress, call.withdrawAmount)?;
            }
            IEntryPointCalls::addStake(call) => {
                self.add_stake(caller, call.unstakeDelaySec, value)?;
            }
            IEntryPointCalls::unlockStake(_) => {
                self.unlock_stake(caller)?;
            }
            IEntryPointCalls::withdrawStake(call) => {
                self.withdraw_stake(caller, call.withdrawAddress)?;
            }
            IEntryPointCalls::incrementNonce(call) => {
                self.state.nonces.increment_nonce(caller, U256::from(call.key));
            }
            IEntryPointCalls::balanceOf(_) | IEntryPointCalls::getNonce(_) => {}
        }
        Ok(Bytes::new())
    }

    fn dispatch_paymaster(
        &mut self,
        paymaster: &TokenPaymaster,
        caller: Address,
        data: &Bytes,
    ) -> Result<Bytes, CallError> {
        if data.is_empty() {
            return Ok(Bytes::new());
        }
        let call =
            ITokenPaymasterCalls::abi_decode(data, true).map_err(|_| unknown_selector(data))?;
        self.charge(self.config.gas.storage_write)?;
        match call {
            ITokenPaymasterCalls::addDepositFor(call) => {
                paymaster.add_deposit_for(self.state, caller, call.token, call.account, call.amount)?;
            }
            ITokenPaymasterCalls::lockTokenDeposit(_) => {
                paymaster.lock_token_deposit(self.state, caller);
            }
            ITokenPaymasterCalls::unlockTokenDeposit(_) => {
                paymaster.unlock_token_deposit(self.state, self.env, caller);
            }
            ITokenPaymasterCalls::withdrawTokensTo(call) => {
                paymaster.withdraw_tokens_to(
                    self.state,
                    self.env,
                    caller,
                    call.token,
                    call.target,
                    call.amount,
                )?;
            }
        }
        Ok(Bytes::new())
    }

    fn dispatch_token(
        &mut self,
        token: Address,
        caller: Address,
        data: &Bytes,
    ) -> Result<Bytes, CallError> {
        let call = IERC20Calls::abi_decode(data, true).map_err(|_| unknown_selector(data))?;
        match call {
            IERC20Calls::balanceOf(call) => {
                return Ok(self.state.tokens.balance_of(token, call.account).abi_encode().into());
            }
            IERC20Calls::allowance(call) => {
                let allowance = self.state.tokens.allowance(token, call.owner, call.spender);
                return Ok(allowance.abi_encode().into());
            }
            _ => {}
        }

        self.charge(self.config.gas.storage_write)?;
        match call {
            IERC20Calls::transfer(call) => {
                self.state.token_transfer(token, caller, call.to, call.amount)?;
            }
            IERC20Calls::approve(call) => {
                self.state.token_approve(token, caller, call.spender, call.amount)?;
            }
            IERC20Calls::transferFrom(call) => {
                self.state.token_transfer_from(token, caller, call.from, call.to, call.amount)?;
            }
            IERC20Calls::balanceOf(_) | IERC20Calls::allowance(_) => {}
        }
        Ok(true.abi_encode().into())
    }
}
