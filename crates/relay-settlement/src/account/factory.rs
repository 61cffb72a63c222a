use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use tracing::debug;

use crate::{
    interfaces::IAccountFactory, AccountFactory, CallContext, CallError, SimpleAccount,
};

/// Deploys [`SimpleAccount`]s at CREATE2 addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleAccountFactory {
    address: Address,
    entry_point: Address,
}

impl SimpleAccountFactory {
    /// Creates a factory at `address` whose accounts trust `entry_point`.
    pub const fn new(address: Address, entry_point: Address) -> Self {
        Self { address, entry_point }
    }

    /// Deployment payload of the account of `(owner, salt)`: the factory address followed by the
    /// `createAccount` call.
    pub fn init_code(&self, owner: Address, salt: U256) -> Bytes {
        let call = IAccountFactory::createAccountCall { owner, salt }.abi_encode();
        let mut init_code = Vec::with_capacity(20 + call.len());
        init_code.extend_from_slice(self.address.as_slice());
        init_code.extend_from_slice(&call);
        init_code.into()
    }

    fn init_code_hash(&self, owner: Address) -> B256 {
        keccak256((self.entry_point, owner).abi_encode())
    }
}

impl AccountFactory for SimpleAccountFactory {
    fn address(&self) -> Address {
        self.address
    }

    fn deterministic_address(&self, owner: Address, salt: U256) -> Address {
        self.address.create2(B256::from(salt), self.init_code_hash(owner))
    }

    fn deploy(
        &self,
        ctx: &mut CallContext<'_>,
        owner: Address,
        salt: U256,
    ) -> Result<Address, CallError> {
        let account = self.deterministic_address(owner, salt);
        if ctx.state.accounts.has_code(account) {
            return Ok(account);
        }
        ctx.charge(ctx.config.gas.account_deployment)?;
        ctx.state.accounts.install(Arc::new(SimpleAccount::new(account, owner, self.entry_point)));
        ctx.state.emit(self.address, &IAccountFactory::AccountCreated { account, owner, salt });
        debug!(target: "relay_settlement::account", %account, %owner, %salt, "account created");
        Ok(account)
    }
}
