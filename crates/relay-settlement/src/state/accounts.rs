use std::sync::Arc;

use alloy_primitives::Address;

use crate::{AccountExecutor, JournaledMap};

/// Deployed accounts, keyed by address. An address has code iff it is registered here.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: JournaledMap<Address, Arc<dyn AccountExecutor>>,
}

impl AccountRegistry {
    /// Whether an account is deployed at `address`.
    pub fn has_code(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    /// The account deployed at `address`.
    pub fn get(&self, address: Address) -> Option<Arc<dyn AccountExecutor>> {
        self.accounts.get(&address).cloned()
    }

    /// Deploys `account` at its own address.
    pub fn install(&mut self, account: Arc<dyn AccountExecutor>) {
        self.accounts.insert(account.address(), account);
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.accounts.checkpoint()
    }

    pub(crate) fn revert_to(&mut self, checkpoint: usize) {
        self.accounts.revert_to(checkpoint);
    }

    pub(crate) fn clear_journal(&mut self) {
        self.accounts.clear_journal();
    }
}
