//! Sender accounts and their factories.

use core::fmt::Debug;

use alloy_primitives::{Address, Bytes, B256, U256};
use auto_impl::auto_impl;

use crate::{AccountError, CallContext, CallError, UserOperation, ValidationData};

mod factory;
pub use factory::*;

mod simple;
pub use simple::*;

/// A deployed sender account.
#[auto_impl(&, Box, Arc)]
pub trait AccountExecutor: Debug + Send + Sync {
    /// Address the account is deployed at.
    fn address(&self) -> Address;

    /// The key holder authorized to sign for and call the account.
    fn owner(&self) -> Address;

    /// Checks that `op` is authorized and pays `missing_account_funds` to the entry point.
    ///
    /// A signature mismatch is reported through [`ValidationData::sig_failed`]; any other failure
    /// is an error.
    fn validate_user_op(
        &self,
        ctx: &mut CallContext<'_>,
        op: &UserOperation,
        user_op_hash: B256,
        missing_account_funds: U256,
    ) -> Result<ValidationData, AccountError>;

    /// Handles a call to the account made by `caller`. Empty `data` only receives value.
    fn execute(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Address,
        data: &Bytes,
    ) -> Result<Bytes, CallError>;
}

/// Deploys accounts at addresses derived from `(owner, salt)`.
#[auto_impl(&, Box, Arc)]
pub trait AccountFactory: Debug + Send + Sync {
    /// Address of the factory.
    fn address(&self) -> Address;

    /// The address `deploy(owner, salt)` deploys to.
    fn deterministic_address(&self, owner: Address, salt: U256) -> Address;

    /// Deploys the account of `(owner, salt)`. If it is already deployed the existing address is
    /// returned and nothing is emitted.
    fn deploy(
        &self,
        ctx: &mut CallContext<'_>,
        owner: Address,
        salt: U256,
    ) -> Result<Address, CallError>;
}
