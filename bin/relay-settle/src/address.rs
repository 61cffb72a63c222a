//! Address module for computing counterfactual account addresses.

use alloy_primitives::{Address, Bytes, U256};
use clap::Parser;
use relay_settlement::{
    constants::DEFAULT_ENTRY_POINT_ADDRESS, AccountFactory, SimpleAccountFactory,
};
use serde::Serialize;

use crate::common::{write_json, Result};

/// Compute the address an account will be deployed at
#[derive(Parser, Debug)]
pub struct Cmd {
    /// The account factory
    #[arg(long = "factory")]
    pub factory: Address,

    /// Owner of the account
    #[arg(long = "owner")]
    pub owner: Address,

    /// Deployment salt
    #[arg(long = "salt", default_value = "0")]
    pub salt: U256,

    /// Entry point the account trusts
    #[arg(long = "entry-point", default_value_t = DEFAULT_ENTRY_POINT_ADDRESS)]
    pub entry_point: Address,
}

/// A counterfactual account and the payload deploying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterfactualAccount {
    /// Address the account will have
    pub address: Address,
    /// `initCode` deploying it through the factory
    pub init_code: Bytes,
}

impl Cmd {
    /// Execute the address command
    pub fn run(&self) -> Result<()> {
        write_json(&self.compute(), None)
    }

    /// The account of `(owner, salt)` at the configured factory.
    pub fn compute(&self) -> CounterfactualAccount {
        let factory = SimpleAccountFactory::new(self.factory, self.entry_point);
        CounterfactualAccount {
            address: factory.deterministic_address(self.owner, self.salt),
            init_code: factory.init_code(self.owner, self.salt),
        }
    }
}
