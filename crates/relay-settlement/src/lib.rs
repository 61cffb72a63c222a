//! Validation and settlement engine for sponsored operations.
//!
//! A relayer submits signed [`UserOperation`]s to the [`EntryPoint`], which validates the sender,
//! optionally lets a [`TokenPaymaster`] sponsor the cost against a token deposit, forwards the
//! call to the sender's [`AccountExecutor`] and settles the realized cost against the
//! [`DepositLedger`] in the same unit of work.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod constants;

mod account;
pub use account::*;

mod entrypoint;
pub use entrypoint::*;

mod env;
pub use env::*;

mod error;
pub use error::*;

mod gas;
pub use gas::*;

pub mod interfaces;

mod journal;
pub use journal::*;

mod ledger;
pub use ledger::*;

mod nonce;
pub use nonce::*;

mod oracle;
pub use oracle::*;

mod paymaster;
pub use paymaster::*;

mod state;
pub use state::*;

#[cfg(feature = "test-utils")]
pub mod test_utils;

mod types;
pub use types::*;
