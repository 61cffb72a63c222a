//! Command-line driver for the relay settlement engine.
//!
//! A scenario file describes the engine configuration, the fee payers and factories to register,
//! and a list of steps: funding, ledger transactions, token deposits and operation batches. The
//! `run` command executes the steps in order and reports each outcome as JSON.

mod cmd;
pub use cmd::*;

pub mod address;
pub mod common;
pub mod hash;
pub mod run;
