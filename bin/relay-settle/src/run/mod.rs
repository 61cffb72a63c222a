//! Run module for executing scenario files
//!
//! A scenario registers contracts, then applies its steps one by one. Every step is reported:
//! ledger transactions with their return value or error code, batches with a receipt or a
//! rejection per operation.

mod cmd;
mod executor;
mod report;
mod scenario;

pub use cmd::*;
pub use report::*;
pub use scenario::*;
