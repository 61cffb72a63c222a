//! Test utilities for the settlement engine.

mod fixture;
mod op_builder;
mod quoter;

pub use fixture::*;
pub use op_builder::*;
pub use quoter::*;
