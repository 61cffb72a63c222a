use clap::Parser;

/// Main command enumeration for the relay-settle CLI tool
#[derive(Parser, Debug)]
#[command(infer_subcommands = true, version = "0.1")]
pub enum MainCmd {
    /// Execute a scenario file and report every step
    Run(crate::run::Cmd),
    /// Compute the hash of an operation
    Hash(crate::hash::Cmd),
    /// Compute the counterfactual address of an account
    Address(crate::address::Cmd),
}

/// Error types for the main command system
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Custom error with static message
    #[error("Custom error: {0}")]
    Custom(&'static str),
    /// Error raised by a subcommand
    #[error("{0}")]
    Settle(#[from] crate::common::SettleError),
}

impl MainCmd {
    /// Execute the main command
    pub fn run(&self) -> Result<(), Error> {
        match self {
            Self::Run(cmd) => cmd.run()?,
            Self::Hash(cmd) => cmd.run()?,
            Self::Address(cmd) => cmd.run()?,
        }
        Ok(())
    }
}
