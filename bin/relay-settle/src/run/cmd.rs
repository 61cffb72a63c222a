use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use super::Scenario;
use crate::common::{load_json, write_json, LogArgs, Result};

/// Execute a scenario file
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Scenario file. If '-' is specified, the scenario is read from stdin
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Output file for the report (if not specified, prints to console)
    #[arg(long = "output", short = 'o')]
    pub output: Option<PathBuf>,

    /// Chain id overriding the one in the scenario
    #[arg(long = "chain-id", env = "RELAY_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Token unlock delay in blocks, overriding every fee payer's configuration
    #[arg(long = "token-unlock-delay", visible_aliases = ["unlock-delay"])]
    pub token_unlock_delay: Option<u64>,

    /// Logging configuration
    #[command(flatten)]
    pub log_args: LogArgs,
}

impl Cmd {
    /// Execute the run command
    pub fn run(&self) -> Result<()> {
        self.log_args.init()?;
        let scenario = self.load()?;
        info!(target: "relay_settle::run", path = %self.scenario.display(), steps = scenario.steps.len(), "running scenario");
        let report = scenario.execute()?;
        write_json(&report, self.output.as_deref())
    }

    /// Loads the scenario and applies the command-line overrides.
    pub fn load(&self) -> Result<Scenario> {
        let mut scenario: Scenario = load_json(&self.scenario)?;
        if let Some(chain_id) = self.chain_id {
            scenario.entry_point.chain_id = chain_id;
        }
        if let Some(delay) = self.token_unlock_delay {
            for paymaster in &mut scenario.paymasters {
                paymaster.config.token_unlock_delay_blocks = delay;
            }
        }
        Ok(scenario)
    }
}
