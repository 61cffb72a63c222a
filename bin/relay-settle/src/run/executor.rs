//! Drives the engine through the steps of a scenario.

use std::{collections::BTreeMap, sync::Arc};

use alloy_primitives::{Address, U256};
use relay_settlement::{
    EntryPoint, SimpleAccountFactory, TokenPaymaster, TokenPriceOracle, UserOperation,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{AccountReport, Failure, OpOutcome, Report, Scenario, ScenarioOp, Step, StepReport};
use crate::common::{Result, SettleError};

type StepResult = std::result::Result<Value, Failure>;

/// Serializes the return value of a step, or converts its error.
fn output<T: Serialize, E: Into<Failure>>(result: std::result::Result<T, E>) -> Result<StepResult> {
    match result {
        Ok(value) => Ok(Ok(serde_json::to_value(value)?)),
        Err(err) => Ok(Err(err.into())),
    }
}

impl Scenario {
    /// Builds the engine with every factory, token and fee payer of the scenario registered.
    pub fn setup(&self) -> Result<EntryPoint> {
        let config = self.entry_point.clone();
        let mut entry_point = EntryPoint::new(config.clone()).with_env(self.block);

        for &factory in &self.factories {
            entry_point.register_factory(Arc::new(SimpleAccountFactory::new(factory, config.address)));
        }
        for &token in &self.tokens {
            entry_point.deploy_token(token);
        }
        for setup in &self.paymasters {
            let oracle = Arc::new(TokenPriceOracle::new(setup.owner));
            let mut paymaster = TokenPaymaster::new(setup.address, setup.owner, setup.config);
            for price in &setup.tokens {
                entry_point.deploy_token(price.token);
                oracle
                    .set_fixed_price(setup.owner, price.token, price.price)
                    .map_err(|err| SettleError::Setup(err.to_string()))?;
                paymaster
                    .add_token(setup.owner, price.token, oracle.clone())
                    .map_err(|err| SettleError::Setup(err.to_string()))?;
            }
            entry_point.register_paymaster(paymaster);
        }

        debug!(
            target: "relay_settle::run",
            factories = self.factories.len(),
            tokens = self.tokens.len(),
            paymasters = self.paymasters.len(),
            "scenario set up"
        );
        Ok(entry_point)
    }

    /// Runs every step and reports its outcome. A failing step does not stop the run.
    pub fn execute(&self) -> Result<Report> {
        let mut entry_point = self.setup()?;
        let mut steps = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let result = self.apply(&mut entry_point, step)?;
            let logs = entry_point.take_logs();
            let (output, error) = match result {
                Ok(output) => (Some(output), None),
                Err(failure) => {
                    warn!(target: "relay_settle::run", index, action = step.action(), code = %failure.code, "step failed");
                    (None, Some(failure))
                }
            };
            steps.push(StepReport { index, action: step.action(), output, error, logs });
        }

        let report = Report {
            entry_point: entry_point.address(),
            chain_id: entry_point.config().chain_id,
            block: *entry_point.env(),
            steps,
            accounts: self.watched(&entry_point),
        };
        info!(target: "relay_settle::run", steps = report.steps.len(), failed = report.failed_steps(), "scenario finished");
        Ok(report)
    }

    fn apply(&self, entry_point: &mut EntryPoint, step: &Step) -> Result<StepResult> {
        debug!(target: "relay_settle::run", action = step.action(), "applying step");
        match step {
            Step::Fund { account, amount } => {
                output(entry_point.state_mut().native.mint(*account, *amount))
            }
            Step::MintTokens { token, account, amount } => {
                output(entry_point.state_mut().token_mint(*token, *account, *amount))
            }
            Step::Approve { token, owner, spender, amount } => {
                output(entry_point.state_mut().token_approve(*token, *owner, *spender, *amount))
            }
            Step::DepositTo { caller, account, amount } => {
                output(entry_point.deposit_to(*caller, *account, *amount))
            }
            Step::WithdrawTo { caller, destination, amount } => {
                output(entry_point.withdraw_to(*caller, *destination, *amount))
            }
            Step::AddStake { caller, unstake_delay_sec, amount } => {
                output(entry_point.add_stake(*caller, *unstake_delay_sec, *amount))
            }
            Step::UnlockStake { caller } => output(entry_point.unlock_stake(*caller)),
            Step::WithdrawStake { caller, destination } => {
                output(entry_point.withdraw_stake(*caller, *destination))
            }
            Step::CreateAccount { caller, factory, owner, salt } => {
                output(entry_point.create_account(*caller, *factory, *owner, *salt))
            }
            Step::AddTokenDeposit { caller, paymaster, token, payer, amount } => {
                output(entry_point.add_deposit_for(*caller, *paymaster, *token, *payer, *amount))
            }
            Step::LockTokenDeposit { caller, paymaster } => {
                output(entry_point.lock_token_deposit(*caller, *paymaster))
            }
            Step::UnlockTokenDeposit { caller, paymaster } => {
                output(entry_point.unlock_token_deposit(*caller, *paymaster))
            }
            Step::WithdrawTokens { caller, paymaster, token, target, amount } => output(
                entry_point.withdraw_tokens_to(*caller, *paymaster, *token, *target, *amount),
            ),
            Step::PaymasterDeposit { caller, paymaster, amount } => {
                output(entry_point.paymaster_deposit(*caller, *paymaster, *amount))
            }
            Step::Advance { blocks, seconds } => {
                let env = entry_point.env_mut();
                env.mine(*blocks);
                env.advance_time(*seconds);
                output(Ok::<_, Failure>(*env))
            }
            Step::HandleOps { beneficiary, ops } => {
                let ops = match resolve_all(entry_point, ops) {
                    Ok(ops) => ops,
                    Err(err) => return Ok(Err(err.into())),
                };
                let outcomes: Vec<OpOutcome> = entry_point
                    .handle_ops(&ops, *beneficiary)
                    .into_iter()
                    .map(OpOutcome::from)
                    .collect();
                output(Ok::<_, Failure>(outcomes))
            }
            Step::SimulateValidation { op } => match op.resolve(entry_point.config()) {
                Ok(op) => output(entry_point.simulate_validation(&op)),
                Err(err) => Ok(Err(err.into())),
            },
            Step::SimulateHandleOp { op, target, target_call_data } => {
                match op.resolve(entry_point.config()) {
                    Ok(op) => output(entry_point.simulate_handle_op(
                        &op,
                        *target,
                        target_call_data.clone(),
                    )),
                    Err(err) => Ok(Err(err.into())),
                }
            }
        }
    }

    fn watched(&self, entry_point: &EntryPoint) -> BTreeMap<Address, AccountReport> {
        let state = entry_point.state();
        self.watch
            .iter()
            .map(|&address| {
                let tokens = self
                    .tokens
                    .iter()
                    .chain(self.paymasters.iter().flat_map(|setup| setup.tokens.iter().map(|p| &p.token)))
                    .map(|&token| (token, state.tokens.balance_of(token, address)))
                    .collect();
                let report = AccountReport {
                    balance: state.native.balance(address),
                    deposit: entry_point.deposit_info(address),
                    nonce: entry_point.get_nonce(address, U256::ZERO),
                    deployed: state.accounts.has_code(address),
                    tokens,
                };
                (address, report)
            })
            .collect()
    }
}

/// Signs every operation of a batch; fails if any signing key is invalid.
fn resolve_all(entry_point: &EntryPoint, ops: &[ScenarioOp]) -> Result<Vec<UserOperation>> {
    ops.iter().map(|op| op.resolve(entry_point.config())).collect()
}
