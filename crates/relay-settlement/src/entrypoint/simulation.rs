//! Dry-run entry points. Every state change they make is discarded before returning.

use alloy_primitives::{Address, Bytes, U256};
use tracing::debug;

use crate::{
    EntryPoint, ExecutionResult, FailedOp, Funding, ReturnInfo, UserOperation, ValidationResult,
};

impl EntryPoint {
    /// Runs the validation phase of `op` and reports its outcome. Signature failures and
    /// validity windows are reported, not rejected.
    pub fn simulate_validation(&mut self, op: &UserOperation) -> Result<ValidationResult, FailedOp> {
        let checkpoint = self.state.checkpoint();
        let mut ctx = self.context(u64::MAX);
        let outcome = ctx.validate_op(op).map(|validated| {
            let data = validated.validation_data();
            let ledger = &ctx.state.ledger;
            ValidationResult {
                sender_info: ledger.stake_info(op.sender),
                factory_info: validated.factory.map(|factory| ledger.stake_info(factory)),
                paymaster_info: validated.funding.paymaster().map(|pm| ledger.stake_info(pm)),
                return_info: ReturnInfo {
                    pre_op_gas: validated.pre_op_gas,
                    prefund: validated.prefund,
                    sig_failed: data.sig_failed,
                    valid_after: data.valid_after,
                    valid_until: data.valid_until,
                    paymaster_context: match validated.funding {
                        Funding::SelfFunded => None,
                        Funding::Sponsored(context) => Some(context),
                    },
                },
            }
        });
        self.state.checkpoint_revert(checkpoint);
        debug!(target: "relay_settlement::simulation", sender = %op.sender, ok = outcome.is_ok(), "validation simulated");
        outcome.map_err(|reason| FailedOp::new(0, reason))
    }

    /// Runs the full pipeline for `op`, then calls `target` with `target_call_data` if a target
    /// is given, and reports the outcome.
    pub fn simulate_handle_op(
        &mut self,
        op: &UserOperation,
        target: Option<Address>,
        target_call_data: Bytes,
    ) -> Result<ExecutionResult, FailedOp> {
        let checkpoint = self.state.checkpoint();
        let entry_point = self.address();
        let mut ctx = self.context(u64::MAX);
        let outcome = ctx.validate_op(op).and_then(|validated| {
            let data = validated.validation_data();
            let executed = ctx.execute_op(op, &validated, entry_point)?;
            let (target_success, target_result) = match target {
                Some(target) => {
                    match ctx.call(entry_point, target, U256::ZERO, &target_call_data) {
                        Ok(output) => (true, output),
                        Err(err) => (false, err.revert_data()),
                    }
                }
                None => (false, Bytes::new()),
            };
            Ok(ExecutionResult {
                pre_op_gas: validated.pre_op_gas,
                paid: executed.actual_gas_cost,
                valid_after: data.valid_after,
                valid_until: data.valid_until,
                target_success,
                target_result,
            })
        });
        self.state.checkpoint_revert(checkpoint);
        debug!(target: "relay_settlement::simulation", sender = %op.sender, ok = outcome.is_ok(), "execution simulated");
        outcome.map_err(|reason| FailedOp::new(0, reason))
    }
}
