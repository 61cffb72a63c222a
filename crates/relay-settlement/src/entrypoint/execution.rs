//! The execution phase: forwarded call, post-op settlement and ledger reconciliation.

use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

use crate::{
    interfaces::IEntryPoint, CallContext, Funding, PostOpMode, RejectReason, UserOperation,
    ValidatedOp,
};

/// Result of executing a validated operation, before it is turned into a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    /// Whether the forwarded call succeeded and its effects were kept
    pub success: bool,
    /// Gas charged
    pub actual_gas_used: U256,
    /// Cost charged to the funder
    pub actual_gas_cost: U256,
    /// Token cost charged by the fee payer
    pub token_cost: Option<U256>,
}

impl CallContext<'_> {
    /// Executes the call of a validated operation and settles its cost: the funder is refunded
    /// the unused prefund and `beneficiary` is credited the actual cost.
    pub fn execute_op(
        &mut self,
        op: &UserOperation,
        validated: &ValidatedOp,
        beneficiary: Address,
    ) -> Result<Executed, RejectReason> {
        let entry_point = self.entry_point();
        let checkpoint = self.state.checkpoint();
        let call_gas_limit = op.call_gas_limit.saturating_to::<u64>();
        let (result, call_gas) = self.with_gas_limit(call_gas_limit, |ctx| {
            ctx.call(entry_point, op.sender, U256::ZERO, &op.call_data)
        });

        let mut mode = match &result {
            Ok(_) => PostOpMode::OpSucceeded,
            Err(err) => {
                debug!(target: "relay_settlement::execution", user_op_hash = %validated.user_op_hash, %err, "call reverted");
                self.state.emit(
                    entry_point,
                    &IEntryPoint::UserOperationRevertReason {
                        userOpHash: validated.user_op_hash,
                        sender: op.sender,
                        nonce: op.nonce,
                        revertReason: err.revert_data(),
                    },
                );
                PostOpMode::OpReverted
            }
        };

        let post_op_gas = match &validated.funding {
            Funding::SelfFunded => 0,
            Funding::Sponsored(context) => self
                .paymasters
                .get(&context.paymaster)
                .map_or(0, |paymaster| paymaster.config().cost_of_post),
        };
        let actual_gas_used =
            validated.pre_op_gas + U256::from(call_gas) + U256::from(post_op_gas);
        let actual_gas_cost = actual_gas_used.saturating_mul(validated.gas_price);
        if actual_gas_cost > validated.prefund {
            self.state.checkpoint_revert(checkpoint);
            return Err(RejectReason::PrefundBelowActualGasCost);
        }

        let token_cost = match &validated.funding {
            Funding::SelfFunded => {
                self.state.checkpoint_commit(checkpoint);
                None
            }
            Funding::Sponsored(context) => {
                let paymasters = self.paymasters;
                let paymaster = paymasters
                    .get(&context.paymaster)
                    .ok_or(RejectReason::PaymasterNotDeployed(context.paymaster))?;
                match paymaster.settle(self.state, context, mode, actual_gas_cost) {
                    Ok(cost) => {
                        self.state.checkpoint_commit(checkpoint);
                        Some(cost)
                    }
                    Err(err) => {
                        warn!(
                            target: "relay_settlement::execution",
                            user_op_hash = %validated.user_op_hash,
                            %err,
                            "post-op settlement failed, retrying against the deposit"
                        );
                        self.state.checkpoint_revert(checkpoint);
                        mode = PostOpMode::PostOpReverted;
                        let cost = paymaster
                            .settle(self.state, context, mode, actual_gas_cost)
                            .map_err(RejectReason::PostOpReverted)?;
                        Some(cost)
                    }
                }
            }
        };
        let success = mode == PostOpMode::OpSucceeded;

        let refund = validated.prefund - actual_gas_cost;
        let funder = validated.funding.funder(op.sender);
        self.state.ledger.increment_deposit(funder, refund).map_err(RejectReason::SettlementFailed)?;
        self.state
            .ledger
            .increment_deposit(beneficiary, actual_gas_cost)
            .map_err(RejectReason::SettlementFailed)?;

        self.state.emit(
            entry_point,
            &IEntryPoint::UserOperationEvent {
                userOpHash: validated.user_op_hash,
                sender: op.sender,
                paymaster: validated.funding.paymaster().unwrap_or_default(),
                nonce: op.nonce,
                success,
                actualGasCost: actual_gas_cost,
                actualGasUsed: actual_gas_used,
            },
        );
        debug!(
            target: "relay_settlement::execution",
            user_op_hash = %validated.user_op_hash,
            success,
            %actual_gas_used,
            %actual_gas_cost,
            %refund,
            "operation settled"
        );
        Ok(Executed { success, actual_gas_used, actual_gas_cost, token_cost })
    }
}
