//! The validation phase: sender creation, account authorization, nonce, prefund reservation and
//! fee payer sponsorship.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use tracing::debug;

use crate::{
    interfaces::{IAccountFactory, IEntryPoint},
    AccountError, CallContext, FeePayerDescriptor, Funding, GasMeter, RejectReason,
    UserOperation, ValidatedOp, ValidationData,
};

impl CallContext<'_> {
    /// Validates `op` and reserves its prefund from the funder's deposit.
    ///
    /// Signature and validity window failures are reported in the returned
    /// [`ValidationData`]; callers executing for real must reject them with
    /// [`ValidatedOp::check_live`].
    pub fn validate_op(&mut self, op: &UserOperation) -> Result<ValidatedOp, RejectReason> {
        if !op.gas_values_in_range() {
            return Err(RejectReason::GasValuesOverflow);
        }
        let descriptor = FeePayerDescriptor::parse(&op.paymaster_and_data)?;
        let paymasters = self.paymasters;
        let paymaster = match &descriptor {
            Some(descriptor) => {
                let paymaster = paymasters
                    .get(&descriptor.paymaster)
                    .ok_or(RejectReason::PaymasterNotDeployed(descriptor.paymaster))?;
                if let Some(token) = descriptor.token.filter(|token| !paymaster.supports(*token)) {
                    return Err(RejectReason::UnsupportedToken(token));
                }
                Some(paymaster)
            }
            None => None,
        };

        let user_op_hash = op.hash(self.entry_point(), self.config.chain_id);
        let gas_price = op.gas_price(self.env.basefee);
        let prefund = op.required_prefund();
        let verification_gas_limit = op.verification_gas_limit.saturating_to::<u64>();
        if verification_gas_limit == 0 {
            return Err(RejectReason::AccountValidationReverted(
                AccountError::ZeroVerificationGasLimit,
            ));
        }
        debug!(
            target: "relay_settlement::validation",
            %user_op_hash,
            sender = %op.sender,
            %prefund,
            sponsored = paymaster.is_some(),
            "validating operation"
        );

        let paymaster_address = descriptor.as_ref().map(|descriptor| descriptor.paymaster);
        let (account_validation, account_gas) =
            self.with_gas_limit(verification_gas_limit, |ctx| {
                ctx.validate_account(op, user_op_hash, prefund, paymaster_address)
            });
        let account_validation = account_validation?;

        let (funding, paymaster_validation, paymaster_gas) = match (paymaster, descriptor) {
            (Some(paymaster), Some(descriptor)) => {
                let deposit = self.state.ledger.balance_of(paymaster.address());
                if deposit < prefund {
                    return Err(RejectReason::PaymasterDepositTooLow { required: prefund, deposit });
                }
                self.state
                    .ledger
                    .debit(paymaster.address(), prefund)
                    .map_err(RejectReason::SettlementFailed)?;

                let mut meter = GasMeter::new(verification_gas_limit);
                meter
                    .charge(self.config.gas.paymaster_validation)
                    .map_err(|_| RejectReason::PaymasterOverVerificationGasLimit)?;
                let (context, validation) = paymaster
                    .validate_sponsorship(self.state, op, &descriptor, gas_price, prefund)
                    .map_err(RejectReason::PaymasterValidationReverted)?;
                (Funding::Sponsored(context), validation, meter.used())
            }
            _ => (Funding::SelfFunded, ValidationData::valid(), 0),
        };

        let pre_op_gas =
            U256::from(account_gas) + U256::from(paymaster_gas) + op.pre_verification_gas;
        debug!(
            target: "relay_settlement::validation",
            %user_op_hash,
            %pre_op_gas,
            sig_failed = account_validation.sig_failed,
            "operation validated"
        );
        Ok(ValidatedOp {
            user_op_hash,
            prefund,
            gas_price,
            pre_op_gas,
            funding,
            account_validation,
            paymaster_validation,
            factory: op.factory(),
        })
    }

    /// Deploys the sender if needed, runs its authorization check, reserves a self-funded
    /// prefund and consumes the nonce. Runs against the verification gas meter.
    fn validate_account(
        &mut self,
        op: &UserOperation,
        user_op_hash: B256,
        prefund: U256,
        paymaster: Option<Address>,
    ) -> Result<ValidationData, RejectReason> {
        if !op.init_code.is_empty() {
            self.create_sender(op, user_op_hash, paymaster)?;
        }
        let account =
            self.state.accounts.get(op.sender).ok_or(RejectReason::AccountNotDeployed)?;

        let missing_account_funds = if paymaster.is_none() {
            prefund.saturating_sub(self.state.ledger.balance_of(op.sender))
        } else {
            U256::ZERO
        };
        let validation = account
            .validate_user_op(self, op, user_op_hash, missing_account_funds)
            .map_err(RejectReason::AccountValidationReverted)?;

        if paymaster.is_none() {
            let deposit = self.state.ledger.balance_of(op.sender);
            if deposit < prefund {
                return Err(RejectReason::DidNotPayPrefund { required: prefund, deposit });
            }
            self.state.ledger.debit(op.sender, prefund).map_err(RejectReason::SettlementFailed)?;
        }

        self.charge(self.config.gas.nonce_update)
            .map_err(|_| RejectReason::OverVerificationGasLimit)?;
        if !self.state.nonces.validate_and_update(op.sender, op.nonce) {
            return Err(RejectReason::InvalidAccountNonce);
        }
        Ok(validation)
    }

    /// Deploys the sender through the factory named in the deployment payload.
    fn create_sender(
        &mut self,
        op: &UserOperation,
        user_op_hash: B256,
        paymaster: Option<Address>,
    ) -> Result<(), RejectReason> {
        if self.state.accounts.has_code(op.sender) {
            return Err(RejectReason::SenderAlreadyConstructed);
        }
        let factory = op
            .factory()
            .ok_or_else(|| RejectReason::InitCodeFailed("initCode too short".to_string()))?;
        let output = self
            .call(self.entry_point(), factory, U256::ZERO, &op.init_code.slice(20..))
            .map_err(|err| RejectReason::InitCodeFailed(err.to_string()))?;
        let deployed = IAccountFactory::createAccountCall::abi_decode_returns(&output, true)
            .map_err(|_| RejectReason::InitCodeFailed("factory returned no address".to_string()))?
            .ret;
        if deployed != op.sender {
            return Err(RejectReason::InitCodeMustReturnSender { deployed });
        }
        if !self.state.accounts.has_code(op.sender) {
            return Err(RejectReason::InitCodeMustCreateSender);
        }

        let entry_point = self.entry_point();
        self.state.emit(
            entry_point,
            &IEntryPoint::AccountDeployed {
                userOpHash: user_op_hash,
                sender: op.sender,
                factory,
                paymaster: paymaster.unwrap_or_default(),
            },
        );
        debug!(target: "relay_settlement::validation", sender = %op.sender, %factory, "sender deployed");
        Ok(())
    }
}

impl ValidatedOp {
    /// The account's and fee payer's outcomes combined.
    pub fn validation_data(&self) -> ValidationData {
        self.account_validation.intersect(self.paymaster_validation)
    }

    /// Rejects signature failures and operations outside their validity window.
    pub fn check_live(self, timestamp: u64) -> Result<Self, RejectReason> {
        if self.account_validation.sig_failed {
            return Err(RejectReason::SignatureError);
        }
        if self.account_validation.is_out_of_range(timestamp) {
            return Err(RejectReason::ExpiredOrNotDue);
        }
        if self.paymaster_validation.sig_failed ||
            self.paymaster_validation.is_out_of_range(timestamp)
        {
            return Err(RejectReason::PaymasterExpiredOrNotDue);
        }
        Ok(self)
    }
}
