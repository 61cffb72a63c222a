//! The validation and execution orchestrator.
//!
//! [`EntryPoint::handle_ops`] runs each operation through validation, execution and settlement
//! under its own checkpoint. A rejected operation leaves no trace, except that a rejection after
//! validation still consumes the nonce. Dry-run entry points always discard their effects.

use std::sync::Arc;

use alloy_primitives::{map::HashMap, Address, Bytes, Log, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, info, warn};

use crate::{
    interfaces::IAccountFactory, AccountExecutor, AccountFactory, BlockEnv, CallError,
    DepositInfo, EntryPointConfig, FailedOp, GasMeter, LedgerError, PaymasterError,
    RejectReason, TokenDepositInfo, TokenPaymaster, UserOperation, WorldState,
};

mod context;
pub use context::*;

mod dispatch;

mod execution;
pub use execution::*;

mod result;
pub use result::*;

mod simulation;

mod stake;

mod validation;

/// The settlement engine: the ledger, every registered fee payer and factory, and the world
/// state they operate on.
#[derive(Debug)]
pub struct EntryPoint {
    config: EntryPointConfig,
    env: BlockEnv,
    state: WorldState,
    paymasters: HashMap<Address, TokenPaymaster>,
    factories: HashMap<Address, Arc<dyn AccountFactory>>,
}

impl EntryPoint {
    /// Creates an entry point with an empty state.
    pub fn new(config: EntryPointConfig) -> Self {
        Self {
            config,
            env: BlockEnv::default(),
            state: WorldState::new(),
            paymasters: HashMap::default(),
            factories: HashMap::default(),
        }
    }

    /// Sets the block environment.
    pub fn with_env(mut self, env: BlockEnv) -> Self {
        self.env = env;
        self
    }

    /// Address of the entry point.
    pub const fn address(&self) -> Address {
        self.config.address
    }

    /// Configuration.
    pub const fn config(&self) -> &EntryPointConfig {
        &self.config
    }

    /// Current block.
    pub const fn env(&self) -> &BlockEnv {
        &self.env
    }

    /// Mutable access to the current block.
    pub const fn env_mut(&mut self) -> &mut BlockEnv {
        &mut self.env
    }

    /// World state.
    pub const fn state(&self) -> &WorldState {
        &self.state
    }

    /// Mutable access to the world state, for genesis setup.
    pub const fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    /// Registers a fee payer.
    pub fn register_paymaster(&mut self, paymaster: TokenPaymaster) {
        debug!(target: "relay_settlement::entrypoint", paymaster = %paymaster.address(), "paymaster registered");
        self.paymasters.insert(paymaster.address(), paymaster);
    }

    /// The fee payer at `address`.
    pub fn paymaster(&self, address: Address) -> Option<&TokenPaymaster> {
        self.paymasters.get(&address)
    }

    /// Mutable access to the fee payer at `address`, for token administration.
    pub fn paymaster_mut(&mut self, address: Address) -> Option<&mut TokenPaymaster> {
        self.paymasters.get_mut(&address)
    }

    /// Registers an account factory.
    pub fn register_factory(&mut self, factory: Arc<dyn AccountFactory>) {
        self.factories.insert(factory.address(), factory);
    }

    /// Registers an ERC-20 token at `token`.
    pub fn deploy_token(&mut self, token: Address) {
        self.state.tokens.register(token);
    }

    /// Deploys `account` directly, without a factory.
    pub fn deploy_account(&mut self, account: Arc<dyn AccountExecutor>) {
        self.state.accounts.install(account);
    }

    /// Deposit of `account`.
    pub fn balance_of(&self, account: Address) -> U256 {
        self.state.ledger.balance_of(account)
    }

    /// Deposit and stake of `account`.
    pub fn deposit_info(&self, account: Address) -> DepositInfo {
        self.state.ledger.deposit_info(account)
    }

    /// Next nonce of `sender` for `key`.
    pub fn get_nonce(&self, sender: Address, key: U256) -> U256 {
        self.state.nonces.get_nonce(sender, key)
    }

    /// Removes and returns the logs emitted so far.
    pub fn take_logs(&mut self) -> Vec<Log> {
        self.state.take_logs()
    }

    fn context(&mut self, gas_limit: u64) -> CallContext<'_> {
        CallContext::new(
            &mut self.state,
            &self.paymasters,
            &self.factories,
            &self.config,
            &self.env,
            GasMeter::new(gas_limit),
        )
    }

    /// Runs `f` atomically: its effects are kept only if it succeeds.
    fn transact<T, E>(
        &mut self,
        f: impl FnOnce(&mut CallContext<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let checkpoint = self.state.checkpoint();
        let result = f(&mut self.context(u64::MAX));
        match result {
            Ok(_) => self.state.checkpoint_commit(checkpoint),
            Err(_) => self.state.checkpoint_revert(checkpoint),
        }
        result
    }

    /// Sends a transaction from `caller` to `to`.
    pub fn call(
        &mut self,
        caller: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes, CallError> {
        self.transact(|ctx| ctx.call(caller, to, value, &data))
    }

    /// Credits `value`, sent by `caller`, to the deposit of `account`. Anyone may fund anyone.
    pub fn deposit_to(
        &mut self,
        caller: Address,
        account: Address,
        value: U256,
    ) -> Result<U256, LedgerError> {
        let entry_point = self.address();
        self.transact(|ctx| {
            ctx.state.native.transfer(caller, entry_point, value)?;
            ctx.deposit_to(account, value)
        })
    }

    /// Withdraws `amount` of the deposit of `caller` to `destination`.
    pub fn withdraw_to(
        &mut self,
        caller: Address,
        destination: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.transact(|ctx| ctx.withdraw_to(caller, destination, amount))
    }

    /// Stakes `value`, sent by `caller`, with the given unstake delay.
    pub fn add_stake(
        &mut self,
        caller: Address,
        unstake_delay_sec: u32,
        value: U256,
    ) -> Result<DepositInfo, LedgerError> {
        let entry_point = self.address();
        self.transact(|ctx| {
            ctx.state.native.transfer(caller, entry_point, value)?;
            ctx.add_stake(caller, unstake_delay_sec, value)
        })
    }

    /// Starts the unstake delay of `caller`. Returns the earliest withdrawal time.
    pub fn unlock_stake(&mut self, caller: Address) -> Result<u64, LedgerError> {
        self.transact(|ctx| ctx.unlock_stake(caller))
    }

    /// Withdraws the unlocked stake of `caller` to `destination`.
    pub fn withdraw_stake(
        &mut self,
        caller: Address,
        destination: Address,
    ) -> Result<U256, LedgerError> {
        self.transact(|ctx| ctx.withdraw_stake(caller, destination))
    }

    /// Skips one sequence number of `caller` for `key`.
    pub fn increment_nonce(&mut self, caller: Address, key: U256) {
        let checkpoint = self.state.checkpoint();
        self.state.nonces.increment_nonce(caller, key);
        self.state.checkpoint_commit(checkpoint);
    }

    /// Deploys the account of `(owner, salt)` through `factory`, returning its address.
    pub fn create_account(
        &mut self,
        caller: Address,
        factory: Address,
        owner: Address,
        salt: U256,
    ) -> Result<Address, CallError> {
        let data = IAccountFactory::createAccountCall { owner, salt }.abi_encode();
        let output = self.call(caller, factory, U256::ZERO, data.into())?;
        IAccountFactory::createAccountCall::abi_decode_returns(&output, true)
            .map(|ret| ret.ret)
            .map_err(|err| CallError::InvalidCallData(err.to_string()))
    }

    fn paymaster_ref(&self, paymaster: Address) -> Result<&TokenPaymaster, PaymasterError> {
        self.paymasters.get(&paymaster).ok_or(PaymasterError::UnknownPaymaster(paymaster))
    }

    /// Pulls `amount` of `token` from `caller` into the deposit of `payer` at `paymaster`.
    pub fn add_deposit_for(
        &mut self,
        caller: Address,
        paymaster: Address,
        token: Address,
        payer: Address,
        amount: U256,
    ) -> Result<(), PaymasterError> {
        self.paymaster_ref(paymaster)?;
        self.transact(|ctx| {
            let paymasters = ctx.paymasters;
            let paymaster = &paymasters[&paymaster];
            paymaster.add_deposit_for(ctx.state, caller, token, payer, amount)
        })
    }

    /// Locks the token deposits of `caller` at `paymaster`.
    pub fn lock_token_deposit(
        &mut self,
        caller: Address,
        paymaster: Address,
    ) -> Result<(), PaymasterError> {
        self.paymaster_ref(paymaster)?;
        self.transact(|ctx| {
            ctx.paymasters[&paymaster].lock_token_deposit(ctx.state, caller);
            Ok(())
        })
    }

    /// Unlocks the token deposits of `caller` at `paymaster`. Returns the unlock marker.
    pub fn unlock_token_deposit(
        &mut self,
        caller: Address,
        paymaster: Address,
    ) -> Result<u64, PaymasterError> {
        self.paymaster_ref(paymaster)?;
        self.transact(|ctx| Ok(ctx.paymasters[&paymaster].unlock_token_deposit(ctx.state, ctx.env, caller)))
    }

    /// Withdraws `amount` of the unlocked `token` deposit of `caller` at `paymaster`.
    pub fn withdraw_tokens_to(
        &mut self,
        caller: Address,
        paymaster: Address,
        token: Address,
        target: Address,
        amount: U256,
    ) -> Result<(), PaymasterError> {
        self.paymaster_ref(paymaster)?;
        self.transact(|ctx| {
            ctx.paymasters[&paymaster].withdraw_tokens_to(
                ctx.state, ctx.env, caller, token, target, amount,
            )
        })
    }

    /// Token deposit of `payer` in `token` at `paymaster`.
    pub fn token_deposit_info(
        &self,
        paymaster: Address,
        token: Address,
        payer: Address,
    ) -> Result<TokenDepositInfo, PaymasterError> {
        Ok(self.paymaster_ref(paymaster)?.deposit_info(&self.state, token, payer))
    }

    /// Funds the settlement-unit deposit of `paymaster` with `value` sent by `caller`.
    pub fn paymaster_deposit(
        &mut self,
        caller: Address,
        paymaster: Address,
        value: U256,
    ) -> Result<U256, PaymasterError> {
        self.paymaster_ref(paymaster)?;
        Ok(self.deposit_to(caller, paymaster, value)?)
    }

    /// Withdraws from the settlement-unit deposit of `paymaster`. Controller only.
    pub fn paymaster_withdraw_to(
        &mut self,
        caller: Address,
        paymaster: Address,
        destination: Address,
        amount: U256,
    ) -> Result<(), PaymasterError> {
        self.paymaster_ref(paymaster)?.ensure_owner(caller)?;
        Ok(self.withdraw_to(paymaster, destination, amount)?)
    }

    /// Stakes `value`, sent by the controller, for `paymaster`.
    pub fn paymaster_add_stake(
        &mut self,
        caller: Address,
        paymaster: Address,
        unstake_delay_sec: u32,
        value: U256,
    ) -> Result<DepositInfo, PaymasterError> {
        self.paymaster_ref(paymaster)?.ensure_owner(caller)?;
        let entry_point = self.address();
        Ok(self.transact(|ctx| {
            ctx.state.native.transfer(caller, entry_point, value)?;
            ctx.add_stake(paymaster, unstake_delay_sec, value)
        })?)
    }

    /// Starts the unstake delay of `paymaster`. Controller only.
    pub fn paymaster_unlock_stake(
        &mut self,
        caller: Address,
        paymaster: Address,
    ) -> Result<u64, PaymasterError> {
        self.paymaster_ref(paymaster)?.ensure_owner(caller)?;
        Ok(self.unlock_stake(paymaster)?)
    }

    /// Withdraws the unlocked stake of `paymaster` to `destination`. Controller only.
    pub fn paymaster_withdraw_stake(
        &mut self,
        caller: Address,
        paymaster: Address,
        destination: Address,
    ) -> Result<U256, PaymasterError> {
        self.paymaster_ref(paymaster)?.ensure_owner(caller)?;
        Ok(self.withdraw_stake(paymaster, destination)?)
    }

    /// Validates, executes and settles every operation in order, crediting `beneficiary` with
    /// each cost. A rejected operation does not affect the others.
    pub fn handle_ops(
        &mut self,
        ops: &[UserOperation],
        beneficiary: Address,
    ) -> Vec<Result<OpReceipt, FailedOp>> {
        info!(target: "relay_settlement::entrypoint", ops = ops.len(), %beneficiary, "handling operations");
        ops.iter().enumerate().map(|(index, op)| self.handle_op_at(index, op, beneficiary)).collect()
    }

    /// Validates, executes and settles a single operation.
    pub fn handle_op(
        &mut self,
        op: &UserOperation,
        beneficiary: Address,
    ) -> Result<OpReceipt, FailedOp> {
        self.handle_op_at(0, op, beneficiary)
    }

    fn handle_op_at(
        &mut self,
        op_index: usize,
        op: &UserOperation,
        beneficiary: Address,
    ) -> Result<OpReceipt, FailedOp> {
        if beneficiary.is_zero() {
            return Err(FailedOp::new(op_index, RejectReason::InvalidBeneficiary));
        }
        let first_log = self.state.logs().len();
        let checkpoint = self.state.checkpoint();
        let timestamp = self.env.timestamp;

        let mut ctx = self.context(u64::MAX);
        let outcome = ctx
            .validate_op(op)
            .and_then(|validated| validated.check_live(timestamp))
            .and_then(|validated| {
                let executed = ctx.execute_op(op, &validated, beneficiary)?;
                Ok((validated, executed))
            });

        match outcome {
            Ok((validated, executed)) => {
                self.state.checkpoint_commit(checkpoint);
                Ok(OpReceipt {
                    user_op_hash: validated.user_op_hash,
                    sender: op.sender,
                    paymaster: validated.funding.paymaster(),
                    nonce: op.nonce,
                    success: executed.success,
                    actual_gas_cost: executed.actual_gas_cost,
                    actual_gas_used: executed.actual_gas_used,
                    token_cost: executed.token_cost,
                    logs: self.state.logs()[first_log..].to_vec(),
                })
            }
            Err(reason) => {
                self.state.checkpoint_revert(checkpoint);
                if reason.consumes_nonce() {
                    let checkpoint = self.state.checkpoint();
                    self.state.nonces.validate_and_update(op.sender, op.nonce);
                    self.state.checkpoint_commit(checkpoint);
                }
                warn!(
                    target: "relay_settlement::entrypoint",
                    op_index,
                    sender = %op.sender,
                    code = reason.code(),
                    %reason,
                    "operation rejected"
                );
                Err(FailedOp::new(op_index, reason))
            }
        }
    }
}
