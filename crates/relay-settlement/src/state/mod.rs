//! The journaled world state every settlement step reads and writes.
//!
//! All stores record undo entries, so a [`StateCheckpoint`] can discard any suffix of work. The
//! orchestrator takes one checkpoint per operation, one per validation phase and one per
//! forwarded call; only the outermost commit makes writes permanent.

use alloy_primitives::{Address, Log};
use alloy_sol_types::SolEvent;
use tracing::trace;

use crate::{DepositLedger, JournaledVec, NonceManager, TokenDepositBook};

mod accounts;
pub use accounts::*;

mod erc20;
pub use erc20::*;

mod native;
pub use native::*;

/// Positions of every store's undo log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCheckpoint {
    native: usize,
    ledger: usize,
    nonces: usize,
    tokens: Erc20Checkpoint,
    token_deposits: (usize, usize),
    accounts: usize,
    logs: usize,
    depth: usize,
}

/// Native balances, ledger, nonces, token books, deployed accounts and emitted logs.
#[derive(Debug, Default)]
pub struct WorldState {
    /// Native balances of the execution substrate
    pub native: NativeBalances,
    /// Stake and deposit ledger of the entry point
    pub ledger: DepositLedger,
    /// Keyed nonces
    pub nonces: NonceManager,
    /// Registered ERC-20 tokens
    pub tokens: Erc20Books,
    /// Token deposits held by fee payers
    pub token_deposits: TokenDepositBook,
    /// Deployed accounts
    pub accounts: AccountRegistry,
    logs: JournaledVec<Log>,
    depth: usize,
}

impl WorldState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a checkpoint. Every checkpoint must be closed with [`Self::checkpoint_commit`] or
    /// [`Self::checkpoint_revert`] in LIFO order.
    pub fn checkpoint(&mut self) -> StateCheckpoint {
        let checkpoint = StateCheckpoint {
            native: self.native.checkpoint(),
            ledger: self.ledger.checkpoint(),
            nonces: self.nonces.checkpoint(),
            tokens: self.tokens.checkpoint(),
            token_deposits: self.token_deposits.checkpoint(),
            accounts: self.accounts.checkpoint(),
            logs: self.logs.checkpoint(),
            depth: self.depth,
        };
        self.depth += 1;
        trace!(target: "relay_settlement::state", depth = self.depth, "checkpoint");
        checkpoint
    }

    /// Keeps the writes made since `checkpoint`.
    pub fn checkpoint_commit(&mut self, checkpoint: StateCheckpoint) {
        self.depth = checkpoint.depth;
        if self.depth == 0 {
            self.native.clear_journal();
            self.ledger.clear_journal();
            self.nonces.clear_journal();
            self.tokens.clear_journal();
            self.token_deposits.clear_journal();
            self.accounts.clear_journal();
        }
    }

    /// Discards the writes and logs made since `checkpoint`.
    pub fn checkpoint_revert(&mut self, checkpoint: StateCheckpoint) {
        self.native.revert_to(checkpoint.native);
        self.ledger.revert_to(checkpoint.ledger);
        self.nonces.revert_to(checkpoint.nonces);
        self.tokens.revert_to(checkpoint.tokens);
        self.token_deposits.revert_to(checkpoint.token_deposits);
        self.accounts.revert_to(checkpoint.accounts);
        self.logs.revert_to(checkpoint.logs);
        self.depth = checkpoint.depth;
        trace!(target: "relay_settlement::state", depth = self.depth, "checkpoint reverted");
    }

    /// Current checkpoint nesting.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Appends an event emitted by `address`.
    pub fn emit<E: SolEvent>(&mut self, address: Address, event: &E) {
        self.logs.push(Log { address, data: event.encode_log_data() });
    }

    /// Logs emitted since the last [`Self::take_logs`].
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Removes and returns the emitted logs.
    pub fn take_logs(&mut self) -> Vec<Log> {
        self.logs.drain_all()
    }
}
