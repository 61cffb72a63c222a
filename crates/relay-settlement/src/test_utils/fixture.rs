use std::sync::Arc;

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_signer_local::PrivateKeySigner;

use crate::{
    constants::{DEFAULT_ENTRY_POINT_ADDRESS, PRICE_PRECISION},
    AccountFactory, EntryPoint, EntryPointConfig, PaymasterConfig, SimpleAccountFactory,
    TokenPaymaster, TokenPriceOracle,
};

/// The entry point address used by [`TestEnv`].
pub const ENTRY_POINT: Address = DEFAULT_ENTRY_POINT_ADDRESS;
/// The account factory.
pub const FACTORY: Address = address!("0x9406Cc6185a346906296840746125a0E44976454");
/// The token fee payer.
pub const PAYMASTER: Address = address!("0x00000000000000000000000000000000000000fe");
/// Controller of the fee payer and the oracle.
pub const PAYMASTER_OWNER: Address = address!("0x00000000000000000000000000000000000000aa");
/// The fee token registered at the fee payer.
pub const TOKEN: Address = address!("0x0000000000000000000000000000000000007011");
/// A token nobody registered.
pub const UNREGISTERED_TOKEN: Address = address!("0x0000000000000000000000000000000000007022");
/// Receives the cost of every operation.
pub const BENEFICIARY: Address = address!("0x000000000000000000000000000000000000BEEF");
/// Fixed oracle rate: token units per settlement unit.
pub const TOKENS_PER_UNIT: u64 = 1000;

/// One ether, in wei.
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

/// A deterministic signer.
pub fn signer(index: u8) -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&B256::with_last_byte(index.saturating_add(1)))
        .expect("valid private key")
}

/// An entry point with a factory, a fee token and a fee payer pricing it at a fixed rate.
#[derive(Debug)]
pub struct TestEnv {
    /// The engine
    pub entry_point: EntryPoint,
    /// The account factory
    pub factory: SimpleAccountFactory,
    /// The oracle pricing [`TOKEN`]
    pub oracle: Arc<TokenPriceOracle>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Creates the environment with an immediate token unlock.
    pub fn new() -> Self {
        Self::with_paymaster_config(PaymasterConfig::default())
    }

    /// Creates the environment with the given fee payer configuration.
    pub fn with_paymaster_config(config: PaymasterConfig) -> Self {
        Self::with_configs(EntryPointConfig::default(), config)
    }

    /// Creates the environment with the given entry point and fee payer configuration.
    pub fn with_configs(entry_point: EntryPointConfig, config: PaymasterConfig) -> Self {
        let factory = SimpleAccountFactory::new(FACTORY, entry_point.address);
        let mut entry_point = EntryPoint::new(entry_point);
        entry_point.register_factory(Arc::new(factory.clone()));
        entry_point.deploy_token(TOKEN);
        entry_point.deploy_token(UNREGISTERED_TOKEN);

        let oracle = Arc::new(TokenPriceOracle::new(PAYMASTER_OWNER));
        oracle
            .set_fixed_price(PAYMASTER_OWNER, TOKEN, PRICE_PRECISION * U256::from(TOKENS_PER_UNIT))
            .expect("owner sets price");
        let mut paymaster = TokenPaymaster::new(PAYMASTER, PAYMASTER_OWNER, config);
        paymaster.add_token(PAYMASTER_OWNER, TOKEN, oracle.clone()).expect("token added");
        entry_point.register_paymaster(paymaster);

        let mut env = Self { entry_point, factory, oracle };
        env.fund(PAYMASTER_OWNER, ether(100));
        env
    }

    /// Mints native currency to `account`.
    pub fn fund(&mut self, account: Address, amount: U256) {
        self.entry_point.state_mut().native.mint(account, amount).expect("mint");
    }

    /// Mints fee tokens to `account`.
    pub fn mint_tokens(&mut self, account: Address, amount: U256) {
        self.entry_point.state_mut().token_mint(TOKEN, account, amount).expect("mint");
        self.entry_point.state_mut().take_logs();
    }

    /// Address and deployment payload of the account of `owner` with `salt`.
    pub fn counterfactual(&self, owner: Address, salt: u64) -> (Address, Bytes) {
        let salt = U256::from(salt);
        (self.factory.deterministic_address(owner, salt), self.factory.init_code(owner, salt))
    }

    /// Deploys the account of `owner` with salt zero.
    pub fn deploy_account(&mut self, owner: Address) -> Address {
        self.entry_point
            .create_account(owner, FACTORY, owner, U256::ZERO)
            .expect("account deployed")
    }

    /// Funds the settlement-unit deposit of the fee payer.
    pub fn fund_paymaster(&mut self, amount: U256) {
        self.entry_point
            .paymaster_deposit(PAYMASTER_OWNER, PAYMASTER, amount)
            .expect("paymaster funded");
    }

    /// Gives `account` tokens and deposits `amount` of them at the fee payer on its own behalf.
    pub fn deposit_tokens(&mut self, account: Address, amount: U256) {
        self.mint_tokens(account, amount);
        self.entry_point
            .state_mut()
            .token_approve(TOKEN, account, PAYMASTER, amount)
            .expect("approve");
        self.entry_point
            .add_deposit_for(account, PAYMASTER, TOKEN, account, amount)
            .expect("token deposit");
    }
}
