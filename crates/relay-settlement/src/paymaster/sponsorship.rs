use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::PRICE_PRECISION, interfaces::ITokenPaymaster, FeePayerDescriptor, OracleError,
    PaymasterError, TokenPaymaster, UserOperation, ValidationData, WorldState,
};

/// Where the sender's token payment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenSource {
    /// The sender's locked token deposit at the fee payer
    Deposit,
    /// The sender's own balance, pulled through its allowance to the fee payer
    Allowance,
}

/// State carried from sponsorship validation to post-op settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipContext {
    /// The fee payer
    pub paymaster: Address,
    /// The sender being billed
    pub payer: Address,
    /// The fee token
    pub token: Address,
    /// Gas price of the operation
    pub gas_price: U256,
    /// Token units per `1e18` settlement units, quoted once during validation
    pub token_price: U256,
    /// Token equivalent of `max_cost`
    pub max_token_cost: U256,
    /// Prefund of the operation in settlement units
    pub max_cost: U256,
    /// Where the payment comes from
    pub source: TokenSource,
}

impl SponsorshipContext {
    /// Token cost of `actual_cost` settlement units at the rate fixed during validation, never
    /// more than the reserved maximum.
    pub fn token_cost(&self, actual_cost: U256) -> U256 {
        let cost = actual_cost.saturating_mul(self.token_price) / PRICE_PRECISION;
        cost.min(self.max_token_cost)
    }
}

/// The outcome of the forwarded call, as seen by post-op settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostOpMode {
    /// The forwarded call succeeded
    OpSucceeded,
    /// The forwarded call reverted; it is still charged
    OpReverted,
    /// Settlement in one of the other modes failed and the call's effects were discarded
    PostOpReverted,
}

impl TokenPaymaster {
    /// Decides whether to sponsor `op`, whose worst-case cost is `max_cost` settlement units.
    ///
    /// The sender's locked deposit is used when it covers the token equivalent of `max_cost`.
    /// Otherwise the sender's balance and allowance to the fee payer must cover it.
    pub fn validate_sponsorship(
        &self,
        state: &WorldState,
        op: &UserOperation,
        descriptor: &FeePayerDescriptor,
        gas_price: U256,
        max_cost: U256,
    ) -> Result<(SponsorshipContext, ValidationData), PaymasterError> {
        let token = descriptor.token.ok_or(PaymasterError::MissingToken)?;
        if op.verification_gas_limit <= U256::from(self.config().cost_of_post) {
            return Err(PaymasterError::GasTooLowForPostOp);
        }
        let token_price = self.token_value_of(token, PRICE_PRECISION)?;
        let max_token_cost = max_cost
            .checked_mul(token_price)
            .ok_or(PaymasterError::Oracle(OracleError::Overflow))? /
            PRICE_PRECISION;
        let payer = op.sender;

        let deposit = self.deposit_info(state, token, payer);
        let locked = deposit.unlock_block == 0;
        let source = if locked && deposit.amount >= max_token_cost {
            TokenSource::Deposit
        } else if state.tokens.balance_of(token, payer) >= max_token_cost &&
            state.tokens.allowance(token, payer, self.address()) >= max_token_cost
        {
            TokenSource::Allowance
        } else {
            return Err(PaymasterError::InsufficientCollateral {
                required: max_token_cost,
                deposit: deposit.amount,
                locked,
            });
        };

        debug!(
            target: "relay_settlement::paymaster",
            paymaster = %self.address(),
            %payer,
            %token,
            %max_token_cost,
            ?source,
            "sponsorship accepted"
        );
        let context = SponsorshipContext {
            paymaster: self.address(),
            payer,
            token,
            gas_price,
            token_price,
            max_token_cost,
            max_cost,
            source,
        };
        Ok((context, ValidationData::valid()))
    }

    /// Charges the payer for `actual_cost` settlement units and credits the charge to the
    /// controller's token deposit. Returns the token cost.
    pub fn settle(
        &self,
        state: &mut WorldState,
        context: &SponsorshipContext,
        mode: PostOpMode,
        actual_cost: U256,
    ) -> Result<U256, PaymasterError> {
        let token_cost = context.token_cost(actual_cost);
        match (mode, context.source) {
            (PostOpMode::PostOpReverted, _) | (_, TokenSource::Deposit) => {
                self.charge_deposit(state, context.token, context.payer, token_cost)?;
            }
            (_, TokenSource::Allowance) => {
                state.token_transfer_from(
                    context.token,
                    self.address(),
                    context.payer,
                    self.address(),
                    token_cost,
                )?;
            }
        }
        self.credit_deposit(state, context.token, self.owner(), token_cost)?;
        state.emit(
            self.address(),
            &ITokenPaymaster::TokenFeeCharged {
                account: context.payer,
                token: context.token,
                tokenCost: token_cost,
                actualGasCost: actual_cost,
            },
        );
        debug!(
            target: "relay_settlement::paymaster",
            payer = %context.payer,
            %token_cost,
            %actual_cost,
            ?mode,
            "fee charged"
        );
        Ok(token_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::PRICE_PRECISION, PaymasterConfig, TokenPriceOracle};
    use alloy_primitives::{address, Bytes};
    use std::sync::Arc;

    const PAYMASTER: Address = address!("0x00000000000000000000000000000000000000fe");
    const OWNER: Address = address!("0x00000000000000000000000000000000000000aa");
    const TOKEN: Address = address!("0x0000000000000000000000000000000000007011");
    const PAYER: Address = address!("0x000000000000000000000000000000000000a11c");

    fn setup() -> (TokenPaymaster, WorldState, UserOperation, FeePayerDescriptor) {
        let oracle = TokenPriceOracle::new(OWNER);
        oracle.set_fixed_price(OWNER, TOKEN, PRICE_PRECISION * U256::from(1000)).unwrap();
        let mut paymaster = TokenPaymaster::new(PAYMASTER, OWNER, PaymasterConfig::default());
        paymaster.add_token(OWNER, TOKEN, Arc::new(oracle)).unwrap();

        let mut state = WorldState::new();
        state.tokens.register(TOKEN);
        state.token_mint(TOKEN, PAYER, U256::from(1_000_000)).unwrap();
        state.token_approve(TOKEN, PAYER, PAYMASTER, U256::MAX).unwrap();

        let op = UserOperation {
            sender: PAYER,
            verification_gas_limit: U256::from(100_000),
            paymaster_and_data: FeePayerDescriptor::encode(PAYMASTER, TOKEN),
            ..Default::default()
        };
        let descriptor = FeePayerDescriptor::parse(&op.paymaster_and_data).unwrap().unwrap();
        (paymaster, state, op, descriptor)
    }

    #[test]
    fn test_locked_deposit_is_collateral() {
        let (paymaster, mut state, op, descriptor) = setup();
        paymaster.add_deposit_for(&mut state, PAYER, TOKEN, PAYER, U256::from(10_000)).unwrap();

        let (context, _) = paymaster
            .validate_sponsorship(&state, &op, &descriptor, U256::from(1), U256::from(10))
            .unwrap();
        assert_eq!(context.source, TokenSource::Deposit);
        assert_eq!(context.max_token_cost, U256::from(10_000));

        let cost = paymaster
            .settle(&mut state, &context, PostOpMode::OpSucceeded, U256::from(4))
            .unwrap();
        assert_eq!(cost, U256::from(4_000));
        assert_eq!(paymaster.deposit_info(&state, TOKEN, PAYER).amount, U256::from(6_000));
        assert_eq!(paymaster.deposit_info(&state, TOKEN, OWNER).amount, U256::from(4_000));
    }

    #[test]
    fn test_unlocked_deposit_falls_back_to_allowance() {
        let (paymaster, mut state, op, descriptor) = setup();
        paymaster.add_deposit_for(&mut state, PAYER, TOKEN, PAYER, U256::from(10_000)).unwrap();
        paymaster.unlock_token_deposit(&mut state, &Default::default(), PAYER);

        let (context, _) = paymaster
            .validate_sponsorship(&state, &op, &descriptor, U256::from(1), U256::from(10))
            .unwrap();
        assert_eq!(context.source, TokenSource::Allowance);

        let before = state.tokens.balance_of(TOKEN, PAYER);
        paymaster.settle(&mut state, &context, PostOpMode::OpReverted, U256::from(2)).unwrap();
        assert_eq!(state.tokens.balance_of(TOKEN, PAYER), before - U256::from(2_000));
        assert_eq!(paymaster.deposit_info(&state, TOKEN, PAYER).amount, U256::from(10_000));
    }

    #[test]
    fn test_insufficient_collateral() {
        let (paymaster, mut state, op, descriptor) = setup();
        state.token_approve(TOKEN, PAYER, PAYMASTER, U256::ZERO).unwrap();
        assert_eq!(
            paymaster
                .validate_sponsorship(&state, &op, &descriptor, U256::from(1), U256::from(10))
                .map(|_| ()),
            Err(PaymasterError::InsufficientCollateral {
                required: U256::from(10_000),
                deposit: U256::ZERO,
                locked: true,
            })
        );
    }

    #[test]
    fn test_descriptor_and_gas_checks() {
        let (paymaster, state, mut op, mut descriptor) = setup();
        op.verification_gas_limit = U256::from(paymaster.config().cost_of_post);
        assert_eq!(
            paymaster
                .validate_sponsorship(&state, &op, &descriptor, U256::from(1), U256::from(10))
                .map(|_| ()),
            Err(PaymasterError::GasTooLowForPostOp)
        );
        descriptor.token = None;
        descriptor.extra = Bytes::new();
        assert_eq!(
            paymaster
                .validate_sponsorship(&state, &op, &descriptor, U256::from(1), U256::from(10))
                .map(|_| ()),
            Err(PaymasterError::MissingToken)
        );
    }

    #[test]
    fn test_token_cost_is_capped() {
        let context = SponsorshipContext {
            paymaster: PAYMASTER,
            payer: PAYER,
            token: TOKEN,
            gas_price: U256::from(1),
            token_price: PRICE_PRECISION * U256::from(100),
            max_token_cost: U256::from(300),
            max_cost: U256::from(3),
            source: TokenSource::Deposit,
        };
        assert_eq!(context.token_cost(U256::from(2)), U256::from(200));
        assert_eq!(context.token_cost(U256::from(5)), U256::from(300));
    }

    #[test]
    fn test_fractional_price_is_charged_at_recorded_rate() {
        let (_, mut state, op, descriptor) = setup();
        let price = PRICE_PRECISION * U256::from(3) / U256::from(2);
        let oracle = TokenPriceOracle::new(OWNER);
        oracle.set_fixed_price(OWNER, TOKEN, price).unwrap();
        let mut paymaster = TokenPaymaster::new(PAYMASTER, OWNER, PaymasterConfig::default());
        paymaster.add_token(OWNER, TOKEN, Arc::new(oracle)).unwrap();
        paymaster.add_deposit_for(&mut state, PAYER, TOKEN, PAYER, U256::from(100)).unwrap();

        let (context, _) = paymaster
            .validate_sponsorship(&state, &op, &descriptor, U256::from(1), U256::from(3))
            .unwrap();
        assert_eq!(context.token_price, price);
        assert_eq!(context.max_token_cost, U256::from(4));

        let expected = paymaster.token_value_of(TOKEN, U256::from(2)).unwrap();
        assert_eq!(expected, U256::from(3));
        let cost = paymaster
            .settle(&mut state, &context, PostOpMode::OpSucceeded, U256::from(2))
            .unwrap();
        assert_eq!(cost, expected);
        assert_eq!(paymaster.deposit_info(&state, TOKEN, PAYER).amount, U256::from(97));
    }
}
