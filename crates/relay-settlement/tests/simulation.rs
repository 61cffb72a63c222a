//! Tests for the dry-run entry points.
//!
//! Simulations report what validation and execution would do and always discard their effects.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use relay_settlement::{
    interfaces::IERC20,
    test_utils::{ether, signer, TestEnv, UserOpBuilder, PAYMASTER, TOKEN, UNREGISTERED_TOKEN},
    TokenSource,
};

/// Deploys an account, funds the fee payer and deposits 10 tokens for the account.
fn setup() -> (TestEnv, Address) {
    let mut env = TestEnv::new();
    let account = env.deploy_account(signer(0).address());
    env.fund_paymaster(ether(1));
    env.deposit_tokens(account, ether(10));
    env.entry_point.take_logs();
    (env, account)
}

/// Asserts that nothing observable changed for `account`.
fn assert_untouched(env: &mut TestEnv, account: Address) {
    let entry_point = &mut env.entry_point;
    assert_eq!(entry_point.get_nonce(account, U256::ZERO), U256::ZERO);
    assert_eq!(entry_point.balance_of(PAYMASTER), ether(1));
    assert_eq!(entry_point.token_deposit_info(PAYMASTER, TOKEN, account).unwrap().amount, ether(10));
    assert_eq!(entry_point.state().depth(), 0);
    assert!(entry_point.take_logs().is_empty());
}

/// Tests that validation is reported without consuming the nonce or reserving the prefund.
#[test]
fn test_simulate_validation() {
    let (mut env, account) = setup();
    let op = UserOpBuilder::new(account).paymaster(PAYMASTER, TOKEN).sign(&signer(0));

    let result = env.entry_point.simulate_validation(&op).unwrap();
    let info = &result.return_info;
    assert_eq!(info.prefund, op.required_prefund());
    assert_eq!(info.pre_op_gas, U256::from(96_000));
    assert!(!info.sig_failed);
    assert_eq!(info.valid_after, 0);
    let context = info.paymaster_context.as_ref().unwrap();
    assert_eq!(context.source, TokenSource::Deposit);
    assert_eq!(context.max_cost, op.required_prefund());
    assert!(result.paymaster_info.is_some());
    assert!(result.factory_info.is_none());

    assert_untouched(&mut env, account);
}

/// Tests that signature failures and windows are reported rather than rejected.
#[test]
fn test_simulate_validation_reports_signature_and_window() {
    let (mut env, account) = setup();

    let op = UserOpBuilder::new(account).paymaster(PAYMASTER, TOKEN).sign(&signer(1));
    let result = env.entry_point.simulate_validation(&op).unwrap();
    assert!(result.return_info.sig_failed);

    let op = UserOpBuilder::new(account)
        .paymaster(PAYMASTER, TOKEN)
        .sign_with_window(&signer(0), 100, 200);
    let result = env.entry_point.simulate_validation(&op).unwrap();
    assert!(!result.return_info.sig_failed);
    assert_eq!(result.return_info.valid_after, 100);
    assert_eq!(result.return_info.valid_until, 200);

    assert_untouched(&mut env, account);
}

/// Tests that a simulated deployment reports the factory and leaves the sender undeployed.
#[test]
fn test_simulate_validation_with_deployment() {
    let mut env = TestEnv::new();
    let owner = signer(5);
    let (account, init_code) = env.counterfactual(owner.address(), 0);
    env.fund(account, ether(1));

    let op = UserOpBuilder::new(account).init_code(init_code).sign(&owner);
    let result = env.entry_point.simulate_validation(&op).unwrap();
    assert!(result.factory_info.is_some());
    assert!(result.paymaster_info.is_none());
    assert!(result.return_info.paymaster_context.is_none());

    assert!(!env.entry_point.state().accounts.has_code(account));
    assert_eq!(env.entry_point.state().native.balance(account), ether(1));
}

/// Tests that a rejection is reported with its code.
#[test]
fn test_simulate_validation_rejection() {
    let (mut env, account) = setup();
    let op = UserOpBuilder::new(account).paymaster(PAYMASTER, UNREGISTERED_TOKEN).sign(&signer(0));

    let err = env.entry_point.simulate_validation(&op).unwrap_err();
    assert_eq!(err.code(), "AA95");
    assert_untouched(&mut env, account);
}

/// Tests that a simulated execution reports the cost and the target call's result.
#[test]
fn test_simulate_handle_op() {
    let (mut env, account) = setup();
    env.mint_tokens(account, ether(4));
    let op = UserOpBuilder::new(account).paymaster(PAYMASTER, TOKEN).sign(&signer(0));

    let data = IERC20::balanceOfCall { account }.abi_encode();
    let result = env.entry_point.simulate_handle_op(&op, Some(TOKEN), data.into()).unwrap();
    assert_eq!(result.pre_op_gas, U256::from(96_000));
    assert_eq!(result.paid, U256::from(133_600u64 * 1_000_000_000));
    assert!(result.target_success);
    assert_eq!(U256::abi_decode(&result.target_result, true).unwrap(), ether(4));

    let result = env.entry_point.simulate_handle_op(&op, None, Default::default()).unwrap();
    assert!(!result.target_success);
    assert!(result.target_result.is_empty());

    let garbage = Bytes::from_static(&[0xde, 0xad]);
    let result = env.entry_point.simulate_handle_op(&op, Some(TOKEN), garbage).unwrap();
    assert!(!result.target_success);
    assert!(!result.target_result.is_empty());

    assert_untouched(&mut env, account);
    assert_eq!(env.entry_point.state().tokens.balance_of(TOKEN, account), ether(4));
}

/// Tests that simulated execution does not enforce the validity window.
#[test]
fn test_simulate_handle_op_ignores_window() {
    let (mut env, account) = setup();
    let op = UserOpBuilder::new(account)
        .paymaster(PAYMASTER, TOKEN)
        .sign_with_window(&signer(0), 100, 200);

    let result = env.entry_point.simulate_handle_op(&op, None, Default::default()).unwrap();
    assert_eq!(result.valid_after, 100);
    assert_eq!(result.valid_until, 200);
    let beneficiary = env.entry_point.address();
    assert_eq!(env.entry_point.handle_op(&op, beneficiary).unwrap_err().code(), "AA22");
}
