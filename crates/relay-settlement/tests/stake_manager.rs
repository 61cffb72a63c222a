//! Tests for the stake and deposit ledger of the entry point.
//!
//! Deposits can be added for anyone and withdrawn by their owner. Stakes are locked with an
//! unstake delay and can only be withdrawn once that delay has elapsed after unlocking.

use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use relay_settlement::{
    interfaces::IEntryPoint,
    test_utils::{ether, TestEnv, ENTRY_POINT},
    LedgerError,
};

const ALICE: Address = address!("0x000000000000000000000000000000000000a11c");
const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

/// Creates an environment where [`ALICE`] holds 10 ether.
fn setup() -> TestEnv {
    let mut env = TestEnv::new();
    env.fund(ALICE, ether(10));
    env.entry_point.take_logs();
    env
}

/// Deposit then withdraw: the deposit is tracked and over-withdrawal is refused.
#[test]
fn test_deposit_and_withdraw() {
    let mut env = setup();
    let entry_point = &mut env.entry_point;

    let total = entry_point.deposit_to(ALICE, ALICE, ether(1)).unwrap();
    assert_eq!(total, ether(1));
    assert_eq!(entry_point.balance_of(ALICE), ether(1));
    assert_eq!(entry_point.state().native.balance(ALICE), ether(9));

    let too_much = ether(1) + ether(1) / U256::from(10);
    let err = entry_point.withdraw_to(ALICE, ALICE, too_much).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(entry_point.balance_of(ALICE), ether(1));

    entry_point.withdraw_to(ALICE, ALICE, ether(1)).unwrap();
    assert_eq!(entry_point.balance_of(ALICE), U256::ZERO);
    assert_eq!(entry_point.state().native.balance(ALICE), ether(10));
}

/// Anyone may fund anyone's deposit, and the event reports the new total.
#[test]
fn test_deposit_for_other_account_emits_event() {
    let mut env = setup();
    let entry_point = &mut env.entry_point;

    entry_point.deposit_to(ALICE, BOB, ether(2)).unwrap();
    entry_point.deposit_to(ALICE, BOB, ether(3)).unwrap();
    assert_eq!(entry_point.balance_of(BOB), ether(5));
    assert_eq!(entry_point.balance_of(ALICE), U256::ZERO);

    let logs = entry_point.take_logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].address, ENTRY_POINT);
    let event = IEntryPoint::Deposited::decode_log_data(&logs[1].data, true).unwrap();
    assert_eq!(event.account, BOB);
    assert_eq!(event.totalDeposit, ether(5));
}

/// A deposit the caller cannot pay for leaves no trace.
#[test]
fn test_unfunded_deposit_is_atomic() {
    let mut env = setup();
    let entry_point = &mut env.entry_point;

    let err = entry_point.deposit_to(BOB, BOB, ether(1)).unwrap_err();
    assert!(matches!(err, LedgerError::Balance(_)));
    assert_eq!(entry_point.balance_of(BOB), U256::ZERO);
    assert!(entry_point.take_logs().is_empty());
}

/// Plain value sent to the entry point is credited to the sender's deposit.
#[test]
fn test_plain_transfer_deposits_for_sender() {
    let mut env = setup();
    let entry_point = &mut env.entry_point;

    entry_point.call(ALICE, ENTRY_POINT, ether(1), Bytes::new()).unwrap();
    assert_eq!(entry_point.balance_of(ALICE), ether(1));

    let data = IEntryPoint::depositToCall { account: BOB }.abi_encode();
    entry_point.call(ALICE, ENTRY_POINT, ether(2), data.into()).unwrap();
    assert_eq!(entry_point.balance_of(BOB), ether(2));

    let data = IEntryPoint::balanceOfCall { account: BOB }.abi_encode();
    let output = entry_point.call(ALICE, ENTRY_POINT, U256::ZERO, data.into()).unwrap();
    assert_eq!(U256::abi_decode(&output, true).unwrap(), ether(2));
}

/// The full stake lifecycle: lock, unlock, wait out the delay, withdraw.
#[test]
fn test_stake_lifecycle() {
    let mut env = setup();
    let stake = ether(1) / U256::from(10);

    let info = env.entry_point.add_stake(ALICE, 1000, stake).unwrap();
    assert!(info.staked);
    assert_eq!(info.stake, stake);
    assert_eq!(info.unstake_delay_sec, 1000);
    assert_eq!(info.withdraw_time, 0);

    let err = env.entry_point.withdraw_stake(ALICE, BOB).unwrap_err();
    assert_eq!(err, LedgerError::NotUnlocked);
    assert_eq!(err.to_string(), "must call unlockStake() first");

    let now = env.entry_point.env().timestamp;
    let withdraw_time = env.entry_point.unlock_stake(ALICE).unwrap();
    assert_eq!(withdraw_time, now + 1000);
    assert!(env.entry_point.deposit_info(ALICE).staked);
    assert_eq!(env.entry_point.unlock_stake(ALICE).unwrap_err(), LedgerError::AlreadyUnstaking);

    let err = env.entry_point.withdraw_stake(ALICE, BOB).unwrap_err();
    assert_eq!(err.to_string(), "Stake withdrawal is not due");

    env.entry_point.env_mut().advance_time(1000);
    let withdrawn = env.entry_point.withdraw_stake(ALICE, BOB).unwrap();
    assert_eq!(withdrawn, stake);
    assert_eq!(env.entry_point.state().native.balance(BOB), stake);

    let info = env.entry_point.deposit_info(ALICE);
    assert!(!info.staked);
    assert_eq!(info.stake, U256::ZERO);
    assert_eq!(info.unstake_delay_sec, 0);
    assert_eq!(info.withdraw_time, 0);
}

/// Adding stake re-locks an unlocking stake and refuses a shorter delay.
#[test]
fn test_add_stake_rules() {
    let mut env = setup();
    let entry_point = &mut env.entry_point;

    assert_eq!(
        entry_point.add_stake(ALICE, 0, ether(1)).unwrap_err(),
        LedgerError::ZeroUnstakeDelay
    );
    assert_eq!(entry_point.add_stake(ALICE, 10, U256::ZERO).unwrap_err(), LedgerError::NoStake);

    entry_point.add_stake(ALICE, 100, ether(1)).unwrap();
    assert!(matches!(
        entry_point.add_stake(ALICE, 50, ether(1)).unwrap_err(),
        LedgerError::UnstakeDelayDecreased { current: 100, requested: 50 }
    ));

    entry_point.unlock_stake(ALICE).unwrap();
    let info = entry_point.add_stake(ALICE, 100, ether(1)).unwrap();
    assert_eq!(info.stake, ether(2));
    assert_eq!(info.withdraw_time, 0);
    assert_eq!(entry_point.withdraw_stake(ALICE, ALICE).unwrap_err(), LedgerError::NotUnlocked);

    // Stake and deposit are tracked separately.
    assert_eq!(entry_point.balance_of(ALICE), U256::ZERO);
}

/// Unlocking requires a stake.
#[test]
fn test_unlock_without_stake() {
    let mut env = setup();
    assert_eq!(env.entry_point.unlock_stake(ALICE).unwrap_err(), LedgerError::NotStaked);
}

/// After any sequence of deposits and withdrawals, the deposit equals credits minus debits and
/// the entry point holds exactly what it owes.
#[test]
fn test_balance_conservation() {
    let mut env = setup();
    env.fund(BOB, ether(10));
    let steps: [(bool, Address, u64); 8] = [
        (true, ALICE, 3),
        (true, BOB, 2),
        (false, ALICE, 1),
        (false, BOB, 5),
        (true, ALICE, 4),
        (false, ALICE, 7),
        (false, ALICE, 6),
        (true, BOB, 1),
    ];

    let mut expected = [U256::ZERO; 2];
    for (deposit, account, amount) in steps {
        let slot = usize::from(account == BOB);
        let amount = ether(amount);
        if deposit {
            env.entry_point.deposit_to(account, account, amount).unwrap();
            expected[slot] += amount;
        } else {
            let result = env.entry_point.withdraw_to(account, account, amount);
            if amount <= expected[slot] {
                result.unwrap();
                expected[slot] -= amount;
            } else {
                assert!(result.is_err());
            }
        }
    }

    assert_eq!(env.entry_point.balance_of(ALICE), expected[0]);
    assert_eq!(env.entry_point.balance_of(BOB), expected[1]);
    assert_eq!(env.entry_point.state().native.balance(ENTRY_POINT), expected[0] + expected[1]);
}
