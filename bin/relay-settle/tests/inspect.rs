//! Tests for the `hash` and `address` commands.

use alloy_primitives::{address, Address, U256};
use clap::Parser;
use relay_settle::{hash, MainCmd};
use relay_settlement::test_utils::{
    signer, TestEnv, UserOpBuilder, ENTRY_POINT, FACTORY, PAYMASTER, TOKEN,
};
use rstest::rstest;
use tempfile::NamedTempFile;

const SENDER: Address = address!("0x000000000000000000000000000000000000a11c");

fn parse_hash(args: &[&str]) -> hash::Cmd {
    let mut argv = vec!["relay-settle", "hash"];
    argv.extend_from_slice(args);
    match MainCmd::try_parse_from(argv).unwrap() {
        MainCmd::Hash(cmd) => cmd,
        other => panic!("unexpected command {other:?}"),
    }
}

fn parse_address(args: &[&str]) -> relay_settle::address::Cmd {
    let mut argv = vec!["relay-settle", "address"];
    argv.extend_from_slice(args);
    match MainCmd::try_parse_from(argv).unwrap() {
        MainCmd::Address(cmd) => cmd,
        other => panic!("unexpected command {other:?}"),
    }
}

/// Tests that the hash binds the entry point and the chain.
#[test]
fn test_hash_binds_entry_point_and_chain() {
    let op = UserOpBuilder::new(SENDER).build();

    let summary = parse_hash(&["op.json"]).summarize(&op);
    assert_eq!(summary.user_op_hash, op.hash(ENTRY_POINT, 1));

    let summary = parse_hash(&["op.json", "--chain-id", "5"]).summarize(&op);
    assert_eq!(summary.user_op_hash, op.hash(ENTRY_POINT, 5));

    let other = "0x0000000000000000000000000000000000000e9e";
    let summary = parse_hash(&["op.json", "--entry-point", other]).summarize(&op);
    assert_eq!(summary.user_op_hash, op.hash(other.parse().unwrap(), 1));
}

/// Tests the gas requirements reported with and without a fee payer.
#[rstest]
#[case::self_funded(false, 471_000)]
#[case::sponsored(true, 971_000)]
fn test_hash_reports_prefund(#[case] sponsored: bool, #[case] prefund_gwei: u64) {
    let mut builder = UserOpBuilder::new(SENDER).nonce(3, 9);
    if sponsored {
        builder = builder.paymaster(PAYMASTER, TOKEN);
    }
    let summary = parse_hash(&["op.json"]).summarize(&builder.build());

    assert_eq!(summary.sponsored, sponsored);
    assert_eq!(summary.nonce_key, U256::from(3));
    assert_eq!(summary.nonce_sequence, 9);
    assert_eq!(summary.required_prefund, U256::from(prefund_gwei) * U256::from(1_000_000_000u64));
    assert!(summary.gas_values_in_range);
    assert!(summary.factory.is_none());
}

/// Tests that the hash command reads the operation from a file.
#[test]
fn test_hash_from_file() {
    let file = NamedTempFile::new().unwrap();
    let op = UserOpBuilder::new(SENDER).build();
    std::fs::write(file.path(), serde_json::to_string(&op).unwrap()).unwrap();

    let cmd = MainCmd::try_parse_from(["relay-settle", "hash", file.path().to_str().unwrap()])
        .unwrap();
    cmd.run().unwrap();
}

/// Tests that the counterfactual address matches the account the factory deploys.
#[test]
fn test_address_matches_deployment() {
    let owner = signer(3).address();
    let owner_arg = owner.to_string();
    let factory_arg = FACTORY.to_string();

    let computed = parse_address(&["--factory", &factory_arg, "--owner", &owner_arg, "--salt", "7"])
        .compute();
    let mut env = TestEnv::new();
    let (expected, init_code) = env.counterfactual(owner, 7);
    assert_eq!(computed.address, expected);
    assert_eq!(computed.init_code, init_code);

    let deployed = env.entry_point.create_account(owner, FACTORY, owner, U256::from(7)).unwrap();
    assert_eq!(deployed, computed.address);

    let other_salt = parse_address(&["--factory", &factory_arg, "--owner", &owner_arg]).compute();
    assert_ne!(other_salt.address, computed.address);
}
