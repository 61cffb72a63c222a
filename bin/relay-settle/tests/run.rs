//! Tests for the `run` command: scenario loading, step execution and the JSON report.

use std::{io::Write, path::Path};

use alloy_primitives::{address, Address, B256, U256};
use clap::Parser;
use relay_settle::{
    run::{PaymasterSetup, Scenario, ScenarioOp, Step, TokenPrice, ValidityWindow},
    MainCmd,
};
use relay_settlement::{
    constants::PRICE_PRECISION,
    test_utils::{
        ether, signer, UserOpBuilder, BENEFICIARY, ENTRY_POINT, FACTORY, PAYMASTER,
        PAYMASTER_OWNER, TOKEN, TOKENS_PER_UNIT, UNREGISTERED_TOKEN,
    },
    AccountFactory, PaymasterConfig, SimpleAccountFactory,
};
use rstest::rstest;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

const ALICE: Address = address!("0x000000000000000000000000000000000000a11c");

/// Private key of `signer(0)`.
fn owner_key() -> B256 {
    B256::with_last_byte(1)
}

/// The counterfactual account of `signer(0)` with salt zero.
fn account() -> Address {
    SimpleAccountFactory::new(FACTORY, ENTRY_POINT).deterministic_address(signer(0).address(), U256::ZERO)
}

/// A scenario with one fee payer accepting [`TOKEN`], a deployed account holding a locked
/// deposit of 10 tokens and a funded fee payer.
fn sponsored_scenario() -> Scenario {
    let owner = signer(0).address();
    let account = account();
    Scenario {
        factories: vec![FACTORY],
        tokens: vec![UNREGISTERED_TOKEN],
        paymasters: vec![PaymasterSetup {
            address: PAYMASTER,
            owner: PAYMASTER_OWNER,
            config: PaymasterConfig::default(),
            tokens: vec![TokenPrice {
                token: TOKEN,
                price: PRICE_PRECISION * U256::from(TOKENS_PER_UNIT),
            }],
        }],
        watch: vec![account, BENEFICIARY, PAYMASTER],
        steps: vec![
            Step::Fund { account: PAYMASTER_OWNER, amount: ether(10) },
            Step::PaymasterDeposit { caller: PAYMASTER_OWNER, paymaster: PAYMASTER, amount: ether(1) },
            Step::CreateAccount { caller: owner, factory: FACTORY, owner, salt: U256::ZERO },
            Step::MintTokens { token: TOKEN, account, amount: ether(10) },
            Step::Approve { token: TOKEN, owner: account, spender: PAYMASTER, amount: ether(10) },
            Step::AddTokenDeposit {
                caller: account,
                paymaster: PAYMASTER,
                token: TOKEN,
                payer: account,
                amount: ether(10),
            },
        ],
        ..Default::default()
    }
}

/// A sponsored operation from [`account`] signed by its owner.
fn sponsored_op(token: Address) -> ScenarioOp {
    ScenarioOp {
        op: UserOpBuilder::new(account()).paymaster(PAYMASTER, token).build(),
        signing_key: Some(owner_key()),
        window: None,
    }
}

/// Writes `scenario` to a temporary file.
fn write_scenario(scenario: &impl serde::Serialize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(scenario).unwrap().as_bytes()).unwrap();
    file
}

/// Parses `relay-settle run <path> <args>` and loads the scenario.
fn load(path: &Path, args: &[&str]) -> Scenario {
    let mut argv = vec!["relay-settle", "run", path.to_str().unwrap()];
    argv.extend_from_slice(args);
    match MainCmd::try_parse_from(argv).unwrap() {
        MainCmd::Run(cmd) => cmd.load().unwrap(),
        other => panic!("unexpected command {other:?}"),
    }
}

fn u256(value: &Value) -> U256 {
    serde_json::from_value(value.clone()).unwrap()
}

/// Tests that a sponsored operation settles from a scenario file and charges the token deposit.
#[test]
fn test_run_sponsored_operation() {
    let mut scenario = sponsored_scenario();
    scenario.steps.push(Step::HandleOps { beneficiary: BENEFICIARY, ops: vec![sponsored_op(TOKEN)] });
    let file = write_scenario(&scenario);

    let report = load(file.path(), &[]).execute().unwrap();
    assert_eq!(report.failed_steps(), 0);
    assert_eq!(report.entry_point, ENTRY_POINT);

    let batch = report.steps.last().unwrap();
    assert_eq!(batch.action, "handleOps");
    let outcome = &batch.output.as_ref().unwrap()[0];
    assert_eq!(outcome["status"], "included");
    assert_eq!(outcome["success"], true);
    assert_eq!(u256(&outcome["actualGasUsed"]), U256::from(133_600));
    let cost = U256::from(133_600u64 * 1_000_000_000);
    assert_eq!(u256(&outcome["actualGasCost"]), cost);
    assert_eq!(u256(&outcome["tokenCost"]), cost * U256::from(TOKENS_PER_UNIT));
    assert!(!batch.logs.is_empty());

    let account = &report.accounts[&account()];
    assert!(account.deployed);
    assert_eq!(account.nonce, U256::from(1));
    assert_eq!(report.accounts[&BENEFICIARY].deposit.deposit, cost);
    assert_eq!(report.accounts[&PAYMASTER].deposit.deposit, ether(1) - cost);
    // The fee is moved between deposits held by the fee payer.
    assert_eq!(report.accounts[&PAYMASTER].tokens[&TOKEN], ether(10));
    assert_eq!(account.tokens[&TOKEN], U256::ZERO);
}

/// Tests that a rejected operation is reported with its code and class.
#[test]
fn test_run_reports_rejection() {
    let mut scenario = sponsored_scenario();
    scenario.steps.push(Step::HandleOps {
        beneficiary: BENEFICIARY,
        ops: vec![sponsored_op(UNREGISTERED_TOKEN), sponsored_op(TOKEN)],
    });

    let report = scenario.execute().unwrap();
    let output = serde_json::to_value(&report.steps.last().unwrap().output).unwrap();
    assert_eq!(output[0]["status"], "rejected");
    assert_eq!(output[0]["opIndex"], 0);
    assert_eq!(output[0]["error"]["code"], "AA95");
    assert_eq!(output[0]["error"]["kind"], "input");
    assert_eq!(output[1]["status"], "included");
}

/// Tests that a failing step is reported and the run continues.
#[test]
fn test_failed_step_does_not_stop_run() {
    let scenario = json!({
        "watch": [ALICE],
        "steps": [
            { "action": "fund", "account": ALICE, "amount": ether(2) },
            { "action": "withdrawTo", "caller": ALICE, "destination": ALICE, "amount": ether(1) },
            { "action": "depositTo", "caller": ALICE, "account": ALICE, "amount": ether(1) },
            { "action": "unlockStake", "caller": ALICE },
            { "action": "advance", "blocks": 3 }
        ]
    });
    let file = write_scenario(&scenario);

    let report = load(file.path(), &[]).execute().unwrap();
    assert_eq!(report.failed_steps(), 2);
    let json = serde_json::to_value(&report).unwrap();
    let steps = &json["steps"];
    assert_eq!(steps[0]["action"], "fund");
    assert!(steps[0].get("error").is_none());
    assert_eq!(steps[1]["error"]["code"], "INSUFFICIENT_FUNDS");
    assert_eq!(u256(&steps[2]["output"]), ether(1));
    assert_eq!(steps[3]["error"]["code"], "NOT_STAKED");
    assert_eq!(steps[4]["output"]["number"], 4);

    let alice = &report.accounts[&ALICE];
    assert_eq!(alice.balance, ether(1));
    assert_eq!(alice.deposit.deposit, ether(1));
    assert!(!alice.deployed);
}

/// Tests the command-line overrides of the chain id and the token unlock delay.
#[rstest]
#[case::defaults(&[], 1, 0)]
#[case::chain_id(&["--chain-id", "7"], 7, 0)]
#[case::unlock_delay(&["--token-unlock-delay", "12"], 1, 12)]
#[case::both(&["--chain-id", "10", "--unlock-delay", "3"], 10, 3)]
fn test_overrides(#[case] args: &[&str], #[case] chain_id: u64, #[case] delay: u64) {
    let file = write_scenario(&sponsored_scenario());
    let scenario = load(file.path(), args);
    assert_eq!(scenario.entry_point.chain_id, chain_id);
    assert_eq!(scenario.paymasters[0].config.token_unlock_delay_blocks, delay);
}

/// Tests that operations are signed for the overridden chain.
#[test]
fn test_signing_follows_chain_override() {
    let mut scenario = sponsored_scenario();
    scenario.steps.push(Step::HandleOps { beneficiary: BENEFICIARY, ops: vec![sponsored_op(TOKEN)] });
    let file = write_scenario(&scenario);

    let report = load(file.path(), &["--chain-id", "5"]).execute().unwrap();
    assert_eq!(report.chain_id, 5);
    let outcome = &report.steps.last().unwrap().output.as_ref().unwrap()[0];
    assert_eq!(outcome["status"], "included");

    assert_eq!(outcome["userOpHash"], json!(sponsored_op(TOKEN).op.hash(ENTRY_POINT, 5)));
}

/// Tests that a signature window is honored by batches and ignored by simulated execution.
#[test]
fn test_windowed_operation() {
    let mut scenario = sponsored_scenario();
    let mut op = sponsored_op(TOKEN);
    op.window = Some(ValidityWindow { valid_after: 1_000, valid_until: 2_000 });
    scenario.steps.push(Step::SimulateValidation { op: op.clone() });
    scenario.steps.push(Step::SimulateHandleOp {
        op: op.clone(),
        target: None,
        target_call_data: Default::default(),
    });
    scenario.steps.push(Step::HandleOps { beneficiary: BENEFICIARY, ops: vec![op.clone()] });
    scenario.steps.push(Step::Advance { blocks: 0, seconds: 1_000 });
    scenario.steps.push(Step::HandleOps { beneficiary: BENEFICIARY, ops: vec![op] });

    let report = scenario.execute().unwrap();
    let steps = serde_json::to_value(&report.steps).unwrap();
    assert_eq!(steps[6]["output"]["returnInfo"]["validAfter"], 1_000);
    assert_eq!(steps[6]["output"]["returnInfo"]["sigFailed"], false);
    assert_eq!(steps[7]["output"]["validUntil"], 2_000);
    assert_eq!(steps[8]["output"][0]["error"]["code"], "AA22");
    assert_eq!(steps[10]["output"][0]["status"], "included");
}

/// Tests that an invalid signing key fails the step without aborting the run.
#[test]
fn test_invalid_signing_key() {
    let mut scenario = sponsored_scenario();
    let mut op = sponsored_op(TOKEN);
    op.signing_key = Some(B256::ZERO);
    scenario.steps.push(Step::HandleOps { beneficiary: BENEFICIARY, ops: vec![op] });
    scenario.steps.push(Step::HandleOps { beneficiary: BENEFICIARY, ops: vec![sponsored_op(TOKEN)] });

    let report = scenario.execute().unwrap();
    assert_eq!(report.failed_steps(), 1);
    assert_eq!(report.steps[6].error.as_ref().unwrap().code, "INVALID_INPUT");
    assert!(report.steps[7].error.is_none());
}

/// Tests that the report is written to the output file.
#[test]
fn test_run_writes_report() {
    let scenario = write_scenario(&json!({
        "steps": [{ "action": "fund", "account": ALICE, "amount": "0x10" }]
    }));
    let output = NamedTempFile::new().unwrap();

    let cmd = MainCmd::try_parse_from([
        "relay-settle",
        "run",
        scenario.path().to_str().unwrap(),
        "--output",
        output.path().to_str().unwrap(),
    ])
    .unwrap();
    cmd.run().unwrap();

    let report: Value = serde_json::from_str(&std::fs::read_to_string(output.path()).unwrap()).unwrap();
    assert_eq!(report["steps"][0]["action"], "fund");
    assert_eq!(report["chainId"], 1);
    assert!(report["steps"][0].get("error").is_none());
}

/// Tests that a malformed scenario is an error, not a report.
#[test]
fn test_malformed_scenario() {
    let file = write_scenario(&json!({ "steps": [{ "action": "teleport" }] }));
    let cmd = MainCmd::try_parse_from(["relay-settle", "run", file.path().to_str().unwrap()]).unwrap();
    assert!(cmd.run().is_err());
}
