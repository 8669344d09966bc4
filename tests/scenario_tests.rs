//! End-to-end scenarios driven through `TestApp`.

use std::sync::Arc;

use chain_tube::proto::auth::QueryAccountRequest;
use chain_tube::proto::bank::{MsgSend, MsgSendResponse, QueryBalanceRequest};
use chain_tube::proto::params::{AssetFtParams, AssetNftParams};
use chain_tube::proto::slashing::QuerySigningInfoRequest;
use chain_tube::proto::staking::{
    BondStatus, CommissionRates, Description, MsgCreateValidator, MsgDelegate,
    QueryValidatorsRequest,
};
use chain_tube::proto::wasm::{MsgStoreCode, QueryCodeRequest};
use chain_tube::{
    Account, AssetFt, AssetNft, Auth, Bank, Coin, FeeSetting, Module, Runner, RunnerError,
    Slashing, SigningAccount, Staking, TestApp, Wasm,
};
use chain_tube_core::{HarnessConfig, HarnessService};
use chain_tube_types::keys::address_from_pubkey_any;
use chain_tube_types::{Address, Ed25519Key};

const DENOM: &str = "ucore";

fn balance(app: &TestApp, address: &str, denom: &str) -> u128 {
    Bank::new(app)
        .query_balance(&QueryBalanceRequest {
            address: address.to_string(),
            denom: denom.to_string(),
        })
        .unwrap()
        .balance
        .unwrap()
        .amount
        .parse()
        .unwrap()
}

fn send(app: &TestApp, from: &SigningAccount, to: &str, amount: Coin) -> Result<(), RunnerError> {
    Bank::new(app)
        .send(
            MsgSend {
                from_address: from.address(),
                to_address: to.to_string(),
                amount: vec![amount],
            },
            from,
        )
        .map(|_| ())
}

#[test]
fn test_fund_transfer_bumps_sequence() {
    let app = TestApp::new().unwrap();
    let alice = app.init_account(&[Coin::new(1000, "core")]).unwrap();
    app.finalize_block().unwrap();
    assert_eq!(app.account_sequence(&alice.address()).unwrap(), 0);

    let bob = app.init_account(&[]).unwrap();
    let res = Bank::new(&app)
        .send(
            MsgSend {
                from_address: alice.address(),
                to_address: bob.address(),
                amount: vec![Coin::new(250, "core")],
            },
            &alice,
        )
        .unwrap();
    assert_eq!(res.data, MsgSendResponse {});
    assert!(res.event("transfer").is_some());
    assert!(res.gas_info.gas_used > 0);
    app.finalize_block().unwrap();

    assert_eq!(app.account_sequence(&alice.address()).unwrap(), 1);
    assert_eq!(balance(&app, &bob.address(), "core"), 250);
    assert_eq!(balance(&app, &alice.address(), "core"), 750);
}

#[test]
fn test_failed_send_still_consumes_sequence() {
    let app = TestApp::new().unwrap();
    // A fixed fee skips the simulation that would reject the send up front.
    let alice = app
        .init_account(&[Coin::new(10, DENOM)])
        .unwrap()
        .with_fee_setting(FeeSetting::Custom {
            amount: Coin::new(0, DENOM),
            gas_limit: 200_000,
        });
    let bob = app.init_account(&[]).unwrap();

    let err = send(&app, &alice, &bob.address(), Coin::new(11, DENOM)).unwrap_err();
    match err {
        RunnerError::ExecuteError { msg } => assert!(msg.contains("insufficient funds"), "{}", msg),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(app.account_sequence(&alice.address()).unwrap(), 1);
    assert_eq!(balance(&app, &alice.address(), DENOM), 10);
}

#[test]
fn test_custom_fee_goes_to_fee_collector() {
    let app = TestApp::new().unwrap();
    let alice = app
        .init_account(&[Coin::new(1_000_000, DENOM)])
        .unwrap()
        .with_fee_setting(FeeSetting::Custom {
            amount: Coin::new(5_000, DENOM),
            gas_limit: 300_000,
        });
    let bob = app.init_account(&[]).unwrap();

    send(&app, &alice, &bob.address(), Coin::new(1_000, DENOM)).unwrap();
    assert_eq!(balance(&app, &alice.address(), DENOM), 1_000_000 - 1_000 - 5_000);
    assert_eq!(balance(&app, &bob.address(), DENOM), 1_000);
}

#[test]
fn test_unsigned_account_cannot_send() {
    let app = TestApp::new().unwrap();
    let stranger = SigningAccount::new(
        chain_tube_types::Secp256k1Key::generate(),
        app.address_prefix(),
        FeeSetting::auto(DENOM),
    );
    let err = send(&app, &stranger, &stranger.address(), Coin::new(1, DENOM)).unwrap_err();
    assert!(matches!(err, RunnerError::EncodeError(_)), "{}", err);
}

#[test]
fn test_simulate_reports_gas_without_side_effects() {
    let app = TestApp::new().unwrap();
    let alice = app.init_account(&[Coin::new(100, DENOM)]).unwrap();
    let msg = chain_tube::Any::pack(&MsgSend {
        from_address: alice.address(),
        to_address: alice.address(),
        amount: vec![Coin::new(1, DENOM)],
    });
    let gas = app.simulate_tx(vec![msg], &alice).unwrap();
    assert!(gas.gas_used > 0);
    assert_eq!(app.account_sequence(&alice.address()).unwrap(), 0);
}

#[test]
fn test_block_height_and_time() {
    let app = TestApp::new().unwrap();
    let height = app.get_block_height().unwrap();
    let time = app.get_block_time_nanos().unwrap();

    app.increase_time(60).unwrap();
    assert_eq!(app.get_block_height().unwrap(), height + 1);
    assert_eq!(app.get_block_time_nanos().unwrap(), time + 60_000_000_000);

    app.finalize_block().unwrap();
    assert_eq!(app.get_block_height().unwrap(), height + 2);
    assert_eq!(
        app.get_block_time_seconds().unwrap(),
        (time + 61_000_000_000) / 1_000_000_000
    );
    assert_eq!(
        app.get_block_datetime().unwrap().timestamp(),
        app.get_block_time_seconds().unwrap()
    );
}

#[test]
fn test_create_validator_is_bonded_at_end_block() {
    let app = TestApp::new().unwrap();
    let signer = app
        .init_account(&[Coin::new(100_000_000_000, DENOM)])
        .unwrap();
    let staking = Staking::new(&app);
    let bonded = || {
        staking
            .query_validators(&QueryValidatorsRequest {
                status: BondStatus::Bonded.as_str_name().to_string(),
            })
            .unwrap()
            .validators
    };
    assert_eq!(bonded().len(), 1);

    let operator = Address::from_bech32(&signer.address(), "core")
        .unwrap()
        .to_bech32("corevaloper");
    staking
        .create_validator(
            MsgCreateValidator {
                description: Some(Description {
                    moniker: "moniker".to_string(),
                    ..Default::default()
                }),
                commission: Some(CommissionRates {
                    rate: "0.1".to_string(),
                    max_rate: "0.2".to_string(),
                    max_change_rate: "0.01".to_string(),
                }),
                min_self_delegation: "20000000000".to_string(),
                delegator_address: signer.address(),
                validator_address: operator.clone(),
                pubkey: Some(Ed25519Key::generate().public_key_any()),
                value: Some(Coin::new(20_000_000_000, DENOM)),
            },
            &signer,
        )
        .unwrap();
    app.finalize_block().unwrap();
    assert_eq!(bonded().len(), 2);

    staking
        .delegate(
            MsgDelegate {
                delegator_address: signer.address(),
                validator_address: operator,
                amount: Some(Coin::new(1_000_000, DENOM)),
            },
            &signer,
        )
        .unwrap();
    // Keeps producing blocks with the new validator in the set.
    app.finalize_block().unwrap();
    app.finalize_block().unwrap();
}

#[test]
fn test_min_self_delegation_enforced_on_tx_path() {
    let app = TestApp::new().unwrap();
    let signer = app.init_account(&[Coin::new(100_000_000, DENOM)]).unwrap();
    let operator = Address::from_bech32(&signer.address(), "core")
        .unwrap()
        .to_bech32("corevaloper");
    let err = Staking::new(&app)
        .create_validator(
            MsgCreateValidator {
                description: Some(Description::default()),
                commission: Some(CommissionRates {
                    rate: "0.1".to_string(),
                    max_rate: "0.2".to_string(),
                    max_change_rate: "0.01".to_string(),
                }),
                min_self_delegation: "1".to_string(),
                delegator_address: signer.address(),
                validator_address: operator,
                pubkey: Some(Ed25519Key::generate().public_key_any()),
                value: Some(Coin::new(1_000, DENOM)),
            },
            &signer,
        )
        .unwrap_err();
    assert!(err.to_string().contains("min self delegation"), "{}", err);
}

#[test]
fn test_genesis_validator_accessors() {
    let app = TestApp::new().unwrap();
    let valoper = app.get_first_validator_address().unwrap();
    let operator = app.get_first_validator_signing_account().unwrap();
    assert_eq!(
        Address::from_bech32(&valoper, "corevaloper").unwrap(),
        Address::from_bech32(&operator.address(), "core").unwrap()
    );
    assert!(matches!(
        app.get_validator_address(5),
        Err(RunnerError::Fatal(_))
    ));

    let validators = Staking::new(&app)
        .query_validators(&QueryValidatorsRequest::default())
        .unwrap()
        .validators;
    let cons = address_from_pubkey_any(validators[0].consensus_pubkey.as_ref().unwrap())
        .unwrap()
        .to_bech32("corevalcons");
    let info = Slashing::new(&app)
        .query_signing_info(&QuerySigningInfoRequest { cons_address: cons })
        .unwrap()
        .val_signing_info
        .unwrap();
    assert!(!info.tombstoned);
}

#[test]
fn test_store_code_and_query_it_back() {
    let app = TestApp::new().unwrap();
    let sender = app.init_account(&[Coin::new(1_000, DENOM)]).unwrap();
    let code = b"\0asm\x01\0\0\0".to_vec();
    let wasm = Wasm::new(&app);
    let res = wasm
        .store_code(
            MsgStoreCode {
                sender: sender.address(),
                wasm_byte_code: code.clone(),
            },
            &sender,
        )
        .unwrap();
    assert_eq!(res.data.code_id, 1);

    let stored = wasm.query_code(&QueryCodeRequest { code_id: 1 }).unwrap();
    assert_eq!(stored.data, code);
    assert_eq!(stored.code_info.unwrap().creator, sender.address());
}

#[test]
fn test_auth_account_query() {
    let app = TestApp::new().unwrap();
    let alice = app.init_account(&[Coin::new(1, DENOM)]).unwrap();
    let auth = Auth::new(&app);
    let account = auth.base_account(&alice.address()).unwrap().unwrap();
    assert_eq!(account.sequence, 0);
    assert_eq!(
        account.account_number,
        app.account_number(&alice.address()).unwrap()
    );

    let missing = chain_tube_types::Secp256k1Key::generate()
        .address()
        .to_bech32("core");
    let err = auth
        .query_account(&QueryAccountRequest { address: missing })
        .unwrap_err();
    assert!(matches!(err, RunnerError::QueryError { .. }));
}

#[test]
fn test_unknown_route_is_query_error() {
    let app = TestApp::new().unwrap();
    let err = app
        .query::<QueryBalanceRequest, chain_tube::proto::bank::QueryBalanceResponse>(
            "/cosmos.bank.v1beta1.Query/Nope",
            &QueryBalanceRequest::default(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        RunnerError::QueryError {
            msg: "No route found for `/cosmos.bank.v1beta1.Query/Nope`".to_string()
        }
    );
}

#[test]
fn test_param_sets() {
    let app = TestApp::new().unwrap();
    let params = AssetNftParams {
        mint_fee: Some(Coin::new(7, DENOM)),
    };
    app.set_param_set("assetnft", &params).unwrap();
    assert_eq!(app.get_param_set::<AssetNftParams>("assetnft").unwrap(), params);

    let err = app
        .set_param_set("assetnft", &Coin::new(1, DENOM))
        .unwrap_err();
    assert_eq!(
        err,
        RunnerError::ExecuteError {
            msg: "No param set found for `/cosmos.base.v1beta1.Coin`".to_string()
        }
    );
}

#[test]
fn test_asset_module_params() {
    let app = TestApp::new().unwrap();
    let asset_ft = AssetFt::new(&app);
    let genesis = asset_ft.params().unwrap();
    assert_eq!(genesis.issue_fee, Some(Coin::new(10_000_000, DENOM)));

    let updated = AssetFtParams {
        issue_fee: Some(Coin::new(5, DENOM)),
        ..genesis
    };
    asset_ft.set_params(&updated).unwrap();
    assert_eq!(asset_ft.params().unwrap(), updated);

    let asset_nft = AssetNft::new(&app);
    let err = asset_nft
        .set_params(&AssetNftParams {
            mint_fee: Some(Coin {
                denom: DENOM.to_string(),
                amount: "free".to_string(),
            }),
        })
        .unwrap_err();
    match err {
        RunnerError::ExecuteError { msg } => assert!(msg.contains("mint fee"), "{}", msg),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(asset_nft.params().unwrap().mint_fee, Some(Coin::new(0, DENOM)));
}

#[test]
fn test_environments_share_nothing() {
    let root = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        temp_root: Some(root.path().to_path_buf()),
        ..HarnessConfig::default()
    };
    let service = Arc::new(HarnessService::new(config));

    let a = TestApp::with_service(Arc::clone(&service)).unwrap();
    let b = TestApp::with_service(Arc::clone(&service)).unwrap();
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 2);

    let alice = a.init_account(&[Coin::new(5, DENOM)]).unwrap();
    a.finalize_block().unwrap();
    a.increase_time(30).unwrap();

    assert_eq!(a.get_block_height().unwrap(), b.get_block_height().unwrap() + 2);
    assert!(matches!(
        b.account_sequence(&alice.address()),
        Err(RunnerError::EncodeError(_))
    ));

    drop(a);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    drop(b);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    assert!(service.registry().is_empty());
}
