//! Application bootstrapper.
//!
//! Builds one [`ChainApp`] on a fresh in-memory store and loads a synthesized
//! single-validator genesis into it.

use std::path::Path;

use anyhow::{Context as _, Result};

use chain_tube_app::{
    AppOptions, ChainApp, ConsensusParams, InitChainRequest, MemStore, ValidatorUpdate,
};
use chain_tube_types::{Ed25519Key, Secp256k1Key};

use crate::network::{
    genesis_state_with_val_set, replace_denom, GenesisValidatorSpec, NetworkConfig,
    DEFAULT_BOND_DENOM,
};

/// Contract size ceiling; large enough that unoptimized builds deploy.
pub const MAX_WASM_SIZE: u64 = 1024 * 1024 * 1024 * 1024 * 1024;

/// Block limits matching mainnet.
pub const CONSENSUS_PARAMS: ConsensusParams = ConsensusParams {
    max_bytes: 22_020_096,
    max_gas: 50_000_000,
};

/// Create an application rooted at `home` and initialize its chain.
///
/// Returns the application and the raw secp256k1 private key of the genesis
/// validator's operator.
pub fn setup_application(home: &Path, network: &NetworkConfig) -> Result<(ChainApp, Vec<u8>)> {
    let prefixes = network.prefixes();
    let mut app = ChainApp::new(
        MemStore::new(),
        AppOptions {
            chain_id: network.chain_id.clone(),
            home: home.to_path_buf(),
            max_wasm_size: MAX_WASM_SIZE,
            prefixes: prefixes.clone(),
        },
    );

    let validator_key = Secp256k1Key::generate();
    let validator = GenesisValidatorSpec {
        operator: validator_key.address(),
        consensus_key: Ed25519Key::generate(),
    };
    let validator_set = vec![ValidatorUpdate {
        pub_key: validator.consensus_key.public_key_any(),
        power: 1,
    }];
    let account = Secp256k1Key::generate().address();

    let genesis = genesis_state_with_val_set(network.app_state(), &prefixes, &validator, &account);
    let mut document =
        serde_json::to_value(&genesis).context("failed to serialize genesis state")?;
    let rewritten = replace_denom(&mut document, DEFAULT_BOND_DENOM, &network.denom);
    tracing::trace!(rewritten, denom = %network.denom, "genesis bond denom replaced");
    let app_state_bytes =
        serde_json::to_vec_pretty(&document).context("failed to encode genesis state")?;

    app.init_chain(InitChainRequest {
        chain_id: network.chain_id.clone(),
        genesis_time: network.genesis_time,
        initial_height: 1,
        consensus_params: CONSENSUS_PARAMS,
        validators: validator_set,
        app_state_bytes,
    })
    .map_err(|e| anyhow::anyhow!("can't init chain: {}", e))?;

    tracing::debug!(
        chain_id = %network.chain_id,
        home = %home.display(),
        "application bootstrapped"
    );
    Ok((app, validator_key.to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_tube_app::genesis::GenesisState;
    use chain_tube_types::proto::staking::BondStatus;

    #[test]
    fn test_setup_loads_single_bonded_validator() {
        let home = tempfile::tempdir().unwrap();
        let network = NetworkConfig::default();
        let (app, key) = setup_application(home.path(), &network).unwrap();

        assert_eq!(key.len(), 32);
        let operator = Secp256k1Key::from_bytes(&key).unwrap().address();
        let validators = app.keepers().staking.validators(app.store()).unwrap();
        assert_eq!(validators.len(), 1);
        assert_eq!(validators[0].status, BondStatus::Bonded as i32);
        assert_eq!(
            validators[0].operator_address,
            operator.to_bech32(&network.prefixes().validator)
        );
        assert_eq!(app.last_header().unwrap().height, 0);
        assert_eq!(app.consensus_params(), CONSENSUS_PARAMS);
    }

    #[test]
    fn test_no_stock_denom_survives() {
        let home = tempfile::tempdir().unwrap();
        let network = NetworkConfig::default();
        let (app, _) = setup_application(home.path(), &network).unwrap();
        let bank = &app.keepers().bank;
        assert_eq!(bank.supply_of(app.store(), DEFAULT_BOND_DENOM).unwrap(), 0);
        assert!(bank.supply_of(app.store(), &network.denom).unwrap() > 0);
        assert_eq!(
            app.keepers().staking.bond_denom(app.store()).unwrap(),
            network.denom
        );
    }

    #[test]
    fn test_genesis_document_round_trips() {
        let network = NetworkConfig::default();
        let bytes = serde_json::to_vec(&network.app_state()).unwrap();
        assert_eq!(GenesisState::from_json(&bytes).unwrap(), network.app_state());
    }
}
