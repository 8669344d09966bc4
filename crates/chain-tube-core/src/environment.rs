//! One isolated chain instance and its block lifecycle.
//!
//! An [`Environment`] owns its application, the context of the last
//! finalized block, the validator key and the scratch directory backing the
//! application home. Block production and genesis failures are fatal: an
//! environment that cannot advance is of no use to the caller.

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use prost::Message;
use tempfile::TempDir;

use chain_tube_app::modules::auth::{BONDED_POOL, NOT_BONDED_POOL};
use chain_tube_app::{
    BlockHeader, CacheStore, ChainApp, CommitResponse, Context, FinalizeBlockRequest, VoteInfo,
};
use chain_tube_types::proto::abci::SimulationResponse;
use chain_tube_types::proto::auth::BaseAccount;
use chain_tube_types::proto::staking::{
    BondStatus, CommissionRates, Description, MsgCreateValidator,
};
use chain_tube_types::{Address, Any, Coin, Ed25519Key, Secp256k1Key};

use crate::bootstrap::setup_application;
use crate::config::HarnessConfig;
use crate::errors::{FatalError, FatalResult};
use crate::param_registry::ParamTypeRegistry;
use crate::result::ReportedError;

/// Voting power attached to the synthetic proposer vote.
pub const PROPOSER_VOTE_POWER: i64 = 1000;

/// Time between genesis and the first block.
pub const GENESIS_BLOCK_DELTA_SECS: u64 = 5;

/// Self-bond of validators created by [`Environment::setup_validator`].
pub const SETUP_VALIDATOR_SELF_BOND: u128 = 100;

pub struct Environment {
    app: ChainApp,
    ctx: Context,
    param_types: Arc<ParamTypeRegistry>,
    validator_key: Vec<u8>,
    scratch_dir: Option<TempDir>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("height", &self.ctx.block_height())
            .field("time", &self.ctx.block_time())
            .field("scratch_dir", &self.scratch_path())
            .finish_non_exhaustive()
    }
}

fn block_err(e: impl std::fmt::Display) -> FatalError {
    FatalError::Block(format!("can't begin a new block: {}", e))
}

fn state_err(e: impl std::fmt::Display) -> FatalError {
    FatalError::State(e.to_string())
}

impl Environment {
    /// Boot a new environment: scratch directory, application, genesis block.
    ///
    /// The scratch directory is removed again if any step fails.
    pub fn create(config: &HarnessConfig, param_types: Arc<ParamTypeRegistry>) -> FatalResult<Self> {
        let scratch_dir = config
            .scratch_dir()
            .map_err(|e| FatalError::ScratchDir(e.to_string()))?;
        let network = config.network_for_new_env();
        let (app, validator_key) = setup_application(scratch_dir.path(), &network)
            .map_err(|e| FatalError::Bootstrap(format!("{:#}", e)))?;
        let mut env = Self::from_parts(app, validator_key, param_types, Some(scratch_dir))?;
        env.produce_genesis_block()?;
        Ok(env)
    }

    /// Wrap an initialized application. The context starts at the
    /// application's last header.
    pub fn from_parts(
        app: ChainApp,
        validator_key: Vec<u8>,
        param_types: Arc<ParamTypeRegistry>,
        scratch_dir: Option<TempDir>,
    ) -> FatalResult<Self> {
        let header = app
            .last_header()
            .cloned()
            .ok_or_else(|| FatalError::Bootstrap("chain is not initialized".to_string()))?;
        Ok(Self {
            app,
            ctx: Context::new(header),
            param_types,
            validator_key,
            scratch_dir,
        })
    }

    /// Seed the genesis validator's signing info, produce the first block
    /// and commit it.
    fn produce_genesis_block(&mut self) -> FatalResult<()> {
        let (keepers, store) = self.app.split_mut();
        let validators = keepers.staking.validators(&*store).map_err(state_err)?;
        let first = validators
            .first()
            .ok_or_else(|| FatalError::Bootstrap("genesis has no validators".to_string()))?;
        let cons = keepers.staking.consensus_address(first).map_err(state_err)?;
        let info = keepers.slashing.new_signing_info(&cons, 0);
        keepers.slashing.set_signing_info(store, &cons, &info);

        self.begin_new_block(GENESIS_BLOCK_DELTA_SECS)?;
        let commit = self.commit();
        tracing::debug!(height = commit.height, "genesis block committed");
        Ok(())
    }

    pub fn app(&self) -> &ChainApp {
        &self.app
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn validator_key(&self) -> &[u8] {
        &self.validator_key
    }

    /// `None` once the environment has been cleaned up.
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch_dir.as_ref().map(|d| d.path())
    }

    pub fn block_height(&self) -> i64 {
        self.ctx.block_height()
    }

    /// Block time in nanoseconds since the unix epoch.
    pub fn block_time_nanos(&self) -> FatalResult<i64> {
        self.ctx.block_time().timestamp_nanos_opt().ok_or_else(|| {
            FatalError::State(format!(
                "block time {} is outside the nanosecond range",
                self.ctx.block_time()
            ))
        })
    }

    fn next_header(&self, delta_secs: u64) -> FatalResult<BlockHeader> {
        let time = i64::try_from(delta_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|delta| self.ctx.block_time().checked_add_signed(delta))
            .ok_or_else(|| block_err(format!("time increase of {}s overflows", delta_secs)))?;
        Ok(BlockHeader {
            chain_id: self.ctx.chain_id().to_string(),
            height: self.ctx.block_height() + 1,
            time,
        })
    }

    /// Consensus address of the block proposer, bootstrapping a bonded
    /// validator when none exists.
    fn proposer(&mut self) -> FatalResult<Address> {
        let staking = &self.app.keepers().staking;
        let bonded = staking.bonded_validators(self.app.store()).map_err(block_err)?;
        if let Some(validator) = bonded.first() {
            return staking.consensus_address(validator).map_err(block_err);
        }
        tracing::warn!(height = self.ctx.block_height(), "no bonded validator, creating one");
        let operator = self.setup_validator(BondStatus::Bonded)?;
        let staking = &self.app.keepers().staking;
        let validator = staking
            .validator(self.app.store(), &operator)
            .map_err(block_err)?
            .ok_or_else(|| block_err("bootstrapped validator is missing"))?;
        staking.consensus_address(&validator).map_err(block_err)
    }

    /// Finalize one block `delta_secs` after the current one, without
    /// committing. The proposer casts the block's only vote.
    pub fn begin_new_block(&mut self, delta_secs: u64) -> FatalResult<()> {
        let proposer = self.proposer()?;
        let header = self.next_header(delta_secs)?;
        self.app
            .finalize_block(FinalizeBlockRequest {
                height: header.height,
                time: header.time,
                proposer,
                votes: vec![VoteInfo {
                    validator: proposer,
                    power: PROPOSER_VOTE_POWER,
                    signed: true,
                }],
            })
            .map_err(block_err)?;
        tracing::trace!(height = header.height, time = %header.time, "block finalized");
        self.ctx = Context::new(header);
        Ok(())
    }

    pub fn commit(&mut self) -> CommitResponse {
        self.app.commit()
    }

    /// One block one second later, committed.
    pub fn finalize_block(&mut self) -> FatalResult<()> {
        self.begin_new_block(1)?;
        self.commit();
        Ok(())
    }

    /// Create a validator directly through the staking keeper and force its
    /// bond status.
    ///
    /// The self-bond is moved into the bonded pool by hand since no
    /// end-block bonding runs for it, and a signing info is seeded so the
    /// validator can vote in the next block.
    pub fn setup_validator(&mut self, status: BondStatus) -> FatalResult<Address> {
        let consensus_key = Ed25519Key::generate();
        let operator = consensus_key.address();
        let height = self.ctx.block_height();
        let (keepers, store) = self.app.split_mut();

        let mut branch = CacheStore::new(&*store);
        let bond_denom = keepers.staking.bond_denom(&branch).map_err(state_err)?;
        let self_bond = Coin::new(SETUP_VALIDATOR_SELF_BOND, bond_denom);
        keepers
            .bank
            .fund_account(&mut branch, &operator, std::slice::from_ref(&self_bond))
            .map_err(state_err)?;

        let rate = "0.05".to_string();
        let msg = MsgCreateValidator {
            description: Some(Description::default()),
            commission: Some(CommissionRates {
                rate: rate.clone(),
                max_rate: rate.clone(),
                max_change_rate: rate,
            }),
            min_self_delegation: "1".to_string(),
            delegator_address: keepers.auth.bech32(&operator),
            validator_address: keepers.staking.valoper_bech32(&operator),
            pubkey: Some(consensus_key.public_key_any()),
            value: Some(self_bond.clone()),
        };
        keepers
            .staking
            .create_validator(&mut branch, &msg)
            .map_err(state_err)?;
        keepers
            .bank
            .send_between_modules(&mut branch, NOT_BONDED_POOL, BONDED_POOL, &[self_bond])
            .map_err(state_err)?;
        keepers
            .staking
            .set_validator_status(&mut branch, &operator, status)
            .map_err(state_err)?;

        let cons = consensus_key.address();
        let info = keepers.slashing.new_signing_info(&cons, height);
        keepers.slashing.set_signing_info(&mut branch, &cons, &info);

        branch.into_writes().apply(store);
        tracing::debug!(
            operator = %keepers.staking.valoper_bech32(&operator),
            status = status.as_str_name(),
            "validator set up"
        );
        Ok(operator)
    }

    /// Operator addresses of all validators, in store order.
    pub fn validator_addresses(&self) -> FatalResult<Vec<String>> {
        Ok(self
            .app
            .keepers()
            .staking
            .validators(self.app.store())
            .map_err(state_err)?
            .into_iter()
            .map(|v| v.operator_address)
            .collect())
    }

    /// Mint `coins` to a freshly generated account and return its key.
    pub fn fund_account(&mut self, coins: &[Coin]) -> FatalResult<Secp256k1Key> {
        let key = Secp256k1Key::generate();
        let addr = key.address();
        let (keepers, store) = self.app.split_mut();
        keepers
            .bank
            .fund_account(store, &addr, coins)
            .map_err(|e| FatalError::State(format!("Failed to fund account: {}", e)))?;
        if !keepers.auth.has_account(&*store, &addr) {
            keepers.auth.new_account(store, &addr).map_err(state_err)?;
        }
        tracing::trace!(address = %keepers.auth.bech32(&addr), "account funded");
        Ok(key)
    }

    /// Account at a bech32 account address.
    pub fn account(&self, address: &str) -> FatalResult<BaseAccount> {
        let auth = &self.app.keepers().auth;
        let addr = auth.parse_address(address).map_err(|e| FatalError::Address {
            input: address.to_string(),
            reason: e.to_string(),
        })?;
        auth.get_account(self.app.store(), &addr)
            .map_err(state_err)?
            .ok_or_else(|| FatalError::AccountNotFound(address.to_string()))
    }

    /// Deliver a transaction in the current block.
    ///
    /// Success payload: an encoded `SimulationResponse`.
    pub fn execute(&mut self, tx_bytes: &[u8]) -> Result<Vec<u8>, ReportedError> {
        let (gas_info, result) = self
            .app
            .deliver_tx(&self.ctx, tx_bytes)
            .map_err(|e| ReportedError::execute(e.to_string()))?;
        Ok(SimulationResponse {
            gas_info: Some(gas_info),
            result: Some(result),
        }
        .encode_to_vec())
    }

    /// Dry-run a transaction. Success payload: an encoded `GasInfo`.
    pub fn simulate(&self, tx_bytes: &[u8]) -> Result<Vec<u8>, ReportedError> {
        let (gas_info, _) = self
            .app
            .simulate_tx(&self.ctx, tx_bytes)
            .map_err(|e| ReportedError::execute(e.to_string()))?;
        Ok(gas_info.encode_to_vec())
    }

    pub fn query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>, ReportedError> {
        self.app
            .query(&self.ctx, path, data)
            .map_err(|e| ReportedError::query(e.to_string()))
    }

    fn require_subspace(&self, subspace: &str) -> Result<(), ReportedError> {
        if self.app.keepers().params.subspace(subspace).is_none() {
            return Err(ReportedError::execute(format!(
                "No subspace found for `{}`",
                subspace
            )));
        }
        Ok(())
    }

    /// Store an `Any`-encoded parameter set in `subspace`.
    pub fn set_param_set(&mut self, subspace: &str, any_bytes: &[u8]) -> Result<(), ReportedError> {
        self.require_subspace(subspace)?;
        let any = Any::decode(any_bytes).map_err(|e| ReportedError::execute(e.to_string()))?;
        let params = self
            .param_types
            .unpack_any(&any)
            .map_err(|e| ReportedError::execute(e.to_string()))?;
        let (keepers, store) = self.app.split_mut();
        keepers
            .params
            .set_param_set(store, subspace, params.as_ref())
            .map_err(|e| ReportedError::execute(e.to_string()))?;
        tracing::debug!(subspace, type_url = %any.type_url, "param set updated");
        Ok(())
    }

    /// Protobuf encoding of the `type_url` parameter set stored in `subspace`.
    pub fn get_param_set(&self, subspace: &str, type_url: &str) -> Result<Vec<u8>, ReportedError> {
        self.require_subspace(subspace)?;
        let mut params = self
            .param_types
            .empty_param_set(type_url)
            .map_err(|e| ReportedError::execute(e.to_string()))?;
        self.app
            .keepers()
            .params
            .get_param_set(self.app.store(), subspace, params.as_mut())
            .map_err(|e| ReportedError::execute(e.to_string()))?;
        Ok(params.encode_value())
    }

    /// Remove the scratch directory. A second call does nothing.
    pub fn cleanup(&mut self) -> FatalResult<()> {
        match self.scratch_dir.take() {
            Some(dir) => {
                let path = dir.path().display().to_string();
                dir.close()
                    .map_err(|e| FatalError::ScratchDir(format!("failed to remove {}: {}", path, e)))?;
                tracing::debug!(path = %path, "scratch directory removed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
