//! The chain application: genesis, block finalization, commit.
//!
//! [`ChainApp`] owns two stores. `working` accumulates every change since the
//! last commit (genesis, finalized blocks, delivered transactions);
//! `committed` is the snapshot taken by the last [`ChainApp::commit`].
//! Queries and transactions always see the working state.

use std::path::{Path, PathBuf};

use chain_tube_types::proto::abci::Event;
use chain_tube_types::proto::auth::BaseAccount;
use chain_tube_types::Bech32Prefixes;

use crate::abci::{
    CommitResponse, ConsensusParams, FinalizeBlockRequest, FinalizeBlockResponse,
    InitChainRequest, ValidatorUpdate,
};
use crate::context::{BlockHeader, Context};
use crate::errors::{AppError, AppResult};
use crate::genesis::GenesisState;
use crate::modules::auth::MODULE_ACCOUNTS;
use crate::modules::params::{
    SUBSPACE_ASSET_FT, SUBSPACE_ASSET_NFT, SUBSPACE_CUSTOM, SUBSPACE_GOV, SUBSPACE_SLASHING,
    SUBSPACE_WASM,
};
use crate::modules::Keepers;
use crate::query::QueryRouter;
use crate::store::{CacheStore, KvStore, MemStore};

/// Construction options for a [`ChainApp`].
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub chain_id: String,
    /// Home directory; contract bytecode lands under `<home>/wasm`.
    pub home: PathBuf,
    /// Upper bound on uploaded contract size in bytes.
    pub max_wasm_size: u64,
    pub prefixes: Bech32Prefixes,
}

pub struct ChainApp {
    options: AppOptions,
    keepers: Keepers,
    working: MemStore,
    committed: MemStore,
    consensus: ConsensusParams,
    last_header: Option<BlockHeader>,
    last_commit: Option<CommitResponse>,
    block_gas_used: u64,
    query_router: QueryRouter,
}

impl std::fmt::Debug for ChainApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainApp")
            .field("chain_id", &self.options.chain_id)
            .field("home", &self.options.home)
            .field("last_header", &self.last_header)
            .field("entries", &self.working.len())
            .finish()
    }
}

impl ChainApp {
    pub fn new(store: MemStore, options: AppOptions) -> Self {
        let keepers = Keepers::new(
            options.prefixes.clone(),
            options.home.clone(),
            options.max_wasm_size,
        );
        Self {
            options,
            keepers,
            committed: store.clone(),
            working: store,
            consensus: ConsensusParams::default(),
            last_header: None,
            last_commit: None,
            block_gas_used: 0,
            query_router: QueryRouter::new(),
        }
    }

    pub fn keepers(&self) -> &Keepers {
        &self.keepers
    }

    /// Working state.
    pub fn store(&self) -> &MemStore {
        &self.working
    }

    /// Keepers and the working state borrowed together.
    pub fn split_mut(&mut self) -> (&Keepers, &mut MemStore) {
        (&self.keepers, &mut self.working)
    }

    pub(crate) fn tx_parts_mut(&mut self) -> (&Keepers, &mut MemStore, ConsensusParams, &mut u64) {
        (
            &self.keepers,
            &mut self.working,
            self.consensus,
            &mut self.block_gas_used,
        )
    }

    /// State as of the last commit.
    pub fn committed_store(&self) -> &MemStore {
        &self.committed
    }

    pub fn chain_id(&self) -> &str {
        &self.options.chain_id
    }

    pub fn home(&self) -> &Path {
        &self.options.home
    }

    pub fn consensus_params(&self) -> ConsensusParams {
        self.consensus
    }

    pub fn last_header(&self) -> Option<&BlockHeader> {
        self.last_header.as_ref()
    }

    pub fn last_commit(&self) -> Option<&CommitResponse> {
        self.last_commit.as_ref()
    }

    pub fn block_gas_used(&self) -> u64 {
        self.block_gas_used
    }

    /// Dispatch a query by route path against the working state.
    pub fn query(&self, ctx: &Context, path: &str, data: &[u8]) -> AppResult<Vec<u8>> {
        let handler = self
            .query_router
            .route(path)
            .ok_or_else(|| AppError::NoRoute(path.to_string()))?;
        handler(self, ctx, data)
    }

    /// Load the genesis document and return the initial validator set.
    ///
    /// When the request carries validators they must match the bonded
    /// validators of the genesis document exactly.
    pub fn init_chain(&mut self, req: InitChainRequest) -> AppResult<Vec<ValidatorUpdate>> {
        if self.last_header.is_some() {
            return Err(AppError::InvalidRequest("chain already initialized".to_string()));
        }
        if req.chain_id != self.options.chain_id {
            return Err(AppError::InvalidGenesis(format!(
                "invalid chain-id on InitChain; expected: {}, got: {}",
                self.options.chain_id, req.chain_id
            )));
        }
        if req.initial_height < 1 {
            return Err(AppError::InvalidGenesis(format!(
                "initial height must be positive, got {}",
                req.initial_height
            )));
        }
        let genesis = GenesisState::from_json(&req.app_state_bytes)?;

        let mut branch = CacheStore::new(&self.working);
        let updates = init_genesis(&self.keepers, &mut branch, &genesis)?;
        if !req.validators.is_empty() {
            check_validator_set(&req.validators, &updates)?;
        }
        branch.into_writes().apply(&mut self.working);

        self.consensus = req.consensus_params;
        self.last_header = Some(BlockHeader {
            chain_id: req.chain_id,
            height: req.initial_height - 1,
            time: req.genesis_time,
        });
        tracing::debug!(
            chain_id = %self.options.chain_id,
            validators = updates.len(),
            "chain initialized"
        );
        Ok(updates)
    }

    /// Run begin-block and end-block logic for the next height.
    ///
    /// Height must follow the last header by exactly one, time must not go
    /// backwards and the proposer must be a known validator. Nothing is
    /// written when any step fails.
    pub fn finalize_block(&mut self, req: FinalizeBlockRequest) -> AppResult<FinalizeBlockResponse> {
        let last = self
            .last_header
            .as_ref()
            .ok_or_else(|| AppError::InvalidBlock("chain is not initialized".to_string()))?;
        if req.height != last.height + 1 {
            return Err(AppError::InvalidBlock(format!(
                "invalid height: expected {}, got {}",
                last.height + 1,
                req.height
            )));
        }
        if req.time < last.time {
            return Err(AppError::InvalidBlock(format!(
                "block time {} is before previous block time {}",
                req.time, last.time
            )));
        }
        let keepers = &self.keepers;
        if keepers
            .staking
            .validator_by_cons(&self.working, &req.proposer)?
            .is_none()
        {
            return Err(AppError::InvalidBlock(format!(
                "unknown proposer {}",
                keepers.slashing.cons_bech32(&req.proposer)
            )));
        }

        let header = BlockHeader {
            chain_id: self.options.chain_id.clone(),
            height: req.height,
            time: req.time,
        };
        let ctx = Context::new(header.clone());
        let mut branch = CacheStore::new(&self.working);
        keepers.slashing.begin_block(&mut branch, &req.votes)?;
        let validator_updates = keepers.staking.end_block(&mut branch, &ctx)?;
        branch.into_writes().apply(&mut self.working);

        let mut events = vec![Event::new("new_block")
            .attr("height", req.height.to_string())
            .attr("proposer", keepers.slashing.cons_bech32(&req.proposer))];
        events.extend(validator_updates.iter().map(|u| {
            Event::new("validator_update").attr("power", u.power.to_string())
        }));

        tracing::trace!(height = req.height, time = %req.time, updates = validator_updates.len(), "block finalized");
        self.last_header = Some(header);
        self.block_gas_used = 0;
        Ok(FinalizeBlockResponse {
            events,
            validator_updates,
        })
    }

    /// Snapshot the working state as the new committed state.
    pub fn commit(&mut self) -> CommitResponse {
        self.committed = self.working.clone();
        let response = CommitResponse {
            height: self.last_header.as_ref().map(|h| h.height).unwrap_or(0),
            app_hash: self.committed.root_hash(),
        };
        tracing::debug!(height = response.height, app_hash = %hex::encode(&response.app_hash), "committed");
        self.last_commit = Some(response.clone());
        response
    }
}

fn init_genesis(
    keepers: &Keepers,
    store: &mut dyn KvStore,
    genesis: &GenesisState,
) -> AppResult<Vec<ValidatorUpdate>> {
    let auth = &keepers.auth;

    let mut next_number = auth.peek_account_number(store);
    for account in &genesis.auth.accounts {
        let addr = auth.parse_address(&account.address)?;
        if auth.has_account(store, &addr) {
            return Err(AppError::InvalidGenesis(format!(
                "duplicate genesis account {}",
                account.address
            )));
        }
        auth.set_account(
            store,
            &addr,
            &BaseAccount {
                address: auth.bech32(&addr),
                pub_key: None,
                account_number: account.account_number,
                sequence: account.sequence,
            },
        );
        next_number = next_number.max(account.account_number + 1);
    }
    auth.set_next_account_number(store, next_number);
    for (name, _) in MODULE_ACCOUNTS {
        auth.ensure_module_account(store, name)?;
    }

    let params = &keepers.params;
    params.set(store, SUBSPACE_SLASHING, &genesis.slashing.params)?;
    params.set(store, SUBSPACE_GOV, &genesis.gov.params)?;
    params.set(store, SUBSPACE_WASM, &genesis.wasm.params)?;
    params.set(store, SUBSPACE_ASSET_FT, &genesis.assetft.params)?;
    params.set(store, SUBSPACE_ASSET_NFT, &genesis.assetnft.params)?;
    params.set(store, SUBSPACE_CUSTOM, &genesis.customparams.staking_params)?;

    let balances = genesis
        .bank
        .balances
        .iter()
        .map(|b| Ok((auth.parse_address(&b.address)?, b.coins.clone())))
        .collect::<AppResult<Vec<_>>>()?;
    keepers
        .bank
        .init_genesis(store, &genesis.bank.params, &balances, &genesis.bank.supply)?;

    let validators = genesis
        .staking
        .validators
        .iter()
        .map(|v| v.to_validator())
        .collect::<AppResult<Vec<_>>>()?;
    let delegations: Vec<_> = genesis
        .staking
        .delegations
        .iter()
        .map(|d| d.to_delegation())
        .collect();
    let updates =
        keepers
            .staking
            .init_genesis(store, &genesis.staking.params, &validators, &delegations)?;

    for info in &genesis.slashing.signing_infos {
        let cons = keepers.slashing.parse_cons_address(&info.address)?;
        let record = keepers.slashing.new_signing_info(&cons, info.start_height);
        keepers.slashing.set_signing_info(store, &cons, &record);
    }
    Ok(updates)
}

fn check_validator_set(requested: &[ValidatorUpdate], genesis: &[ValidatorUpdate]) -> AppResult<()> {
    if requested.len() != genesis.len() {
        return Err(AppError::InvalidGenesis(format!(
            "len(RequestInitChain.Validators) != len(GenValidators) ({} != {})",
            requested.len(),
            genesis.len()
        )));
    }
    for update in requested {
        if !genesis.contains(update) {
            return Err(AppError::InvalidGenesis(format!(
                "genesis validator with power {} does not match the validator set",
                update.power
            )));
        }
    }
    Ok(())
}
