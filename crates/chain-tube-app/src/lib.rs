//! In-memory single-validator chain application.
//!
//! This crate is the application the harness drives. It keeps all state in
//! an ordered in-memory store and exposes the handful of entry points a
//! consensus driver needs:
//!
//! - [`ChainApp::init_chain`] - load a JSON genesis document
//! - [`ChainApp::finalize_block`] / [`ChainApp::commit`] - produce blocks
//! - [`ChainApp::deliver_tx`] / [`ChainApp::simulate_tx`] - run transactions
//! - [`ChainApp::query`] and the [`QueryRouter`] - gRPC-path queries
//! - [`Keepers`] - direct access to module state
//!
//! Modules: auth, bank, staking, slashing, params and a wasm code store.

pub mod abci;
pub mod app;
pub mod context;
pub mod decimal;
pub mod errors;
pub mod genesis;
pub mod modules;
pub mod query;
pub mod store;
pub mod tx;

pub use abci::{
    CommitResponse, ConsensusParams, FinalizeBlockRequest, FinalizeBlockResponse,
    InitChainRequest, ValidatorUpdate, VoteInfo,
};
pub use app::{AppOptions, ChainApp};
pub use context::{BlockHeader, Context, ExecMode, GasMeter};
pub use errors::{AppError, AppResult};
pub use genesis::GenesisState;
pub use modules::{Keepers, ParamSet, Params, ParamsKeeper, Subspace};
pub use query::{QueryHandler, QueryRouter};
pub use store::{CacheStore, KvStore, MemStore};
