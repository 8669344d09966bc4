//! Requests and responses exchanged with the consensus driver.

use chrono::{DateTime, Utc};

use chain_tube_types::proto::abci::Event;
use chain_tube_types::{Address, Any};

/// Block limits enforced on every delivered transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Maximum encoded transaction bytes per block; `<= 0` disables the check.
    pub max_bytes: i64,
    /// Maximum gas per block; `<= 0` disables the check.
    pub max_gas: i64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            max_bytes: 22_020_096,
            max_gas: -1,
        }
    }
}

/// Voting power change for one consensus key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorUpdate {
    pub pub_key: Any,
    pub power: i64,
}

#[derive(Debug, Clone)]
pub struct InitChainRequest {
    pub chain_id: String,
    pub genesis_time: DateTime<Utc>,
    pub initial_height: i64,
    pub consensus_params: ConsensusParams,
    pub validators: Vec<ValidatorUpdate>,
    /// JSON genesis document.
    pub app_state_bytes: Vec<u8>,
}

/// One validator's participation in the previous block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteInfo {
    /// Consensus address.
    pub validator: Address,
    pub power: i64,
    pub signed: bool,
}

#[derive(Debug, Clone)]
pub struct FinalizeBlockRequest {
    pub height: i64,
    pub time: DateTime<Utc>,
    pub proposer: Address,
    pub votes: Vec<VoteInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct FinalizeBlockResponse {
    pub events: Vec<Event>,
    pub validator_updates: Vec<ValidatorUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResponse {
    pub height: i64,
    pub app_hash: Vec<u8>,
}
