//! Boundary operations.
//!
//! [`HarnessService`] is the single object every foreign call goes through.
//! It owns the environment registry and the process-wide execution lock;
//! each operation resolves a handle, performs one state transition or read
//! and, where a domain failure is possible, answers with a
//! [`ResultEnvelope`].
//!
//! Lock order: execution lock, then registry, then the environment entry.

use std::sync::Arc;

use parking_lot::Mutex;

use chain_tube_types::coin::parse_coins_json;
use chain_tube_types::encoding::{base64_decode, base64_encode};

use crate::config::HarnessConfig;
use crate::environment::Environment;
use crate::errors::{FatalError, FatalResult};
use crate::param_registry::ParamTypeRegistry;
use crate::registry::{EnvHandle, EnvironmentRegistry};
use crate::result::ResultEnvelope;

fn decode_b64(b64: &str, what: &str) -> FatalResult<Vec<u8>> {
    base64_decode(b64, what).map_err(|e| FatalError::Base64(e.to_string()))
}

#[derive(Debug)]
pub struct HarnessService {
    config: HarnessConfig,
    registry: EnvironmentRegistry,
    param_types: Arc<ParamTypeRegistry>,
    /// Serializes application execution across all environments.
    exec_lock: Mutex<()>,
}

impl Default for HarnessService {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl HarnessService {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            registry: EnvironmentRegistry::new(),
            param_types: Arc::new(ParamTypeRegistry::with_defaults()),
            exec_lock: Mutex::new(()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(HarnessConfig::from_env())
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    fn env(&self, id: u64) -> FatalResult<EnvHandle> {
        self.registry.load(id)
    }

    /// Boot a new environment and return its handle.
    pub fn create(&self) -> FatalResult<u64> {
        let _exec = self.exec_lock.lock();
        let env = Environment::create(&self.config, Arc::clone(&self.param_types))?;
        let id = self.registry.insert(env);
        tracing::debug!(env_id = id, "environment created");
        Ok(id)
    }

    /// Remove an environment and its scratch directory. Unknown or already
    /// cleaned handles are ignored.
    pub fn cleanup(&self, id: u64) -> FatalResult<()> {
        let Some(entry) = self.registry.remove(id) else {
            tracing::trace!(env_id = id, "cleanup of unknown environment ignored");
            return Ok(());
        };
        let mut env = entry.lock();
        env.cleanup()?;
        tracing::debug!(env_id = id, "environment cleaned up");
        Ok(())
    }

    /// Fund a fresh account with `coins_json` (a coin or a list of coins)
    /// and return its base64 private key.
    pub fn fund_account(&self, id: u64, coins_json: &str) -> FatalResult<String> {
        let coins = parse_coins_json(coins_json).map_err(|e| FatalError::CoinsJson(e.to_string()))?;
        let entry = self.env(id)?;
        let key = entry.lock().fund_account(&coins)?;
        Ok(base64_encode(&key.to_bytes()))
    }

    /// Finalize one block `seconds` later without committing.
    pub fn advance_time(&self, id: u64, seconds: u64) -> FatalResult<()> {
        let entry = self.env(id)?;
        let mut env = entry.lock();
        env.begin_new_block(seconds)
    }

    /// Finalize and commit one block one second later.
    pub fn finalize_block(&self, id: u64) -> FatalResult<()> {
        let entry = self.env(id)?;
        let mut env = entry.lock();
        env.finalize_block()
    }

    pub fn execute(&self, id: u64, tx_b64: &str) -> FatalResult<ResultEnvelope> {
        let _exec = self.exec_lock.lock();
        let tx = decode_b64(tx_b64, "transaction")?;
        let entry = self.env(id)?;
        let mut env = entry.lock();
        Ok(env.execute(&tx).into())
    }

    pub fn simulate(&self, id: u64, tx_b64: &str) -> FatalResult<ResultEnvelope> {
        let _exec = self.exec_lock.lock();
        let tx = decode_b64(tx_b64, "transaction")?;
        let entry = self.env(id)?;
        let env = entry.lock();
        Ok(env.simulate(&tx).into())
    }

    pub fn query(&self, id: u64, path: &str, query_b64: &str) -> FatalResult<ResultEnvelope> {
        let data = decode_b64(query_b64, "query message")?;
        let entry = self.env(id)?;
        let env = entry.lock();
        Ok(env.query(path, &data).into())
    }

    /// Block time of the current context in unix nanoseconds.
    pub fn block_time(&self, id: u64) -> FatalResult<i64> {
        self.env(id)?.lock().block_time_nanos()
    }

    pub fn block_height(&self, id: u64) -> FatalResult<i64> {
        Ok(self.env(id)?.lock().block_height())
    }

    pub fn account_sequence(&self, id: u64, address: &str) -> FatalResult<u64> {
        Ok(self.env(id)?.lock().account(address)?.sequence)
    }

    pub fn account_number(&self, id: u64, address: &str) -> FatalResult<u64> {
        Ok(self.env(id)?.lock().account(address)?.account_number)
    }

    /// Store an `Any`-encoded parameter set; the success payload is empty.
    pub fn set_param_set(&self, id: u64, subspace: &str, any_b64: &str) -> FatalResult<ResultEnvelope> {
        let _exec = self.exec_lock.lock();
        let any_bytes = decode_b64(any_b64, "param set")?;
        let entry = self.env(id)?;
        let mut env = entry.lock();
        Ok(env.set_param_set(subspace, &any_bytes).map(|()| Vec::new()).into())
    }

    pub fn get_param_set(&self, id: u64, subspace: &str, type_url: &str) -> FatalResult<ResultEnvelope> {
        let entry = self.env(id)?;
        let env = entry.lock();
        Ok(env.get_param_set(subspace, type_url).into())
    }

    /// Operator address of the `index`-th validator.
    pub fn validator_address(&self, id: u64, index: i32) -> FatalResult<String> {
        let addresses = self.env(id)?.lock().validator_addresses()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| addresses.get(i).cloned())
            .ok_or(FatalError::ValidatorIndex {
                index,
                count: addresses.len(),
            })
    }

    /// Base64 private key of the genesis validator operator.
    pub fn validator_private_key(&self, id: u64) -> FatalResult<String> {
        Ok(base64_encode(self.env(id)?.lock().validator_key()))
    }
}
