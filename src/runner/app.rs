//! [`TestApp`]: one harness environment owned by a Rust test.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use prost::Message;

use chain_tube_core::{FatalError, HarnessService};
use chain_tube_types::encoding::{base64_decode, base64_encode};
use chain_tube_types::proto::abci::{GasInfo, SimulationResponse};
use chain_tube_types::proto::tx::Fee;
use chain_tube_types::{Any, Coin, Secp256k1Key, TypeUrl};

use crate::account::{Account, FeeSetting, SigningAccount};
use crate::runner::error::{DecodeError, EncodeError, RunnerError};
use crate::runner::result::{RawResult, RunnerExecuteResult, RunnerResult};
use crate::runner::Runner;

static SHARED_SERVICE: OnceLock<Arc<HarnessService>> = OnceLock::new();

/// The process-wide service every [`TestApp::new`] environment lives in.
pub fn shared_service() -> Arc<HarnessService> {
    Arc::clone(SHARED_SERVICE.get_or_init(|| Arc::new(HarnessService::from_env())))
}

fn account_error(err: FatalError) -> RunnerError {
    match err {
        FatalError::AccountNotFound(addr) => EncodeError::MissingAccount(addr).into(),
        other => other.into(),
    }
}

/// A chain environment that is cleaned up when dropped.
#[derive(Debug)]
pub struct TestApp {
    service: Arc<HarnessService>,
    id: u64,
}

impl TestApp {
    pub fn new() -> RunnerResult<Self> {
        Self::with_service(shared_service())
    }

    /// Create the environment inside `service` instead of the shared one.
    pub fn with_service(service: Arc<HarnessService>) -> RunnerResult<Self> {
        let id = service.create()?;
        tracing::debug!(env_id = id, "test app created");
        Ok(Self { service, id })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn service(&self) -> &HarnessService {
        &self.service
    }

    pub fn chain_id(&self) -> &str {
        &self.service.config().network.chain_id
    }

    pub fn denom(&self) -> &str {
        &self.service.config().network.denom
    }

    pub fn address_prefix(&self) -> &str {
        &self.service.config().network.address_prefix
    }

    fn signing_account(&self, key_b64: &str) -> RunnerResult<SigningAccount> {
        let bytes = base64_decode(key_b64, "private key")
            .map_err(|e| DecodeError::InvalidKey(e.to_string()))?;
        let key = Secp256k1Key::from_bytes(&bytes).map_err(|e| DecodeError::InvalidKey(e.to_string()))?;
        Ok(SigningAccount::new(
            key,
            self.address_prefix(),
            FeeSetting::auto(self.denom()),
        ))
    }

    /// Create a fresh account holding `coins`.
    pub fn init_account(&self, coins: &[Coin]) -> RunnerResult<SigningAccount> {
        let coins_json =
            serde_json::to_string(coins).map_err(|e| EncodeError::JsonEncodeError(e.to_string()))?;
        let key = self.service.fund_account(self.id, &coins_json)?;
        self.signing_account(&key)
    }

    pub fn init_accounts(&self, coins: &[Coin], count: usize) -> RunnerResult<Vec<SigningAccount>> {
        (0..count).map(|_| self.init_account(coins)).collect()
    }

    /// Produce one block `seconds` later without committing it.
    pub fn increase_time(&self, seconds: u64) -> RunnerResult<()> {
        Ok(self.service.advance_time(self.id, seconds)?)
    }

    pub fn finalize_block(&self) -> RunnerResult<()> {
        Ok(self.service.finalize_block(self.id)?)
    }

    pub fn get_block_time_nanos(&self) -> RunnerResult<i64> {
        Ok(self.service.block_time(self.id)?)
    }

    pub fn get_block_time_seconds(&self) -> RunnerResult<i64> {
        Ok(self.get_block_time_nanos()? / 1_000_000_000)
    }

    pub fn get_block_datetime(&self) -> RunnerResult<DateTime<Utc>> {
        Ok(DateTime::from_timestamp_nanos(self.get_block_time_nanos()?))
    }

    pub fn get_block_height(&self) -> RunnerResult<i64> {
        Ok(self.service.block_height(self.id)?)
    }

    pub fn account_sequence(&self, address: &str) -> RunnerResult<u64> {
        self.service
            .account_sequence(self.id, address)
            .map_err(account_error)
    }

    pub fn account_number(&self, address: &str) -> RunnerResult<u64> {
        self.service
            .account_number(self.id, address)
            .map_err(account_error)
    }

    fn sign(&self, msgs: Vec<Any>, fee: Fee, signer: &SigningAccount) -> RunnerResult<Vec<u8>> {
        let address = signer.address();
        let account_number = self.account_number(&address)?;
        let sequence = self.account_sequence(&address)?;
        Ok(signer.sign_tx(msgs, fee, self.chain_id(), account_number, sequence))
    }

    /// Gas the transaction would use, without changing state.
    pub fn simulate_tx(&self, msgs: Vec<Any>, signer: &SigningAccount) -> RunnerResult<GasInfo> {
        let tx = self.sign(msgs, signer.fee_setting().fee_for(0)?, signer)?;
        let payload = RawResult::from(self.service.simulate(self.id, &base64_encode(&tx))?)
            .into_result()?;
        Ok(GasInfo::decode(payload.as_slice()).map_err(DecodeError::ProtoDecodeError)?)
    }

    fn fee_for(&self, msgs: &[Any], signer: &SigningAccount) -> RunnerResult<Fee> {
        match signer.fee_setting() {
            FeeSetting::Auto { .. } => {
                let gas = self.simulate_tx(msgs.to_vec(), signer)?;
                Ok(signer.fee_setting().fee_for(gas.gas_used)?)
            }
            custom @ FeeSetting::Custom { .. } => Ok(custom.fee_for(0)?),
        }
    }

    pub fn set_param_set<P>(&self, subspace: &str, params: &P) -> RunnerResult<()>
    where
        P: Message + TypeUrl,
    {
        let any = Any::pack(params).encode_to_vec();
        let envelope = self
            .service
            .set_param_set(self.id, subspace, &base64_encode(&any))?;
        RawResult::from(envelope).into_result()?;
        Ok(())
    }

    pub fn get_param_set<P>(&self, subspace: &str) -> RunnerResult<P>
    where
        P: Message + Default + TypeUrl,
    {
        let envelope = self.service.get_param_set(self.id, subspace, P::TYPE_URL)?;
        let payload = RawResult::from(envelope).into_result()?;
        Ok(P::decode(payload.as_slice()).map_err(DecodeError::ProtoDecodeError)?)
    }

    pub fn get_validator_address(&self, index: i32) -> RunnerResult<String> {
        Ok(self.service.validator_address(self.id, index)?)
    }

    pub fn get_first_validator_address(&self) -> RunnerResult<String> {
        self.get_validator_address(0)
    }

    /// Signing account of the genesis validator operator.
    pub fn get_first_validator_signing_account(&self) -> RunnerResult<SigningAccount> {
        let key = self.service.validator_private_key(self.id)?;
        self.signing_account(&key)
    }
}

impl Runner for TestApp {
    fn execute_multiple_raw<R>(&self, msgs: Vec<Any>, signer: &SigningAccount) -> RunnerExecuteResult<R>
    where
        R: Message + Default,
    {
        let fee = self.fee_for(&msgs, signer)?;
        let tx = self.sign(msgs, fee, signer)?;
        self.execute_tx(&tx)?.try_into()
    }

    fn execute_tx(&self, tx_bytes: &[u8]) -> RunnerResult<SimulationResponse> {
        let envelope = self.service.execute(self.id, &base64_encode(tx_bytes))?;
        let payload = RawResult::from(envelope).into_result()?;
        Ok(SimulationResponse::decode(payload.as_slice()).map_err(DecodeError::ProtoDecodeError)?)
    }

    fn query<Q, R>(&self, path: &str, query: &Q) -> RunnerResult<R>
    where
        Q: Message,
        R: Message + Default,
    {
        let envelope = self
            .service
            .query(self.id, path, &base64_encode(&query.encode_to_vec()))?;
        let payload = RawResult::from(envelope).into_result()?;
        Ok(R::decode(payload.as_slice()).map_err(DecodeError::ProtoDecodeError)?)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Err(e) = self.service.cleanup(self.id) {
            tracing::warn!(env_id = self.id, error = %e, "failed to clean up test app");
        }
    }
}
