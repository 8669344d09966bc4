//! Transaction pipeline: decode, ante checks, message routing, gas.
//!
//! A transaction executes in two nested branches. The ante branch pays the
//! fee, checks signatures and bumps sequences; the message branch runs the
//! messages on top of it. When a message fails the ante branch is still
//! written back, so a failed delivery consumes the sequence and the fee.

use prost::Message;

use chain_tube_types::coin::{coins_to_string, normalize};
use chain_tube_types::keys::{pubkey_bytes_from_any, verify_secp256k1};
use chain_tube_types::proto::abci::{Event, GasInfo, TxResult};
use chain_tube_types::proto::bank::{MsgSend, MsgSendResponse};
use chain_tube_types::proto::crypto::Secp256k1PubKey;
use chain_tube_types::proto::params::StakingCustomParams;
use chain_tube_types::proto::staking::{
    MsgCreateValidator, MsgCreateValidatorResponse, MsgDelegate, MsgDelegateResponse,
};
use chain_tube_types::proto::tx::{AuthInfo, Fee, SignDoc, TxBody, TxRaw};
use chain_tube_types::proto::wasm::{MsgStoreCode, MsgStoreCodeResponse};
use chain_tube_types::{Address, Any, TypeUrl};

use crate::abci::ConsensusParams;
use crate::app::ChainApp;
use crate::context::{Context, GasMeter};
use crate::errors::{AppError, AppResult};
use crate::modules::auth::FEE_COLLECTOR;
use crate::modules::params::SUBSPACE_CUSTOM;
use crate::modules::staking::parse_int;
use crate::modules::Keepers;
use crate::store::{CacheStore, KvStore};

pub const TX_SIZE_COST_PER_BYTE: u64 = 10;
pub const SIG_VERIFY_COST_SECP256K1: u64 = 1_000;
pub const MSG_SEND_GAS: u64 = 10_000;
pub const MSG_SEND_GAS_PER_COIN: u64 = 1_000;
pub const MSG_CREATE_VALIDATOR_GAS: u64 = 50_000;
pub const MSG_DELEGATE_GAS: u64 = 30_000;
pub const MSG_STORE_CODE_GAS: u64 = 20_000;
pub const STORE_CODE_GAS_PER_BYTE: u64 = 2;

/// A transaction with its body and auth info decoded.
#[derive(Debug, Clone)]
pub struct DecodedTx {
    pub raw: TxRaw,
    pub body: TxBody,
    pub auth_info: AuthInfo,
}

impl DecodedTx {
    pub fn fee(&self) -> Fee {
        self.auth_info.fee.clone().unwrap_or_default()
    }
}

pub fn decode_tx(bytes: &[u8]) -> AppResult<DecodedTx> {
    let raw = TxRaw::decode(bytes).map_err(|e| AppError::TxDecode(e.to_string()))?;
    let body =
        TxBody::decode(raw.body_bytes.as_slice()).map_err(|e| AppError::TxDecode(e.to_string()))?;
    let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice())
        .map_err(|e| AppError::TxDecode(e.to_string()))?;
    Ok(DecodedTx {
        raw,
        body,
        auth_info,
    })
}

/// Messages this application routes.
#[derive(Debug, Clone)]
pub enum TxMsg {
    Send(MsgSend),
    CreateValidator(MsgCreateValidator),
    Delegate(MsgDelegate),
    StoreCode(MsgStoreCode),
}

impl TxMsg {
    pub fn from_any(any: &Any) -> AppResult<Self> {
        fn decode<M: Message + Default>(any: &Any) -> AppResult<M> {
            M::decode(any.value.as_slice()).map_err(|e| AppError::TxDecode(e.to_string()))
        }
        let url = any.type_url.as_str();
        if url == MsgSend::TYPE_URL {
            Ok(TxMsg::Send(decode(any)?))
        } else if url == MsgCreateValidator::TYPE_URL {
            Ok(TxMsg::CreateValidator(decode(any)?))
        } else if url == MsgDelegate::TYPE_URL {
            Ok(TxMsg::Delegate(decode(any)?))
        } else if url == MsgStoreCode::TYPE_URL {
            Ok(TxMsg::StoreCode(decode(any)?))
        } else {
            Err(AppError::UnknownMessage(url.to_string()))
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            TxMsg::Send(_) => MsgSend::TYPE_URL,
            TxMsg::CreateValidator(_) => MsgCreateValidator::TYPE_URL,
            TxMsg::Delegate(_) => MsgDelegate::TYPE_URL,
            TxMsg::StoreCode(_) => MsgStoreCode::TYPE_URL,
        }
    }

    /// Bech32 account address that must sign this message.
    pub fn signer(&self) -> &str {
        match self {
            TxMsg::Send(m) => &m.from_address,
            TxMsg::CreateValidator(m) => &m.delegator_address,
            TxMsg::Delegate(m) => &m.delegator_address,
            TxMsg::StoreCode(m) => &m.sender,
        }
    }

    fn module(&self) -> &'static str {
        match self {
            TxMsg::Send(_) => "bank",
            TxMsg::CreateValidator(_) | TxMsg::Delegate(_) => "staking",
            TxMsg::StoreCode(_) => "wasm",
        }
    }
}

/// Limits and state carried into one transaction run.
pub(crate) struct TxEnv<'a> {
    pub keepers: &'a Keepers,
    pub consensus: ConsensusParams,
    pub block_gas_used: u64,
}

impl TxEnv<'_> {
    /// Run a transaction against `store`. Returns the gas used in every case
    /// so block gas accounting can include failed deliveries.
    pub(crate) fn run(
        &self,
        store: &mut dyn KvStore,
        ctx: &Context,
        tx_bytes: &[u8],
    ) -> (u64, AppResult<(GasInfo, TxResult)>) {
        let tx = match decode_tx(tx_bytes) {
            Ok(tx) => tx,
            Err(e) => return (0, Err(e)),
        };
        let fee = tx.fee();
        if let Err(e) = self.check_block_limits(ctx, tx_bytes, &fee) {
            return (0, Err(e));
        }
        let mut meter = if ctx.is_simulate() {
            GasMeter::infinite()
        } else {
            GasMeter::new(fee.gas_limit)
        };

        let msgs: AppResult<Vec<TxMsg>> = tx.body.messages.iter().map(TxMsg::from_any).collect();
        let msgs = match msgs {
            Ok(m) if m.is_empty() => {
                return (
                    0,
                    Err(AppError::InvalidRequest("must contain at least one message".to_string())),
                )
            }
            Ok(m) => m,
            Err(e) => return (0, Err(e)),
        };

        let mut ante = CacheStore::new(&*store);
        if let Err(e) = self.ante(&mut ante, ctx, &mut meter, &tx, &msgs, tx_bytes.len()) {
            return (meter.consumed(), Err(e));
        }

        let outcome = {
            let mut branch = CacheStore::new(&ante);
            self.run_msgs(&mut branch, ctx, &mut meter, &msgs)
                .map(|result| (result, branch.into_writes()))
        };
        let gas_info = GasInfo {
            gas_wanted: fee.gas_limit,
            gas_used: meter.consumed(),
        };
        match outcome {
            Ok((result, writes)) => {
                writes.apply(&mut ante);
                ante.into_writes().apply(store);
                (gas_info.gas_used, Ok((gas_info, result)))
            }
            Err(e) => {
                ante.into_writes().apply(store);
                (gas_info.gas_used, Err(e))
            }
        }
    }

    fn check_block_limits(&self, ctx: &Context, tx_bytes: &[u8], fee: &Fee) -> AppResult<()> {
        if ctx.is_simulate() {
            return Ok(());
        }
        if fee.gas_limit == 0 {
            return Err(AppError::InvalidRequest("invalid gas limit: 0".to_string()));
        }
        if self.consensus.max_bytes > 0 && tx_bytes.len() as i64 > self.consensus.max_bytes {
            return Err(AppError::BlockLimit(format!(
                "tx size {} exceeds max block bytes {}",
                tx_bytes.len(),
                self.consensus.max_bytes
            )));
        }
        if self.consensus.max_gas > 0 {
            let max_gas = self.consensus.max_gas as u64;
            if self.block_gas_used.saturating_add(fee.gas_limit) > max_gas {
                return Err(AppError::BlockLimit(format!(
                    "tx gas limit {} exceeds remaining block gas {}",
                    fee.gas_limit,
                    max_gas.saturating_sub(self.block_gas_used)
                )));
            }
        }
        Ok(())
    }

    fn signers(&self, msgs: &[TxMsg]) -> AppResult<Vec<Address>> {
        let mut signers: Vec<Address> = Vec::new();
        for msg in msgs {
            let addr = self.keepers.auth.parse_address(msg.signer())?;
            if !signers.contains(&addr) {
                signers.push(addr);
            }
        }
        Ok(signers)
    }

    fn ante(
        &self,
        store: &mut dyn KvStore,
        ctx: &Context,
        meter: &mut GasMeter,
        tx: &DecodedTx,
        msgs: &[TxMsg],
        tx_len: usize,
    ) -> AppResult<()> {
        let auth = &self.keepers.auth;
        meter.consume(tx_len as u64 * TX_SIZE_COST_PER_BYTE, "txSize")?;

        let signers = self.signers(msgs)?;
        let infos = &tx.auth_info.signer_infos;
        if infos.len() != signers.len() {
            return Err(AppError::Unauthorized(format!(
                "wrong number of signers; expected {}, got {}",
                signers.len(),
                infos.len()
            )));
        }
        if !ctx.is_simulate() && tx.raw.signatures.len() != signers.len() {
            return Err(AppError::Unauthorized(format!(
                "wrong number of signatures; expected {}, got {}",
                signers.len(),
                tx.raw.signatures.len()
            )));
        }

        let fee = tx.fee();
        let fee_coins = normalize(&fee.amount)?;
        if !fee_coins.is_empty() {
            let payer = &signers[0];
            auth.require_account(store, payer)?;
            self.keepers
                .bank
                .send_from_account_to_module(store, payer, FEE_COLLECTOR, &fee_coins)
                .map_err(|e| match e {
                    AppError::InsufficientFunds { .. } => AppError::InsufficientFee(format!(
                        "{} does not cover fee {}",
                        auth.bech32(payer),
                        coins_to_string(&fee_coins)
                    )),
                    other => other,
                })?;
        }

        for (i, (signer, info)) in signers.iter().zip(infos).enumerate() {
            let account = auth.require_account(store, signer)?;
            let pub_key = match (&info.public_key, &account.pub_key) {
                (Some(pk), _) => Some(pk.clone()),
                (None, Some(pk)) => Some(pk.clone()),
                (None, None) => None,
            };
            match &pub_key {
                Some(pk) => auth.set_or_check_pubkey(store, signer, pk)?,
                None if ctx.is_simulate() => {}
                None => {
                    return Err(AppError::InvalidRequest(format!(
                        "pubkey on account {} is not set",
                        account.address
                    )))
                }
            }
            if info.sequence != account.sequence {
                return Err(AppError::WrongSequence {
                    expected: account.sequence,
                    got: info.sequence,
                });
            }
            meter.consume(SIG_VERIFY_COST_SECP256K1, "ante verify: secp256k1")?;
            if !ctx.is_simulate() {
                let pk = pub_key.as_ref().ok_or_else(|| {
                    AppError::InvalidRequest(format!("pubkey on account {} is not set", account.address))
                })?;
                if pk.type_url != Secp256k1PubKey::TYPE_URL {
                    return Err(AppError::InvalidRequest(format!(
                        "unsupported signer key type {}",
                        pk.type_url
                    )));
                }
                let sign_doc = SignDoc {
                    body_bytes: tx.raw.body_bytes.clone(),
                    auth_info_bytes: tx.raw.auth_info_bytes.clone(),
                    chain_id: ctx.chain_id().to_string(),
                    account_number: account.account_number,
                };
                let key_bytes = pubkey_bytes_from_any(pk)?;
                if !verify_secp256k1(&key_bytes, &sign_doc.encode_to_vec(), &tx.raw.signatures[i]) {
                    return Err(AppError::InvalidSignature {
                        signer: account.address,
                    });
                }
            }
            auth.increment_sequence(store, signer)?;
        }
        Ok(())
    }

    fn run_msgs(
        &self,
        store: &mut dyn KvStore,
        ctx: &Context,
        meter: &mut GasMeter,
        msgs: &[TxMsg],
    ) -> AppResult<TxResult> {
        let mut result = TxResult::default();
        for msg in msgs {
            result.events.push(
                Event::new("message")
                    .attr("action", msg.type_url())
                    .attr("sender", msg.signer())
                    .attr("module", msg.module()),
            );
            let (response, events) = self.handle_msg(store, ctx, meter, msg)?;
            result.events.extend(events);
            result.msg_responses.push(response);
        }
        Ok(result)
    }

    fn handle_msg(
        &self,
        store: &mut dyn KvStore,
        ctx: &Context,
        meter: &mut GasMeter,
        msg: &TxMsg,
    ) -> AppResult<(Any, Vec<Event>)> {
        let keepers = self.keepers;
        match msg {
            TxMsg::Send(m) => {
                meter.consume(
                    MSG_SEND_GAS + MSG_SEND_GAS_PER_COIN * m.amount.len() as u64,
                    "bank send",
                )?;
                let coins = normalize(&m.amount)?;
                if coins.is_empty() {
                    return Err(AppError::InvalidRequest("send amount cannot be empty".to_string()));
                }
                keepers.bank.check_send_enabled(store, &coins)?;
                let from = keepers.auth.parse_address(&m.from_address)?;
                let to = keepers.auth.parse_address(&m.to_address)?;
                let event = keepers.bank.send(store, &from, &to, &coins)?;
                Ok((Any::pack(&MsgSendResponse {}), vec![event]))
            }
            TxMsg::CreateValidator(m) => {
                meter.consume(MSG_CREATE_VALIDATOR_GAS, "create validator")?;
                let custom: StakingCustomParams = keepers.params.get(store, SUBSPACE_CUSTOM)?;
                let required = custom.min_self_delegation.parse::<u128>().map_err(|_| {
                    AppError::InvalidParams(format!(
                        "stored min self delegation '{}' is not an integer",
                        custom.min_self_delegation
                    ))
                })?;
                let declared = parse_int(&m.min_self_delegation, "min self delegation")?;
                if declared < required {
                    return Err(AppError::InvalidRequest(format!(
                        "min self delegation must be greater than or equal to {}",
                        required
                    )));
                }
                let (_, events) = keepers.staking.create_validator(store, m)?;
                Ok((Any::pack(&MsgCreateValidatorResponse {}), events))
            }
            TxMsg::Delegate(m) => {
                meter.consume(MSG_DELEGATE_GAS, "delegate")?;
                let events = keepers.staking.delegate(store, m)?;
                Ok((Any::pack(&MsgDelegateResponse {}), events))
            }
            TxMsg::StoreCode(m) => {
                meter.consume(
                    MSG_STORE_CODE_GAS + STORE_CODE_GAS_PER_BYTE * m.wasm_byte_code.len() as u64,
                    "store code",
                )?;
                let sender = keepers.auth.parse_address(&m.sender)?;
                let (code_id, checksum, event) =
                    keepers.wasm.store_code(store, ctx, &sender, &m.wasm_byte_code)?;
                Ok((
                    Any::pack(&MsgStoreCodeResponse { code_id, checksum }),
                    vec![event],
                ))
            }
        }
    }
}

impl ChainApp {
    /// Execute a transaction against the block's working state.
    pub fn deliver_tx(&mut self, ctx: &Context, tx_bytes: &[u8]) -> AppResult<(GasInfo, TxResult)> {
        let ctx = ctx.with_exec_mode(crate::context::ExecMode::Deliver);
        let (keepers, store, consensus, block_gas_used) = self.tx_parts_mut();
        let env = TxEnv {
            keepers,
            consensus,
            block_gas_used: *block_gas_used,
        };
        let (gas_used, result) = env.run(store, &ctx, tx_bytes);
        *block_gas_used = block_gas_used.saturating_add(gas_used);
        match &result {
            Ok((gas, _)) => tracing::trace!(gas_used = gas.gas_used, height = ctx.block_height(), "tx delivered"),
            Err(e) => tracing::debug!(error = %e, gas_used, "tx failed"),
        }
        result
    }

    /// Dry-run a transaction on a throwaway branch of the working state.
    ///
    /// Signatures are not verified and gas is unmetered; the reported gas is
    /// what the transaction would consume.
    pub fn simulate_tx(&self, ctx: &Context, tx_bytes: &[u8]) -> AppResult<(GasInfo, TxResult)> {
        let ctx = ctx.with_exec_mode(crate::context::ExecMode::Simulate);
        let env = TxEnv {
            keepers: self.keepers(),
            consensus: self.consensus_params(),
            block_gas_used: 0,
        };
        let mut branch = CacheStore::new(self.store());
        let (_, result) = env.run(&mut branch, &ctx, tx_bytes);
        result
    }
}
