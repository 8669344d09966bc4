//! Validator liveness bookkeeping.
//!
//! Every vote in a finalized block must belong to a validator with a signing
//! info record; a missing record is an error rather than a silent insert.

use chain_tube_types::proto::slashing::{SlashingParams, ValidatorSigningInfo};
use chain_tube_types::{Address, Bech32Prefixes};

use crate::abci::VoteInfo;
use crate::context::Context;
use crate::errors::{AppError, AppResult};
use crate::store::{self, KvStore};

use super::params::{ParamsKeeper, SUBSPACE_SLASHING};
use super::prefix;

#[derive(Debug, Clone)]
pub struct SlashingKeeper {
    prefixes: Bech32Prefixes,
    params: ParamsKeeper,
}

impl SlashingKeeper {
    pub fn new(prefixes: Bech32Prefixes, params: ParamsKeeper) -> Self {
        Self { prefixes, params }
    }

    pub fn params(&self, store: &dyn KvStore) -> AppResult<SlashingParams> {
        self.params.get(store, SUBSPACE_SLASHING)
    }

    pub fn cons_bech32(&self, cons: &Address) -> String {
        cons.to_bech32(&self.prefixes.consensus)
    }

    pub fn parse_cons_address(&self, input: &str) -> AppResult<Address> {
        Ok(Address::from_bech32(input, &self.prefixes.consensus)?)
    }

    pub fn signing_info(
        &self,
        store: &dyn KvStore,
        cons: &Address,
    ) -> AppResult<Option<ValidatorSigningInfo>> {
        store::get_msg(store, &store::key(prefix::SIGNING_INFO, &[cons.as_bytes()]))
    }

    pub fn set_signing_info(&self, store: &mut dyn KvStore, cons: &Address, info: &ValidatorSigningInfo) {
        store::set_msg(store, &store::key(prefix::SIGNING_INFO, &[cons.as_bytes()]), info);
    }

    /// Fresh signing info starting at `start_height`.
    pub fn new_signing_info(&self, cons: &Address, start_height: i64) -> ValidatorSigningInfo {
        ValidatorSigningInfo {
            address: self.cons_bech32(cons),
            start_height,
            index_offset: 0,
            jailed_until: 0,
            tombstoned: false,
            missed_blocks_counter: 0,
        }
    }

    /// Bonding hook: make sure a newly bonded validator is tracked.
    pub fn on_validator_bonded(&self, store: &mut dyn KvStore, ctx: &Context, cons: &Address) -> AppResult<()> {
        if self.signing_info(store, cons)?.is_none() {
            let info = self.new_signing_info(cons, ctx.block_height());
            self.set_signing_info(store, cons, &info);
        }
        Ok(())
    }

    /// Record last-block participation for every vote.
    pub fn begin_block(&self, store: &mut dyn KvStore, votes: &[VoteInfo]) -> AppResult<()> {
        let params = self.params(store)?;
        let window = params.signed_blocks_window.max(1);
        for vote in votes {
            let mut info = self.signing_info(store, &vote.validator)?.ok_or_else(|| {
                AppError::NotFound(format!(
                    "expected signing info for validator {} but not found",
                    self.cons_bech32(&vote.validator)
                ))
            })?;
            info.index_offset = (info.index_offset + 1) % window;
            if !vote.signed {
                info.missed_blocks_counter += 1;
            }
            self.set_signing_info(store, &vote.validator, &info);
        }
        Ok(())
    }
}
