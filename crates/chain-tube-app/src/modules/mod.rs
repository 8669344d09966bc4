//! Module keepers.
//!
//! Keepers are cheap, cloneable handles holding module configuration; all
//! state lives in the [`KvStore`](crate::store::KvStore) passed to each call,
//! so the same keeper works on the committed store, a block's working store
//! or a throwaway cache branch.

pub mod auth;
pub mod bank;
pub mod params;
pub mod slashing;
pub mod staking;
pub mod wasm;

use std::path::PathBuf;

use chain_tube_types::Bech32Prefixes;

pub use auth::AuthKeeper;
pub use bank::BankKeeper;
pub use params::{ParamSet, Params, ParamsKeeper, Subspace};
pub use slashing::SlashingKeeper;
pub use staking::StakingKeeper;
pub use wasm::WasmKeeper;

/// One-byte store prefixes, one range per module.
pub(crate) mod prefix {
    pub const ACCOUNT: u8 = 0x01;
    pub const MODULE_ACCOUNT: u8 = 0x02;
    pub const NEXT_ACCOUNT_NUMBER: u8 = 0x03;
    pub const BALANCE: u8 = 0x10;
    pub const SUPPLY: u8 = 0x11;
    pub const VALIDATOR: u8 = 0x21;
    pub const DELEGATION: u8 = 0x22;
    pub const VALIDATOR_BY_CONS: u8 = 0x23;
    pub const SIGNING_INFO: u8 = 0x31;
    pub const PARAMS: u8 = 0x41;
    pub const CODE: u8 = 0x51;
    pub const LAST_CODE_ID: u8 = 0x52;
}

#[derive(Debug, Clone)]
pub struct Keepers {
    pub auth: AuthKeeper,
    pub bank: BankKeeper,
    pub params: ParamsKeeper,
    pub staking: StakingKeeper,
    pub slashing: SlashingKeeper,
    pub wasm: WasmKeeper,
}

impl Keepers {
    pub fn new(prefixes: Bech32Prefixes, home: PathBuf, max_wasm_size: u64) -> Self {
        let params = ParamsKeeper::new();
        let auth = AuthKeeper::new(prefixes.clone());
        let bank = BankKeeper::new(auth.clone(), params.clone());
        let slashing = SlashingKeeper::new(prefixes.clone(), params.clone());
        let staking = StakingKeeper::new(
            auth.clone(),
            bank.clone(),
            params.clone(),
            slashing.clone(),
        );
        let wasm = WasmKeeper::new(auth.clone(), params.clone(), home, max_wasm_size);
        Self {
            auth,
            bank,
            params,
            staking,
            slashing,
            wasm,
        }
    }
}
