//! chain-tube runner
//!
//! Rust client for the in-process chain harness:
//!
//! - **Environments**: [`TestApp`] owns one chain environment and removes it on drop
//! - **Transactions**: the [`Runner`] trait signs, delivers and decodes messages
//! - **Modules**: typed wrappers such as [`Bank`] and [`Staking`], generated with
//!   [`fn_execute!`] and [`fn_query!`]; [`AssetFt`] and [`AssetNft`] expose
//!   their parameter sets
//! - **Envelopes**: [`RawResult`] decodes the base64 results the C boundary returns
//!
//! ```no_run
//! use chain_tube::{Account, Bank, Module, TestApp};
//! use chain_tube::proto::bank::QueryBalanceRequest;
//! use chain_tube::Coin;
//!
//! let app = TestApp::new().unwrap();
//! let alice = app.init_account(&[Coin::new(1_000, "ucore")]).unwrap();
//! let bank = Bank::new(&app);
//! let balance = bank
//!     .query_balance(&QueryBalanceRequest {
//!         address: alice.address(),
//!         denom: "ucore".to_string(),
//!     })
//!     .unwrap();
//! # let _ = balance;
//! ```

#![allow(clippy::result_large_err)]

pub mod account;
pub mod module;
pub mod runner;

pub use chain_tube_types::proto;
pub use chain_tube_types::{Any, Coin, TypeUrl};

pub use account::{Account, FeeSetting, NonSigningAccount, SigningAccount};
pub use module::{AssetFt, AssetNft, Auth, Bank, Module, Slashing, Staking, Wasm};
pub use runner::app::TestApp;
pub use runner::error::{DecodeError, EncodeError, RunnerError};
pub use runner::result::{ExecuteResponse, RawResult, RunnerExecuteResult, RunnerResult};
pub use runner::Runner;
