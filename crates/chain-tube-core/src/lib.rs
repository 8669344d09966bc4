//! Environment lifecycle and execution boundary of the chain-tube harness.
//!
//! A [`HarnessService`] keeps any number of independent chain environments,
//! addressed by numeric handles, and exposes the operations the C boundary
//! forwards to it:
//!
//! - lifecycle: [`HarnessService::create`], [`HarnessService::cleanup`]
//! - blocks: [`HarnessService::advance_time`], [`HarnessService::finalize_block`]
//! - transactions: [`HarnessService::execute`], [`HarnessService::simulate`]
//! - reads: [`HarnessService::query`], block time/height, account
//!   sequence/number, validator address and key
//! - parameters: [`HarnessService::set_param_set`], [`HarnessService::get_param_set`]
//!
//! Domain failures come back as a [`ResultEnvelope`]; contract violations
//! as a [`FatalError`].
//!
//! ```no_run
//! use chain_tube_core::HarnessService;
//!
//! let service = HarnessService::from_env();
//! let env = service.create().unwrap();
//! let key = service.fund_account(env, r#"[{"denom":"ucore","amount":"1000"}]"#).unwrap();
//! service.finalize_block(env).unwrap();
//! assert_eq!(service.block_height(env).unwrap(), 2);
//! service.cleanup(env).unwrap();
//! # let _ = key;
//! ```

pub mod bootstrap;
pub mod config;
pub mod environment;
pub mod errors;
pub mod network;
pub mod param_registry;
pub mod registry;
pub mod result;
pub mod service;

pub use bootstrap::setup_application;
pub use config::HarnessConfig;
pub use environment::Environment;
pub use errors::{FatalError, FatalResult};
pub use network::NetworkConfig;
pub use param_registry::{ParamRegistryError, ParamTypeRegistry};
pub use registry::{EnvHandle, EnvironmentRegistry};
pub use result::{EnvelopeError, ErrorCode, ReportedError, ResultEnvelope};
pub use service::HarnessService;
