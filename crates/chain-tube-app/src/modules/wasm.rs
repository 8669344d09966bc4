//! Contract code storage.
//!
//! Only the code store is modelled: uploaded bytecode is checked against the
//! size ceiling and upload-access parameter, recorded as a [`CodeInfo`] and
//! written under `<home>/wasm/<checksum>.wasm`. Instantiation and execution
//! are outside this application.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use chain_tube_types::proto::abci::Event;
use chain_tube_types::proto::wasm::{AccessType, CodeInfo, WasmParams};
use chain_tube_types::Address;

use crate::context::Context;
use crate::errors::{AppError, AppResult};
use crate::store::{self, KvStore};

use super::auth::AuthKeeper;
use super::params::{ParamsKeeper, SUBSPACE_WASM};
use super::prefix;

const WASM_MAGIC: &[u8] = b"\0asm";

#[derive(Debug, Clone)]
pub struct WasmKeeper {
    auth: AuthKeeper,
    params: ParamsKeeper,
    home: PathBuf,
    max_wasm_size: u64,
}

impl WasmKeeper {
    pub fn new(auth: AuthKeeper, params: ParamsKeeper, home: PathBuf, max_wasm_size: u64) -> Self {
        Self {
            auth,
            params,
            home,
            max_wasm_size,
        }
    }

    pub fn params(&self, store: &dyn KvStore) -> AppResult<WasmParams> {
        self.params.get(store, SUBSPACE_WASM)
    }

    pub fn max_wasm_size(&self) -> u64 {
        self.max_wasm_size
    }

    pub fn code_dir(&self) -> PathBuf {
        self.home.join("wasm")
    }

    fn code_path(&self, checksum: &[u8]) -> PathBuf {
        self.code_dir().join(format!("{}.wasm", hex::encode(checksum)))
    }

    fn check_upload_access(&self, store: &dyn KvStore, sender: &Address) -> AppResult<()> {
        let access = self.params(store)?.code_upload_access.unwrap_or_default();
        let sender_bech32 = self.auth.bech32(sender);
        let allowed = match AccessType::try_from(access.permission) {
            Ok(AccessType::Everybody) => true,
            Ok(AccessType::AnyOfAddresses) => access.addresses.iter().any(|a| *a == sender_bech32),
            _ => false,
        };
        if !allowed {
            return Err(AppError::Unauthorized(format!(
                "can not create code: {} is not allowed to upload",
                sender_bech32
            )));
        }
        Ok(())
    }

    pub fn code_info(&self, store: &dyn KvStore, code_id: u64) -> AppResult<Option<CodeInfo>> {
        store::get_msg(store, &store::key(prefix::CODE, &[&code_id.to_be_bytes()[..]]))
    }

    pub fn last_code_id(&self, store: &dyn KvStore) -> u64 {
        store
            .get(&[prefix::LAST_CODE_ID])
            .and_then(|b| <[u8; 8]>::try_from(b.as_slice()).ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0)
    }

    /// Bytecode of a stored code, read back from the code directory.
    pub fn code_bytes(&self, info: &CodeInfo) -> AppResult<Vec<u8>> {
        Ok(fs::read(self.code_path(&info.code_hash))?)
    }

    /// Store bytecode and return `(code_id, checksum)`.
    ///
    /// The bytecode file is only written when the context delivers; a
    /// simulation runs every check without touching the home directory.
    pub fn store_code(
        &self,
        store: &mut dyn KvStore,
        ctx: &Context,
        sender: &Address,
        code: &[u8],
    ) -> AppResult<(u64, Vec<u8>, Event)> {
        self.check_upload_access(store, sender)?;
        if code.is_empty() {
            return Err(AppError::InvalidRequest("empty wasm code".to_string()));
        }
        if code.len() as u64 > self.max_wasm_size {
            return Err(AppError::InvalidRequest(format!(
                "wasm code exceeds limit: max {} bytes, got {}",
                self.max_wasm_size,
                code.len()
            )));
        }
        if !code.starts_with(WASM_MAGIC) {
            return Err(AppError::InvalidRequest("invalid wasm code: bad magic number".to_string()));
        }

        let checksum = Sha256::digest(code).to_vec();
        let code_id = self.last_code_id(store) + 1;
        store.set(&[prefix::LAST_CODE_ID], code_id.to_be_bytes().to_vec());
        let info = CodeInfo {
            code_hash: checksum.clone(),
            creator: self.auth.bech32(sender),
        };
        store::set_msg(store, &store::key(prefix::CODE, &[&code_id.to_be_bytes()[..]]), &info);

        if !ctx.is_simulate() {
            write_code(&self.code_dir(), &self.code_path(&checksum), code)?;
        }
        tracing::debug!(code_id, checksum = %hex::encode(&checksum), size = code.len(), "code stored");
        let event = Event::new("store_code")
            .attr("code_checksum", hex::encode(&checksum))
            .attr("code_id", code_id.to_string());
        Ok((code_id, checksum, event))
    }
}

fn write_code(dir: &Path, path: &Path, code: &[u8]) -> AppResult<()> {
    fs::create_dir_all(dir)?;
    if !path.exists() {
        fs::write(path, code)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockHeader, ExecMode};
    use crate::store::MemStore;
    use chain_tube_types::proto::wasm::AccessConfig;
    use chain_tube_types::Bech32Prefixes;
    use chrono::Utc;

    fn setup(home: &Path, access: AccessType) -> (WasmKeeper, MemStore) {
        let params = ParamsKeeper::new();
        let keeper = WasmKeeper::new(
            AuthKeeper::new(Bech32Prefixes::default()),
            params.clone(),
            home.to_path_buf(),
            64,
        );
        let mut store = MemStore::new();
        params
            .set(
                &mut store,
                SUBSPACE_WASM,
                &WasmParams {
                    code_upload_access: Some(AccessConfig {
                        permission: access as i32,
                        addresses: vec![],
                    }),
                    instantiate_default_permission: AccessType::Everybody as i32,
                },
            )
            .unwrap();
        (keeper, store)
    }

    fn ctx() -> Context {
        Context::new(BlockHeader {
            chain_id: "c".to_string(),
            height: 2,
            time: Utc::now(),
        })
    }

    #[test]
    fn test_store_code_writes_file() {
        let home = tempfile::tempdir().unwrap();
        let (keeper, mut store) = setup(home.path(), AccessType::Everybody);
        let code = b"\0asm\x01\0\0\0";
        let (id, checksum, _) = keeper
            .store_code(&mut store, &ctx(), &Address::new([1; 20]), code)
            .unwrap();
        assert_eq!(id, 1);
        let info = keeper.code_info(&store, 1).unwrap().unwrap();
        assert_eq!(info.code_hash, checksum);
        assert_eq!(keeper.code_bytes(&info).unwrap(), code.to_vec());
    }

    #[test]
    fn test_simulated_store_leaves_home_untouched() {
        let home = tempfile::tempdir().unwrap();
        let (keeper, mut store) = setup(home.path(), AccessType::Everybody);
        let sim = ctx().with_exec_mode(ExecMode::Simulate);
        keeper
            .store_code(&mut store, &sim, &Address::new([1; 20]), b"\0asm")
            .unwrap();
        assert!(!keeper.code_dir().exists());
    }

    #[test]
    fn test_store_code_rejections() {
        let home = tempfile::tempdir().unwrap();
        let (keeper, mut store) = setup(home.path(), AccessType::Everybody);
        let sender = Address::new([1; 20]);
        assert!(keeper.store_code(&mut store, &ctx(), &sender, b"nope").is_err());
        let oversized = vec![0u8; keeper.max_wasm_size() as usize + 1];
        assert!(keeper
            .store_code(&mut store, &ctx(), &sender, &oversized)
            .is_err());

        let (locked, mut store) = setup(home.path(), AccessType::Nobody);
        let err = locked
            .store_code(&mut store, &ctx(), &sender, b"\0asm")
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
