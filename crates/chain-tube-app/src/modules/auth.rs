//! Accounts: numbers, sequences, public keys and module accounts.

use chain_tube_types::keys::address_from_pubkey_any;
use chain_tube_types::proto::auth::{BaseAccount, ModuleAccount};
use chain_tube_types::{Address, Any, Bech32Prefixes};

use crate::errors::{AppError, AppResult};
use crate::store::{self, KvStore};

use super::prefix;

pub const FEE_COLLECTOR: &str = "fee_collector";
pub const MINTER: &str = "mint";
pub const BONDED_POOL: &str = "bonded_tokens_pool";
pub const NOT_BONDED_POOL: &str = "not_bonded_tokens_pool";

/// Module accounts created at genesis and their permissions.
pub const MODULE_ACCOUNTS: &[(&str, &[&str])] = &[
    (FEE_COLLECTOR, &[]),
    (MINTER, &["minter"]),
    (BONDED_POOL, &["burner", "staking"]),
    (NOT_BONDED_POOL, &["burner", "staking"]),
];

#[derive(Debug, Clone)]
pub struct AuthKeeper {
    prefixes: Bech32Prefixes,
}

impl AuthKeeper {
    pub fn new(prefixes: Bech32Prefixes) -> Self {
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &Bech32Prefixes {
        &self.prefixes
    }

    pub fn bech32(&self, addr: &Address) -> String {
        addr.to_bech32(&self.prefixes.account)
    }

    pub fn parse_address(&self, input: &str) -> AppResult<Address> {
        Ok(Address::from_bech32(input, &self.prefixes.account)?)
    }

    pub fn module_address(name: &str) -> Address {
        Address::module(name)
    }

    pub fn get_account(&self, store: &dyn KvStore, addr: &Address) -> AppResult<Option<BaseAccount>> {
        store::get_msg(store, &store::key(prefix::ACCOUNT, &[addr.as_bytes()]))
    }

    pub fn require_account(&self, store: &dyn KvStore, addr: &Address) -> AppResult<BaseAccount> {
        self.get_account(store, addr)?
            .ok_or_else(|| AppError::UnknownAddress(self.bech32(addr)))
    }

    pub fn set_account(&self, store: &mut dyn KvStore, addr: &Address, account: &BaseAccount) {
        store::set_msg(store, &store::key(prefix::ACCOUNT, &[addr.as_bytes()]), account);
    }

    pub fn has_account(&self, store: &dyn KvStore, addr: &Address) -> bool {
        store.has(&store::key(prefix::ACCOUNT, &[addr.as_bytes()]))
    }

    /// Create an account with the next free account number and sequence 0.
    pub fn new_account(&self, store: &mut dyn KvStore, addr: &Address) -> AppResult<BaseAccount> {
        if self.has_account(store, addr) {
            return Err(AppError::AlreadyExists(format!("account {}", self.bech32(addr))));
        }
        let account = BaseAccount {
            address: self.bech32(addr),
            pub_key: None,
            account_number: self.next_account_number(store),
            sequence: 0,
        };
        self.set_account(store, addr, &account);
        tracing::trace!(address = %account.address, number = account.account_number, "account created");
        Ok(account)
    }

    /// Return the next account number and advance the counter.
    pub fn next_account_number(&self, store: &mut dyn KvStore) -> u64 {
        let key = [prefix::NEXT_ACCOUNT_NUMBER];
        let next = self.peek_account_number(store);
        store.set(&key, (next + 1).to_be_bytes().to_vec());
        next
    }

    pub fn peek_account_number(&self, store: &dyn KvStore) -> u64 {
        store
            .get(&[prefix::NEXT_ACCOUNT_NUMBER])
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0)
    }

    pub fn set_next_account_number(&self, store: &mut dyn KvStore, next: u64) {
        store.set(&[prefix::NEXT_ACCOUNT_NUMBER], next.to_be_bytes().to_vec());
    }

    pub fn increment_sequence(&self, store: &mut dyn KvStore, addr: &Address) -> AppResult<u64> {
        let mut account = self.require_account(store, addr)?;
        account.sequence += 1;
        self.set_account(store, addr, &account);
        Ok(account.sequence)
    }

    /// Record the signer's public key, or check it against the stored one.
    pub fn set_or_check_pubkey(
        &self,
        store: &mut dyn KvStore,
        addr: &Address,
        pub_key: &Any,
    ) -> AppResult<()> {
        let derived = address_from_pubkey_any(pub_key)?;
        if derived != *addr {
            return Err(AppError::InvalidRequest(format!(
                "pubkey does not match signer address {}",
                self.bech32(addr)
            )));
        }
        let mut account = self.require_account(store, addr)?;
        match &account.pub_key {
            Some(existing) if existing != pub_key => Err(AppError::InvalidRequest(format!(
                "pubkey mismatch for account {}",
                account.address
            ))),
            Some(_) => Ok(()),
            None => {
                account.pub_key = Some(pub_key.clone());
                self.set_account(store, addr, &account);
                Ok(())
            }
        }
    }

    /// Create the named module account if it does not exist yet.
    pub fn ensure_module_account(&self, store: &mut dyn KvStore, name: &str) -> AppResult<Address> {
        let addr = Self::module_address(name);
        let name_key = store::key(prefix::MODULE_ACCOUNT, &[addr.as_bytes()]);
        if !store.has(&name_key) {
            if !self.has_account(store, &addr) {
                self.new_account(store, &addr)?;
            }
            store.set(&name_key, name.as_bytes().to_vec());
        }
        Ok(addr)
    }

    pub fn module_name(&self, store: &dyn KvStore, addr: &Address) -> Option<String> {
        store
            .get(&store::key(prefix::MODULE_ACCOUNT, &[addr.as_bytes()]))
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Account packed the way the account query returns it.
    pub fn account_any(&self, store: &dyn KvStore, addr: &Address) -> AppResult<Option<Any>> {
        let Some(account) = self.get_account(store, addr)? else {
            return Ok(None);
        };
        let packed = match self.module_name(store, addr) {
            Some(name) => {
                let permissions = MODULE_ACCOUNTS
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, perms)| perms.iter().map(|p| p.to_string()).collect())
                    .unwrap_or_default();
                Any::pack(&ModuleAccount {
                    base_account: Some(account),
                    name,
                    permissions,
                })
            }
            None => Any::pack(&account),
        };
        Ok(Some(packed))
    }
}
