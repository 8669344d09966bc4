//! Balances, supply, minting and transfers.

use chain_tube_types::coin::{amount_of, coins_to_string, normalize, validate_denom};
use chain_tube_types::proto::abci::Event;
use chain_tube_types::proto::bank::BankParams;
use chain_tube_types::{Address, Coin};

use crate::errors::{AppError, AppResult};
use crate::store::{self, KvStore};

use super::auth::{AuthKeeper, MINTER};
use super::params::{ParamsKeeper, SUBSPACE_BANK};
use super::prefix;

#[derive(Debug, Clone)]
pub struct BankKeeper {
    auth: AuthKeeper,
    params: ParamsKeeper,
}

fn balance_key(addr: &Address, denom: &str) -> Vec<u8> {
    store::key(prefix::BALANCE, &[addr.as_bytes(), denom.as_bytes()])
}

fn read_amount(bytes: Option<Vec<u8>>) -> AppResult<u128> {
    match bytes {
        None => Ok(0),
        Some(bytes) => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse::<u128>().ok())
            .ok_or_else(|| AppError::Decode("corrupt stored amount".to_string())),
    }
}

fn write_amount(store: &mut dyn KvStore, key: &[u8], amount: u128) {
    if amount == 0 {
        store.delete(key);
    } else {
        store.set(key, amount.to_string().into_bytes());
    }
}

impl BankKeeper {
    pub fn new(auth: AuthKeeper, params: ParamsKeeper) -> Self {
        Self { auth, params }
    }

    pub fn params(&self, store: &dyn KvStore) -> AppResult<BankParams> {
        self.params.get(store, SUBSPACE_BANK)
    }

    pub fn balance(&self, store: &dyn KvStore, addr: &Address, denom: &str) -> AppResult<u128> {
        read_amount(store.get(&balance_key(addr, denom)))
    }

    pub fn all_balances(&self, store: &dyn KvStore, addr: &Address) -> AppResult<Vec<Coin>> {
        let prefix = store::key(prefix::BALANCE, &[addr.as_bytes()]);
        store
            .prefix_scan(&prefix)
            .into_iter()
            .map(|(k, v)| {
                let denom = String::from_utf8(k[prefix.len()..].to_vec())
                    .map_err(|_| AppError::Decode("corrupt balance key".to_string()))?;
                Ok(Coin::new(read_amount(Some(v))?, denom))
            })
            .collect()
    }

    pub fn supply_of(&self, store: &dyn KvStore, denom: &str) -> AppResult<u128> {
        read_amount(store.get(&store::key(prefix::SUPPLY, &[denom.as_bytes()])))
    }

    pub fn total_supply(&self, store: &dyn KvStore) -> AppResult<Vec<Coin>> {
        let prefix = [prefix::SUPPLY];
        store
            .prefix_scan(&prefix)
            .into_iter()
            .map(|(k, v)| {
                let denom = String::from_utf8(k[1..].to_vec())
                    .map_err(|_| AppError::Decode("corrupt supply key".to_string()))?;
                Ok(Coin::new(read_amount(Some(v))?, denom))
            })
            .collect()
    }

    fn set_supply(&self, store: &mut dyn KvStore, denom: &str, amount: u128) {
        write_amount(store, &store::key(prefix::SUPPLY, &[denom.as_bytes()]), amount);
    }

    fn add_coins(&self, store: &mut dyn KvStore, addr: &Address, coins: &[Coin]) -> AppResult<()> {
        for coin in coins {
            let amount = amount_of(coin)?;
            let key = balance_key(addr, &coin.denom);
            let current = read_amount(store.get(&key))?;
            let updated = current.checked_add(amount).ok_or_else(|| {
                AppError::InvalidRequest(format!("balance overflow for {}", coin.denom))
            })?;
            write_amount(store, &key, updated);
        }
        Ok(())
    }

    /// Debit every coin or none of them.
    fn sub_coins(&self, store: &mut dyn KvStore, addr: &Address, coins: &[Coin]) -> AppResult<()> {
        let mut updates = Vec::with_capacity(coins.len());
        for coin in coins {
            let amount = amount_of(coin)?;
            let key = balance_key(addr, &coin.denom);
            let current = read_amount(store.get(&key))?;
            if current < amount {
                return Err(AppError::InsufficientFunds {
                    address: self.auth.bech32(addr),
                    needed: coins_to_string(std::slice::from_ref(coin)),
                    available: coins_to_string(&self.all_balances(store, addr)?),
                });
            }
            updates.push((key, current - amount));
        }
        for (key, amount) in updates {
            write_amount(store, &key, amount);
        }
        Ok(())
    }

    /// Move coins between accounts, creating the recipient account if needed.
    pub fn send(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> AppResult<Event> {
        let coins = normalize(coins)?;
        self.sub_coins(store, from, &coins)?;
        if !self.auth.has_account(store, to) {
            self.auth.new_account(store, to)?;
        }
        self.add_coins(store, to, &coins)?;
        Ok(Event::new("transfer")
            .attr("recipient", self.auth.bech32(to))
            .attr("sender", self.auth.bech32(from))
            .attr("amount", coins_to_string(&coins)))
    }

    /// Reject coins whose denom is not currently transferable.
    pub fn check_send_enabled(&self, store: &dyn KvStore, coins: &[Coin]) -> AppResult<()> {
        let params = self.params(store)?;
        if params.default_send_enabled {
            return Ok(());
        }
        match coins.first() {
            Some(coin) => Err(AppError::SendDisabled(coin.denom.clone())),
            None => Ok(()),
        }
    }

    pub fn send_from_module_to_account(
        &self,
        store: &mut dyn KvStore,
        module: &str,
        to: &Address,
        coins: &[Coin],
    ) -> AppResult<Event> {
        let from = self.auth.ensure_module_account(store, module)?;
        self.send(store, &from, to, coins)
    }

    pub fn send_from_account_to_module(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        module: &str,
        coins: &[Coin],
    ) -> AppResult<Event> {
        let to = self.auth.ensure_module_account(store, module)?;
        self.send(store, from, &to, coins)
    }

    pub fn send_between_modules(
        &self,
        store: &mut dyn KvStore,
        from_module: &str,
        to_module: &str,
        coins: &[Coin],
    ) -> AppResult<Event> {
        let from = self.auth.ensure_module_account(store, from_module)?;
        let to = self.auth.ensure_module_account(store, to_module)?;
        self.send(store, &from, &to, coins)
    }

    /// Create new coins in a module account and grow the supply.
    pub fn mint_coins(&self, store: &mut dyn KvStore, module: &str, coins: &[Coin]) -> AppResult<()> {
        let coins = normalize(coins)?;
        let addr = self.auth.ensure_module_account(store, module)?;
        self.add_coins(store, &addr, &coins)?;
        for coin in &coins {
            let supply = self.supply_of(store, &coin.denom)?;
            let amount = amount_of(coin)?;
            let updated = supply.checked_add(amount).ok_or_else(|| {
                AppError::InvalidRequest(format!("supply overflow for {}", coin.denom))
            })?;
            self.set_supply(store, &coin.denom, updated);
        }
        Ok(())
    }

    /// Mint `coins` and send them to `addr`.
    pub fn fund_account(&self, store: &mut dyn KvStore, addr: &Address, coins: &[Coin]) -> AppResult<()> {
        self.mint_coins(store, MINTER, coins)?;
        self.send_from_module_to_account(store, MINTER, addr, coins)?;
        Ok(())
    }

    /// Seed genesis balances; supply is derived from them and checked against
    /// any declared supply.
    pub fn init_genesis(
        &self,
        store: &mut dyn KvStore,
        params: &BankParams,
        balances: &[(Address, Vec<Coin>)],
        declared_supply: &[Coin],
    ) -> AppResult<()> {
        self.params.set(store, SUBSPACE_BANK, params)?;
        let mut supply: Vec<Coin> = Vec::new();
        for (addr, coins) in balances {
            let coins = normalize(coins)?;
            if !self.auth.has_account(store, addr) {
                self.auth.new_account(store, addr)?;
            }
            self.add_coins(store, addr, &coins)?;
            supply.extend(coins);
        }
        let supply = normalize(&supply)?;
        let declared = normalize(declared_supply)?;
        if !declared.is_empty() && declared != supply {
            return Err(AppError::InvalidGenesis(format!(
                "genesis supply is incorrect, expected {}, got {}",
                coins_to_string(&supply),
                coins_to_string(&declared)
            )));
        }
        for coin in &supply {
            validate_denom(&coin.denom)?;
            self.set_supply(store, &coin.denom, amount_of(coin)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use chain_tube_types::Bech32Prefixes;

    fn keeper() -> BankKeeper {
        BankKeeper::new(AuthKeeper::new(Bech32Prefixes::default()), ParamsKeeper::new())
    }

    #[test]
    fn test_fund_account_creates_account_and_supply() {
        let bank = keeper();
        let mut store = MemStore::new();
        let addr = Address::new([9; 20]);
        bank.fund_account(&mut store, &addr, &[Coin::new(1000, "core")]).unwrap();

        assert_eq!(bank.balance(&store, &addr, "core").unwrap(), 1000);
        assert_eq!(bank.supply_of(&store, "core").unwrap(), 1000);
        assert!(bank.auth.has_account(&store, &addr));
        // Minter module account holds nothing afterwards.
        let minter = AuthKeeper::module_address(MINTER);
        assert!(bank.all_balances(&store, &minter).unwrap().is_empty());
    }

    #[test]
    fn test_send_insufficient_funds_leaves_state() {
        let bank = keeper();
        let mut store = MemStore::new();
        let from = Address::new([1; 20]);
        let to = Address::new([2; 20]);
        bank.fund_account(&mut store, &from, &[Coin::new(10, "core")]).unwrap();

        let err = bank.send(&mut store, &from, &to, &[Coin::new(11, "core")]).unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { .. }));
        assert!(err.to_string().contains("insufficient funds"));
        assert_eq!(bank.balance(&store, &from, "core").unwrap(), 10);

        let event = bank.send(&mut store, &from, &to, &[Coin::new(4, "core")]).unwrap();
        assert_eq!(event.r#type, "transfer");
        assert_eq!(bank.balance(&store, &to, "core").unwrap(), 4);
        assert_eq!(bank.balance(&store, &from, "core").unwrap(), 6);
    }

    #[test]
    fn test_send_enabled_param() {
        let bank = keeper();
        let mut store = MemStore::new();
        let coins = [Coin::new(1, "core")];
        assert!(matches!(
            bank.check_send_enabled(&store, &coins),
            Err(AppError::SendDisabled(_))
        ));
        bank.params
            .set(&mut store, SUBSPACE_BANK, &BankParams { default_send_enabled: true })
            .unwrap();
        assert!(bank.check_send_enabled(&store, &coins).is_ok());
    }

    #[test]
    fn test_genesis_supply_mismatch() {
        let bank = keeper();
        let mut store = MemStore::new();
        let balances = vec![(Address::new([3; 20]), vec![Coin::new(5, "core")])];
        let err = bank
            .init_genesis(&mut store, &BankParams::default(), &balances, &[Coin::new(6, "core")])
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidGenesis(_)));
    }
}
