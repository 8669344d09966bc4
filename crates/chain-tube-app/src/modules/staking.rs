//! Validators, delegations and the bonded / not-bonded pools.
//!
//! Tokens and shares are kept 1:1 (no slashing of stake), so shares are
//! stored as integer strings. Consensus power is `tokens / POWER_REDUCTION`.

use prost::Message;

use chain_tube_types::coin::amount_of;
use chain_tube_types::keys::address_from_pubkey_any;
use chain_tube_types::proto::abci::Event;
use chain_tube_types::proto::crypto::Ed25519PubKey;
use chain_tube_types::proto::staking::{
    BondStatus, Delegation, MsgCreateValidator, MsgDelegate, StakingParams, Validator,
};
use chain_tube_types::{Address, Coin, TypeUrl};

use crate::abci::ValidatorUpdate;
use crate::context::Context;
use crate::decimal::parse_dec;
use crate::errors::{AppError, AppResult};
use crate::store::{self, KvStore};

use super::auth::{AuthKeeper, BONDED_POOL, NOT_BONDED_POOL};
use super::bank::BankKeeper;
use super::params::{ParamsKeeper, SUBSPACE_STAKING};
use super::prefix;
use super::slashing::SlashingKeeper;

pub const POWER_REDUCTION: u128 = 1_000_000;

#[derive(Debug, Clone)]
pub struct StakingKeeper {
    auth: AuthKeeper,
    bank: BankKeeper,
    params: ParamsKeeper,
    slashing: SlashingKeeper,
}

pub(crate) fn parse_int(value: &str, what: &str) -> AppResult<u128> {
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<u128>()
        .map_err(|_| AppError::InvalidRequest(format!("invalid {} '{}'", what, value)))
}

pub fn consensus_power(validator: &Validator) -> i64 {
    let tokens = validator.tokens.parse::<u128>().unwrap_or(0);
    i64::try_from(tokens / POWER_REDUCTION).unwrap_or(i64::MAX)
}

impl StakingKeeper {
    pub fn new(
        auth: AuthKeeper,
        bank: BankKeeper,
        params: ParamsKeeper,
        slashing: SlashingKeeper,
    ) -> Self {
        Self {
            auth,
            bank,
            params,
            slashing,
        }
    }

    pub fn params(&self, store: &dyn KvStore) -> AppResult<StakingParams> {
        self.params.get(store, SUBSPACE_STAKING)
    }

    pub fn bond_denom(&self, store: &dyn KvStore) -> AppResult<String> {
        Ok(self.params(store)?.bond_denom)
    }

    pub fn valoper_bech32(&self, addr: &Address) -> String {
        addr.to_bech32(&self.auth.prefixes().validator)
    }

    pub fn parse_valoper(&self, input: &str) -> AppResult<Address> {
        Ok(Address::from_bech32(input, &self.auth.prefixes().validator)?)
    }

    pub fn operator(&self, validator: &Validator) -> AppResult<Address> {
        self.parse_valoper(&validator.operator_address)
    }

    pub fn consensus_address(&self, validator: &Validator) -> AppResult<Address> {
        let pubkey = validator.consensus_pubkey.as_ref().ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "validator {} has no consensus pubkey",
                validator.operator_address
            ))
        })?;
        Ok(address_from_pubkey_any(pubkey)?)
    }

    pub fn validator(&self, store: &dyn KvStore, operator: &Address) -> AppResult<Option<Validator>> {
        store::get_msg(store, &store::key(prefix::VALIDATOR, &[operator.as_bytes()]))
    }

    pub fn set_validator(&self, store: &mut dyn KvStore, operator: &Address, validator: &Validator) {
        store::set_msg(store, &store::key(prefix::VALIDATOR, &[operator.as_bytes()]), validator);
    }

    /// All validators in operator-address order.
    pub fn validators(&self, store: &dyn KvStore) -> AppResult<Vec<Validator>> {
        store
            .prefix_scan(&[prefix::VALIDATOR])
            .into_iter()
            .map(|(_, v)| Validator::decode(v.as_slice()).map_err(AppError::from))
            .collect()
    }

    pub fn bonded_validators(&self, store: &dyn KvStore) -> AppResult<Vec<Validator>> {
        Ok(self
            .validators(store)?
            .into_iter()
            .filter(|v| v.status == BondStatus::Bonded as i32)
            .collect())
    }

    pub fn validator_by_cons(&self, store: &dyn KvStore, cons: &Address) -> AppResult<Option<Validator>> {
        match store.get(&store::key(prefix::VALIDATOR_BY_CONS, &[cons.as_bytes()])) {
            Some(operator) => self.validator(store, &Address::from_slice(&operator)?),
            None => Ok(None),
        }
    }

    pub fn delegation(
        &self,
        store: &dyn KvStore,
        delegator: &Address,
        operator: &Address,
    ) -> AppResult<Option<Delegation>> {
        store::get_msg(
            store,
            &store::key(prefix::DELEGATION, &[delegator.as_bytes(), operator.as_bytes()]),
        )
    }

    fn set_delegation(
        &self,
        store: &mut dyn KvStore,
        delegator: &Address,
        operator: &Address,
        delegation: &Delegation,
    ) {
        store::set_msg(
            store,
            &store::key(prefix::DELEGATION, &[delegator.as_bytes(), operator.as_bytes()]),
            delegation,
        );
    }

    fn add_delegation(
        &self,
        store: &mut dyn KvStore,
        delegator: &Address,
        operator: &Address,
        amount: u128,
    ) -> AppResult<()> {
        let mut delegation = self
            .delegation(store, delegator, operator)?
            .unwrap_or_else(|| Delegation {
                delegator_address: self.auth.bech32(delegator),
                validator_address: self.valoper_bech32(operator),
                shares: "0".to_string(),
            });
        let shares = parse_int(&delegation.shares, "shares")? + amount;
        delegation.shares = shares.to_string();
        self.set_delegation(store, delegator, operator, &delegation);
        Ok(())
    }

    fn check_commission(&self, params: &StakingParams, msg: &MsgCreateValidator) -> AppResult<()> {
        let commission = msg.commission.clone().unwrap_or_default();
        let rate = parse_dec(&commission.rate)?;
        let max_rate = parse_dec(&commission.max_rate)?;
        let max_change = parse_dec(&commission.max_change_rate)?;
        if rate > max_rate {
            return Err(AppError::InvalidRequest(
                "commission rate cannot be more than the max rate".to_string(),
            ));
        }
        if max_change > max_rate {
            return Err(AppError::InvalidRequest(
                "commission change rate cannot be more than the max rate".to_string(),
            ));
        }
        if !params.min_commission_rate.is_empty() && rate < parse_dec(&params.min_commission_rate)? {
            return Err(AppError::InvalidRequest(format!(
                "commission rate cannot be less than the minimum {}",
                params.min_commission_rate
            )));
        }
        Ok(())
    }

    /// Create an unbonded validator with its self-delegation held in the
    /// not-bonded pool.
    pub fn create_validator(
        &self,
        store: &mut dyn KvStore,
        msg: &MsgCreateValidator,
    ) -> AppResult<(Address, Vec<Event>)> {
        let params = self.params(store)?;
        let operator = self.parse_valoper(&msg.validator_address)?;
        let delegator = self.auth.parse_address(&msg.delegator_address)?;
        if operator != delegator {
            return Err(AppError::InvalidRequest(
                "validator address is invalid: operator and delegator differ".to_string(),
            ));
        }
        if self.validator(store, &operator)?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "validator {} already exist",
                msg.validator_address
            )));
        }

        let pubkey = msg
            .pubkey
            .clone()
            .ok_or_else(|| AppError::InvalidRequest("empty validator public key".to_string()))?;
        if pubkey.type_url != Ed25519PubKey::TYPE_URL {
            return Err(AppError::InvalidRequest(format!(
                "validator pubkey type {} is not supported",
                pubkey.type_url
            )));
        }
        let cons = address_from_pubkey_any(&pubkey)?;
        if store.has(&store::key(prefix::VALIDATOR_BY_CONS, &[cons.as_bytes()])) {
            return Err(AppError::AlreadyExists("validator pubkey already exist".to_string()));
        }

        let value = msg
            .value
            .clone()
            .ok_or_else(|| AppError::InvalidRequest("empty self delegation".to_string()))?;
        if value.denom != params.bond_denom {
            return Err(AppError::InvalidRequest(format!(
                "invalid coin denomination: got {}, expected {}",
                value.denom, params.bond_denom
            )));
        }
        let amount = amount_of(&value)?;
        let min_self = parse_int(&msg.min_self_delegation, "min self delegation")?;
        if min_self == 0 {
            return Err(AppError::InvalidRequest(
                "minimum self delegation must be a positive integer".to_string(),
            ));
        }
        if amount < min_self {
            return Err(AppError::InvalidRequest(
                "validator's self delegation must be greater than their minimum self delegation"
                    .to_string(),
            ));
        }
        self.check_commission(&params, msg)?;

        let transfer =
            self.bank
                .send_from_account_to_module(store, &delegator, NOT_BONDED_POOL, &[value.clone()])?;

        let validator = Validator {
            operator_address: self.valoper_bech32(&operator),
            consensus_pubkey: Some(pubkey),
            jailed: false,
            status: BondStatus::Unbonded as i32,
            tokens: amount.to_string(),
            delegator_shares: amount.to_string(),
            description: msg.description.clone(),
            unbonding_height: 0,
            commission: msg.commission.clone(),
            min_self_delegation: min_self.to_string(),
        };
        self.set_validator(store, &operator, &validator);
        store.set(
            &store::key(prefix::VALIDATOR_BY_CONS, &[cons.as_bytes()]),
            operator.as_bytes().to_vec(),
        );
        self.add_delegation(store, &delegator, &operator, amount)?;

        tracing::debug!(operator = %validator.operator_address, tokens = %validator.tokens, "validator created");
        let event = Event::new("create_validator")
            .attr("validator", validator.operator_address.clone())
            .attr("amount", format!("{}{}", value.amount, value.denom));
        Ok((operator, vec![transfer, event]))
    }

    pub fn delegate(&self, store: &mut dyn KvStore, msg: &MsgDelegate) -> AppResult<Vec<Event>> {
        let delegator = self.auth.parse_address(&msg.delegator_address)?;
        let operator = self.parse_valoper(&msg.validator_address)?;
        let mut validator = self
            .validator(store, &operator)?
            .ok_or_else(|| AppError::NotFound("validator does not exist".to_string()))?;
        let coin = msg
            .amount
            .clone()
            .ok_or_else(|| AppError::InvalidRequest("invalid delegation amount".to_string()))?;
        let bond_denom = self.bond_denom(store)?;
        if coin.denom != bond_denom {
            return Err(AppError::InvalidRequest(format!(
                "invalid coin denomination: got {}, expected {}",
                coin.denom, bond_denom
            )));
        }
        let amount = amount_of(&coin)?;
        if amount == 0 {
            return Err(AppError::InvalidRequest("invalid delegation amount".to_string()));
        }
        let pool = if validator.status == BondStatus::Bonded as i32 {
            BONDED_POOL
        } else {
            NOT_BONDED_POOL
        };
        let transfer = self
            .bank
            .send_from_account_to_module(store, &delegator, pool, &[coin.clone()])?;

        validator.tokens = (parse_int(&validator.tokens, "tokens")? + amount).to_string();
        validator.delegator_shares =
            (parse_int(&validator.delegator_shares, "shares")? + amount).to_string();
        self.set_validator(store, &operator, &validator);
        self.add_delegation(store, &delegator, &operator, amount)?;

        let event = Event::new("delegate")
            .attr("validator", msg.validator_address.clone())
            .attr("delegator", msg.delegator_address.clone())
            .attr("amount", format!("{}{}", coin.amount, coin.denom));
        Ok(vec![transfer, event])
    }

    /// Overwrite a validator's bond status without moving any funds.
    pub fn set_validator_status(
        &self,
        store: &mut dyn KvStore,
        operator: &Address,
        status: BondStatus,
    ) -> AppResult<()> {
        let mut validator = self
            .validator(store, operator)?
            .ok_or_else(|| AppError::NotFound("validator does not exist".to_string()))?;
        validator.status = status as i32;
        self.set_validator(store, operator, &validator);
        Ok(())
    }

    /// Bond the strongest unbonded validators while seats remain.
    pub fn end_block(&self, store: &mut dyn KvStore, ctx: &Context) -> AppResult<Vec<ValidatorUpdate>> {
        let params = self.params(store)?;
        let validators = self.validators(store)?;
        let mut bonded = validators
            .iter()
            .filter(|v| v.status == BondStatus::Bonded as i32)
            .count();
        let mut candidates: Vec<Validator> = validators
            .into_iter()
            .filter(|v| {
                v.status != BondStatus::Bonded as i32 && !v.jailed && consensus_power(v) > 0
            })
            .collect();
        candidates.sort_by(|a, b| {
            let ta = a.tokens.parse::<u128>().unwrap_or(0);
            let tb = b.tokens.parse::<u128>().unwrap_or(0);
            tb.cmp(&ta)
                .then_with(|| a.operator_address.cmp(&b.operator_address))
        });

        let mut updates = Vec::new();
        for mut validator in candidates {
            if bonded >= params.max_validators as usize {
                break;
            }
            let operator = self.operator(&validator)?;
            let cons = self.consensus_address(&validator)?;
            let tokens = Coin {
                denom: params.bond_denom.clone(),
                amount: validator.tokens.clone(),
            };
            self.bank
                .send_between_modules(store, NOT_BONDED_POOL, BONDED_POOL, &[tokens])?;
            validator.status = BondStatus::Bonded as i32;
            self.set_validator(store, &operator, &validator);
            self.slashing.on_validator_bonded(store, ctx, &cons)?;
            bonded += 1;
            tracing::debug!(operator = %validator.operator_address, "validator bonded");
            updates.push(ValidatorUpdate {
                pub_key: validator.consensus_pubkey.clone().unwrap_or_default(),
                power: consensus_power(&validator),
            });
        }
        Ok(updates)
    }

    /// Load genesis validators and delegations, checking pool balances
    /// against the tokens they claim to hold.
    pub fn init_genesis(
        &self,
        store: &mut dyn KvStore,
        params: &StakingParams,
        validators: &[Validator],
        delegations: &[Delegation],
    ) -> AppResult<Vec<ValidatorUpdate>> {
        self.params.set(store, SUBSPACE_STAKING, params)?;
        let bonded_pool = self.auth.ensure_module_account(store, BONDED_POOL)?;
        let not_bonded_pool = self.auth.ensure_module_account(store, NOT_BONDED_POOL)?;

        let mut bonded_tokens: u128 = 0;
        let mut not_bonded_tokens: u128 = 0;
        let mut updates = Vec::new();
        for validator in validators {
            let operator = self.operator(validator)?;
            let cons = self.consensus_address(validator)?;
            let tokens = parse_int(&validator.tokens, "tokens")?;
            if validator.status == BondStatus::Bonded as i32 {
                bonded_tokens += tokens;
                updates.push(ValidatorUpdate {
                    pub_key: validator.consensus_pubkey.clone().unwrap_or_default(),
                    power: consensus_power(validator),
                });
            } else {
                not_bonded_tokens += tokens;
            }
            self.set_validator(store, &operator, validator);
            store.set(
                &store::key(prefix::VALIDATOR_BY_CONS, &[cons.as_bytes()]),
                operator.as_bytes().to_vec(),
            );
        }
        for delegation in delegations {
            let delegator = self.auth.parse_address(&delegation.delegator_address)?;
            let operator = self.parse_valoper(&delegation.validator_address)?;
            if self.validator(store, &operator)?.is_none() {
                return Err(AppError::InvalidGenesis(format!(
                    "delegation to unknown validator {}",
                    delegation.validator_address
                )));
            }
            self.set_delegation(store, &delegator, &operator, delegation);
        }

        let bonded_balance = self.bank.balance(store, &bonded_pool, &params.bond_denom)?;
        if bonded_balance != bonded_tokens {
            return Err(AppError::InvalidGenesis(format!(
                "bonded pool balance is different from bonded coins: {} <-> {}",
                bonded_balance, bonded_tokens
            )));
        }
        let not_bonded_balance = self.bank.balance(store, &not_bonded_pool, &params.bond_denom)?;
        if not_bonded_balance != not_bonded_tokens {
            return Err(AppError::InvalidGenesis(format!(
                "not bonded pool balance is different from not bonded coins: {} <-> {}",
                not_bonded_balance, not_bonded_tokens
            )));
        }
        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BlockHeader;
    use crate::store::MemStore;
    use chain_tube_types::proto::staking::CommissionRates;
    use chain_tube_types::{Bech32Prefixes, Ed25519Key, Secp256k1Key};
    use chrono::Utc;

    fn keepers() -> (StakingKeeper, BankKeeper, SlashingKeeper) {
        let prefixes = Bech32Prefixes::default();
        let params = ParamsKeeper::new();
        let auth = AuthKeeper::new(prefixes.clone());
        let bank = BankKeeper::new(auth.clone(), params.clone());
        let slashing = SlashingKeeper::new(prefixes, params.clone());
        let staking = StakingKeeper::new(auth, bank.clone(), params, slashing.clone());
        (staking, bank, slashing)
    }

    fn staking_params() -> StakingParams {
        StakingParams {
            unbonding_time_seconds: 60,
            max_validators: 2,
            max_entries: 7,
            historical_entries: 0,
            bond_denom: "ucore".to_string(),
            min_commission_rate: "0".to_string(),
        }
    }

    fn create_msg(operator: &Secp256k1Key, amount: u128) -> MsgCreateValidator {
        let addr = operator.address();
        MsgCreateValidator {
            description: None,
            commission: Some(CommissionRates {
                rate: "0.05".to_string(),
                max_rate: "0.2".to_string(),
                max_change_rate: "0.01".to_string(),
            }),
            min_self_delegation: "1".to_string(),
            delegator_address: addr.to_bech32("core"),
            validator_address: addr.to_bech32("corevaloper"),
            pubkey: Some(Ed25519Key::generate().public_key_any()),
            value: Some(Coin::new(amount, "ucore")),
        }
    }

    fn ctx() -> Context {
        Context::new(BlockHeader {
            chain_id: "c".to_string(),
            height: 1,
            time: Utc::now(),
        })
    }

    #[test]
    fn test_create_validator_and_bond_at_end_block() {
        let (staking, bank, slashing) = keepers();
        let mut store = MemStore::new();
        staking.init_genesis(&mut store, &staking_params(), &[], &[]).unwrap();

        let operator = Secp256k1Key::generate();
        bank.fund_account(&mut store, &operator.address(), &[Coin::new(5_000_000, "ucore")])
            .unwrap();
        let (addr, _) = staking
            .create_validator(&mut store, &create_msg(&operator, 2_000_000))
            .unwrap();
        let validator = staking.validator(&store, &addr).unwrap().unwrap();
        assert_eq!(validator.status, BondStatus::Unbonded as i32);
        assert_eq!(
            bank.balance(&store, &AuthKeeper::module_address(NOT_BONDED_POOL), "ucore").unwrap(),
            2_000_000
        );

        let updates = staking.end_block(&mut store, &ctx()).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].power, 2);
        let validator = staking.validator(&store, &addr).unwrap().unwrap();
        assert_eq!(validator.status, BondStatus::Bonded as i32);
        assert_eq!(
            bank.balance(&store, &AuthKeeper::module_address(BONDED_POOL), "ucore").unwrap(),
            2_000_000
        );
        let cons = staking.consensus_address(&validator).unwrap();
        assert!(slashing.signing_info(&store, &cons).unwrap().is_some());
    }

    #[test]
    fn test_create_validator_rejections() {
        let (staking, bank, _) = keepers();
        let mut store = MemStore::new();
        staking.init_genesis(&mut store, &staking_params(), &[], &[]).unwrap();
        let operator = Secp256k1Key::generate();
        bank.fund_account(&mut store, &operator.address(), &[Coin::new(10, "ucore")])
            .unwrap();

        let mut wrong_denom = create_msg(&operator, 5);
        wrong_denom.value = Some(Coin::new(5, "other"));
        assert!(staking.create_validator(&mut store, &wrong_denom).is_err());

        let mut bad_commission = create_msg(&operator, 5);
        bad_commission.commission = Some(CommissionRates {
            rate: "0.5".to_string(),
            max_rate: "0.1".to_string(),
            max_change_rate: "0.01".to_string(),
        });
        assert!(staking.create_validator(&mut store, &bad_commission).is_err());

        let msg = create_msg(&operator, 5);
        staking.create_validator(&mut store, &msg).unwrap();
        let err = staking.create_validator(&mut store, &msg).unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[test]
    fn test_delegate_adds_tokens_and_shares() {
        let (staking, bank, _) = keepers();
        let mut store = MemStore::new();
        staking.init_genesis(&mut store, &staking_params(), &[], &[]).unwrap();
        let operator = Secp256k1Key::generate();
        let delegator = Secp256k1Key::generate();
        bank.fund_account(&mut store, &operator.address(), &[Coin::new(10, "ucore")])
            .unwrap();
        bank.fund_account(&mut store, &delegator.address(), &[Coin::new(10, "ucore")])
            .unwrap();
        let (op_addr, _) = staking
            .create_validator(&mut store, &create_msg(&operator, 10))
            .unwrap();

        staking
            .delegate(
                &mut store,
                &MsgDelegate {
                    delegator_address: delegator.address().to_bech32("core"),
                    validator_address: op_addr.to_bech32("corevaloper"),
                    amount: Some(Coin::new(7, "ucore")),
                },
            )
            .unwrap();
        let validator = staking.validator(&store, &op_addr).unwrap().unwrap();
        assert_eq!(validator.tokens, "17");
        let delegation = staking
            .delegation(&store, &delegator.address(), &op_addr)
            .unwrap()
            .unwrap();
        assert_eq!(delegation.shares, "7");
    }

    #[test]
    fn test_genesis_pool_mismatch_rejected() {
        let (staking, _, _) = keepers();
        let mut store = MemStore::new();
        let cons = Ed25519Key::generate();
        let operator = Address::new([8; 20]);
        let validator = Validator {
            operator_address: operator.to_bech32("corevaloper"),
            consensus_pubkey: Some(cons.public_key_any()),
            status: BondStatus::Bonded as i32,
            tokens: "1000000".to_string(),
            delegator_shares: "1000000".to_string(),
            ..Default::default()
        };
        let err = staking
            .init_genesis(&mut store, &staking_params(), &[validator], &[])
            .unwrap_err();
        assert!(err.to_string().contains("bonded pool balance"));
    }
}
