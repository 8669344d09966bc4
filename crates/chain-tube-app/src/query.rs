//! Query routing by fully-qualified gRPC method path.
//!
//! Requests and responses are protobuf bytes; each handler decodes its own
//! request type and reads the application's working state.

use std::collections::BTreeMap;

use prost::Message;

use chain_tube_types::proto::auth::{QueryAccountRequest, QueryAccountResponse};
use chain_tube_types::proto::bank::{
    QueryAllBalancesRequest, QueryAllBalancesResponse, QueryBalanceRequest, QueryBalanceResponse,
    QuerySupplyOfRequest, QuerySupplyOfResponse,
};
use chain_tube_types::proto::slashing::{QuerySigningInfoRequest, QuerySigningInfoResponse};
use chain_tube_types::proto::staking::{
    BondStatus, DelegationResponse, QueryDelegationRequest, QueryDelegationResponse,
    QueryStakingParamsResponse, QueryValidatorRequest, QueryValidatorResponse,
    QueryValidatorsRequest, QueryValidatorsResponse,
};
use chain_tube_types::proto::wasm::{CodeInfoResponse, QueryCodeRequest, QueryCodeResponse};
use chain_tube_types::Coin;

use crate::app::ChainApp;
use crate::context::Context;
use crate::errors::{AppError, AppResult};

pub type QueryHandler = fn(&ChainApp, &Context, &[u8]) -> AppResult<Vec<u8>>;

pub const ROUTE_ACCOUNT: &str = "/cosmos.auth.v1beta1.Query/Account";
pub const ROUTE_BALANCE: &str = "/cosmos.bank.v1beta1.Query/Balance";
pub const ROUTE_ALL_BALANCES: &str = "/cosmos.bank.v1beta1.Query/AllBalances";
pub const ROUTE_SUPPLY_OF: &str = "/cosmos.bank.v1beta1.Query/SupplyOf";
pub const ROUTE_VALIDATORS: &str = "/cosmos.staking.v1beta1.Query/Validators";
pub const ROUTE_VALIDATOR: &str = "/cosmos.staking.v1beta1.Query/Validator";
pub const ROUTE_DELEGATION: &str = "/cosmos.staking.v1beta1.Query/Delegation";
pub const ROUTE_STAKING_PARAMS: &str = "/cosmos.staking.v1beta1.Query/Params";
pub const ROUTE_SIGNING_INFO: &str = "/cosmos.slashing.v1beta1.Query/SigningInfo";
pub const ROUTE_CODE: &str = "/cosmwasm.wasm.v1.Query/Code";

#[derive(Clone)]
pub struct QueryRouter {
    routes: BTreeMap<&'static str, QueryHandler>,
}

impl std::fmt::Debug for QueryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routes.keys()).finish()
    }
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryRouter {
    pub fn new() -> Self {
        let mut routes: BTreeMap<&'static str, QueryHandler> = BTreeMap::new();
        routes.insert(ROUTE_ACCOUNT, account);
        routes.insert(ROUTE_BALANCE, balance);
        routes.insert(ROUTE_ALL_BALANCES, all_balances);
        routes.insert(ROUTE_SUPPLY_OF, supply_of);
        routes.insert(ROUTE_VALIDATORS, validators);
        routes.insert(ROUTE_VALIDATOR, validator);
        routes.insert(ROUTE_DELEGATION, delegation);
        routes.insert(ROUTE_STAKING_PARAMS, staking_params);
        routes.insert(ROUTE_SIGNING_INFO, signing_info);
        routes.insert(ROUTE_CODE, code);
        Self { routes }
    }

    pub fn route(&self, path: &str) -> Option<QueryHandler> {
        self.routes.get(path).copied()
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }
}

fn require_field(value: &str, what: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::InvalidRequest(format!("empty {} is not allowed", what)));
    }
    Ok(())
}

fn account(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QueryAccountRequest::decode(data)?;
    require_field(&req.address, "address")?;
    let auth = &app.keepers().auth;
    let addr = auth.parse_address(&req.address)?;
    let account = auth
        .account_any(app.store(), &addr)?
        .ok_or_else(|| AppError::NotFound(format!("account {} not found", req.address)))?;
    Ok(QueryAccountResponse {
        account: Some(account),
    }
    .encode_to_vec())
}

fn balance(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QueryBalanceRequest::decode(data)?;
    require_field(&req.address, "address")?;
    chain_tube_types::coin::validate_denom(&req.denom)?;
    let keepers = app.keepers();
    let addr = keepers.auth.parse_address(&req.address)?;
    let amount = keepers.bank.balance(app.store(), &addr, &req.denom)?;
    Ok(QueryBalanceResponse {
        balance: Some(Coin::new(amount, req.denom)),
    }
    .encode_to_vec())
}

fn all_balances(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QueryAllBalancesRequest::decode(data)?;
    require_field(&req.address, "address")?;
    let keepers = app.keepers();
    let addr = keepers.auth.parse_address(&req.address)?;
    Ok(QueryAllBalancesResponse {
        balances: keepers.bank.all_balances(app.store(), &addr)?,
    }
    .encode_to_vec())
}

fn supply_of(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QuerySupplyOfRequest::decode(data)?;
    chain_tube_types::coin::validate_denom(&req.denom)?;
    let amount = app.keepers().bank.supply_of(app.store(), &req.denom)?;
    Ok(QuerySupplyOfResponse {
        amount: Some(Coin::new(amount, req.denom)),
    }
    .encode_to_vec())
}

fn validators(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QueryValidatorsRequest::decode(data)?;
    let status = if req.status.is_empty() {
        None
    } else {
        let status = BondStatus::from_str_name(&req.status).ok_or_else(|| {
            AppError::InvalidRequest(format!("invalid validator status {}", req.status))
        })?;
        Some(status as i32)
    };
    let validators = app
        .keepers()
        .staking
        .validators(app.store())?
        .into_iter()
        .filter(|v| status.map_or(true, |s| v.status == s))
        .collect();
    Ok(QueryValidatorsResponse { validators }.encode_to_vec())
}

fn validator(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QueryValidatorRequest::decode(data)?;
    require_field(&req.validator_addr, "validator address")?;
    let staking = &app.keepers().staking;
    let operator = staking.parse_valoper(&req.validator_addr)?;
    let validator = staking
        .validator(app.store(), &operator)?
        .ok_or_else(|| AppError::NotFound(format!("validator {} not found", req.validator_addr)))?;
    Ok(QueryValidatorResponse {
        validator: Some(validator),
    }
    .encode_to_vec())
}

fn delegation(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QueryDelegationRequest::decode(data)?;
    require_field(&req.delegator_addr, "delegator address")?;
    require_field(&req.validator_addr, "validator address")?;
    let keepers = app.keepers();
    let delegator = keepers.auth.parse_address(&req.delegator_addr)?;
    let operator = keepers.staking.parse_valoper(&req.validator_addr)?;
    let delegation = keepers
        .staking
        .delegation(app.store(), &delegator, &operator)?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "delegation with delegator {} not found for validator {}",
                req.delegator_addr, req.validator_addr
            ))
        })?;
    // Shares map 1:1 onto tokens.
    let balance = Coin {
        denom: keepers.staking.bond_denom(app.store())?,
        amount: delegation.shares.clone(),
    };
    Ok(QueryDelegationResponse {
        delegation_response: Some(DelegationResponse {
            delegation: Some(delegation),
            balance: Some(balance),
        }),
    }
    .encode_to_vec())
}

fn staking_params(app: &ChainApp, _ctx: &Context, _data: &[u8]) -> AppResult<Vec<u8>> {
    Ok(QueryStakingParamsResponse {
        params: Some(app.keepers().staking.params(app.store())?),
    }
    .encode_to_vec())
}

fn signing_info(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QuerySigningInfoRequest::decode(data)?;
    require_field(&req.cons_address, "consensus address")?;
    let slashing = &app.keepers().slashing;
    let cons = slashing.parse_cons_address(&req.cons_address)?;
    let info = slashing.signing_info(app.store(), &cons)?.ok_or_else(|| {
        AppError::NotFound(format!("SigningInfo not found for validator {}", req.cons_address))
    })?;
    Ok(QuerySigningInfoResponse {
        val_signing_info: Some(info),
    }
    .encode_to_vec())
}

fn code(app: &ChainApp, _ctx: &Context, data: &[u8]) -> AppResult<Vec<u8>> {
    let req = QueryCodeRequest::decode(data)?;
    if req.code_id == 0 {
        return Err(AppError::InvalidRequest("code id cannot be 0".to_string()));
    }
    let wasm = &app.keepers().wasm;
    let info = wasm
        .code_info(app.store(), req.code_id)?
        .ok_or_else(|| AppError::NotFound(format!("code {} not found", req.code_id)))?;
    let bytes = wasm.code_bytes(&info)?;
    Ok(QueryCodeResponse {
        code_info: Some(CodeInfoResponse {
            code_id: req.code_id,
            creator: info.creator,
            data_hash: info.code_hash,
        }),
        data: bytes,
    }
    .encode_to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_paths() {
        let router = QueryRouter::new();
        assert!(router.route(ROUTE_BALANCE).is_some());
        assert!(router.route("/cosmos.bank.v1beta1.Query/Nope").is_none());
        assert_eq!(router.paths().count(), 10);
    }
}
