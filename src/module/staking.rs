use chain_tube_types::proto::staking::{
    MsgCreateValidator, MsgCreateValidatorResponse, MsgDelegate, MsgDelegateResponse,
    QueryDelegationRequest, QueryDelegationResponse, QueryStakingParamsRequest,
    QueryStakingParamsResponse, QueryValidatorRequest, QueryValidatorResponse,
    QueryValidatorsRequest, QueryValidatorsResponse,
};

use crate::module::Module;
use crate::runner::Runner;
use crate::{fn_execute, fn_query};

pub struct Staking<'a, R: Runner> {
    runner: &'a R,
}

impl<'a, R: Runner> Module<'a, R> for Staking<'a, R> {
    fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<'a, R: Runner> Staking<'a, R> {
    fn_execute! {
        pub create_validator: MsgCreateValidator => MsgCreateValidatorResponse
    }

    fn_execute! {
        pub delegate: MsgDelegate => MsgDelegateResponse
    }

    fn_query! {
        /// Validators, optionally filtered by bond status name.
        pub query_validators ["/cosmos.staking.v1beta1.Query/Validators"]: QueryValidatorsRequest => QueryValidatorsResponse
    }

    fn_query! {
        pub query_validator ["/cosmos.staking.v1beta1.Query/Validator"]: QueryValidatorRequest => QueryValidatorResponse
    }

    fn_query! {
        pub query_delegation ["/cosmos.staking.v1beta1.Query/Delegation"]: QueryDelegationRequest => QueryDelegationResponse
    }

    fn_query! {
        pub query_params ["/cosmos.staking.v1beta1.Query/Params"]: QueryStakingParamsRequest => QueryStakingParamsResponse
    }
}
