use chain_tube_types::proto::wasm::{
    MsgStoreCode, MsgStoreCodeResponse, QueryCodeRequest, QueryCodeResponse,
};

use crate::module::Module;
use crate::runner::Runner;
use crate::{fn_execute, fn_query};

pub struct Wasm<'a, R: Runner> {
    runner: &'a R,
}

impl<'a, R: Runner> Module<'a, R> for Wasm<'a, R> {
    fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<'a, R: Runner> Wasm<'a, R> {
    fn_execute! {
        pub store_code: MsgStoreCode => MsgStoreCodeResponse
    }

    fn_query! {
        pub query_code ["/cosmwasm.wasm.v1.Query/Code"]: QueryCodeRequest => QueryCodeResponse
    }
}
