use chain_tube_types::proto::auth::{BaseAccount, QueryAccountRequest, QueryAccountResponse};

use crate::fn_query;
use crate::module::Module;
use crate::runner::error::DecodeError;
use crate::runner::result::RunnerResult;
use crate::runner::Runner;

pub struct Auth<'a, R: Runner> {
    runner: &'a R,
}

impl<'a, R: Runner> Module<'a, R> for Auth<'a, R> {
    fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<'a, R: Runner> Auth<'a, R> {
    fn_query! {
        pub query_account ["/cosmos.auth.v1beta1.Query/Account"]: QueryAccountRequest => QueryAccountResponse
    }

    /// The account at `address` unpacked as a [`BaseAccount`]; `None` for
    /// module accounts.
    pub fn base_account(&self, address: &str) -> RunnerResult<Option<BaseAccount>> {
        let res = self.query_account(&QueryAccountRequest {
            address: address.to_string(),
        })?;
        let Some(any) = res.account else {
            return Ok(None);
        };
        Ok(any
            .unpack::<BaseAccount>()
            .map_err(DecodeError::ProtoDecodeError)?)
    }
}
