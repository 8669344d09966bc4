use chain_tube_types::proto::slashing::{QuerySigningInfoRequest, QuerySigningInfoResponse};

use crate::fn_query;
use crate::module::Module;
use crate::runner::Runner;

pub struct Slashing<'a, R: Runner> {
    runner: &'a R,
}

impl<'a, R: Runner> Module<'a, R> for Slashing<'a, R> {
    fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<'a, R: Runner> Slashing<'a, R> {
    fn_query! {
        pub query_signing_info ["/cosmos.slashing.v1beta1.Query/SigningInfo"]: QuerySigningInfoRequest => QuerySigningInfoResponse
    }
}
