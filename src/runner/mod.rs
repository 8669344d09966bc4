//! Driving a harness environment from Rust.

pub mod app;
pub mod error;
pub mod result;

use prost::Message;

use chain_tube_types::proto::abci::SimulationResponse;
use chain_tube_types::Any;

use crate::account::SigningAccount;
use crate::runner::result::{RunnerExecuteResult, RunnerResult};

/// Something that executes transactions and answers queries.
pub trait Runner {
    /// Sign `msgs` with `signer` and deliver them as one transaction. The
    /// response is decoded from the first message's reply.
    fn execute_multiple_raw<R>(&self, msgs: Vec<Any>, signer: &SigningAccount) -> RunnerExecuteResult<R>
    where
        R: Message + Default;

    /// Deliver already signed transaction bytes.
    fn execute_tx(&self, tx_bytes: &[u8]) -> RunnerResult<SimulationResponse>;

    fn query<Q, R>(&self, path: &str, query: &Q) -> RunnerResult<R>
    where
        Q: Message,
        R: Message + Default;

    fn execute_multiple<M, R>(&self, msgs: &[(M, &str)], signer: &SigningAccount) -> RunnerExecuteResult<R>
    where
        M: Message,
        R: Message + Default,
    {
        let msgs = msgs
            .iter()
            .map(|(msg, type_url)| Any {
                type_url: type_url.to_string(),
                value: msg.encode_to_vec(),
            })
            .collect();
        self.execute_multiple_raw(msgs, signer)
    }

    fn execute<M, R>(&self, msg: M, type_url: &str, signer: &SigningAccount) -> RunnerExecuteResult<R>
    where
        M: Message,
        R: Message + Default,
    {
        self.execute_multiple(&[(msg, type_url)], signer)
    }
}
