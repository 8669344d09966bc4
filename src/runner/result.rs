//! Decoding harness responses on the client side.

use prost::Message;

use chain_tube_core::ResultEnvelope;
use chain_tube_types::proto::abci::{Event, GasInfo, SimulationResponse};

use crate::runner::error::{DecodeError, RunnerError};

pub type RunnerResult<T> = Result<T, RunnerError>;
pub type RunnerExecuteResult<R> = Result<ExecuteResponse<R>, RunnerError>;

/// Outcome of a delivered transaction whose first message answered with `R`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteResponse<R>
where
    R: Message + Default,
{
    pub data: R,
    pub raw_data: Vec<u8>,
    pub events: Vec<Event>,
    pub gas_info: GasInfo,
}

impl<R> ExecuteResponse<R>
where
    R: Message + Default,
{
    /// First event of `kind`, if any.
    pub fn event(&self, kind: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.r#type == kind)
    }
}

impl<R> TryFrom<SimulationResponse> for ExecuteResponse<R>
where
    R: Message + Default,
{
    type Error = RunnerError;

    fn try_from(res: SimulationResponse) -> Result<Self, Self::Error> {
        let result = res
            .result
            .ok_or_else(|| RunnerError::GenericError("response carries no tx result".to_string()))?;
        // An empty response list means no message ran.
        let msg_data = result
            .msg_responses
            .first()
            .ok_or_else(|| RunnerError::ExecuteError {
                msg: result.log.clone(),
            })?;
        let data = R::decode(msg_data.value.as_slice()).map_err(DecodeError::ProtoDecodeError)?;

        Ok(Self {
            data,
            raw_data: result.data,
            events: result.events,
            gas_info: res.gas_info.unwrap_or_default(),
        })
    }
}

/// A decoded result envelope.
///
/// The harness answers execute, query, simulate and parameter calls with a
/// base64 string: one tag byte (`0` ok, `1` query error, `2` execute error)
/// followed by the payload or a UTF-8 message.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult(Result<Vec<u8>, RunnerError>);

impl RawResult {
    /// Decode a base64 envelope as returned across the C boundary.
    pub fn from_base64(b64: &str) -> Result<Self, DecodeError> {
        ResultEnvelope::from_base64(b64)
            .map(Self::from)
            .map_err(DecodeError::Envelope)
    }

    pub fn into_result(self) -> Result<Vec<u8>, RunnerError> {
        self.0
    }
}

impl From<ResultEnvelope> for RawResult {
    fn from(envelope: ResultEnvelope) -> Self {
        Self(envelope.into_result().map_err(RunnerError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_tube_core::ReportedError;
    use chain_tube_types::proto::abci::TxResult;
    use chain_tube_types::proto::bank::MsgSendResponse;
    use chain_tube_types::Any;

    #[test]
    fn test_raw_result_from_base64() {
        // tag 0 followed by "hi"
        let ok = RawResult::from_base64("AGhp").unwrap();
        assert_eq!(ok.into_result().unwrap(), b"hi".to_vec());

        let envelope = ResultEnvelope::err(ReportedError::query("No route found for `/x`"));
        let err = RawResult::from_base64(&envelope.to_base64())
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(
            err,
            RunnerError::QueryError {
                msg: "No route found for `/x`".to_string()
            }
        );
    }

    #[test]
    fn test_raw_result_rejects_unknown_tag() {
        // tag 9
        assert_eq!(
            RawResult::from_base64("CQ==").unwrap_err(),
            DecodeError::Envelope(chain_tube_core::EnvelopeError::UnknownTag(9))
        );
    }

    #[test]
    fn test_execute_response_takes_first_msg_response() {
        let res = SimulationResponse {
            gas_info: Some(GasInfo {
                gas_wanted: 200_000,
                gas_used: 12_345,
            }),
            result: Some(TxResult {
                data: vec![1, 2],
                log: String::new(),
                events: vec![Event::new("transfer").attr("amount", "5core")],
                msg_responses: vec![Any::pack(&MsgSendResponse {})],
            }),
        };
        let parsed = ExecuteResponse::<MsgSendResponse>::try_from(res).unwrap();
        assert_eq!(parsed.gas_info.gas_used, 12_345);
        assert_eq!(parsed.raw_data, vec![1, 2]);
        assert!(parsed.event("transfer").is_some());
        assert!(parsed.event("burn").is_none());
    }

    #[test]
    fn test_execute_response_without_msg_response_is_execute_error() {
        let res = SimulationResponse {
            gas_info: None,
            result: Some(TxResult {
                log: "nothing ran".to_string(),
                ..Default::default()
            }),
        };
        assert_eq!(
            ExecuteResponse::<MsgSendResponse>::try_from(res).unwrap_err(),
            RunnerError::ExecuteError {
                msg: "nothing ran".to_string()
            }
        );
    }
}
