//! Execution context and gas metering.

use chrono::{DateTime, Duration, Utc};

use crate::errors::{AppError, AppResult};

/// Header of the block being built or last finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: i64,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// State-changing block execution.
    Deliver,
    /// Dry run: no signature checks, infinite gas, writes discarded.
    Simulate,
}

/// Immutable view of where and how a request executes.
///
/// A new context is built for every block; callers never patch the header of
/// a context in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    header: BlockHeader,
    exec_mode: ExecMode,
}

impl Context {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            exec_mode: ExecMode::Deliver,
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn chain_id(&self) -> &str {
        &self.header.chain_id
    }

    pub fn block_height(&self) -> i64 {
        self.header.height
    }

    pub fn block_time(&self) -> DateTime<Utc> {
        self.header.time
    }

    pub fn exec_mode(&self) -> ExecMode {
        self.exec_mode
    }

    pub fn is_simulate(&self) -> bool {
        self.exec_mode == ExecMode::Simulate
    }

    pub fn with_exec_mode(&self, exec_mode: ExecMode) -> Self {
        Self {
            header: self.header.clone(),
            exec_mode,
        }
    }

    /// Header of the block following this one, `delta_secs` later.
    pub fn next_header(&self, delta_secs: i64) -> BlockHeader {
        BlockHeader {
            chain_id: self.header.chain_id.clone(),
            height: self.header.height + 1,
            time: self.header.time + Duration::seconds(delta_secs),
        }
    }
}

/// Tracks gas consumed against an optional limit.
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: 0,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn consume(&mut self, amount: u64, descriptor: &str) -> AppResult<()> {
        self.consumed = self.consumed.saturating_add(amount);
        match self.limit {
            Some(limit) if self.consumed > limit => Err(AppError::OutOfGas {
                limit,
                used: self.consumed,
                descriptor: descriptor.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> BlockHeader {
        BlockHeader {
            chain_id: "test-1".to_string(),
            height: 7,
            time: DateTime::from_timestamp(1_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_next_header_advances_height_and_time() {
        let ctx = Context::new(header());
        let next = ctx.next_header(5);
        assert_eq!(next.height, 8);
        assert_eq!(next.time.timestamp(), 1_005);
        assert_eq!(next.chain_id, "test-1");
    }

    #[test]
    fn test_simulate_mode_keeps_header() {
        let ctx = Context::new(header()).with_exec_mode(ExecMode::Simulate);
        assert!(ctx.is_simulate());
        assert_eq!(ctx.block_height(), 7);
    }

    #[test]
    fn test_gas_meter_limit() {
        let mut meter = GasMeter::new(100);
        meter.consume(60, "a").unwrap();
        let err = meter.consume(50, "b").unwrap_err();
        assert!(matches!(err, AppError::OutOfGas { limit: 100, used: 110, .. }));

        let mut unlimited = GasMeter::infinite();
        unlimited.consume(u64::MAX, "big").unwrap();
        assert_eq!(unlimited.consumed(), u64::MAX);
    }
}
