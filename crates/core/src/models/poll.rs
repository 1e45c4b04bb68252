//! Terminal outcome of a bounded polling cycle

use super::Snapshot;
use crate::{Error, Result};
use std::fmt;
use std::time::Duration;

/// Expected / observed pair from one fetch-sample cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPair {
    pub expected: Snapshot,
    pub observed: Snapshot,
}

/// Lifecycle of a polling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Polling,
    Matched,
    TimedOut,
    Failed,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PollState::Pending => "pending",
            PollState::Polling => "polling",
            PollState::Matched => "matched",
            PollState::TimedOut => "timed_out",
            PollState::Failed => "error",
        };
        f.write_str(s)
    }
}

/// Terminal outcome, carrying the last pair for diagnostics
#[derive(Debug)]
pub enum PollResult {
    Matched {
        attempts: u32,
        elapsed: Duration,
        pair: SnapshotPair,
    },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last: Option<SnapshotPair>,
        /// Transient error behind the last attempt, if it was not a
        /// plain "not yet"
        last_error: Option<Error>,
    },
    Error {
        attempts: u32,
        elapsed: Duration,
        error: Error,
        last: Option<SnapshotPair>,
    },
}

impl PollResult {
    pub fn state(&self) -> PollState {
        match self {
            PollResult::Matched { .. } => PollState::Matched,
            PollResult::TimedOut { .. } => PollState::TimedOut,
            PollResult::Error { .. } => PollState::Failed,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, PollResult::Matched { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollResult::Matched { attempts, .. }
            | PollResult::TimedOut { attempts, .. }
            | PollResult::Error { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollResult::Matched { elapsed, .. }
            | PollResult::TimedOut { elapsed, .. }
            | PollResult::Error { elapsed, .. } => *elapsed,
        }
    }

    /// Last expected/observed pair, if any attempt got that far
    pub fn last_pair(&self) -> Option<&SnapshotPair> {
        match self {
            PollResult::Matched { pair, .. } => Some(pair),
            PollResult::TimedOut { last, .. } | PollResult::Error { last, .. } => last.as_ref(),
        }
    }

    /// Turn a non-matching outcome into a test failure.
    ///
    /// An element that never appeared surfaces as `ElementNotFound` with
    /// the full wait, so it stays distinct from a value that never matched.
    pub fn into_result(self) -> Result<SnapshotPair> {
        match self {
            PollResult::Matched { pair, .. } => Ok(pair),
            PollResult::TimedOut {
                elapsed,
                last,
                last_error,
                ..
            } => {
                let elapsed_ms = elapsed.as_millis() as u64;
                let what = match (last_error, &last) {
                    (Some(Error::ElementNotFound { locator, .. }), _) => {
                        return Err(Error::ElementNotFound {
                            locator,
                            timeout_ms: elapsed_ms,
                        })
                    }
                    (Some(error), _) => error.to_string(),
                    (None, Some(pair)) => format!("{} to match {}", pair.observed, pair.expected),
                    (None, None) => "first successful sample".to_string(),
                };
                Err(Error::Timeout { what, elapsed_ms })
            }
            PollResult::Error { error, .. } => Err(error),
        }
    }
}

impl fmt::Display for PollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} attempt(s) in {:.1}s",
            self.state(),
            self.attempts(),
            self.elapsed().as_secs_f64()
        )?;
        if let Some(pair) = self.last_pair() {
            write!(f, ": expected {}, observed {}", pair.expected, pair.observed)?;
        }
        if let PollResult::Error { error, .. } = self {
            write!(f, " ({})", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    #[test]
    fn test_timed_out_into_result() {
        let result = PollResult::TimedOut {
            attempts: 4,
            elapsed: Duration::from_secs(30),
            last: Some(SnapshotPair {
                expected: Snapshot::computed("wallet_balance", Value::Amount(150.0)),
                observed: Snapshot::api("wallet_balance", Value::Amount(100.0)),
            }),
            last_error: None,
        };
        assert_eq!(result.state(), PollState::TimedOut);
        let err = result.into_result().unwrap_err();
        assert!(matches!(err, Error::Timeout { elapsed_ms: 30_000, .. }));
    }

    #[test]
    fn test_missing_element_is_not_reported_as_timeout() {
        let result = PollResult::TimedOut {
            attempts: 3,
            elapsed: Duration::from_millis(2_500),
            last: None,
            last_error: Some(Error::ElementNotFound {
                locator: "#vip-remaining".into(),
                timeout_ms: 0,
            }),
        };
        match result.into_result() {
            Err(Error::ElementNotFound { locator, timeout_ms }) => {
                assert_eq!(locator, "#vip-remaining");
                assert_eq!(timeout_ms, 2_500);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
