//! Retry state machine for statement execution
//!
//! The executor drives a [`RetryState`] with the outcome of each attempt. The
//! transition function is pure, so the policy can be tested without a pool.
//!
//! ```text
//! Attempting(n) --Succeeded--------------------> Succeeded(n)
//! Attempting(n) --Failed(retriable), n < max--> Rebuilding(n)
//! Attempting(n) --Failed(otherwise)-----------> Exhausted(n)
//! Rebuilding(n) --Rebuilt---------------------> Attempting(n + 1)
//! ```

use crate::error::DatabaseError;

/// Default attempt budget for a statement
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Where an execution currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to run attempt `attempt` (1-based)
    Attempting { attempt: u32 },
    /// Attempt `attempt` failed; the pools are being rebuilt
    Rebuilding { attempt: u32 },
    /// The statement succeeded on attempt `attempts`
    Succeeded { attempts: u32 },
    /// No attempts remain, or the last failure cannot be retried
    Exhausted { attempts: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded { .. } | RetryState::Exhausted { .. })
    }
}

/// Outcome fed into [`RetryPolicy::transition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    Succeeded,
    Failed { retriable: bool },
    Rebuilt,
}

impl RetryEvent {
    pub fn failed(error: &DatabaseError) -> Self {
        RetryEvent::Failed {
            retriable: error.is_retriable(),
        }
    }
}

/// Attempt budget for one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` attempts in total
    ///
    /// # Errors
    ///
    /// A budget of zero would never run the statement and is rejected as a
    /// configuration error.
    pub fn new(max_retries: u32) -> Result<Self, DatabaseError> {
        if max_retries == 0 {
            return Err(DatabaseError::configuration(
                "max_retries must allow at least one attempt",
            ));
        }
        Ok(Self { max_retries })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initial(&self) -> RetryState {
        RetryState::Attempting { attempt: 1 }
    }

    /// Applies `event` to `state`
    ///
    /// Events that do not apply to the current state leave it unchanged.
    pub fn transition(&self, state: RetryState, event: RetryEvent) -> RetryState {
        match (state, event) {
            (RetryState::Attempting { attempt }, RetryEvent::Succeeded) => {
                RetryState::Succeeded { attempts: attempt }
            }
            (RetryState::Attempting { attempt }, RetryEvent::Failed { retriable: true })
                if attempt < self.max_retries =>
            {
                RetryState::Rebuilding { attempt }
            }
            (RetryState::Attempting { attempt }, RetryEvent::Failed { .. }) => {
                RetryState::Exhausted { attempts: attempt }
            }
            (RetryState::Rebuilding { attempt }, RetryEvent::Rebuilt) => RetryState::Attempting {
                attempt: attempt + 1,
            },
            (state, _) => state,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
