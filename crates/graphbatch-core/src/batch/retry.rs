//! Attempt budget for calls whose slot came back `null`.

use crate::batch::operation::QueuedCall;

/// Times a call is sent before it is given up as unanswered.
pub const MAX_ATTEMPTS: u32 = 3;

/// What to do with a call that got no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDecision {
    /// Send it again in the next round; `attempt` is the upcoming attempt.
    Requeue { attempt: u32 },
    /// Budget spent; resolve it to a "no response" error.
    Exhausted,
}

/// Decides requeue vs. failure from the attempt counter on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCoordinator {
    max_attempts: u32,
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS)
    }
}

impl RetryCoordinator {
    /// A budget below one attempt is treated as one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn on_missing(&self, call: &mut QueuedCall) -> MissingDecision {
        if call.attempts() < self.max_attempts {
            MissingDecision::Requeue {
                attempt: call.bump_attempts(),
            }
        } else {
            MissingDecision::Exhausted
        }
    }
}
