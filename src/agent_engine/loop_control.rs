use crate::agent_engine::state::Session;
use crate::errors::{ScoutError, ScoutResult};

/// Terminal condition and the revisit guard.
pub struct LoopController {
    max_consecutive_revisits: u32,
    consecutive_revisits: u32,
}

impl LoopController {
    pub fn new(max_consecutive_revisits: u32) -> Self {
        Self {
            max_consecutive_revisits,
            consecutive_revisits: 0,
        }
    }

    /// The loop stops only once the budget of distinct addresses is spent.
    pub fn should_stop(&self, session: &Session) -> bool {
        session.is_exhausted()
    }

    /// A fresh address was observed.
    pub fn record_new(&mut self) {
        self.consecutive_revisits = 0;
    }

    /// An already-visited address was served again. Errors with `Stalled`
    /// once the source keeps doing so past the limit.
    pub fn record_revisit(&mut self) -> ScoutResult<()> {
        self.consecutive_revisits += 1;
        if self.consecutive_revisits > self.max_consecutive_revisits {
            return Err(ScoutError::Stalled {
                revisits: self.consecutive_revisits,
            });
        }
        Ok(())
    }
}
