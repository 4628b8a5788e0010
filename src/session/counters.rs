use std::collections::HashSet;

use super::ids::FlowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    Counted,
    /// This flow was the last one the counter was waiting for.
    Reached,
    Duplicate,
    Overflow,
}

/// Counts flows that finished one direction of the test, together with the
/// epoch times (ms) of the first and the last qualifying events.
///
/// Each flow is counted at most once and the count never passes `target`.
/// The last timestamp stops moving once the target is reached.
#[derive(Debug, Clone, Default)]
pub struct CompletionCounter {
    target: u32,
    flows: HashSet<FlowId>,
    first_ms: Option<i64>,
    last_ms: Option<i64>,
}

impl CompletionCounter {
    #[must_use]
    pub fn new(target: u32) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Returns `false` when a first timestamp was already recorded.
    pub fn record_first(&mut self, at_ms: i64) -> bool {
        if self.first_ms.is_some() {
            return false;
        }
        self.first_ms = Some(at_ms);
        true
    }

    pub fn record_last(&mut self, flow_id: FlowId, at_ms: i64) -> CounterUpdate {
        if self.flows.contains(&flow_id) {
            return CounterUpdate::Duplicate;
        }
        if self.is_complete() {
            return CounterUpdate::Overflow;
        }
        self.flows.insert(flow_id);
        self.last_ms = Some(at_ms);
        if self.is_complete() {
            CounterUpdate::Reached
        } else {
            CounterUpdate::Counted
        }
    }

    #[must_use]
    pub fn completed(&self) -> u32 {
        u32::try_from(self.flows.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn target(&self) -> u32 {
        self.target
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed() >= self.target
    }

    #[must_use]
    pub const fn first_ms(&self) -> Option<i64> {
        self.first_ms
    }

    #[must_use]
    pub const fn last_ms(&self) -> Option<i64> {
        self.last_ms
    }
}
