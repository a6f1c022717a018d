//! Publish fan-out contract.
//!
//! Every publish pushes the current full [`MatchState`] to every registered
//! [`StateSink`]. Publishes come from two places:
//!
//! - the tick loop, once per second, with no command (a heartbeat);
//! - the event pipeline, right after a commit, with the resulting command
//!   (which may itself be `None`).
//!
//! Sinks are called while the controller holds its critical section, so
//! [`StateSink::publish`] must hand the snapshot off without waiting on the
//! network. Each sink owns its buffering and backpressure policy.

use std::fmt;
use std::sync::Arc;

use refbox_types::{EventCommand, MatchState};

/// A consumer of published match states.
pub trait StateSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Accept a snapshot. Must not block.
    ///
    /// `command` is `None` for heartbeats and for commits that produced no
    /// command. Session-oriented sinks usually ignore it.
    fn publish(&self, state: &MatchState, command: Option<&EventCommand>);
}

/// The set of sinks every publish is delivered to.
#[derive(Clone, Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn StateSink>>,
}

impl FanOut {
    /// Create an empty fan-out.
    pub const fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Register a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn StateSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Deliver `state` and `command` to every sink, in registration order.
    pub fn publish(&self, state: &MatchState, command: Option<&EventCommand>) {
        for sink in &self.sinks {
            sink.publish(state, command);
        }
    }
}

impl fmt::Debug for FanOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sinks.iter().map(|s| s.name()))
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use refbox_types::CommandKind;

    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn every_sink_sees_every_publish() {
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        let fan_out = FanOut::new()
            .with_sink(Arc::clone(&a) as Arc<dyn StateSink>)
            .with_sink(Arc::clone(&b) as Arc<dyn StateSink>);
        let state = MatchState::default();
        let command = EventCommand::neutral(CommandKind::Stop);

        fan_out.publish(&state, None);
        fan_out.publish(&state, Some(&command));

        for sink in [a, b] {
            let calls = sink.calls();
            assert_eq!(calls.len(), 2);
            assert_eq!(calls.first().map(|c| c.1), Some(None));
            assert_eq!(calls.get(1).map(|c| c.1), Some(Some(command)));
        }
    }

    #[test]
    fn debug_lists_sink_names() {
        let fan_out = FanOut::new().with_sink(Arc::new(RecordingSink::default()));
        assert_eq!(format!("{fan_out:?}"), r#"["recording"]"#);
    }
}
