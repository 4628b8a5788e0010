use tokio::sync::mpsc;
use tracing::debug;

use crate::error::TransportError;

use super::ids::{FlowId, SessionId};

/// A pending data-flow allocation parked by the transport until the session
/// answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowRequest {
    pub request_id: u64,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    FirstSent,
    LastSent,
    FirstReceived,
    LastReceived,
}

/// Everything that can change a session. All of it goes through one queue so
/// the controller sees events one at a time.
#[derive(Debug)]
pub enum SessionEvent {
    Control(Vec<u8>),
    FlowRequested(FlowRequest),
    FlowDeallocated(FlowId),
    Completion {
        flow_id: FlowId,
        kind: CompletionKind,
        at_ms: i64,
    },
}

/// Sending side of a session's event queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    #[must_use]
    pub fn channel(session_id: SessionId) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel::<SessionEvent>();
        (Self { session_id, sender }, receiver)
    }

    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// # Errors
    ///
    /// Returns an error once the session task has finished.
    pub fn send(&self, event: SessionEvent) -> Result<(), TransportError> {
        self.sender
            .send(event)
            .map_err(|_err| TransportError::SessionClosed {
                session_id: self.session_id.0,
            })
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Handed to each flow worker to report its progress back to the session.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    flow_id: FlowId,
    session: SessionHandle,
}

impl CompletionSink {
    #[must_use]
    pub fn new(flow_id: FlowId, session: SessionHandle) -> Self {
        Self { flow_id, session }
    }

    #[must_use]
    pub const fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    pub fn first_sent(&self, at_ms: i64) {
        self.report(CompletionKind::FirstSent, at_ms);
    }

    pub fn last_sent(&self, at_ms: i64) {
        self.report(CompletionKind::LastSent, at_ms);
    }

    pub fn first_received(&self, at_ms: i64) {
        self.report(CompletionKind::FirstReceived, at_ms);
    }

    pub fn last_received(&self, at_ms: i64) {
        self.report(CompletionKind::LastReceived, at_ms);
    }

    fn report(&self, kind: CompletionKind, at_ms: i64) {
        let event = SessionEvent::Completion {
            flow_id: self.flow_id,
            kind,
            at_ms,
        };
        if let Err(err) = self.session.send(event) {
            debug!(
                "Dropping {:?} report from flow {}: {}",
                kind, self.flow_id, err
            );
        }
    }
}
