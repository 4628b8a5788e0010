use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::flow::{FlowGrant, TcpFlow};
use crate::session::{
    AllocatedFlow, EndpointRegistration, FlowId, FlowRequest, FlowTransport, SessionEvent,
    SessionHandle, SessionId,
};

struct PendingRequest {
    session_id: SessionId,
    grant: oneshot::Sender<FlowGrant>,
}

struct FlowSlot {
    shutdown: watch::Sender<bool>,
    listener: Option<SessionHandle>,
}

#[derive(Default)]
struct TransportState {
    /// Registered endpoints and the session accepting flows on each.
    endpoints: HashMap<SessionId, Option<SessionHandle>>,
    pending: HashMap<u64, PendingRequest>,
    flows: HashMap<FlowId, FlowSlot>,
}

/// Flow transport for data connections accepted by the server.
///
/// A data connection offers itself with [`TcpFlowTransport::offer_connection`]
/// and is parked until its session answers. Accepted connections receive a
/// [`FlowGrant`] and report their end with [`TcpFlowTransport::flow_closed`].
#[derive(Default)]
pub struct TcpFlowTransport {
    state: Mutex<TransportState>,
    next_flow_id: AtomicU64,
    next_request_id: AtomicU64,
}

impl TcpFlowTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out ids shared by control and data flows.
    pub fn next_flow_id(&self) -> FlowId {
        FlowId(self.next_flow_id.fetch_add(1, Ordering::Relaxed).saturating_add(1))
    }

    /// Parks a data connection for `session_id` and notifies the session's
    /// acceptor. The receiver resolves with a grant when the flow is
    /// accepted and errors when it is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error when the session has no endpoint or no acceptor.
    pub fn offer_connection(
        &self,
        session_id: SessionId,
    ) -> Result<oneshot::Receiver<FlowGrant>, TransportError> {
        let mut state = self.lock();
        let acceptor = state
            .endpoints
            .get(&session_id)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(TransportError::NoEndpoint {
                session_id: session_id.0,
            })?;
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (grant, receiver) = oneshot::channel();
        state
            .pending
            .insert(request_id, PendingRequest { session_id, grant });
        let request = FlowRequest {
            request_id,
            session_id,
        };
        if let Err(err) = acceptor.send(SessionEvent::FlowRequested(request)) {
            state.pending.remove(&request_id);
            return Err(err);
        }
        debug!(
            "Session {}: parked flow request {}",
            session_id, request_id
        );
        Ok(receiver)
    }

    /// Reports that a data connection ended on its own.
    pub fn flow_closed(&self, flow_id: FlowId) {
        if self.release(flow_id) {
            debug!("Flow {}: connection closed", flow_id);
        }
    }

    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.lock().endpoints.len()
    }

    #[must_use]
    pub fn pending_request_count(&self) -> usize {
        self.lock().pending.len()
    }

    #[must_use]
    pub fn live_flow_count(&self) -> usize {
        self.lock().flows.len()
    }

    /// Forgets a flow, signals its connection and tells its watcher.
    fn release(&self, flow_id: FlowId) -> bool {
        let Some(slot) = self.lock().flows.remove(&flow_id) else {
            return false;
        };
        drop(slot.shutdown.send(true));
        if let Some(listener) = slot.listener
            && let Err(err) = listener.send(SessionEvent::FlowDeallocated(flow_id))
        {
            debug!("Flow {}: watcher gone: {}", flow_id, err);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FlowTransport for TcpFlowTransport {
    type Flow = TcpFlow;

    fn register_endpoint(
        &self,
        session_id: SessionId,
    ) -> Result<EndpointRegistration, TransportError> {
        let mut state = self.lock();
        if state.endpoints.contains_key(&session_id) {
            return Err(TransportError::EndpointInUse {
                session_id: session_id.0,
            });
        }
        state.endpoints.insert(session_id, None);
        Ok(EndpointRegistration {
            session_id,
            endpoint: format!("session-{}", session_id),
        })
    }

    fn unregister_endpoint(
        &self,
        registration: &EndpointRegistration,
    ) -> Result<(), TransportError> {
        let session_id = registration.session_id;
        let mut state = self.lock();
        state
            .endpoints
            .remove(&session_id)
            .ok_or(TransportError::NoEndpoint {
                session_id: session_id.0,
            })?;
        // Dropping a parked grant rejects its connection.
        let parked = state.pending.len();
        state
            .pending
            .retain(|_, pending| pending.session_id != session_id);
        let dropped = parked.saturating_sub(state.pending.len());
        if dropped > 0 {
            info!(
                "Session {}: dropped {} unanswered flow requests",
                session_id, dropped
            );
        }
        Ok(())
    }

    fn add_flow_acceptor(&self, registration: &EndpointRegistration, acceptor: SessionHandle) {
        if let Some(slot) = self.lock().endpoints.get_mut(&registration.session_id) {
            *slot = Some(acceptor);
        }
    }

    fn remove_flow_acceptor(&self, registration: &EndpointRegistration) {
        if let Some(slot) = self.lock().endpoints.get_mut(&registration.session_id) {
            *slot = None;
        }
    }

    fn respond_to_flow_request(
        &self,
        request: FlowRequest,
        accept: bool,
    ) -> Result<Option<AllocatedFlow<TcpFlow>>, TransportError> {
        let mut state = self.lock();
        let pending = state
            .pending
            .remove(&request.request_id)
            .ok_or(TransportError::UnknownRequest {
                request_id: request.request_id,
            })?;
        if !accept {
            info!(
                "Session {}: rejected flow request {}",
                pending.session_id, request.request_id
            );
            return Ok(None);
        }

        let flow_id = self.next_flow_id();
        let (start, start_rx) = oneshot::channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let grant = FlowGrant {
            flow_id,
            start: start_rx,
            shutdown: shutdown_rx,
        };
        if pending.grant.send(grant).is_err() {
            return Err(TransportError::FlowClosed { flow_id: flow_id.0 });
        }
        state.flows.insert(
            flow_id,
            FlowSlot {
                shutdown,
                listener: None,
            },
        );
        Ok(Some(AllocatedFlow {
            id: flow_id,
            flow: TcpFlow { start },
        }))
    }

    fn request_deallocate(&self, flow_id: FlowId) -> Result<(), TransportError> {
        if self.release(flow_id) {
            Ok(())
        } else {
            Err(TransportError::UnknownFlow { flow_id: flow_id.0 })
        }
    }

    fn watch_deallocation(&self, flow_id: FlowId, listener: SessionHandle) {
        let mut state = self.lock();
        if let Some(slot) = state.flows.get_mut(&flow_id) {
            slot.listener = Some(listener);
            return;
        }
        drop(state);
        // The connection is already gone.
        if let Err(err) = listener.send(SessionEvent::FlowDeallocated(flow_id)) {
            debug!("Flow {}: watcher gone: {}", flow_id, err);
        }
    }

    fn unwatch_deallocation(&self, flow_id: FlowId) {
        if let Some(slot) = self.lock().flows.get_mut(&flow_id) {
            slot.listener = None;
        }
    }
}
