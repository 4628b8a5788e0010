use crate::control::TestParameters;
use crate::error::TransportError;

use super::events::{CompletionSink, FlowRequest, SessionHandle};
use super::ids::{FlowId, SessionId};

/// A data endpoint reserved for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistration {
    pub session_id: SessionId,
    pub endpoint: String,
}

#[derive(Debug)]
pub struct AllocatedFlow<F> {
    pub id: FlowId,
    pub flow: F,
}

/// Allocation, registration and teardown of data flows.
///
/// Implementations deliver `FlowRequested` events to the acceptor registered
/// for an endpoint and `FlowDeallocated` events to watchers of a flow. None
/// of the methods may block.
pub trait FlowTransport: Send + Sync + 'static {
    type Flow: Send + 'static;

    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be reserved.
    fn register_endpoint(
        &self,
        session_id: SessionId,
    ) -> Result<EndpointRegistration, TransportError>;

    /// # Errors
    ///
    /// Returns an error if the endpoint was not registered.
    fn unregister_endpoint(&self, registration: &EndpointRegistration)
    -> Result<(), TransportError>;

    fn add_flow_acceptor(&self, registration: &EndpointRegistration, acceptor: SessionHandle);

    fn remove_flow_acceptor(&self, registration: &EndpointRegistration);

    /// Answers a parked allocation request. Returns the allocated flow when
    /// accepted, `None` when rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is unknown or its connection is gone.
    fn respond_to_flow_request(
        &self,
        request: FlowRequest,
        accept: bool,
    ) -> Result<Option<AllocatedFlow<Self::Flow>>, TransportError>;

    /// # Errors
    ///
    /// Returns an error if the flow is unknown.
    fn request_deallocate(&self, flow_id: FlowId) -> Result<(), TransportError>;

    fn watch_deallocation(&self, flow_id: FlowId, listener: SessionHandle);

    fn unwatch_deallocation(&self, flow_id: FlowId);
}

/// Write side of a session's control flow.
pub trait ControlChannel: Send + 'static {
    fn flow_id(&self) -> FlowId;

    /// # Errors
    ///
    /// Returns an error if the control flow is closed.
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError>;
}

pub trait FlowWorker: Send + 'static {
    /// Starts moving data units on the flow. Called once, on START.
    fn execute(&mut self);
}

pub trait WorkerFactory<F>: Send + 'static {
    type Worker: FlowWorker;

    fn build(
        &self,
        params: &TestParameters,
        flow: AllocatedFlow<F>,
        sink: CompletionSink,
    ) -> Self::Worker;
}
