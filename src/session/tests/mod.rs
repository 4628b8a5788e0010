mod manager;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use super::{
    AllocatedFlow, CompletionSink, ControlChannel, EndpointRegistration, FlowId, FlowRequest,
    FlowTransport, FlowWorker, SessionEvent, SessionHandle, SessionId, SessionLimits,
    SessionPorts, TestController, WorkerFactory,
};
use crate::control::{
    ControlCodec, ControlMessage, JsonControlCodec, OpCode, StatisticsReport, TestParameters,
    encode_parameters, encode_statistics,
};
use crate::error::{AppError, AppResult, TransportError};

const CONTROL_FLOW: FlowId = FlowId(1);

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TransportCall {
    Register(SessionId),
    Unregister(SessionId),
    AddAcceptor(SessionId),
    RemoveAcceptor(SessionId),
    Respond(u64),
    Deallocate(FlowId),
    Watch(FlowId),
    Unwatch(FlowId),
}

/// Allocates flow `request_id` for every accepted request.
#[derive(Debug, Default)]
struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
}

impl MockTransport {
    fn calls(&self) -> Vec<TransportCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: TransportCall) {
        lock(&self.calls).push(call);
    }
}

impl FlowTransport for MockTransport {
    type Flow = ();

    fn register_endpoint(
        &self,
        session_id: SessionId,
    ) -> Result<EndpointRegistration, TransportError> {
        self.record(TransportCall::Register(session_id));
        Ok(EndpointRegistration {
            session_id,
            endpoint: format!("mock/{}", session_id),
        })
    }

    fn unregister_endpoint(
        &self,
        registration: &EndpointRegistration,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::Unregister(registration.session_id));
        Ok(())
    }

    fn add_flow_acceptor(&self, registration: &EndpointRegistration, _acceptor: SessionHandle) {
        self.record(TransportCall::AddAcceptor(registration.session_id));
    }

    fn remove_flow_acceptor(&self, registration: &EndpointRegistration) {
        self.record(TransportCall::RemoveAcceptor(registration.session_id));
    }

    fn respond_to_flow_request(
        &self,
        request: FlowRequest,
        accept: bool,
    ) -> Result<Option<AllocatedFlow<()>>, TransportError> {
        self.record(TransportCall::Respond(request.request_id));
        Ok(accept.then_some(AllocatedFlow {
            id: FlowId(request.request_id),
            flow: (),
        }))
    }

    fn request_deallocate(&self, flow_id: FlowId) -> Result<(), TransportError> {
        self.record(TransportCall::Deallocate(flow_id));
        Ok(())
    }

    fn watch_deallocation(&self, flow_id: FlowId, _listener: SessionHandle) {
        self.record(TransportCall::Watch(flow_id));
    }

    fn unwatch_deallocation(&self, flow_id: FlowId) {
        self.record(TransportCall::Unwatch(flow_id));
    }
}

#[derive(Debug, Clone, Default)]
struct MockControl {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ControlChannel for MockControl {
    fn flow_id(&self) -> FlowId {
        CONTROL_FLOW
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        lock(&self.frames).push(frame);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct MockWorkers {
    executed: Arc<Mutex<Vec<FlowId>>>,
}

struct MockWorker {
    flow_id: FlowId,
    executed: Arc<Mutex<Vec<FlowId>>>,
}

impl FlowWorker for MockWorker {
    fn execute(&mut self) {
        lock(&self.executed).push(self.flow_id);
    }
}

impl WorkerFactory<()> for MockWorkers {
    type Worker = MockWorker;

    fn build(
        &self,
        _params: &TestParameters,
        flow: AllocatedFlow<()>,
        _sink: CompletionSink,
    ) -> MockWorker {
        MockWorker {
            flow_id: flow.id,
            executed: Arc::clone(&self.executed),
        }
    }
}

/// A controller wired to mocks, fed synchronously.
struct Harness {
    controller: TestController<MockTransport, MockWorkers>,
    transport: Arc<MockTransport>,
    control: MockControl,
    workers: MockWorkers,
    _events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_limits(SessionLimits::default())
    }

    fn with_limits(limits: SessionLimits) -> Self {
        let transport = Arc::new(MockTransport::default());
        let control = MockControl::default();
        let workers = MockWorkers::default();
        let (handle, events) = SessionHandle::channel(SessionId::from(CONTROL_FLOW));
        let ports = SessionPorts {
            transport: Arc::clone(&transport),
            workers: workers.clone(),
            codec: Arc::new(JsonControlCodec),
            control: Box::new(control.clone()),
        };
        Self {
            controller: TestController::new(limits, ports, handle),
            transport,
            control,
            workers,
            _events: events,
        }
    }

    fn control(&mut self, message: &ControlMessage) -> AppResult<()> {
        let frame = JsonControlCodec.encode(message)?;
        self.controller.handle_event(SessionEvent::Control(frame));
        Ok(())
    }

    fn create(&mut self, params: &TestParameters) -> AppResult<()> {
        let message = ControlMessage::new(OpCode::Create, 1)
            .with_object("test information", "test")
            .with_value(encode_parameters(params)?);
        self.control(&message)
    }

    fn start(&mut self) -> AppResult<()> {
        self.control(&ControlMessage::new(OpCode::Start, 2))
    }

    fn stop(&mut self, stats: &StatisticsReport) -> AppResult<()> {
        let message = ControlMessage::new(OpCode::Stop, 3)
            .with_object("statistics", "stats")
            .with_value(encode_statistics(stats)?);
        self.control(&message)
    }

    fn request_flow(&mut self, request_id: u64) {
        self.controller
            .handle_event(SessionEvent::FlowRequested(FlowRequest {
                request_id,
                session_id: self.controller.session_id(),
            }));
    }

    fn complete(&mut self, flow_id: u64, kind: super::CompletionKind, at_ms: i64) {
        self.controller.handle_event(SessionEvent::Completion {
            flow_id: FlowId(flow_id),
            kind,
            at_ms,
        });
    }

    fn deallocated(&mut self, flow_id: u64) {
        self.controller
            .handle_event(SessionEvent::FlowDeallocated(FlowId(flow_id)));
    }

    fn replies(&self) -> AppResult<Vec<ControlMessage>> {
        let frames = lock(&self.control.frames).clone();
        let mut replies = Vec::with_capacity(frames.len());
        for frame in frames {
            replies.push(JsonControlCodec.decode(&frame)?);
        }
        Ok(replies)
    }

    fn executed(&self) -> Vec<FlowId> {
        lock(&self.workers.executed).clone()
    }
}

fn upload_params(flow_count: u32) -> TestParameters {
    TestParameters {
        flow_count,
        sdus_per_flow: 100,
        sdu_size: 512,
        client_sends: true,
        server_sends: false,
        session_id: None,
    }
}

fn expect_state(harness: &Harness, expected: super::SessionState) -> AppResult<()> {
    let actual = harness.controller.state();
    if actual != expected {
        return Err(AppError::session(format!(
            "Expected state {}, got {}",
            expected, actual
        )));
    }
    Ok(())
}
