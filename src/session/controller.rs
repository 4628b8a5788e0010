use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::control::{
    ControlCodec, ControlMessage, OpCode, TestParameters, decode_parameters, decode_statistics,
    encode_parameters, encode_statistics,
};
use crate::error::{AppResult, SessionError};

use super::counters::{CompletionCounter, CounterUpdate};
use super::events::{CompletionKind, CompletionSink, FlowRequest, SessionEvent, SessionHandle};
use super::ids::{FlowId, SessionId};
use super::limits::SessionLimits;
use super::ports::{
    AllocatedFlow, ControlChannel, EndpointRegistration, FlowTransport, FlowWorker,
    WorkerFactory,
};
use super::state::SessionState;
use super::stats::{
    LocalTimestamps, ThroughputReport, compute_throughput, log_throughput,
    merge_local_timestamps,
};

/// Collaborators a controller talks to.
pub struct SessionPorts<T, W> {
    pub transport: Arc<T>,
    pub workers: W,
    pub codec: Arc<dyn ControlCodec>,
    pub control: Box<dyn ControlChannel>,
}

struct RegisteredFlow<TWorker> {
    worker: TWorker,
    torn_down: bool,
}

/// Negotiates and runs a single test.
///
/// The controller is a plain state machine: it is driven one
/// [`SessionEvent`] at a time by [`super::run_session`] and never blocks.
pub struct TestController<T, W>
where
    T: FlowTransport,
    W: WorkerFactory<T::Flow>,
{
    session_id: SessionId,
    limits: SessionLimits,
    state: SessionState,
    params: Option<TestParameters>,
    registration: Option<EndpointRegistration>,
    flows: HashMap<FlowId, RegisteredFlow<W::Worker>>,
    sent: CompletionCounter,
    received: CompletionCounter,
    pending_stop: Option<ControlMessage>,
    report: Option<ThroughputReport>,
    events: SessionHandle,
    transport: Arc<T>,
    workers: W,
    codec: Arc<dyn ControlCodec>,
    control: Box<dyn ControlChannel>,
}

impl<T, W> TestController<T, W>
where
    T: FlowTransport,
    W: WorkerFactory<T::Flow>,
{
    /// `events` must feed the queue this controller is driven from; it is
    /// handed to the transport and to every worker.
    pub fn new(limits: SessionLimits, ports: SessionPorts<T, W>, events: SessionHandle) -> Self {
        let SessionPorts {
            transport,
            workers,
            codec,
            control,
        } = ports;
        Self {
            session_id: SessionId::from(control.flow_id()),
            limits,
            state: SessionState::AwaitingCreate,
            params: None,
            registration: None,
            flows: HashMap::new(),
            sent: CompletionCounter::default(),
            received: CompletionCounter::default(),
            pending_stop: None,
            report: None,
            events,
            transport,
            workers,
            codec,
            control,
        }
    }

    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn parameters(&self) -> Option<&TestParameters> {
        self.params.as_ref()
    }

    #[must_use]
    pub fn registered_flows(&self) -> usize {
        self.flows.len()
    }

    #[must_use]
    pub fn is_registered(&self, flow_id: FlowId) -> bool {
        self.flows.contains_key(&flow_id)
    }

    #[must_use]
    pub const fn has_pending_stop(&self) -> bool {
        self.pending_stop.is_some()
    }

    #[must_use]
    pub const fn sent_counter(&self) -> &CompletionCounter {
        &self.sent
    }

    #[must_use]
    pub const fn received_counter(&self) -> &CompletionCounter {
        &self.received
    }

    #[must_use]
    pub const fn report(&self) -> Option<ThroughputReport> {
        self.report
    }

    /// A session is done once it completed and every data flow is gone.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Completed && self.flows.is_empty()
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Control(frame) => self.handle_control_frame(&frame),
            SessionEvent::FlowRequested(request) => self.handle_flow_request(request),
            SessionEvent::FlowDeallocated(flow_id) => self.handle_flow_deallocated(flow_id),
            SessionEvent::Completion {
                flow_id,
                kind,
                at_ms,
            } => self.handle_completion(flow_id, kind, at_ms),
        }
    }

    fn handle_control_frame(&mut self, frame: &[u8]) {
        let message = match self.codec.decode(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(
                    "Session {}: error decoding control message: {}",
                    self.session_id, err
                );
                return;
            }
        };
        debug!(
            "Session {}: received {} (invoke_id={})",
            self.session_id, message.op_code, message.invoke_id
        );
        match message.op_code {
            OpCode::Create => self.handle_create(&message),
            OpCode::Start => self.handle_start(),
            OpCode::Stop => self.handle_stop(message),
            other => warn!(
                "Session {}: received unexpected {} message, ignoring it.",
                self.session_id, other
            ),
        }
    }

    fn handle_create(&mut self, message: &ControlMessage) {
        if self.state != SessionState::AwaitingCreate {
            warn!(
                "Session {}: received CREATE while in {} state, ignoring it.",
                self.session_id, self.state
            );
            return;
        }
        if let Err(err) = self.negotiate(message) {
            warn!(
                "Session {}: error handling CREATE message: {}",
                self.session_id, err
            );
            return;
        }
        if let Some(params) = self.params.as_ref() {
            info!(
                "Session {}: waiting to START a test with {} flows x {} SDUs of {} bytes (client_sends={}, server_sends={})",
                self.session_id,
                params.flow_count,
                params.sdus_per_flow,
                params.sdu_size,
                params.client_sends,
                params.server_sends
            );
        }
    }

    fn negotiate(&mut self, message: &ControlMessage) -> AppResult<()> {
        let value = message
            .obj_value
            .as_deref()
            .ok_or(SessionError::MissingObjectValue { op: "CREATE" })?;
        let requested = decode_parameters(value).map_err(|err| SessionError::Decode {
            context: "test parameters",
            source: err,
        })?;
        let mut params = self.limits.clamp(requested);
        params.session_id = Some(self.session_id.to_string());
        let value = encode_parameters(&params).map_err(|err| SessionError::Encode {
            context: "test parameters",
            source: err,
        })?;

        let registration = self.transport.register_endpoint(self.session_id)?;
        self.transport
            .add_flow_acceptor(&registration, self.events.clone());
        debug!(
            "Session {}: registered data endpoint {}",
            self.session_id, registration.endpoint
        );

        self.registration = Some(registration);
        self.sent = CompletionCounter::new(params.flow_count);
        self.received = CompletionCounter::new(params.flow_count);
        self.params = Some(params);
        self.state = SessionState::AwaitingStart;

        let reply = message.reply().with_value(value);
        if let Err(err) = self.send_control(&reply, "CREATE response") {
            warn!("Session {}: {}", self.session_id, err);
        }
        Ok(())
    }

    fn handle_start(&mut self) {
        if self.state != SessionState::AwaitingStart {
            warn!(
                "Session {}: received START while in {} state, ignoring it.",
                self.session_id, self.state
            );
            return;
        }
        let mut started = 0usize;
        for flow in self.flows.values_mut().filter(|flow| !flow.torn_down) {
            flow.worker.execute();
            started = started.saturating_add(1);
        }
        self.state = SessionState::Executing;
        info!(
            "Session {}: started test execution on {} flows",
            self.session_id, started
        );
        self.check_data_complete();
    }

    fn handle_stop(&mut self, message: ControlMessage) {
        match self.state {
            SessionState::Executing => {
                if self.pending_stop.is_some() {
                    debug!(
                        "Session {}: replacing previously stored STOP message",
                        self.session_id
                    );
                }
                self.pending_stop = Some(message);
                info!(
                    "Session {}: received STOP while still EXECUTING, waiting to send/receive all test data",
                    self.session_id
                );
            }
            SessionState::AwaitingStop => self.finalize(message),
            other => warn!(
                "Session {}: received STOP while in {} state, ignoring it.",
                self.session_id, other
            ),
        }
    }

    fn handle_completion(&mut self, flow_id: FlowId, kind: CompletionKind, at_ms: i64) {
        if !self.state.accepts_completion() {
            debug!(
                "Session {}: dropping {:?} from flow {} while in {} state",
                self.session_id, kind, flow_id, self.state
            );
            return;
        }
        match kind {
            CompletionKind::FirstSent => {
                if self.sent.record_first(at_ms) {
                    debug!("Session {}: first SDU sent at {}", self.session_id, at_ms);
                }
            }
            CompletionKind::FirstReceived => {
                if self.received.record_first(at_ms) {
                    debug!(
                        "Session {}: first SDU received at {}",
                        self.session_id, at_ms
                    );
                }
            }
            CompletionKind::LastSent => {
                let update = self.sent.record_last(flow_id, at_ms);
                self.apply_counter_update("sending", flow_id, update);
            }
            CompletionKind::LastReceived => {
                let update = self.received.record_last(flow_id, at_ms);
                self.apply_counter_update("receiving", flow_id, update);
            }
        }
    }

    fn apply_counter_update(&mut self, direction: &str, flow_id: FlowId, update: CounterUpdate) {
        match update {
            CounterUpdate::Counted => debug!(
                "Session {}: flow {} finished {}",
                self.session_id, flow_id, direction
            ),
            CounterUpdate::Reached => {
                info!(
                    "Session {}: all flows finished {}",
                    self.session_id, direction
                );
                self.check_data_complete();
            }
            CounterUpdate::Duplicate => warn!(
                "Session {}: flow {} reported finished {} twice, ignoring it.",
                self.session_id, flow_id, direction
            ),
            CounterUpdate::Overflow => warn!(
                "Session {}: flow {} finished {} after every negotiated flow did, ignoring it.",
                self.session_id, flow_id, direction
            ),
        }
    }

    /// Moves EXECUTING to AWAITING_STOP once every direction that carries
    /// data has completed on all flows, then consumes a stored STOP.
    fn check_data_complete(&mut self) {
        if self.state != SessionState::Executing {
            return;
        }
        let Some(params) = self.params.as_ref() else {
            return;
        };
        let sent_done = !params.server_sends || self.sent.is_complete();
        let received_done = !params.client_sends || self.received.is_complete();
        if !(sent_done && received_done) {
            return;
        }
        self.state = SessionState::AwaitingStop;
        info!("Session {}: all test data exchanged", self.session_id);
        if let Some(stop) = self.pending_stop.take() {
            self.finalize(stop);
        }
    }

    fn finalize(&mut self, stop: ControlMessage) {
        match self.reply_with_statistics(&stop) {
            Ok(report) => {
                log_throughput(self.session_id, &report);
                self.report = Some(report);
            }
            Err(err) => warn!(
                "Session {}: problems returning STOP response: {}",
                self.session_id, err
            ),
        }
        self.release_endpoint();
        self.state = SessionState::Completed;
        self.flows.retain(|_, flow| !flow.torn_down);
        info!(
            "Session {}: test completed ({} data flows still allocated)",
            self.session_id,
            self.flows.len()
        );
    }

    fn reply_with_statistics(&self, stop: &ControlMessage) -> AppResult<ThroughputReport> {
        let params = self.params.as_ref().ok_or(SessionError::NotNegotiated)?;
        let value = stop
            .obj_value
            .as_deref()
            .ok_or(SessionError::MissingObjectValue { op: "STOP" })?;
        let mut stats = decode_statistics(value).map_err(|err| SessionError::Decode {
            context: "statistics",
            source: err,
        })?;
        merge_local_timestamps(&mut stats, params, &self.local_timestamps());
        debug!("Session {}: merged statistics {:?}", self.session_id, stats);

        let value = encode_statistics(&stats).map_err(|err| SessionError::Encode {
            context: "statistics",
            source: err,
        })?;
        let reply = stop.reply().with_value(value);
        if let Err(err) = self.send_control(&reply, "STOP response") {
            warn!("Session {}: {}", self.session_id, err);
        }
        Ok(compute_throughput(params, &stats))
    }

    const fn local_timestamps(&self) -> LocalTimestamps {
        LocalTimestamps {
            first_received_ms: self.received.first_ms(),
            last_received_ms: self.received.last_ms(),
            first_sent_ms: self.sent.first_ms(),
            last_sent_ms: self.sent.last_ms(),
        }
    }

    fn release_endpoint(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };
        self.transport.remove_flow_acceptor(&registration);
        if let Err(err) = self.transport.unregister_endpoint(&registration) {
            warn!(
                "Session {}: problems unregistering data endpoint {}: {}",
                self.session_id, registration.endpoint, err
            );
        }
    }

    fn send_control(
        &self,
        message: &ControlMessage,
        context: &'static str,
    ) -> Result<(), SessionError> {
        let frame = self
            .codec
            .encode(message)
            .map_err(|err| SessionError::Encode {
                context,
                source: err,
            })?;
        self.control
            .send(frame)
            .map_err(|err| SessionError::Reply {
                context,
                source: err,
            })
    }

    fn handle_flow_request(&mut self, request: FlowRequest) {
        match self.transport.respond_to_flow_request(request, true) {
            Ok(Some(flow)) => self.flow_allocated(flow),
            Ok(None) => debug!(
                "Session {}: flow request {} was not allocated",
                self.session_id, request.request_id
            ),
            Err(err) => warn!(
                "Session {}: problems answering flow request {}: {}",
                self.session_id, request.request_id, err
            ),
        }
    }

    fn flow_allocated(&mut self, flow: AllocatedFlow<T::Flow>) {
        let flow_id = flow.id;
        if self.state != SessionState::AwaitingStart {
            info!(
                "Session {}: data flow {} allocated while in {} state, requesting deallocation.",
                self.session_id, flow_id, self.state
            );
            if let Err(err) = self.transport.request_deallocate(flow_id) {
                warn!(
                    "Session {}: problems deallocating flow {}: {}",
                    self.session_id, flow_id, err
                );
            }
            return;
        }
        if self.flows.contains_key(&flow_id) {
            warn!(
                "Session {}: data flow {} is already registered, ignoring it.",
                self.session_id, flow_id
            );
            return;
        }
        let Some(params) = self.params.as_ref() else {
            return;
        };
        let sink = CompletionSink::new(flow_id, self.events.clone());
        let worker = self.workers.build(params, flow, sink);
        self.flows.insert(
            flow_id,
            RegisteredFlow {
                worker,
                torn_down: false,
            },
        );
        self.transport
            .watch_deallocation(flow_id, self.events.clone());
        info!(
            "Session {}: data flow {} allocated ({} registered)",
            self.session_id,
            flow_id,
            self.flows.len()
        );
    }

    fn handle_flow_deallocated(&mut self, flow_id: FlowId) {
        if self.state == SessionState::Completed {
            if self.flows.remove(&flow_id).is_some() {
                info!(
                    "Session {}: data flow {} deallocated",
                    self.session_id, flow_id
                );
            }
        } else if let Some(flow) = self.flows.get_mut(&flow_id) {
            flow.torn_down = true;
            info!(
                "Session {}: data flow {} deallocated before the test completed",
                self.session_id, flow_id
            );
        }
        self.transport.unwatch_deallocation(flow_id);
    }
}
