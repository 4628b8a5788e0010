//! Per-session test control: the state machine that negotiates a test,
//! admits its data flows, tracks their completion, and reports aggregate
//! throughput once the client stops the test.
mod controller;
mod counters;
mod events;
mod ids;
mod limits;
mod manager;
mod ports;
mod runner;
mod state;
mod stats;

#[cfg(test)]
mod tests;

pub use controller::{SessionPorts, TestController};
pub use counters::{CompletionCounter, CounterUpdate};
pub use events::{CompletionKind, CompletionSink, FlowRequest, SessionEvent, SessionHandle};
pub use ids::{FlowId, SessionId};
pub use limits::{
    DEFAULT_MAX_FLOWS, DEFAULT_MAX_SDU_SIZE, DEFAULT_MAX_SDUS_PER_FLOW, SessionLimits,
};
pub use manager::SessionManager;
pub use ports::{
    AllocatedFlow, ControlChannel, EndpointRegistration, FlowTransport, FlowWorker,
    WorkerFactory,
};
pub use runner::run_session;
pub use state::SessionState;
pub use stats::{
    DirectionRates, LocalTimestamps, ThroughputReport, compute_throughput,
    merge_local_timestamps,
};
