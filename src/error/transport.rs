use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection closed.")]
    ConnectionClosed,
    #[error("No data endpoint registered for session {session_id}.")]
    NoEndpoint { session_id: u64 },
    #[error("Data endpoint for session {session_id} is already registered.")]
    EndpointInUse { session_id: u64 },
    #[error("Unknown flow allocation request {request_id}.")]
    UnknownRequest { request_id: u64 },
    #[error("Unknown flow {flow_id}.")]
    UnknownFlow { flow_id: u64 },
    #[error("Flow {flow_id} closed before allocation completed.")]
    FlowClosed { flow_id: u64 },
    #[error("Session {session_id} event queue closed.")]
    SessionClosed { session_id: u64 },
    #[error("Control channel for flow {flow_id} closed.")]
    ControlChannelClosed { flow_id: u64 },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
