use thiserror::Error;

use super::{ProtocolError, TransportError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{op} message did not carry an object value.")]
    MissingObjectValue { op: &'static str },
    #[error("Test parameters have not been negotiated.")]
    NotNegotiated,
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: ProtocolError,
    },
    #[error("Failed to encode {context}: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: ProtocolError,
    },
    #[error("Failed to send {context}: {source}")]
    Reply {
        context: &'static str,
        #[source]
        source: TransportError,
    },
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
