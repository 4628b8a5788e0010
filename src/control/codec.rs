use crate::error::ProtocolError;

use super::types::{ControlMessage, StatisticsReport, TestParameters};

/// Encodes and decodes control messages exchanged on the control flow.
pub trait ControlCodec: Send + Sync {
    /// Decodes one control frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a well-formed control message.
    fn decode(&self, frame: &[u8]) -> Result<ControlMessage, ProtocolError>;

    /// Encodes one control message into a frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    fn encode(&self, message: &ControlMessage) -> Result<Vec<u8>, ProtocolError>;
}

/// Control messages as single-line JSON objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonControlCodec;

impl ControlCodec for JsonControlCodec {
    fn decode(&self, frame: &[u8]) -> Result<ControlMessage, ProtocolError> {
        let text =
            std::str::from_utf8(frame).map_err(|err| ProtocolError::InvalidUtf8 { source: err })?;
        serde_json::from_str::<ControlMessage>(text.trim_end()).map_err(|err| {
            ProtocolError::Deserialize {
                context: "control message",
                source: err,
            }
        })
    }

    fn encode(&self, message: &ControlMessage) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(message).map_err(|err| ProtocolError::Serialize {
            context: "control message",
            source: err,
        })
    }
}

/// # Errors
///
/// Returns an error if the parameters cannot be serialized.
pub fn encode_parameters(params: &TestParameters) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(params).map_err(|err| ProtocolError::Serialize {
        context: "test parameters",
        source: err,
    })
}

/// # Errors
///
/// Returns an error if the value is not a test-parameters document.
pub fn decode_parameters(value: &[u8]) -> Result<TestParameters, ProtocolError> {
    serde_json::from_slice(value).map_err(|err| ProtocolError::Deserialize {
        context: "test parameters",
        source: err,
    })
}

/// # Errors
///
/// Returns an error if the statistics cannot be serialized.
pub fn encode_statistics(stats: &StatisticsReport) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(stats).map_err(|err| ProtocolError::Serialize {
        context: "statistics",
        source: err,
    })
}

/// # Errors
///
/// Returns an error if the value is not a statistics document.
pub fn decode_statistics(value: &[u8]) -> Result<StatisticsReport, ProtocolError> {
    serde_json::from_slice(value).map_err(|err| ProtocolError::Deserialize {
        context: "statistics",
        source: err,
    })
}
