use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    Create,
    CreateResponse,
    Start,
    StartResponse,
    Stop,
    StopResponse,
}

impl OpCode {
    #[must_use]
    pub const fn response(self) -> Self {
        match self {
            OpCode::Create | OpCode::CreateResponse => OpCode::CreateResponse,
            OpCode::Start | OpCode::StartResponse => OpCode::StartResponse,
            OpCode::Stop | OpCode::StopResponse => OpCode::StopResponse,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            OpCode::Create => "CREATE",
            OpCode::CreateResponse => "CREATE_R",
            OpCode::Start => "START",
            OpCode::StartResponse => "START_R",
            OpCode::Stop => "STOP",
            OpCode::StopResponse => "STOP_R",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One message on the control flow.
///
/// `obj_value` is opaque to the codec; its content depends on the op code
/// (test parameters for CREATE, statistics for STOP).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub op_code: OpCode,
    #[serde(default)]
    pub invoke_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_base64")]
    pub obj_value: Option<Vec<u8>>,
    #[serde(default)]
    pub result: i32,
}

impl ControlMessage {
    #[must_use]
    pub const fn new(op_code: OpCode, invoke_id: u32) -> Self {
        Self {
            op_code,
            invoke_id,
            obj_class: None,
            obj_name: None,
            obj_value: None,
            result: 0,
        }
    }

    /// Builds the response to this message, keeping the invoke id and object
    /// metadata so the peer can correlate it.
    #[must_use]
    pub fn reply(&self) -> Self {
        Self {
            op_code: self.op_code.response(),
            invoke_id: self.invoke_id,
            obj_class: self.obj_class.clone(),
            obj_name: self.obj_name.clone(),
            obj_value: None,
            result: 0,
        }
    }

    #[must_use]
    pub fn with_object(mut self, class: impl Into<String>, name: impl Into<String>) -> Self {
        self.obj_class = Some(class.into());
        self.obj_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Vec<u8>) -> Self {
        self.obj_value = Some(value);
        self
    }
}

/// Test parameters proposed by the client in CREATE and echoed back, clamped,
/// in the CREATE response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestParameters {
    pub flow_count: u32,
    pub sdus_per_flow: u32,
    pub sdu_size: u32,
    pub client_sends: bool,
    pub server_sends: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Epoch timestamps exchanged in STOP / STOP response, in microseconds.
/// Zero means "not observed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsReport {
    #[serde(default)]
    pub client_first_sent_us: i64,
    #[serde(default)]
    pub client_last_sent_us: i64,
    #[serde(default)]
    pub client_first_received_us: i64,
    #[serde(default)]
    pub client_last_received_us: i64,
    #[serde(default)]
    pub server_first_received_us: i64,
    #[serde(default)]
    pub server_last_received_us: i64,
    #[serde(default)]
    pub server_first_sent_us: i64,
    #[serde(default)]
    pub server_last_sent_us: i64,
}

/// First line written by a client on a new data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowHello {
    pub session_id: u64,
}

/// Written back on a data connection once the session accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAccepted {
    pub flow_id: u64,
}

mod serde_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|value| {
                STANDARD
                    .decode(value.as_bytes())
                    .map_err(|err| de::Error::custom(format!("Invalid base64 value: {}", err)))
            })
            .transpose()
    }
}
