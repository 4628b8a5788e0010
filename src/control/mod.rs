//! Control-channel wire format: message types, the codec seam, and
//! newline-delimited frame IO.
mod codec;
mod io;
mod types;


pub use codec::{
    ControlCodec, JsonControlCodec, decode_parameters, decode_statistics, encode_parameters,
    encode_statistics,
};
pub use io::{MAX_FRAME_BYTES, read_frame, read_json, write_frame, write_json};
pub use types::{
    ControlMessage, FlowAccepted, FlowHello, OpCode, StatisticsReport, TestParameters,
};
