//! In-process registry backing TCP data flows: session endpoints, parked
//! flow requests, and live flows awaiting teardown.
mod tcp;


pub use tcp::TcpFlowTransport;
