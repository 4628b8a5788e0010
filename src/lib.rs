//! Core library for the `flowband` bandwidth test server.
//!
//! A client negotiates a test over a control connection (CREATE), opens the
//! agreed number of data connections, starts the test (START), and collects
//! merged timing statistics when it stops it (STOP). The server reports
//! aggregate throughput per direction and an RTT estimate for each session.
pub mod config;
pub mod control;
pub mod error;
pub mod flow;
pub mod logger;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod transport;
pub mod utils;
