mod app;
mod config;
mod protocol;
mod session;
mod transport;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use protocol::ProtocolError;
pub use session::SessionError;
pub use transport::TransportError;
