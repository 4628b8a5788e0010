//! Configuration loading and server settings.
mod loader;
mod settings;
pub mod types;

#[cfg(test)]
mod tests;

pub use loader::load_config;
pub use settings::{DEFAULT_CONTROL_LISTEN, DEFAULT_DATA_LISTEN, ServerSettings};

#[cfg(test)]
pub(crate) use loader::load_config_file;
