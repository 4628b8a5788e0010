use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOG_ENV: &str = "FLOWBAND_LOG";
const QUIET_DIRECTIVES: &str = "info";
// Verbose output is scoped to this crate so tokio internals stay quiet.
const VERBOSE_DIRECTIVES: &str = "info,flowband=debug";

/// Builds the log filter from explicit directives, falling back to the
/// defaults for `verbose` when none are given or they do not parse.
#[must_use]
pub fn log_filter(directives: Option<&str>, verbose: bool) -> EnvFilter {
    let fallback = if verbose {
        VERBOSE_DIRECTIVES
    } else {
        QUIET_DIRECTIVES
    };
    directives
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

/// Installs the global subscriber. The filter comes from `FLOWBAND_LOG`, then
/// `RUST_LOG`, then `verbose`.
pub fn init_logging(verbose: bool) {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_err| std::env::var("RUST_LOG"))
        .ok();
    let filter = log_filter(directives.as_deref(), verbose);
    let active = filter.to_string();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
        return;
    }
    debug!("Logging with filter \"{}\"", active);
}
