use flowband::config::{ServerSettings, load_config};
use flowband::error::AppResult;
use flowband::logger::init_logging;
use flowband::server::run_server;

/// Environment variable naming an explicit config file.
const CONFIG_ENV: &str = "FLOWBAND_CONFIG";

#[tokio::main]
async fn main() -> AppResult<()> {
    let config_path = std::env::var(CONFIG_ENV).ok();
    let config = load_config(config_path.as_deref())?;
    let settings = ServerSettings::from_config(config.as_ref())?;
    init_logging(settings.verbose);
    run_server(&settings).await
}
