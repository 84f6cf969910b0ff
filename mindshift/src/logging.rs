use mindconfig::Config;
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt, Registry,
};

/// Handle to change the log level after initialisation
pub type LevelHandle = reload::Handle<LevelFilter, Registry>;

pub fn string_to_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

/// Installs the global subscriber from the `host.logger` settings
///
/// `verbose` forces DEBUG regardless of the configured level.
pub fn init_logging(config: &Config, verbose: bool) -> LevelHandle {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        match config.get_log_min_level() {
            Ok(l) => string_to_level(&l).map(LevelFilter::from_level).unwrap_or(LevelFilter::INFO),
            Err(_) => LevelFilter::INFO,
        }
    };

    let (filter, handle) = reload::Layer::new(level);
    let subscriber = Registry::default().with(filter);

    let enable_console = config.get_log_enable_console().unwrap_or(true);
    if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber.init();
    }

    handle
}
