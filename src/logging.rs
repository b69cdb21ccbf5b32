use std::io;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs the dual stdout/rolling-file tracing subscriber.
///
/// `log_dir` is created if missing. `filter` is an `EnvFilter`-style
/// directive string (e.g. `"info,sqlx=warn"`); an empty string falls back
/// to `RUST_LOG` if set, else `"info"`.
pub fn configure_logging(log_dir: &str, filter: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    // html5ever/scraper emit noisy parse warnings on malformed article HTML,
    // which is the normal case, not an error worth surfacing.
    let quiet_parser = FilterFn::new(|metadata| {
        !(metadata.level() == &Level::WARN && metadata.target().starts_with("html5ever"))
    });

    let stdout_filter = if filter.is_empty() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"))
    } else {
        EnvFilter::new(filter.to_string())
    };

    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter)
        .with_filter(quiet_parser);

    let file_appender = rolling::daily(log_dir, "newsclust.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_filter(EnvFilter::new("info,sqlx=info"));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();

    Ok(())
}
