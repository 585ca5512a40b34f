use std::io::Write;
use std::sync::Arc;

use tokio::sync::Mutex;

use cync_bridge::backend::cloud::CloudBackend;
use cync_bridge::backend::Backend;
use cync_bridge::config;
use cync_bridge::error::ApiResult;
use cync_bridge::host::LoggingHost;
use cync_bridge::model::registry::DeviceRegistry;

/*
 * Formatter function to output in syslog format. This makes sense when running
 * as a service (where output might go to a log file, or the system journal)
 */
fn syslog_format(
    buf: &mut pretty_env_logger::env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        buf,
        "<{}>{}: {}",
        match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug | log::Level::Trace => 7,
        },
        record.target(),
        record.args()
    )
}

fn init_logging() -> ApiResult<()> {
    /* Try to provide reasonable default filters, when RUST_LOG is not specified */
    const DEFAULT_LOG_FILTERS: &[&str] = &["debug"];

    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTERS.join(","));

    /* Detect if we need syslog or human-readable formatting */
    if std::env::var("SYSTEMD_EXEC_PID").is_ok_and(|pid| pid == std::process::id().to_string()) {
        Ok(pretty_env_logger::env_logger::builder()
            .format(syslog_format)
            .parse_filters(&log_filters)
            .try_init()?)
    } else {
        Ok(pretty_env_logger::formatted_timed_builder()
            .parse_filters(&log_filters)
            .try_init()?)
    }
}

async fn run() -> ApiResult<()> {
    init_logging()?;

    let config = config::parse("config.yaml")?;
    log::debug!("Configuration loaded successfully");

    let registry = Arc::new(Mutex::new(DeviceRegistry::new()));
    let chan = registry.lock().await.backend_event_stream();

    let backend = CloudBackend::new(
        "cloud",
        config.cloud,
        registry.clone(),
        Arc::new(LoggingHost),
        chan,
    );

    let mut session = tokio::spawn(backend.run_forever());

    tokio::select! {
        res = &mut session => res?,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Ctrl-C pressed, exiting..");
            // aborting the session drops the socket, timers and queue in
            // one move; the host is not called again
            session.abort();
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        log::error!("Bridge error: {err}");
        log::error!("Fatal error encountered, cannot continue.");
    }
}
