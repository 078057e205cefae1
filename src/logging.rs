use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::shared::config::LoggingConfig;

fn level(raw: &str, which: &str) -> anyhow::Result<LevelFilter> {
    raw.trim()
        .parse::<LevelFilter>()
        .with_context(|| format!("invalid {} log level '{}'", which, raw))
}

/// Installs the global subscriber: ANSI stdout plus a daily file under
/// `log_dir`. `RUST_LOG` directives narrow the stdout layer further.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let stdout_level = level(&cfg.stdout_level, "stdout")?;
    let file_level = level(&cfg.file_level, "file")?;

    std::fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("cannot create log directory '{}'", cfg.log_dir))?;

    let stdout_filter = EnvFilter::builder()
        .with_default_directive(stdout_level.into())
        .from_env_lossy();
    let stdout_layer = fmt::layer().with_ansi(true).with_filter(stdout_filter);

    let file_appender = tracing_appender::rolling::daily(&cfg.log_dir, "snel_cohort.log");
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_appender)
        .with_filter(file_level);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    info!(
        target: "snel_cohort::logging",
        log_dir = %cfg.log_dir,
        stdout = %stdout_level,
        file = %file_level,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter =
            EnvFilter::from_default_env().add_directive("snel_cohort=debug".parse().unwrap());

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
