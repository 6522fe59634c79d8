use anyhow::Result;
use helmsman_core::config::{LogConfig, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// RUST_LOG が設定されていればそちらを優先する。ログは stderr へ。
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let base = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env)
            .with(base.json())
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env)
            .with(base.compact())
            .try_init()?,
    }
    Ok(())
}
