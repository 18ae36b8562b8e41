use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging to stderr so stdout carries only the result.
///
/// The level comes from `--log-level` unless `RUST_LOG` is set.
pub fn init_logging(level: &str) {
    let default_filter = format!("devflow={level},devflow_core={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let initialized = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(atty::is(atty::Stream::Stderr))
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init();
    if let Err(e) = initialized {
        eprintln!("Warning: Failed to initialize logging: {e}");
    }
}
