use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// 指令輸出走 stdout，日誌一律寫到 stderr
pub fn init_cli_logger(verbose: bool) {
    let filter = env_filter(verbose);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Same filtering as the CLI logger, one JSON object per line for log shippers.
pub fn init_json_logger(verbose: bool) {
    let filter = env_filter(verbose);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

// RUST_LOG 優先，否則依 --verbose 決定
fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "athlete_orbit=debug,info"
    } else {
        "athlete_orbit=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
