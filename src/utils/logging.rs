/// Installs the global fmt subscriber for the bridge, capped at the level
/// named by `logging.level`.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init(level: &str) {
    let lvl = parse_level(level);

    // try_init: the binary and every test may call this
    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(false)
        .try_init();
}

/// Maps a `logging.level` value to a tracing level. Matching is case
/// insensitive, `warning` is accepted for `warn`, and anything unknown is
/// `INFO`.
pub(crate) fn parse_level(name: &str) -> tracing::Level {
    match name.trim().to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}
