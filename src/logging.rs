use tracing::Level;

/// Installs the global fmt subscriber. `level` falls back to `info` when it
/// does not parse.
pub fn init(level: &str) {
    let level = level.parse().unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
