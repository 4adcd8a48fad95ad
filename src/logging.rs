use tracing_subscriber::EnvFilter;

/// Env var holding the log filter directive, e.g. `cursor_usage=debug`
pub const LOG_ENV: &str = "CURSOR_USAGE_LOG";

fn default_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "warn" }
}

/// Log to stderr; stdout carries the status line.
pub fn init(debug: bool) {
    let level = default_level(debug);
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .ok()
        .filter(|_| !debug)
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_raises_level() {
        assert_eq!(default_level(true), "debug");
        assert_eq!(default_level(false), "warn");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
