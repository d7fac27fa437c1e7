//! Log filter selection: `SCI_BRIDGE_LOG`, then `RUST_LOG`, then `warn`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV: &str = "SCI_BRIDGE_LOG";

const CRATES: [&str; 5] = ["app", "bridge_core", "editor_bridge", "engine_sim", "native"];

/// A bare level in `SCI_BRIDGE_LOG` applies to the bridge crates only;
/// anything with directive syntax is used as is.
#[must_use]
pub fn filter_directives(bridge_log: Option<&str>, rust_log: Option<&str>) -> String {
    match (bridge_log, rust_log) {
        (Some(spec), _) if spec.contains(['=', ',', ':']) => spec.to_owned(),
        (Some(level), _) => std::iter::once("warn".to_owned())
            .chain(CRATES.iter().map(|name| format!("{name}={level}")))
            .collect::<Vec<_>>()
            .join(","),
        (None, Some(spec)) => spec.to_owned(),
        (None, None) => "warn".to_owned(),
    }
}

/// Logs go to stderr so they never mix with the report.
pub fn init() {
    let directives = filter_directives(
        std::env::var(LOG_ENV).ok().as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
    );
    let filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_warn() {
        assert_eq!(filter_directives(None, None), "warn");
    }

    #[test]
    fn test_bridge_log_wins() {
        assert_eq!(
            filter_directives(Some("debug"), Some("trace")),
            "warn,app=debug,bridge_core=debug,editor_bridge=debug,engine_sim=debug,native=debug"
        );
        assert_eq!(
            filter_directives(Some("bridge_core=trace"), None),
            "bridge_core=trace"
        );
    }

    #[test]
    fn test_rust_log_fallback() {
        assert_eq!(filter_directives(None, Some("info")), "info");
    }
}
