//! Diagnostic output for the plug-in
//!
//! Hosts own stdout, so everything goes to stderr. The filter comes from `CCBRIDGE_LOG`
//! (default `ccbridge=info`) and `CCBRIDGE_LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::{fmt, EnvFilter};

const FILTER_VAR: &str = "CCBRIDGE_LOG";
const FORMAT_VAR: &str = "CCBRIDGE_LOG_FORMAT";
const DEFAULT_FILTER: &str = "ccbridge=info,ccbridge_core=info";

/// Install the global subscriber. A host that already installed one keeps it.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(FILTER_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true);

    let installed = if wants_json(std::env::var(FORMAT_VAR).ok().as_deref()) {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already set by host, keeping it");
    }
}

fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_selection() {
        assert!(wants_json(Some("json")));
        assert!(wants_json(Some(" JSON ")));
        assert!(!wants_json(Some("text")));
        assert!(!wants_json(None));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
    }
}
