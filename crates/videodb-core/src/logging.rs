//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the configured levels:
//! ```bash
//! RUST_LOG=videodb_segment=debug videodb segment ./toy-data
//! ```

use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Builds the filter directive string, e.g. `warn,videodb_rank=debug`.
pub fn directives(config: &LoggingConfig) -> String {
    let mut out = config.level.clone();
    for (module, level) in &config.modules {
        out.push_str(&format!(",{module}={level}"));
    }
    out
}

/// Install the global subscriber. Only the first call takes effect.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directives(config)));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_filter(filter);
        // Another subscriber may already be installed by the host.
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}
