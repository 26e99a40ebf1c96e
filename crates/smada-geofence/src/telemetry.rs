//! Tracing setup for SMADA binaries.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const SMADA_TARGETS: [&str; 4] = ["smada", "smada_geofence", "smada_state", "smada_insight"];

/// Directive used when `RUST_LOG` is unset: `level` for SMADA crates,
/// `warn` for dependencies (reqwest, hyper, ...).
fn default_directive(level: Level) -> String {
    let mut directive = String::from("warn");
    for target in SMADA_TARGETS {
        directive.push_str(&format!(",{}={}", target, level.as_str().to_lowercase()));
    }
    directive
}

/// Install the global subscriber, writing to stderr so stdout stays
/// machine-readable. Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
