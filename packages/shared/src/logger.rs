//! Logging setup utilities for the study-room binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the study-room library crates and the binary itself.
/// It can be overridden with the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "studyroom-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info")
///
/// # Examples
///
/// ```no_run
/// use studyroom_shared::logger::setup_logger;
///
/// setup_logger("studyroom-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let targets = [
        "studyroom_shared",
        "studyroom_server",
        "studyroom_client",
        &binary_name.replace('-', "_"),
    ];

    let mut directives: Vec<String> = Vec::with_capacity(targets.len() + 1);
    for target in targets {
        let directive = format!("{}={}", target, default_log_level);
        if !directives.contains(&directive) {
            directives.push(directive);
        }
    }
    directives.push(format!("tower_http={}", default_log_level));

    directives.join(",")
}
