use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Logs go to stderr so stdout carries only answers and verdicts.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
