use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
///
/// Interactive sessions (a display is attached) log at `info`, unattended
/// runs at `warn`.
pub fn default_filter(display_attached: bool) -> &'static str {
    if display_attached {
        "info,sqlx=warn"
    } else {
        "warn,sqlx=warn"
    }
}

/// Install the global tracing subscriber.
pub fn init() {
    let display_attached = std::env::var_os("DISPLAY").is_some();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(display_attached).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
