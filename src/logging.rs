use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console logging; `RUST_LOG` overrides the default `hf_rankings=info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hf_rankings=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
