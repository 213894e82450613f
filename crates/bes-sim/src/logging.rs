use std::error::Error;
use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise the sweep crates log at `level`.
/// Stdout stays reserved for command output.
pub fn init_logging(level: &str) -> Result<(), Box<dyn Error>> {
    let default_filter = format!("bes_sim={level},bes_exp={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()?;
    Ok(())
}
