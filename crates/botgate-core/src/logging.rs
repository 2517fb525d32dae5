//! Logging sink initialization.
//!
//! The configured `[logging]` table maps sink names to file destinations.
//! Recognized sinks: `debug` (everything at DEBUG and up), `error` (ERROR
//! only), `update` (raw update traffic, emitted under the `update` target).
//! Unknown keys are ignored. Safe to call more than once per process; only
//! the first call installs a subscriber.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::error::Result;

/// Target used for the raw-update sink. Emit with
/// `tracing::info!(target: UPDATE_TARGET, ...)`.
pub const UPDATE_TARGET: &str = "update";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber: one stderr layer honoring `RUST_LOG`
/// plus one file layer per recognized sink.
pub fn init_sinks(sinks: &BTreeMap<String, String>) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "botgate=info".into());
    layers.push(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter)
            .boxed(),
    );

    for (name, dest) in sinks {
        let layer = match name.as_str() {
            "debug" => fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer(dest)?)
                .with_filter(LevelFilter::DEBUG)
                .boxed(),
            "error" => fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer(dest)?)
                .with_filter(LevelFilter::ERROR)
                .boxed(),
            "update" => fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer(dest)?)
                .with_filter(filter_fn(|meta| meta.target() == UPDATE_TARGET))
                .boxed(),
            other => {
                tracing::debug!(sink = %other, "ignoring unknown logging sink");
                continue;
            }
        };
        layers.push(layer);
    }

    // try_init: a second invocation in the same process is a no-op.
    let _ = tracing_subscriber::registry().with(layers).try_init();
    Ok(())
}

fn file_writer(dest: &str) -> Result<Arc<std::fs::File>> {
    let file = OpenOptions::new().create(true).append(true).open(dest)?;
    Ok(Arc::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sinks_are_ignored() {
        let dir = std::env::temp_dir();
        let mut sinks = BTreeMap::new();
        sinks.insert(
            "nonsense".to_string(),
            dir.join("botgate-nonsense.log").display().to_string(),
        );
        // must not error and must not create the file
        init_sinks(&sinks).unwrap();
        assert!(!dir.join("botgate-nonsense.log").exists());
    }

    #[test]
    fn repeated_init_is_a_noop() {
        let sinks = BTreeMap::new();
        init_sinks(&sinks).unwrap();
        init_sinks(&sinks).unwrap();
    }
}
