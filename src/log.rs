// src/log.rs
//
// Subscriber setup. Library code only emits `tracing` events; the binary
// decides where they go. Stderr gets the human-facing stream, and the
// optional debug log (by convention `<cache>/debug.log`) gets everything.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::Result;

pub const DEBUG_LOG_FILE: &str = "debug.log";

fn stderr_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity` when set.
/// Calling this twice is harmless; the second call is ignored.
pub fn init(verbosity: u8, debug_log: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(stderr_level(verbosity).into())
        .from_env_lossy();

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let file = match debug_log {
        Some(path) => {
            if let Some(parent) = path.parent() {
                crate::file::ensure_directory(parent)?;
            }
            let f = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(f))
                    .with_ansi(false)
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry().with(stderr).with(file).try_init();
    Ok(())
}
