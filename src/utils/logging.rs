use crate::error::{ProcessingError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `debug` when
/// verbose and `info` when not, and dependencies at `warn`. Output goes to
/// stderr, or is appended to `log_file` without colour codes.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,airq_processor={}", default_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| ProcessingError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialisation_is_reported() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let log_path = temp_dir.path().join("airq.log");

        init_logging(false, Some(&log_path)).unwrap();
        assert!(log_path.exists());

        let err = init_logging(true, None).unwrap_err();
        assert!(matches!(err, ProcessingError::Logging(_)));
    }
}
