use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::console::{Console, Style};

/// Sink for validation outcomes.
///
/// `persist` marks messages that should also reach the durable log; accepted
/// values are usually reported with `persist = false`.
pub trait Logger {
    fn run(&self) {}
    fn info(&self, message: &str, persist: bool);
    fn warning(&self, message: &str, persist: bool);
}

/// [`Logger`] that forwards to `tracing`. Persisted warnings are also printed
/// on the console.
pub struct TracingLogger<'a> {
    root: PathBuf,
    console: &'a dyn Console,
}

impl<'a> TracingLogger<'a> {
    pub fn new(root: &Path, console: &'a dyn Console) -> Self {
        Self {
            root: root.to_path_buf(),
            console,
        }
    }
}

impl Logger for TracingLogger<'_> {
    /// Installs a global fmt subscriber filtered by `RUST_LOG` (default
    /// `info`). A subscriber installed earlier by the host wins.
    fn run(&self) {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_level(true)
            .try_init()
            .is_ok();

        if installed {
            info!(root = %self.root.display(), "logger initialized");
        }
    }

    fn info(&self, message: &str, persist: bool) {
        info!(persist, "{message}");
    }

    fn warning(&self, message: &str, persist: bool) {
        warn!(persist, "{message}");
        if persist {
            self.console.print(message, Style::Warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordingConsole {
        printed: RefCell<Vec<(String, Style)>>,
    }

    impl Console for RecordingConsole {
        fn print(&self, message: &str, style: Style) {
            self.printed.borrow_mut().push((message.to_string(), style));
        }

        fn input(&self, _prompt: &str) -> String {
            String::new()
        }
    }

    #[test]
    fn test_run_is_idempotent() {
        let dir = std::env::temp_dir();
        let console = RecordingConsole::default();
        let logger = TracingLogger::new(&dir, &console);

        logger.run();
        logger.run();
        logger.info("chunk set to 1024", false);
    }

    #[test]
    fn test_persisted_warnings_reach_the_console() {
        // Arrange
        let dir = std::env::temp_dir();
        let console = RecordingConsole::default();
        let logger = TracingLogger::new(&dir, &console);

        // Act
        logger.warning("split a/b contains illegal characters", true);
        logger.warning("chunk -1 is invalid", false);
        logger.info("storage_format not set", true);

        // Assert
        assert_eq!(
            *console.printed.borrow(),
            vec![("split a/b contains illegal characters".to_string(), Style::Warning)]
        );
    }
}
