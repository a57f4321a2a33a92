//! Scraper diagnostics with colored terminal output.
//!
//! Used by the walker to report skipped stylesheets and by the server to
//! report requests. Deduplication is owned by the caller through
//! [`WarningLog`], so two scrapes never share state.

use std::collections::HashSet;
use std::sync::Mutex;

use owo_colors::OwoColorize;

/// Print a warning for `component` to stderr.
///
/// # Example
/// ```ignore
/// warn("walker", "skipping https://example.com/a.css: HTTP error 404");
/// ```
pub fn warn(component: &str, message: &str) {
    eprintln!(
        "{} {}",
        format!("[csscrape {component}] ⚠").yellow().bold(),
        message.yellow()
    );
}

/// Print an informational line for `component` to stderr.
pub fn info(component: &str, message: &str) {
    eprintln!("{} {message}", format!("[csscrape {component}]").cyan());
}

/// A set of warnings already printed during one scrape.
///
/// A stylesheet imported from twenty places that fails twenty times is
/// reported once.
#[derive(Debug, Default)]
pub struct WarningLog {
    seen: Mutex<HashSet<String>>,
}

impl WarningLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn about `message` unless this log has already printed it.
    ///
    /// Returns `true` if the warning was printed.
    pub fn warn_once(&self, component: &str, message: &str) -> bool {
        let key = format!("[{component}] {message}");
        let fresh = match self.seen.lock() {
            Ok(mut seen) => seen.insert(key),
            // A panicking fetch thread must not silence later warnings.
            Err(poisoned) => poisoned.into_inner().insert(key),
        };

        if fresh {
            warn(component, message);
        }
        fresh
    }

    /// Number of distinct warnings printed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether nothing has been printed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
