//! GitHub Actions log grouping.
//!
//! Workflow commands `::group::` / `::endgroup::` fold log sections in the
//! Actions UI. Elsewhere they would only be noise, so they are off unless
//! running under Actions or explicitly requested.

use std::fmt::{self, Display};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Whether the process runs inside GitHub Actions.
#[must_use]
pub fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

type Sink = Arc<Mutex<dyn Write + Send>>;

/// Factory for log groups.
///
/// Markers go to stdout by default; [`LogGroups::to_writer`] redirects them.
#[derive(Clone, Default)]
pub struct LogGroups {
    sink: Option<Sink>,
}

impl LogGroups {
    /// Groups that print markers to stdout only when `enabled`.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        if enabled { Self::to_writer(std::io::stdout()) } else { Self::default() }
    }

    /// Enabled groups writing their markers to `writer`.
    #[must_use]
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        let sink: Sink = Arc::new(Mutex::new(writer));
        Self { sink: Some(sink) }
    }

    /// Enabled when running under Actions.
    #[must_use]
    pub fn detect() -> Self {
        Self::new(running_in_actions())
    }

    /// Whether markers are printed.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Open a group; it closes when the returned guard is dropped.
    pub fn start(&self, title: impl Display) -> LogGroup {
        if let Some(sink) = &self.sink {
            emit(sink, &open_marker(title));
        }
        LogGroup { sink: self.sink.clone() }
    }
}

impl fmt::Debug for LogGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGroups").field("enabled", &self.enabled()).finish()
    }
}

/// An open log group.
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct LogGroup {
    sink: Option<Sink>,
}

impl Drop for LogGroup {
    fn drop(&mut self) {
        if let Some(sink) = &self.sink {
            emit(sink, CLOSE_MARKER);
        }
    }
}

impl fmt::Debug for LogGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGroup").field("enabled", &self.sink.is_some()).finish()
    }
}

// Marker output is best effort; a closed stdout must not abort the crawl.
fn emit(sink: &Sink, line: &str) {
    let mut out = match sink.lock() {
        Ok(out) => out,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        tracing::debug!(error = %e, "Failed to write log group marker");
    }
}

/// Marker closing the innermost group.
pub const CLOSE_MARKER: &str = "::endgroup::";

/// Marker opening a group titled `title`. Line breaks would end the command early.
#[must_use]
pub fn open_marker(title: impl Display) -> String {
    format!("::group::{}", title.to_string().replace(['\r', '\n'], " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_open_marker() {
        assert_eq!(open_marker("Fetch category: cs"), "::group::Fetch category: cs");
        assert_eq!(open_marker("two\nlines"), "::group::two lines");
    }

    #[test]
    fn test_disabled_groups_are_inert() {
        let groups = LogGroups::new(false);
        assert!(!groups.enabled());
        let _guard = groups.start("quiet");
    }

    #[test]
    fn test_enabled_group_wraps_scope() {
        let buffer = Buffer::default();
        let groups = LogGroups::to_writer(buffer.clone());
        assert!(groups.enabled());

        {
            let _guard = groups.start("Fetch category: cs");
            assert_eq!(buffer.contents(), "::group::Fetch category: cs\n");
        }

        let _second = groups.start("Save\nstate");
        assert_eq!(
            buffer.contents(),
            "::group::Fetch category: cs\n::endgroup::\n::group::Save state\n"
        );
    }
}
