//! Diagnostics sink for non-fatal replication faults.
//!
//! Faults in the override machinery never abort a session; at worst an
//! entity spawns as its original template or with default configuration.
//! What the machinery does instead is report through a [`DiagnosticsSink`]:
//! a message string plus an optional display duration, interpreted however
//! the host application likes.
//!
//! Two implementations ship here: [`ScreenLog`], an on-screen message list
//! with per-entry expiration, and [`TraceSink`], which forwards to
//! `tracing` for headless hosts.

use std::time::{Duration, Instant};

use tracing::info;

// ---------------------------------------------------------------------------
// DiagnosticsSink
// ---------------------------------------------------------------------------

/// Receiver for human-readable diagnostic messages.
pub trait DiagnosticsSink {
    /// Report a message. `display_for` is how long the message should stay
    /// visible, where the sink displays messages at all; `None` means "use
    /// the sink's default".
    fn log_message(&mut self, message: &str, display_for: Option<Duration>);
}

// ---------------------------------------------------------------------------
// TraceSink
// ---------------------------------------------------------------------------

/// Sink that forwards every message to `tracing` at info level.
#[derive(Debug, Default)]
pub struct TraceSink;

impl DiagnosticsSink for TraceSink {
    fn log_message(&mut self, message: &str, _display_for: Option<Duration>) {
        info!(target: "diorama::diagnostics", "{message}");
    }
}

// ---------------------------------------------------------------------------
// ScreenLog
// ---------------------------------------------------------------------------

/// One visible message with its expiration time.
#[derive(Debug, Clone)]
struct LogEntry {
    message: String,
    expires_at: Instant,
}

/// On-screen message list with per-entry time-to-live.
///
/// Messages are kept newest-first. Expired entries are removed by
/// [`prune`](Self::prune), which the host calls from its update loop.
#[derive(Debug)]
pub struct ScreenLog {
    entries: Vec<LogEntry>,
    default_ttl: Duration,
}

impl ScreenLog {
    /// Default time a message stays visible.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

    /// Create a log with the default time-to-live.
    pub fn new() -> Self {
        Self::with_default_ttl(Self::DEFAULT_TTL)
    }

    /// Create a log with a custom default time-to-live.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: Vec::new(),
            default_ttl,
        }
    }

    /// Remove every entry whose time-to-live has elapsed at `now`.
    pub fn prune(&mut self, now: Instant) {
        self.entries.retain(|entry| entry.expires_at > now);
    }

    /// Currently visible messages, newest first.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.message.as_str())
    }

    /// Number of currently held messages (including not-yet-pruned ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the log holds no messages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ScreenLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsSink for ScreenLog {
    fn log_message(&mut self, message: &str, display_for: Option<Duration>) {
        let ttl = display_for.unwrap_or(self.default_ttl);
        let entry = LogEntry {
            message: message.to_owned(),
            expires_at: Instant::now() + ttl,
        };
        // Newest messages render at the top of the list.
        self.entries.insert(0, entry);
        info!(target: "diorama::diagnostics", "{message}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
