use std::time::{Duration, Instant};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
}

impl Level {
    pub fn icon(self) -> &'static str {
        match self {
            Level::Success => "✅",
            Level::Error => "❌",
            Level::Info => "💕",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
            Level::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: Level,
    pub message: String,
    pub shown_at: Instant,
}

/// Holds at most one toast; a new one replaces whatever is visible.
#[derive(Debug, Clone)]
pub struct Notifier {
    current: Option<Toast>,
    duration: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl Notifier {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    pub fn show<S: Into<String>>(&mut self, level: Level, message: S) {
        self.current = Some(Toast {
            level,
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn success<S: Into<String>>(&mut self, message: S) {
        self.show(Level::Success, message);
    }

    pub fn error<S: Into<String>>(&mut self, message: S) {
        self.show(Level::Error, message);
    }

    pub fn info<S: Into<String>>(&mut self, message: S) {
        self.show(Level::Info, message);
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Drops the toast once it has been visible for the configured duration.
    /// Returns true when something was dismissed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|toast| now.saturating_duration_since(toast.shown_at) >= self.duration);
        if expired {
            self.current = None;
        }
        expired
    }
}
