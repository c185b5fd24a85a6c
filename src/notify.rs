//! User-facing failure notices
//!
//! The dialog itself is an external capability; the core only says what to
//! report. `LogNotifier` renders notices through tracing.

use tracing::{error, info, warn};

use crate::constants::messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn with_severity(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            title: messages::TITLE.to_string(),
            severity,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Info, message)
    }
}

/// Shows a notice to the user; implementations must not block on a reply
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.severity {
            Severity::Error => error!(title = %notice.title, "{}", notice.message),
            Severity::Warning => warn!(title = %notice.title, "{}", notice.message),
            Severity::Info => info!(title = %notice.title, "{}", notice.message),
        }
    }
}
