//! UI notifier collaborator.

use tracing::{info, warn};

/// Severity of a toast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Displays transient toast/alert-style messages to the user.
///
/// The core only ever emits short informational notices (connectivity
/// transitions, batch sync results); everything else stays silent.
pub trait Notifier: Send + Sync {
    fn toast(&self, level: ToastLevel, message: &str);
}

/// Notifier that routes toasts to the log, for headless contexts.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, level: ToastLevel, message: &str) {
        match level {
            ToastLevel::Warning | ToastLevel::Error => warn!("{message}"),
            ToastLevel::Info | ToastLevel::Success => info!("{message}"),
        }
    }
}

/// Notifier that records toasts, for tests.
#[derive(Default)]
pub struct RecordingNotifier {
    pub toasts: std::sync::Mutex<Vec<(ToastLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.toasts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn toast(&self, level: ToastLevel, message: &str) {
        self.toasts
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}
