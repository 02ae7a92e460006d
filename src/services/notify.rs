//! User-facing notifications
//!
//! Failures the user has to act on (a rejected removal request) are pushed to a
//! `Notifier`; everything else only goes to the log. Frontends choose how to
//! present notifications: an alert, a console line, or nothing at all.

use std::sync::{Arc, Mutex};

/// Pipeline stages a notification can originate from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Decoding an original or transformed image
    Decode,
    /// Uploading to the removal endpoint
    RemovalRequest,
    /// Fetching and compositing a background
    BackgroundFetch,
    /// Listing gallery candidates
    GalleryQuery,
    /// Writing the exported PNG
    Export,
}

impl PipelineStage {
    /// Human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Decode => "Decoding image",
            Self::RemovalRequest => "Removing background",
            Self::BackgroundFetch => "Applying background",
            Self::GalleryQuery => "Loading backgrounds",
            Self::Export => "Exporting image",
        }
    }
}

/// Something the user should see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The removal endpoint rejected the upload; the user may resubmit
    RemovalFailed(String),
    /// A new removal result is on screen and can be exported
    ResultReady,
    /// Non-actionable failure in another stage
    StageFailed {
        stage: PipelineStage,
        message: String,
    },
}

impl Notification {
    /// Alert-style text for the notification
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::RemovalFailed(reason) => format!("Error: {}", reason),
            Self::ResultReady => "Background removed. Ready to download.".to_string(),
            Self::StageFailed { stage, message } => {
                format!("{} failed: {}", stage.description(), message)
            },
        }
    }
}

/// Receiver for user-facing notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Discards all notifications
#[derive(Debug, Default)]
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::ResultReady => log::info!("✅ {}", notification.message()),
            Notification::RemovalFailed(_) | Notification::StageFailed { .. } => {
                log::error!("❌ {}", notification.message());
            },
        }
    }
}

/// Keeps every notification in memory, in arrival order
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    received: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut received) = self.received.lock() {
            received.push(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        let shared = notifier.clone();
        shared.notify(Notification::RemovalFailed("HTTP 500".to_string()));
        shared.notify(Notification::ResultReady);

        assert_eq!(
            notifier.notifications(),
            vec![
                Notification::RemovalFailed("HTTP 500".to_string()),
                Notification::ResultReady
            ]
        );
    }

    #[test]
    fn test_notification_messages() {
        assert_eq!(
            Notification::RemovalFailed("Failed to remove background".to_string()).message(),
            "Error: Failed to remove background"
        );
        let failed = Notification::StageFailed {
            stage: PipelineStage::GalleryQuery,
            message: "timeout".to_string(),
        };
        assert_eq!(failed.message(), "Loading backgrounds failed: timeout");
    }
}
