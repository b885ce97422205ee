//! Notification Module
//!
//! Operator-facing reports: the captured burner identity and the final node
//! status. Delivery is best-effort from the supervisor's point of view; a
//! failed send is logged and never ends a run.

pub mod config;
pub mod format;
pub mod sink;
pub mod telegram;

pub use config::TelegramConfig;
pub use sink::{LogNotifier, Notification, NotificationSink, NotifyError, RecordingNotifier};
pub use telegram::TelegramNotifier;
