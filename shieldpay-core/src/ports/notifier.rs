//! Notification sink port

use std::sync::Mutex;

use crate::domain::ActionMenu;

/// Receives human-readable progress and result messages.
///
/// The front end decides how to render text and menus (chat buttons,
/// terminal output, ...).
pub trait Notifier: Send + Sync {
    fn deliver(&self, user_id: &str, text: &str, menu: Option<&ActionMenu>);
}

/// A delivered message, as captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub user_id: String,
    pub text: String,
    pub menu: Option<ActionMenu>,
}

/// Notifier that keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.deliveries().into_iter().map(|d| d.text).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut d) = self.deliveries.lock() {
            d.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, user_id: &str, text: &str, menu: Option<&ActionMenu>) {
        if let Ok(mut d) = self.deliveries.lock() {
            d.push(Delivery {
                user_id: user_id.to_string(),
                text: text.to_string(),
                menu: menu.cloned(),
            });
        }
    }
}
