use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sitewatch::errors::Result;
use sitewatch::notify::{Notification, Notifier};
use sitewatch::target::Target;

/// Records `(target name, notification)` pairs. Clones share the log.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<(String, Notification)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<(String, Notification)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.seen().iter().map(|(_, n)| n.kind()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, target: &Target, notification: &Notification) -> Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push((target.name.clone(), notification.clone()));
        Ok(())
    }
}
