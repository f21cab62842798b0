use parking_lot::Mutex;
use tracing::info;

/// Performs the final full-page navigation to the backend-supplied URL
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Navigator that only records targets, for tests and headless hosts
#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        info!("Recorded navigation to {}", url);
        self.visited.lock().push(url.to_string());
    }
}
