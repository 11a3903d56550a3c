//! Best-effort diagnostic screenshots for failure paths.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ScreenshotConfig;
use crate::session::BrowserSession;

/// Captures a screenshot into the configured directory when a component is
/// about to propagate a failure. Capture problems are logged and swallowed;
/// this is a diagnostic side channel, never part of the scrape contract.
#[derive(Debug, Clone)]
pub struct Screenshots {
    enabled: bool,
    dir: PathBuf,
}

impl Screenshots {
    pub fn new(config: &ScreenshotConfig) -> Self {
        Self {
            enabled: config.enabled,
            dir: PathBuf::from(&config.dir),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::new(),
        }
    }

    /// Capture a screenshot tagged with the failing phase, e.g. `filters`.
    /// Returns the path it was written to, if any.
    pub async fn capture(&self, session: &dyn BrowserSession, tag: &str) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("debug_{tag}_{timestamp}_{}.png", uuid::Uuid::new_v4().simple());
        let path = self.dir.join(filename);
        match session.screenshot(&path).await {
            Ok(()) => {
                debug!("saved diagnostic screenshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("could not capture {tag} screenshot: {e}");
                None
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
