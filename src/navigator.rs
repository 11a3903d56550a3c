//! Loads the advanced-search page and confirms it rendered.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{PortalConfig, ScraperConfig};
use crate::screenshots::Screenshots;
use crate::session::{wait_for, BrowserSession, Locator, SessionError};
use crate::utils::error::{Result, ScrapeError};

/// Layout marker that only exists once the search interface has rendered.
const READY_MARKER: &str = "ul.nav-tabs";

pub struct PageNavigator {
    session: Arc<dyn BrowserSession>,
    portal: PortalConfig,
    scraper: ScraperConfig,
    screenshots: Screenshots,
}

impl PageNavigator {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        portal: PortalConfig,
        scraper: ScraperConfig,
        screenshots: Screenshots,
    ) -> Self {
        Self {
            session,
            portal,
            scraper,
            screenshots,
        }
    }

    /// Navigate to the search page and block until the layout marker is
    /// present. A timeout is reported as `LoadError`; retrying is the
    /// caller's decision, composed through the retry wrapper.
    pub async fn load(&self) -> Result<()> {
        info!("loading search page: {}", self.portal.search_url);
        self.session.navigate(&self.portal.search_url).await?;

        let marker = Locator::css(READY_MARKER);
        match wait_for(
            self.session.as_ref(),
            &marker,
            self.scraper.page_load_timeout(),
            self.scraper.poll_interval(),
        )
        .await
        {
            Ok(_) => {
                debug!("search page ready ({marker} present)");
                Ok(())
            }
            Err(SessionError::Timeout { waited, .. }) => {
                self.screenshots.capture(self.session.as_ref(), "load").await;
                Err(ScrapeError::Load(format!(
                    "layout marker {marker} not present after {waited:?}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}
