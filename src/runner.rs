//! Composes one scrape run: navigate, filter, then scan all pages.

use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::config::AppConfig;
use crate::extractor::BidExtractor;
use crate::filters::{FilterApplicator, SearchOutcome};
use crate::models::{BidRecord, ScrapeRequest};
use crate::navigator::PageNavigator;
use crate::paginator::PaginationController;
use crate::retry::{with_retries, RetryPolicy};
use crate::screenshots::Screenshots;
use crate::session::BrowserSession;
use crate::utils::error::{Result, ScrapeError};

/// One-shot scrape orchestrator. The session is owned exclusively by this
/// run for its entire duration; never share it across concurrent callers.
pub struct ScrapeRunner {
    session: Arc<dyn BrowserSession>,
    config: AppConfig,
}

impl ScrapeRunner {
    pub fn new(session: Arc<dyn BrowserSession>, config: AppConfig) -> Self {
        Self { session, config }
    }

    /// Run a full scrape and return the matched records in portal order.
    /// Navigation and filter application are retried on transient browser
    /// failures; pagination errors propagate to the caller, which decides
    /// whether to retry the whole run.
    pub async fn run(&self, request: &ScrapeRequest) -> Result<Vec<BidRecord>> {
        request.validate()?;
        let window = request.window();
        let policy = RetryPolicy::from_config(&self.config.scraper);
        let screenshots = Screenshots::new(&self.config.screenshots);

        let origin = Url::parse(&self.config.portal.origin)
            .map_err(|e| ScrapeError::Request(format!("invalid portal origin: {e}")))?;

        let navigator = PageNavigator::new(
            Arc::clone(&self.session),
            self.config.portal.clone(),
            self.config.scraper.clone(),
            screenshots.clone(),
        );
        with_retries(&policy, "search page load", || navigator.load()).await?;

        let filters = FilterApplicator::new(
            Arc::clone(&self.session),
            self.config.scraper.clone(),
            screenshots.clone(),
        );
        let outcome =
            with_retries(&policy, "filter application", || filters.apply(&request.state)).await?;

        if outcome == SearchOutcome::NoResults {
            info!("no records matched the requested filters");
            return Ok(Vec::new());
        }

        let paginator = PaginationController::new(
            Arc::clone(&self.session),
            BidExtractor::new(origin),
            self.config.scraper.clone(),
            screenshots,
        );
        let sheet = paginator.collect(&window, request.max_pages).await?;

        info!("scrape complete: {} bid(s) collected", sheet.len());
        Ok(sheet.into_records())
    }
}
