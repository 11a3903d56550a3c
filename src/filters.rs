//! Applies the consignee-location facet and triggers search execution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::screenshots::Screenshots;
use crate::session::{
    wait_for, wait_for_any, BrowserSession, Locator, SessionError,
};
use crate::utils::error::{Result, ScrapeError, ScrapePhase};

pub const LOCATION_TAB: &str = "#location-tab";
pub const STATE_DROPDOWN: &str = "#state_name_con";
// The search control is wired to the portal's searchBid routine; both anchor
// and button variants have been observed.
pub const SEARCH_CONTROL: &str =
    r#"a[onclick*="searchBid('con')"], button[onclick*="searchBid('con')"]"#;
pub const SEARCH_FALLBACK_JS: &str = "searchBid('con');";
pub const RESULT_CARD: &str = ".card";
pub const NO_RECORDS_INDICATOR: &str = "#bidCard .no-record-found, #bidCard .alert.alert-info";
pub const ERROR_BANNER: &str = "#bidCard .alert.alert-danger";
/// Banner text the portal shows when its own backend fails.
pub const SERVER_FAILURE_PHRASE: &str = "Something went wrong";

/// What the portal showed once the search settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    ResultsPresent,
    /// A valid, empty scrape — not a failure.
    NoResults,
}

pub struct FilterApplicator {
    session: Arc<dyn BrowserSession>,
    config: ScraperConfig,
    screenshots: Screenshots,
}

impl FilterApplicator {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        config: ScraperConfig,
        screenshots: Screenshots,
    ) -> Self {
        Self {
            session,
            config,
            screenshots,
        }
    }

    /// Open the location facet, select `state`, run the search, and report
    /// whether the portal produced results. Any failure path captures a
    /// diagnostic screenshot before propagating.
    pub async fn apply(&self, state: &str) -> Result<SearchOutcome> {
        let applied = self.apply_inner(state).await;
        if applied.is_err() {
            self.screenshots
                .capture(self.session.as_ref(), "filters")
                .await;
        }
        applied
    }

    async fn apply_inner(&self, state: &str) -> Result<SearchOutcome> {
        info!("applying filters, state: {:?}", state);
        self.open_location_facet().await?;

        if !state.trim().is_empty() {
            self.select_state(state.trim()).await?;
        }

        self.trigger_search().await?;
        self.classify_outcome().await
    }

    async fn open_location_facet(&self) -> Result<()> {
        let tab = wait_for(
            self.session.as_ref(),
            &Locator::css(LOCATION_TAB),
            self.config.filter_timeout(),
            self.config.poll_interval(),
        )
        .await
        .map_err(|e| match e {
            SessionError::Timeout { waited, .. } => ScrapeError::filter_timing(format!(
                "location facet did not become interactive within {waited:?}"
            )),
            other => other.into(),
        })?;
        tab.click().await?;
        debug!("location facet opened");
        Ok(())
    }

    async fn select_state(&self, state: &str) -> Result<()> {
        let dropdown = wait_for(
            self.session.as_ref(),
            &Locator::css(STATE_DROPDOWN),
            self.config.filter_timeout(),
            self.config.poll_interval(),
        )
        .await
        .map_err(|e| match e {
            SessionError::Timeout { waited, .. } => ScrapeError::filter_timing(format!(
                "state dropdown did not appear within {waited:?}"
            )),
            other => other.into(),
        })?;

        dropdown.select_by_label(state).await.map_err(|e| match e {
            // Retrying will not make the option exist.
            SessionError::OptionNotFound { label } => {
                ScrapeError::filter_terminal(format!("state not available: {label}"))
            }
            other => other.into(),
        })?;
        info!("selected state: {state}");

        // Give the portal's JS a moment to register the selection.
        tokio::time::sleep(self.config.settle_delay()).await;
        Ok(())
    }

    async fn trigger_search(&self) -> Result<()> {
        match wait_for(
            self.session.as_ref(),
            &Locator::css(SEARCH_CONTROL),
            self.config.filter_timeout(),
            self.config.poll_interval(),
        )
        .await
        {
            Ok(button) => match button.click().await {
                Ok(()) => debug!("clicked search control"),
                Err(e) => {
                    warn!("search control click failed ({e}), invoking search routine directly");
                    self.session.execute_script(SEARCH_FALLBACK_JS).await?;
                }
            },
            Err(SessionError::Timeout { .. }) => {
                // The control is sometimes occluded or not yet wired up;
                // invoke the portal's search routine directly instead.
                warn!("search control not clickable, invoking search routine directly");
                self.session.execute_script(SEARCH_FALLBACK_JS).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn classify_outcome(&self) -> Result<SearchOutcome> {
        let card = Locator::css(RESULT_CARD);
        let no_records = Locator::css(NO_RECORDS_INDICATOR);
        let banner = Locator::css(ERROR_BANNER);

        wait_for_any(
            self.session.as_ref(),
            &[&card, &no_records, &banner],
            self.config.results_timeout(),
            self.config.poll_interval(),
        )
        .await
        .map_err(|e| match e {
            SessionError::Timeout { waited, .. } => ScrapeError::filter_timing(format!(
                "search produced neither results nor an outcome indicator within {waited:?}"
            )),
            other => other.into(),
        })?;

        if let Some(element) = self.session.find(&banner).await? {
            let text = element.text().await.unwrap_or_default();
            if text.contains(SERVER_FAILURE_PHRASE) {
                return Err(ScrapeError::Portal {
                    phase: ScrapePhase::Filtering,
                    page: 1,
                    message: text.trim().to_string(),
                });
            }
            warn!("ignoring unrecognized banner text: {}", text.trim());
        }

        if self.session.find(&no_records).await?.is_some() {
            info!("portal reported no matching records");
            return Ok(SearchOutcome::NoResults);
        }

        debug!("search results present");
        Ok(SearchOutcome::ResultsPresent)
    }
}
