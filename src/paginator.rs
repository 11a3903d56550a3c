//! Drives the extractor across result pages and decides when to stop.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::accumulator::BidSheet;
use crate::config::ScraperConfig;
use crate::extractor::BidExtractor;
use crate::filters::{ERROR_BANNER, RESULT_CARD, SERVER_FAILURE_PHRASE};
use crate::models::DateWindow;
use crate::screenshots::Screenshots;
use crate::session::{
    wait_for, wait_for_any, BrowserSession, Locator, SessionError,
};
use crate::utils::error::{Result, ScrapeError, ScrapePhase};

pub const NEXT_PAGE_CONTROL: &str = "#light-pagination a.next";

/// Most result sets end by running out of cards or next-controls, not via
/// an explicit "last page" signal, so `Exhausted` is the normal terminal
/// state and `Failed` is reserved for errors surfaced mid-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Scanning,
    Exhausted,
    Failed,
}

/// Transient per-run position. Created at scrape start, mutated on each
/// page transition, discarded when the scrape ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// 1-based page number.
    pub page: u32,
    pub last_count: usize,
    pub terminal: bool,
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            page: 1,
            last_count: 0,
            terminal: false,
        }
    }

    pub fn record_page(&mut self, count: usize) {
        self.last_count = count;
    }

    pub fn advance(&mut self) {
        self.page += 1;
    }

    pub fn finish(&mut self) {
        self.terminal = true;
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PaginationController {
    session: Arc<dyn BrowserSession>,
    extractor: BidExtractor,
    config: ScraperConfig,
    screenshots: Screenshots,
}

impl PaginationController {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        extractor: BidExtractor,
        config: ScraperConfig,
        screenshots: Screenshots,
    ) -> Self {
        Self {
            session,
            extractor,
            config,
            screenshots,
        }
    }

    /// Scan every result page, extracting each card and admitting records
    /// through the date window. Terminates in `Exhausted` (normal end or
    /// page cap) or `Failed` with the underlying error; a mid-scan portal
    /// failure is never reported as a completed scan.
    pub async fn collect(&self, window: &DateWindow, max_pages: Option<u32>) -> Result<BidSheet> {
        let mut sheet = BidSheet::new();
        let mut cursor = PageCursor::new();

        loop {
            match self.step(&mut cursor, &mut sheet, window, max_pages).await {
                Ok(ScanState::Scanning) => {}
                Ok(terminal) => {
                    cursor.finish();
                    debug!("scan reached {terminal:?} on page {}", cursor.page);
                    break;
                }
                Err(e) => {
                    cursor.finish();
                    debug!(
                        "scan reached {:?} on page {}: {e}",
                        ScanState::Failed,
                        cursor.page
                    );
                    return Err(e);
                }
            }
        }

        info!(
            "scan finished after {} page(s), {} bid(s) collected",
            cursor.page,
            sheet.len()
        );
        Ok(sheet)
    }

    /// Process the current page and either advance to the next one
    /// (`Scanning`) or report the terminal state.
    async fn step(
        &self,
        cursor: &mut PageCursor,
        sheet: &mut BidSheet,
        window: &DateWindow,
        max_pages: Option<u32>,
    ) -> Result<ScanState> {
        let card = Locator::css(RESULT_CARD);

        match wait_for(
            self.session.as_ref(),
            &card,
            self.config.cards_timeout(),
            self.config.poll_interval(),
        )
        .await
        {
            Ok(_) => {}
            Err(SessionError::Timeout { .. }) => {
                info!("no result cards on page {}, ending scan", cursor.page);
                return Ok(ScanState::Exhausted);
            }
            Err(e) => return Err(e.into()),
        }

        let cards = self.session.find_all(&card).await?;
        cursor.record_page(cards.len());
        debug!("page {}: {} result cards", cursor.page, cursor.last_count);

        for element in &cards {
            if let Some(record) = self.extractor.extract(element.as_ref()).await {
                if window.contains(record.start_date_ts) {
                    sheet.push(record);
                } else {
                    debug!("bid {} outside requested window, skipped", record.bid_number);
                }
            }
        }

        if max_pages.is_some_and(|cap| cursor.page >= cap) {
            info!("page cap of {} reached, ending scan", cursor.page);
            return Ok(ScanState::Exhausted);
        }

        match self.session.find(&Locator::css(NEXT_PAGE_CONTROL)).await? {
            None => {
                info!("no next-page control after page {}, ending scan", cursor.page);
                Ok(ScanState::Exhausted)
            }
            Some(next) => {
                next.click().await?;
                cursor.advance();
                debug!("navigating to page {}", cursor.page);
                self.await_page_turn(cursor).await?;
                Ok(ScanState::Scanning)
            }
        }
    }

    /// After a pagination click, wait for either the next page's cards or
    /// the portal's error banner.
    async fn await_page_turn(&self, cursor: &PageCursor) -> Result<()> {
        let card = Locator::css(RESULT_CARD);
        let banner = Locator::css(ERROR_BANNER);

        let (matched, element) = match wait_for_any(
            self.session.as_ref(),
            &[&banner, &card],
            self.config.page_turn_timeout(),
            self.config.poll_interval(),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.screenshots
                    .capture(self.session.as_ref(), "pagination")
                    .await;
                return Err(e.into());
            }
        };

        if matched == 0 {
            let text = element.text().await.unwrap_or_default();
            if text.contains(SERVER_FAILURE_PHRASE) {
                self.screenshots
                    .capture(self.session.as_ref(), "pagination")
                    .await;
                return Err(ScrapeError::Portal {
                    phase: ScrapePhase::Paging,
                    page: cursor.page,
                    message: text.trim().to_string(),
                });
            }
            warn!(
                "ignoring unrecognized banner on page {}: {}",
                cursor.page,
                text.trim()
            );
        }
        Ok(())
    }
}
