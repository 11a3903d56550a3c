use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, ScrapeError};

/// Caller-supplied configuration for one scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// Consignee state as it appears in the location facet, e.g.
    /// "ANDHRA PRADESH". Empty means "do not filter by location".
    pub state: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Hard cap on pages scanned; unbounded when absent.
    pub max_pages: Option<u32>,
}

impl ScrapeRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(end) = self.end_date {
            if self.start_date > end {
                return Err(ScrapeError::Request(format!(
                    "start date {} is after end date {}",
                    self.start_date, end
                )));
            }
        }
        if let Some(0) = self.max_pages {
            return Err(ScrapeError::Request("max_pages must be at least 1".into()));
        }
        Ok(())
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::from_bounds(self.start_date, self.end_date)
    }
}

/// Which records the date policy admits.
///
/// Result ordering by date is not a portal invariant, so both modes compare
/// every record independently; the scan never stops early on an old record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    /// Single-bound mode: admit records starting on or after the bound.
    After(NaiveDateTime),
    /// Window mode: admit records inside the closed interval. The upper
    /// bound covers its whole calendar day.
    Between(NaiveDateTime, NaiveDateTime),
}

impl DateWindow {
    pub fn from_bounds(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        let lower = start.and_hms_opt(0, 0, 0).unwrap_or_default();
        match end {
            Some(end) => {
                let upper = end.and_hms_opt(23, 59, 59).unwrap_or_default();
                DateWindow::Between(lower, upper)
            }
            None => DateWindow::After(lower),
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        match self {
            DateWindow::After(bound) => ts >= *bound,
            DateWindow::Between(lower, upper) => ts >= *lower && ts <= *upper,
        }
    }
}
