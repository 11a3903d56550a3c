//! Turns one rendered result card into a `BidRecord`.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::models::{BidRecord, SENTINEL};
use crate::session::{Locator, PageElement};

const START_DATE: &str = ".start_date";
const END_DATE: &str = ".end_date";
const BID_LINK: &str = "a.bid_no_hover";
const ITEMS: &str = ".//strong[contains(text(), 'Items:')]/following-sibling::a";
const QUANTITY: &str = ".//strong[contains(text(), 'Quantity:')]/..";
const DEPARTMENT: &str =
    ".//strong[contains(text(), 'Department Name And Address:')]/../following-sibling::div";

pub struct BidExtractor {
    origin: Url,
    date_regex: Regex,
}

impl BidExtractor {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            date_regex: Regex::new(r"\d{2}-\d{2}-\d{4}(?: \d{1,2}:\d{2} [AP]M)?").unwrap(),
        }
    }

    /// Extract a record from one card, or `None` when the start date is
    /// absent or unparseable — malformed cards are expected noise, not
    /// errors. Every other field degrades independently to the sentinel;
    /// one layout surprise loses one field, never the record.
    pub async fn extract(&self, card: &dyn PageElement) -> Option<BidRecord> {
        let raw_start = match self.field(card, &Locator::css(START_DATE)).await {
            Some(text) => text,
            None => {
                warn!("dropping card without a start date element");
                return None;
            }
        };
        let (start_date, start_date_ts) = match self.parse_start_date(&raw_start) {
            Some(parsed) => parsed,
            None => {
                warn!("dropping card with unparseable start date: {raw_start:?}");
                return None;
            }
        };

        let bid_number = self
            .field(card, &Locator::css(BID_LINK))
            .await
            .unwrap_or_else(|| SENTINEL.to_string());
        let bid_url = self.bid_url(card).await;
        let items = self
            .field(card, &Locator::xpath(ITEMS))
            .await
            .unwrap_or_else(|| SENTINEL.to_string());
        let quantity = self
            .field(card, &Locator::xpath(QUANTITY))
            .await
            .map(|text| trailing_value(&text))
            .unwrap_or_else(|| SENTINEL.to_string());
        let department = self
            .field(card, &Locator::xpath(DEPARTMENT))
            .await
            .unwrap_or_else(|| SENTINEL.to_string());
        let end_date = self
            .field(card, &Locator::css(END_DATE))
            .await
            .unwrap_or_else(|| SENTINEL.to_string());

        Some(BidRecord {
            bid_number,
            bid_url,
            items,
            quantity,
            department,
            start_date,
            end_date,
            start_date_ts,
        })
    }

    /// Non-empty trimmed text of the first match, or `None`. Read failures
    /// count as absence so one bad field cannot abort the card.
    async fn field(&self, card: &dyn PageElement, locator: &Locator) -> Option<String> {
        match card.text_of(locator).await {
            Ok(Some(text)) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Ok(None) => None,
            Err(e) => {
                debug!("field read via {locator} failed: {e}");
                None
            }
        }
    }

    async fn bid_url(&self, card: &dyn PageElement) -> String {
        let href = match card
            .attribute_of(&Locator::css(BID_LINK), "href")
            .await
        {
            Ok(Some(href)) => href,
            Ok(None) => return SENTINEL.to_string(),
            Err(e) => {
                debug!("bid link read failed: {e}");
                return SENTINEL.to_string();
            }
        };
        match Url::parse(&href) {
            // Already absolute.
            Ok(absolute) => absolute.to_string(),
            Err(_) => match self.origin.join(&href) {
                Ok(joined) => joined.to_string(),
                Err(_) => SENTINEL.to_string(),
            },
        }
    }

    /// Pull the date token out of the raw element text (which may carry a
    /// label and trailing lines) and parse it. Time-of-day is optional.
    fn parse_start_date(&self, raw: &str) -> Option<(String, NaiveDateTime)> {
        let token = self.date_regex.find(raw)?.as_str().to_string();
        let ts = NaiveDateTime::parse_from_str(&token, "%d-%m-%Y %I:%M %p")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(&token, "%d-%m-%Y")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;
        Some((token, ts))
    }
}

/// "Quantity: 120" -> "120".
fn trailing_value(text: &str) -> String {
    text.rsplit(':').next().unwrap_or(text).trim().to_string()
}
