use chrono::NaiveDateTime;
use serde::Serialize;

/// Placeholder recorded for any field that could not be extracted from a
/// result card. Matches what the portal's own UI shows for blank fields.
pub const SENTINEL: &str = "Not Found";

/// One procurement opportunity as shown on the portal's results list.
///
/// `start_date_ts` exists only so the date-window policy can compare
/// records; it is not part of the tabular output and is not required to
/// round-trip back to the raw `start_date` string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidRecord {
    pub bid_number: String,
    pub bid_url: String,
    pub items: String,
    pub quantity: String,
    pub department: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing)]
    pub start_date_ts: NaiveDateTime,
}

impl BidRecord {
    /// Column order of the tabular output.
    pub const HEADERS: [&'static str; 7] = [
        "bid_number",
        "bid_url",
        "items",
        "quantity",
        "department",
        "start_date",
        "end_date",
    ];

    pub fn to_row(&self) -> [&str; 7] {
        [
            &self.bid_number,
            &self.bid_url,
            &self.items,
            &self.quantity,
            &self.department,
            &self.start_date,
            &self.end_date,
        ]
    }
}
