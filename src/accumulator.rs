//! Ordered collection of extracted records.

use crate::models::BidRecord;

/// Records in portal order: page order first, then in-page card order.
/// The sheet is tabular data for the caller to serialize; the engine never
/// writes a wire format itself.
#[derive(Debug, Clone, Default)]
pub struct BidSheet {
    records: Vec<BidRecord>,
}

impl BidSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BidRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[BidRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<BidRecord> {
        self.records
    }

    pub fn headers() -> &'static [&'static str] {
        &BidRecord::HEADERS
    }

    pub fn rows(&self) -> impl Iterator<Item = [&str; 7]> {
        self.records.iter().map(BidRecord::to_row)
    }
}
