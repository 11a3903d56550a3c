use std::fmt;

use thiserror::Error;

use crate::session::SessionError;

/// Where in the scrape flow a portal-side failure was observed. Carried on
/// `ScrapeError::Portal` so a caller can tell "our bug" from "their outage".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapePhase {
    Loading,
    Filtering,
    Scanning,
    Paging,
}

impl fmt::Display for ScrapePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            ScrapePhase::Loading => "page load",
            ScrapePhase::Filtering => "filter application",
            ScrapePhase::Scanning => "result scan",
            ScrapePhase::Paging => "page transition",
        };
        f.write_str(phase)
    }
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The search page never reached a recognizable state.
    #[error("search page did not become ready: {0}")]
    Load(String),

    /// Facet interaction or selection failed. `retryable` is false when the
    /// requested facet value does not exist in the dropdown.
    #[error("filter application failed: {message}")]
    Filter { message: String, retryable: bool },

    /// The portal reported its own failure (recognized error banner).
    #[error("portal error during {phase} on page {page}: {message}")]
    Portal {
        phase: ScrapePhase,
        page: u32,
        message: String,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("invalid scrape request: {0}")]
    Request(String),
}

impl ScrapeError {
    /// Whether a bounded retry has any chance of succeeding. Portal errors
    /// and unrecognized facet values reproduce on retry; timeouts, stale
    /// references and driver errors may not.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Load(_) => true,
            ScrapeError::Filter { retryable, .. } => *retryable,
            ScrapeError::Portal { .. } => false,
            ScrapeError::Session(e) => e.is_transient(),
            ScrapeError::Request(_) => false,
        }
    }

    pub(crate) fn filter_timing(message: impl Into<String>) -> Self {
        ScrapeError::Filter {
            message: message.into(),
            retryable: true,
        }
    }

    pub(crate) fn filter_terminal(message: impl Into<String>) -> Self {
        ScrapeError::Filter {
            message: message.into(),
            retryable: false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
