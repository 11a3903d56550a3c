//! Capability interface over a rendering-automation session.
//!
//! The scrape engine never talks to an automation library directly; it is
//! driven through these traits so the browser backend stays swappable and
//! the engine stays testable against a scripted portal.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, Instant};

pub mod chrome;

pub use chrome::ChromeSession;

/// How an element is addressed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// The raw selector/expression text.
    pub fn expr(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{s}`"),
            Locator::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("element reference went stale: {0}")]
    Stale(String),

    #[error("browser driver error: {0}")]
    Driver(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("option '{label}' not present in dropdown")]
    OptionNotFound { label: String },

    #[error("screenshot capture failed: {0}")]
    Screenshot(String),

    #[error("failed to launch browser: {0}")]
    Launch(String),
}

impl SessionError {
    /// Transient category per the retry contract: timeouts, stale element
    /// references and driver hiccups. Script failures and missing dropdown
    /// options reproduce deterministically.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::Timeout { .. } | SessionError::Stale(_) | SessionError::Driver(_)
        )
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

pub type ElementHandle = Box<dyn PageElement>;

/// A controllable rendering session. One scrape run owns the session
/// exclusively for its entire duration.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    /// Element-or-none; `None` is an expected outcome, not an error.
    async fn find(&self, locator: &Locator) -> SessionResult<Option<ElementHandle>>;

    async fn find_all(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>>;

    /// Run a page-global script (e.g. invoking the portal's own search
    /// routine when its button cannot be clicked).
    async fn execute_script(&self, code: &str) -> SessionResult<()>;

    async fn screenshot(&self, path: &Path) -> SessionResult<()>;
}

/// A handle to one rendered element. Field probes are scoped to the element
/// so a result card can be read without touching the rest of the page.
#[async_trait]
pub trait PageElement: Send + Sync {
    async fn text(&self) -> SessionResult<String>;

    async fn attribute(&self, name: &str) -> SessionResult<Option<String>>;

    /// Text content of the first descendant matching `locator`, or `None`
    /// if no such descendant exists.
    async fn text_of(&self, locator: &Locator) -> SessionResult<Option<String>>;

    /// Attribute of the first descendant matching `locator`.
    async fn attribute_of(&self, locator: &Locator, name: &str)
        -> SessionResult<Option<String>>;

    /// Dispatch a DOM click on the node directly, bypassing hit-testing.
    /// Portal controls are frequently occluded by overlays, so synthetic
    /// pointer clicks are not reliable here.
    async fn click(&self) -> SessionResult<()>;

    /// Select an option from a `<select>` by its exact visible label and
    /// fire the change event the portal's JS listens for.
    async fn select_by_label(&self, label: &str) -> SessionResult<()>;
}

/// Interval between `find` probes while waiting on a condition.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Block until `locator` matches, polling the session at `poll` intervals.
/// Every wait in the engine is a bounded poll like this one; there are no
/// callbacks and no event loop to coordinate with.
pub async fn wait_for(
    session: &dyn BrowserSession,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> SessionResult<ElementHandle> {
    let started = Instant::now();
    loop {
        if let Some(element) = session.find(locator).await? {
            return Ok(element);
        }
        if started.elapsed() >= timeout {
            return Err(SessionError::Timeout {
                what: locator.to_string(),
                waited: started.elapsed(),
            });
        }
        sleep(poll).await;
    }
}

/// Block until any of `locators` matches; returns the index of the first
/// locator that matched and its element. Locators earlier in the slice win
/// when several match in the same probe round.
pub async fn wait_for_any(
    session: &dyn BrowserSession,
    locators: &[&Locator],
    timeout: Duration,
    poll: Duration,
) -> SessionResult<(usize, ElementHandle)> {
    let started = Instant::now();
    loop {
        for (index, locator) in locators.iter().enumerate() {
            if let Some(element) = session.find(locator).await? {
                return Ok((index, element));
            }
        }
        if started.elapsed() >= timeout {
            let described = locators
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(SessionError::Timeout {
                what: described,
                waited: started.elapsed(),
            });
        }
        sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullElement;

    #[async_trait]
    impl PageElement for NullElement {
        async fn text(&self) -> SessionResult<String> {
            Ok(String::new())
        }
        async fn attribute(&self, _name: &str) -> SessionResult<Option<String>> {
            Ok(None)
        }
        async fn text_of(&self, _locator: &Locator) -> SessionResult<Option<String>> {
            Ok(None)
        }
        async fn attribute_of(
            &self,
            _locator: &Locator,
            _name: &str,
        ) -> SessionResult<Option<String>> {
            Ok(None)
        }
        async fn click(&self) -> SessionResult<()> {
            Ok(())
        }
        async fn select_by_label(&self, _label: &str) -> SessionResult<()> {
            Ok(())
        }
    }

    /// Finds `.late` only from the nth probe onward.
    struct LateSession {
        appears_after: usize,
        probes: AtomicUsize,
    }

    #[async_trait]
    impl BrowserSession for LateSession {
        async fn navigate(&self, _url: &str) -> SessionResult<()> {
            Ok(())
        }
        async fn find(&self, locator: &Locator) -> SessionResult<Option<ElementHandle>> {
            let probe = self.probes.fetch_add(1, Ordering::SeqCst);
            if locator.expr() == ".late" && probe >= self.appears_after {
                Ok(Some(Box::new(NullElement)))
            } else {
                Ok(None)
            }
        }
        async fn find_all(&self, _locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
            Ok(Vec::new())
        }
        async fn execute_script(&self, _code: &str) -> SessionResult<()> {
            Ok(())
        }
        async fn screenshot(&self, _path: &Path) -> SessionResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_polls_until_present() {
        let session = LateSession {
            appears_after: 3,
            probes: AtomicUsize::new(0),
        };
        let found = wait_for(
            &session,
            &Locator::css(".late"),
            Duration::from_secs(5),
            Duration::from_millis(100),
        )
        .await;
        assert!(found.is_ok());
        assert!(session.probes.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let session = LateSession {
            appears_after: usize::MAX,
            probes: AtomicUsize::new(0),
        };
        let err = wait_for(
            &session,
            &Locator::css(".never"),
            Duration::from_millis(500),
            Duration::from_millis(100),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, SessionError::Timeout { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_any_reports_matching_index() {
        let session = LateSession {
            appears_after: 0,
            probes: AtomicUsize::new(0),
        };
        let first = Locator::css(".missing");
        let second = Locator::css(".late");
        let (index, _) = wait_for_any(
            &session,
            &[&first, &second],
            Duration::from_secs(1),
            Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css(".card").to_string(), "css `.card`");
        assert_eq!(
            Locator::xpath(".//strong").to_string(),
            "xpath `.//strong`"
        );
    }
}
