//! `headless_chrome` implementation of the session capability traits.
//!
//! One `ChromeSession` owns one browser and one tab for the lifetime of a
//! scrape run. All clicks are dispatched as DOM clicks and all scoped field
//! reads go through small JS probes evaluated against the element, which is
//! the only way to express relative XPath lookups over CDP.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde_json::{json, Value};

use super::{
    BrowserSession, ElementHandle, Locator, PageElement, SessionError, SessionResult,
};
use crate::config::ScraperConfig;

pub struct ChromeSession {
    // Kept alive for the duration of the run; dropping it closes the tab.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a headless browser and open the single tab this session drives.
    pub fn launch(config: &ScraperConfig) -> SessionResult<Self> {
        let window_size = format!("--window-size={},{}", 1920, 1080);
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new(window_size.as_str()),
            ])
            .build()
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser =
            Browser::new(launch_options).map_err(|e| SessionError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| SessionError::Launch(e.to_string()))?;
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn wrap(&self, element: Element<'_>) -> ElementHandle {
        Box::new(ChromeElement {
            tab: Arc::clone(&self.tab),
            node_id: element.node_id,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| SessionError::Driver(format!("navigation to {url} failed: {e}")))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| SessionError::Driver(format!("page load of {url} failed: {e}")))?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> SessionResult<Option<ElementHandle>> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_element(selector).ok(),
            Locator::XPath(expression) => self.tab.find_element_by_xpath(expression).ok(),
        };
        Ok(found.map(|e| self.wrap(e)))
    }

    async fn find_all(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_elements(selector),
            Locator::XPath(expression) => self.tab.find_elements_by_xpath(expression),
        };
        // headless_chrome reports "no matches" as an error; an empty page is
        // an expected outcome here, not a failure.
        Ok(found
            .unwrap_or_default()
            .into_iter()
            .map(|e| self.wrap(e))
            .collect())
    }

    async fn execute_script(&self, code: &str) -> SessionResult<()> {
        self.tab
            .evaluate(code, false)
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> SessionResult<()> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| SessionError::Screenshot(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::Screenshot(e.to_string()))?;
        }
        std::fs::write(path, png).map_err(|e| SessionError::Screenshot(e.to_string()))?;
        Ok(())
    }
}

struct ChromeElement {
    tab: Arc<Tab>,
    node_id: u32,
}

impl ChromeElement {
    /// Re-resolve the node on every operation; the portal re-renders the
    /// results container and cached CDP handles go stale across renders.
    fn resolve(&self) -> SessionResult<Element<'_>> {
        Element::new(self.tab.as_ref(), self.node_id)
            .map_err(|e| SessionError::Stale(e.to_string()))
    }

    fn call_probe(&self, declaration: &str, args: Vec<Value>) -> SessionResult<Option<Value>> {
        let element = self.resolve()?;
        let result = element
            .call_js_fn(declaration, args, false)
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(result.value)
    }
}

/// A JS string literal with proper escaping.
fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Build a probe that resolves `locator` relative to `this` and evaluates
/// `expr` on the matched element (`el`), returning null when nothing matches.
fn probe_js(locator: &Locator, expr: &str) -> String {
    match locator {
        Locator::Css(selector) => format!(
            "function() {{ const el = this.querySelector({sel}); return el ? {expr} : null; }}",
            sel = js_str(selector),
        ),
        Locator::XPath(expression) => format!(
            "function() {{ \
               const el = document.evaluate({xp}, this, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue; \
               return el ? {expr} : null; \
             }}",
            xp = js_str(expression),
        ),
    }
}

const CLICK_JS: &str = "function() { this.click(); }";

const SELECT_BY_LABEL_JS: &str = "\
function(label) { \
  const want = String(label).trim(); \
  const options = Array.from(this.options || []); \
  const match = options.find(o => (o.textContent || '').trim() === want); \
  if (!match) { return false; } \
  this.value = match.value; \
  this.dispatchEvent(new Event('change', { bubbles: true })); \
  return true; \
}";

#[async_trait]
impl PageElement for ChromeElement {
    async fn text(&self) -> SessionResult<String> {
        self.resolve()?
            .get_inner_text()
            .map_err(|e| SessionError::Driver(e.to_string()))
    }

    async fn attribute(&self, name: &str) -> SessionResult<Option<String>> {
        let attributes = self
            .resolve()?
            .get_attributes()
            .map_err(|e| SessionError::Driver(e.to_string()))?;
        // CDP returns attributes as a flat [name, value, name, value, ...] list.
        Ok(attributes.and_then(|flat| {
            flat.chunks_exact(2)
                .find(|pair| pair[0] == name)
                .map(|pair| pair[1].clone())
        }))
    }

    async fn text_of(&self, locator: &Locator) -> SessionResult<Option<String>> {
        let probe = probe_js(locator, "el.textContent");
        Ok(match self.call_probe(&probe, Vec::new())? {
            Some(Value::String(text)) => Some(text),
            _ => None,
        })
    }

    async fn attribute_of(
        &self,
        locator: &Locator,
        name: &str,
    ) -> SessionResult<Option<String>> {
        let expr = format!("el.getAttribute({})", js_str(name));
        let probe = probe_js(locator, &expr);
        Ok(match self.call_probe(&probe, Vec::new())? {
            Some(Value::String(value)) => Some(value),
            _ => None,
        })
    }

    async fn click(&self) -> SessionResult<()> {
        self.call_probe(CLICK_JS, Vec::new())?;
        Ok(())
    }

    async fn select_by_label(&self, label: &str) -> SessionResult<()> {
        match self.call_probe(SELECT_BY_LABEL_JS, vec![json!(label)])? {
            Some(Value::Bool(true)) => Ok(()),
            _ => Err(SessionError::OptionNotFound {
                label: label.to_string(),
            }),
        }
    }
}
