//! Scripted fake of the tender portal for scenario tests.
//!
//! Pages are defined as card HTML and parsed with `scraper`, so field
//! extraction runs against the same markup shapes the real portal renders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use gembid::session::{
    BrowserSession, ElementHandle, Locator, PageElement, SessionError, SessionResult,
};

/// One result card, rendered to HTML the way the portal lays cards out.
#[derive(Debug, Clone)]
pub struct CardSpec {
    pub bid_no: Option<String>,
    pub href: Option<String>,
    pub items: Option<String>,
    pub quantity: Option<String>,
    pub department: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl CardSpec {
    pub fn new(bid_no: &str, start_date: &str) -> Self {
        Self {
            bid_no: Some(bid_no.to_string()),
            href: Some(format!("/showbidDocument/{}", bid_no.replace('/', "-"))),
            items: Some("Office Chairs".to_string()),
            quantity: Some("120".to_string()),
            department: Some("Department of School Education".to_string()),
            start_date: Some(start_date.to_string()),
            end_date: Some("28-02-2024 03:00 PM".to_string()),
        }
    }

    pub fn without_date(mut self) -> Self {
        self.start_date = None;
        self
    }

    pub fn without_items(mut self) -> Self {
        self.items = None;
        self
    }

    fn html(&self) -> String {
        let mut parts = vec![r#"<div class="card">"#.to_string()];
        if let (Some(bid_no), Some(href)) = (&self.bid_no, &self.href) {
            parts.push(format!(
                r#"<div class="block"><a class="bid_no_hover" href="{href}">{bid_no}</a></div>"#
            ));
        }
        if let Some(items) = &self.items {
            parts.push(format!(
                r#"<div class="block"><div><strong>Items:</strong><a>{items}</a></div></div>"#
            ));
        }
        if let Some(quantity) = &self.quantity {
            parts.push(format!(
                r#"<div class="block"><div><strong>Quantity:</strong> {quantity}</div></div>"#
            ));
        }
        if let Some(department) = &self.department {
            parts.push(format!(
                r#"<div class="block"><div><strong>Department Name And Address:</strong></div><div>{department}</div></div>"#
            ));
        }
        if let Some(start) = &self.start_date {
            parts.push(format!(r#"<div class="start_date">{start}</div>"#));
        }
        if let Some(end) = &self.end_date {
            parts.push(format!(r#"<div class="end_date">{end}</div>"#));
        }
        parts.push("</div>".to_string());
        parts.join("")
    }
}

#[derive(Debug)]
pub struct PortalState {
    pages: Vec<Vec<String>>,
    state_options: Vec<String>,
    layout_ready: bool,
    has_search_control: bool,
    no_records: bool,
    banner: Option<(usize, String)>,

    pub searched: bool,
    pub selected_state: Option<String>,
    pub select_attempts: u32,
    pub current_page: usize,
    pub navigations: u32,
    pub scripts: Vec<String>,
    pub screenshots: Vec<PathBuf>,
}

impl PortalState {
    fn banner_active(&self) -> bool {
        self.searched
            && self
                .banner
                .as_ref()
                .is_some_and(|(page, _)| *page == self.current_page)
    }

    fn cards_visible(&self) -> bool {
        self.searched && !self.no_records && !self.banner_active()
    }

    fn current_cards(&self) -> &[String] {
        if !self.cards_visible() {
            return &[];
        }
        self.pages
            .get(self.current_page - 1)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Clone)]
pub struct FakePortal {
    state: Arc<Mutex<PortalState>>,
}

impl FakePortal {
    pub fn with_pages(pages: Vec<Vec<CardSpec>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| page.iter().map(CardSpec::html).collect())
            .collect();
        Self {
            state: Arc::new(Mutex::new(PortalState {
                pages,
                state_options: vec![
                    "ANDHRA PRADESH".to_string(),
                    "KARNATAKA".to_string(),
                    "TAMIL NADU".to_string(),
                ],
                layout_ready: true,
                has_search_control: true,
                no_records: false,
                banner: None,
                searched: false,
                selected_state: None,
                select_attempts: 0,
                current_page: 1,
                navigations: 0,
                scripts: Vec::new(),
                screenshots: Vec::new(),
            })),
        }
    }

    pub fn no_records() -> Self {
        let portal = Self::with_pages(Vec::new());
        portal.state.lock().unwrap().no_records = true;
        portal
    }

    pub fn never_ready(self) -> Self {
        self.state.lock().unwrap().layout_ready = false;
        self
    }

    pub fn without_search_control(self) -> Self {
        self.state.lock().unwrap().has_search_control = false;
        self
    }

    pub fn with_banner_on_page(self, page: usize, text: &str) -> Self {
        self.state.lock().unwrap().banner = Some((page, text.to_string()));
        self
    }

    pub fn with_state_options(self, options: &[&str]) -> Self {
        self.state.lock().unwrap().state_options =
            options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn session(&self) -> Arc<dyn BrowserSession> {
        Arc::new(self.clone())
    }

    pub fn state(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap()
    }

    fn control(&self, kind: ControlKind) -> ElementHandle {
        Box::new(FakeControl {
            state: Arc::clone(&self.state),
            kind,
        })
    }
}

#[async_trait]
impl BrowserSession for FakePortal {
    async fn navigate(&self, _url: &str) -> SessionResult<()> {
        self.state.lock().unwrap().navigations += 1;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> SessionResult<Option<ElementHandle>> {
        let expr = locator.expr();
        let state = self.state.lock().unwrap();
        let found: Option<ElementHandle> = if expr.contains("nav-tabs") {
            state.layout_ready.then(|| self.control(ControlKind::Inert))
        } else if expr.contains("location-tab") {
            state.layout_ready.then(|| self.control(ControlKind::LocationTab))
        } else if expr.contains("state_name_con") {
            state.layout_ready.then(|| self.control(ControlKind::StateDropdown))
        } else if expr.contains("searchBid") {
            state.has_search_control.then(|| self.control(ControlKind::SearchControl))
        } else if expr.contains("no-record") || expr.contains("alert-info") {
            (state.searched && state.no_records).then(|| self.control(ControlKind::Inert))
        } else if expr.contains("alert-danger") {
            state.banner_active().then(|| {
                let text = state.banner.as_ref().map(|(_, t)| t.clone()).unwrap_or_default();
                self.control(ControlKind::Banner(text))
            })
        } else if expr.contains("a.next") {
            (state.cards_visible() && state.current_page < state.pages.len())
                .then(|| self.control(ControlKind::NextPage))
        } else if expr == ".card" {
            state
                .current_cards()
                .first()
                .map(|html| Box::new(HtmlCard { html: html.clone() }) as ElementHandle)
        } else {
            None
        };
        Ok(found)
    }

    async fn find_all(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        if locator.expr() != ".card" {
            return Ok(Vec::new());
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .current_cards()
            .iter()
            .map(|html| Box::new(HtmlCard { html: html.clone() }) as ElementHandle)
            .collect())
    }

    async fn execute_script(&self, code: &str) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        state.scripts.push(code.to_string());
        if code.contains("searchBid") {
            state.searched = true;
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> SessionResult<()> {
        self.state.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }
}

enum ControlKind {
    Inert,
    LocationTab,
    StateDropdown,
    SearchControl,
    NextPage,
    Banner(String),
}

struct FakeControl {
    state: Arc<Mutex<PortalState>>,
    kind: ControlKind,
}

#[async_trait]
impl PageElement for FakeControl {
    async fn text(&self) -> SessionResult<String> {
        Ok(match &self.kind {
            ControlKind::Banner(text) => text.clone(),
            _ => String::new(),
        })
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
        let mut state = self.state.lock().unwrap();
        match self.kind {
            ControlKind::SearchControl => state.searched = true,
            ControlKind::NextPage => state.current_page += 1,
            _ => {}
        }
        Ok(())
    }

    async fn select_by_label(&self, label: &str) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        state.select_attempts += 1;
        if state.state_options.iter().any(|option| option == label) {
            state.selected_state = Some(label.to_string());
            Ok(())
        } else {
            Err(SessionError::OptionNotFound {
                label: label.to_string(),
            })
        }
    }
}

/// A detached card backed by parsed HTML.
struct HtmlCard {
    html: String,
}

impl HtmlCard {
    fn with_doc<T>(&self, f: impl FnOnce(&Html) -> T) -> T {
        let doc = Html::parse_fragment(&self.html);
        f(&doc)
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Resolve the handful of relative XPath shapes the engine uses against a
/// parsed fragment: label-strong plus sibling, parent, or parent's sibling.
fn xpath_text(doc: &Html, xpath: &str) -> Option<String> {
    let strong_selector = Selector::parse("strong").ok()?;
    let label = xpath.split('\'').nth(1)?;
    let strong = doc
        .select(&strong_selector)
        .find(|el| element_text(*el).contains(label))?;

    if xpath.contains("following-sibling::a") {
        let sibling = strong
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a")?;
        return Some(element_text(sibling));
    }
    let parent = ElementRef::wrap(strong.parent()?)?;
    if xpath.contains("../following-sibling::div") {
        let sibling = parent
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "div")?;
        return Some(element_text(sibling));
    }
    // ".//strong[...]/.." form: the labelled container itself.
    Some(element_text(parent))
}

#[async_trait]
impl PageElement for HtmlCard {
    async fn text(&self) -> SessionResult<String> {
        Ok(self.with_doc(|doc| {
            doc.root_element().text().collect::<Vec<_>>().join(" ")
        }))
    }

    async fn attribute(&self, _name: &str) -> SessionResult<Option<String>> {
        Ok(None)
    }

    async fn text_of(&self, locator: &Locator) -> SessionResult<Option<String>> {
        Ok(self.with_doc(|doc| match locator {
            Locator::Css(selector) => {
                let parsed = Selector::parse(selector).ok()?;
                doc.select(&parsed).next().map(element_text)
            }
            Locator::XPath(xpath) => xpath_text(doc, xpath),
        }))
    }

    async fn attribute_of(
        &self,
        locator: &Locator,
        name: &str,
    ) -> SessionResult<Option<String>> {
        Ok(self.with_doc(|doc| match locator {
            Locator::Css(selector) => {
                let parsed = Selector::parse(selector).ok()?;
                doc.select(&parsed)
                    .next()
                    .and_then(|el| el.value().attr(name))
                    .map(str::to_string)
            }
            Locator::XPath(_) => None,
        }))
    }

    async fn click(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn select_by_label(&self, _label: &str) -> SessionResult<()> {
        Ok(())
    }
}
