//! Browser session over pre-captured HTML.
//!
//! Pages are registered by URL and parsed with `scraper`. Anchors navigate to
//! their resolved `href` when clicked and pressing Enter in an input submits
//! its enclosing form as a GET request, so a saved set of result pages can be
//! walked the same way a live site is. Scripts are not evaluated.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::{BrowserError, BrowserResult, BrowserSession, Element, PageElement, SessionLauncher};

const BLANK_URL: &str = "about:blank";
const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

/// Canonical form used as the page key, so `https://a.b` and `https://a.b/` agree.
fn normalize_url(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

fn parse_selector(selector: &str) -> BrowserResult<Selector> {
    Selector::parse(selector).map_err(|e| BrowserError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// All elements of a document in document order; an element's position here
/// is its stable handle.
fn elements(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.root_element().descendants().filter_map(ElementRef::wrap)
}

fn ordinals_of<'a>(doc: &'a Html, matched: impl Iterator<Item = ElementRef<'a>>) -> Vec<usize> {
    let ids: Vec<_> = matched.map(|e| e.id()).collect();
    elements(doc)
        .enumerate()
        .filter(|(_, e)| ids.contains(&e.id()))
        .map(|(i, _)| i)
        .collect()
}

fn self_and_ancestors(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::successors(Some(el), |e| e.parent().and_then(ElementRef::wrap))
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    let value = el.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    if value.name() == "input"
        && value
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let style = style.replace(' ', "").to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

/// Whitespace-collapsed text, approximating `innerText`.
fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

struct LoadedPage {
    url: String,
    doc: Rc<Html>,
    /// Values typed into inputs, by element position.
    typed: HashMap<usize, String>,
}

impl LoadedPage {
    fn new(url: String, html: &str) -> Self {
        Self {
            url,
            doc: Rc::new(Html::parse_document(html)),
            typed: HashMap::new(),
        }
    }
}

struct SnapshotState {
    pages: RefCell<HashMap<String, String>>,
    current: RefCell<LoadedPage>,
    visited: RefCell<Vec<String>>,
    /// Fail navigation to unregistered URLs instead of loading a blank page.
    strict: Cell<bool>,
    launches: Cell<usize>,
    shutdowns: Cell<usize>,
}

impl SnapshotState {
    fn new() -> Self {
        Self {
            pages: RefCell::new(HashMap::new()),
            current: RefCell::new(LoadedPage::new(BLANK_URL.to_string(), BLANK_PAGE)),
            visited: RefCell::new(Vec::new()),
            strict: Cell::new(false),
            launches: Cell::new(0),
            shutdowns: Cell::new(0),
        }
    }

    fn navigate(&self, url: &str) -> BrowserResult<()> {
        let url = normalize_url(url);
        self.visited.borrow_mut().push(url.clone());

        let html = self.pages.borrow().get(&url).cloned();
        let page = match html {
            Some(html) => LoadedPage::new(url, &html),
            None if self.strict.get() => {
                return Err(BrowserError::Navigation {
                    url,
                    reason: "no snapshot registered for this URL".to_string(),
                })
            }
            None => {
                debug!("No snapshot for {}, loading blank page", url);
                LoadedPage::new(url, BLANK_PAGE)
            }
        };

        *self.current.borrow_mut() = page;
        Ok(())
    }

    fn current_doc(&self) -> Rc<Html> {
        Rc::clone(&self.current.borrow().doc)
    }

    fn current_url(&self) -> String {
        self.current.borrow().url.clone()
    }

    fn element_handles(self: &Rc<Self>, doc: &Rc<Html>, ordinals: Vec<usize>) -> Vec<Element> {
        ordinals
            .into_iter()
            .map(|ordinal| {
                Box::new(SnapshotElement {
                    state: Rc::clone(self),
                    doc: Rc::clone(doc),
                    ordinal,
                }) as Element
            })
            .collect()
    }
}

/// Hands out sessions that share one set of registered pages.
///
/// Clones share state, so a test can keep a launcher to inspect visited URLs
/// and shutdown calls after the scraper consumed its session.
#[derive(Clone)]
pub struct SnapshotLauncher {
    state: Rc<SnapshotState>,
}

impl Default for SnapshotLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotLauncher {
    pub fn new() -> Self {
        Self {
            state: Rc::new(SnapshotState::new()),
        }
    }

    /// Register `html` as the content served for `url`.
    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.add_page(url, html);
        self
    }

    pub fn add_page(&self, url: &str, html: impl Into<String>) {
        self.state
            .pages
            .borrow_mut()
            .insert(normalize_url(url), html.into());
    }

    /// Make navigation to unregistered URLs fail.
    pub fn strict(self) -> Self {
        self.state.strict.set(true);
        self
    }

    /// Every URL navigated to, in order, normalized.
    pub fn visited(&self) -> Vec<String> {
        self.state.visited.borrow().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.state.launches.get()
    }

    pub fn shutdown_count(&self) -> usize {
        self.state.shutdowns.get()
    }
}

#[async_trait(?Send)]
impl SessionLauncher for SnapshotLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        self.state.launches.set(self.state.launches.get() + 1);
        Ok(Box::new(SnapshotSession {
            state: Rc::clone(&self.state),
        }))
    }
}

/// A session whose current page is one parsed HTML document.
pub struct SnapshotSession {
    state: Rc<SnapshotState>,
}

impl SnapshotSession {
    /// Session with a single page already loaded.
    pub fn from_html(url: &str, html: &str) -> Self {
        let state = SnapshotState::new();
        *state.current.borrow_mut() = LoadedPage::new(normalize_url(url), html);
        Self {
            state: Rc::new(state),
        }
    }
}

#[async_trait(?Send)]
impl BrowserSession for SnapshotSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.state.navigate(url)
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.state.current_url())
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        let selector = parse_selector(selector)?;
        let doc = self.state.current_doc();
        let ordinals = ordinals_of(&doc, doc.select(&selector));
        Ok(self.state.element_handles(&doc, ordinals))
    }

    async fn execute_script(&self, script: &str) -> BrowserResult<serde_json::Value> {
        debug!("Snapshot session ignores script ({} bytes)", script.len());
        Ok(serde_json::Value::Null)
    }

    async fn shutdown(&mut self) -> BrowserResult<()> {
        self.state.shutdowns.set(self.state.shutdowns.get() + 1);
        Ok(())
    }

    fn abandon(&mut self) {
        debug!("Snapshot session abandoned");
        self.state.shutdowns.set(self.state.shutdowns.get() + 1);
    }
}

struct SnapshotElement {
    state: Rc<SnapshotState>,
    doc: Rc<Html>,
    ordinal: usize,
}

impl SnapshotElement {
    fn element(&self) -> BrowserResult<ElementRef<'_>> {
        elements(&self.doc)
            .nth(self.ordinal)
            .ok_or_else(|| BrowserError::Protocol("element is no longer attached".to_string()))
    }

    fn with_element<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> BrowserResult<T> {
        Ok(f(self.element()?))
    }

    fn is_on_current_page(&self) -> bool {
        Rc::ptr_eq(&self.doc, &self.state.current.borrow().doc)
    }

    fn typed_value(&self) -> Option<String> {
        if !self.is_on_current_page() {
            return None;
        }
        self.state.current.borrow().typed.get(&self.ordinal).cloned()
    }

    fn edit_typed(&self, f: impl FnOnce(&mut String)) {
        if self.is_on_current_page() {
            let mut current = self.state.current.borrow_mut();
            f(current.typed.entry(self.ordinal).or_default());
        }
    }

    /// Resolve `target` against the URL of the page this element belongs to.
    fn resolve(&self, target: &str) -> Option<String> {
        let base = self.state.current_url();
        Url::parse(&base)
            .and_then(|b| b.join(target))
            .or_else(|_| Url::parse(target))
            .ok()
            .map(|u| u.to_string())
    }

    /// `href` of this element or its nearest enclosing anchor.
    fn link_target(&self) -> BrowserResult<Option<String>> {
        self.with_element(|el| {
            self_and_ancestors(el)
                .find(|e| e.value().name() == "a")
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty() && !href.starts_with('#'))
                .filter(|href| !href.starts_with("javascript:"))
                .map(str::to_string)
        })
    }

    fn follow_link(&self) -> BrowserResult<()> {
        if let Some(href) = self.link_target()? {
            if let Some(url) = self.resolve(&href) {
                return self.state.navigate(&url);
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl PageElement for SnapshotElement {
    async fn text(&self) -> BrowserResult<String> {
        self.with_element(collapsed_text)
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        if name == "value" {
            if let Some(typed) = self.typed_value() {
                return Ok(Some(typed));
            }
        }
        self.with_element(|el| el.value().attr(name).map(str::to_string))
    }

    async fn parent_attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        self.with_element(|el| {
            el.parent()
                .and_then(ElementRef::wrap)
                .and_then(|p| p.value().attr(name))
                .map(str::to_string)
        })
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        let selector = parse_selector(selector)?;
        let ordinals = ordinals_of(&self.doc, self.element()?.select(&selector));
        Ok(self.state.element_handles(&self.doc, ordinals))
    }

    async fn is_visible(&self) -> BrowserResult<bool> {
        self.with_element(|el| !self_and_ancestors(el).any(is_hidden))
    }

    async fn scroll_into_view(&self) -> BrowserResult<()> {
        Ok(())
    }

    async fn click(&self) -> BrowserResult<()> {
        self.follow_link()
    }

    async fn dom_click(&self) -> BrowserResult<()> {
        self.follow_link()
    }

    async fn clear(&self) -> BrowserResult<()> {
        self.edit_typed(String::clear);
        Ok(())
    }

    async fn type_text(&self, text: &str) -> BrowserResult<()> {
        self.edit_typed(|value| value.push_str(text));
        Ok(())
    }

    async fn press_enter(&self) -> BrowserResult<()> {
        let form = self.with_element(|el| {
            let field = el.value().attr("name").unwrap_or("q").to_string();
            let initial = el.value().attr("value").unwrap_or_default().to_string();
            self_and_ancestors(el)
                .find(|e| e.value().name() == "form")
                .map(|f| (f.value().attr("action").map(str::to_string), field, initial))
        })?;

        let Some((action, field, initial)) = form else {
            debug!("Enter pressed outside a form, nothing to submit");
            return Ok(());
        };

        let target = match action.filter(|a| !a.trim().is_empty()) {
            Some(action) => self.resolve(&action),
            None => Some(self.state.current_url()),
        };
        let Some(mut url) = target.and_then(|t| Url::parse(&t).ok()) else {
            return Err(BrowserError::Navigation {
                url: self.state.current_url(),
                reason: "form action does not resolve to a URL".to_string(),
            });
        };

        let value = self.typed_value().unwrap_or(initial);
        url.query_pairs_mut().clear().append_pair(&field, &value);
        self.state.navigate(url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = r#"
        <html><body>
          <form action="/catalog/">
            <input type="search" name="q" placeholder="Search in Daraz">
          </form>
          <a id="deals" href="/deals/">Deals</a>
          <div style="display: none"><a id="ghost" href="/ghost/">Ghost</a></div>
        </body></html>
    "#;

    fn launcher() -> SnapshotLauncher {
        SnapshotLauncher::new()
            .with_page("https://shop.example.com", HOME)
            .with_page(
                "https://shop.example.com/deals/",
                "<html><body><h1>Deals</h1></body></html>",
            )
    }

    #[tokio::test]
    async fn test_navigate_normalizes_url() {
        let launcher = launcher();
        let session = launcher.launch().await.unwrap();
        session.navigate("https://shop.example.com").await.unwrap();

        assert_eq!(
            session.current_url().await.unwrap(),
            "https://shop.example.com/"
        );
        assert_eq!(session.find_all("form").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_url_loads_blank_page_unless_strict() {
        let session = launcher().launch().await.unwrap();
        session.navigate("https://shop.example.com/missing").await.unwrap();
        assert!(session.find_all("a").await.unwrap().is_empty());

        let strict = launcher().strict().launch().await.unwrap();
        let err = strict
            .navigate("https://shop.example.com/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Navigation { .. }));
    }

    #[tokio::test]
    async fn test_click_follows_relative_href() {
        let launcher = launcher();
        let session = launcher.launch().await.unwrap();
        session.navigate("https://shop.example.com/").await.unwrap();

        let links = session.find_all("#deals").await.unwrap();
        links[0].click().await.unwrap();

        assert_eq!(
            session.current_url().await.unwrap(),
            "https://shop.example.com/deals/"
        );
        let heading = session.find_all("h1").await.unwrap();
        assert_eq!(heading[0].text().await.unwrap(), "Deals");
    }

    #[tokio::test]
    async fn test_hidden_ancestor_makes_element_invisible() {
        let session = launcher().launch().await.unwrap();
        session.navigate("https://shop.example.com/").await.unwrap();

        let ghost = session.find_all("#ghost").await.unwrap();
        assert!(!ghost[0].is_visible().await.unwrap());
        let deals = session.find_all("#deals").await.unwrap();
        assert!(deals[0].is_visible().await.unwrap());
    }

    #[tokio::test]
    async fn test_enter_submits_enclosing_form() {
        let launcher = launcher();
        let session = launcher.launch().await.unwrap();
        session.navigate("https://shop.example.com/").await.unwrap();

        let input = session.find_all("input[type='search']").await.unwrap();
        input[0].clear().await.unwrap();
        input[0].type_text("face wash").await.unwrap();
        assert_eq!(
            input[0].attribute("value").await.unwrap().as_deref(),
            Some("face wash")
        );
        input[0].press_enter().await.unwrap();

        assert_eq!(
            session.current_url().await.unwrap(),
            "https://shop.example.com/catalog/?q=face+wash"
        );
    }

    #[tokio::test]
    async fn test_text_collapses_whitespace_across_children() {
        let session = SnapshotSession::from_html(
            "https://shop.example.com/item",
            "<div id='card'>  Rs.<span> 1,299 </span>\n <b>Sold</b> 5 </div>",
        );
        let card = session.find_all("#card").await.unwrap();
        assert_eq!(card[0].text().await.unwrap(), "Rs. 1,299 Sold 5");
    }

    #[tokio::test]
    async fn test_invalid_selector_is_reported() {
        let session = SnapshotSession::from_html("https://shop.example.com/", "<p></p>");
        let Err(err) = session.find_all("div[").await else {
            panic!("malformed selector was accepted");
        };
        assert!(matches!(err, BrowserError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_is_counted_on_launcher() {
        let launcher = launcher();
        let mut session = launcher.launch().await.unwrap();
        session.shutdown().await.unwrap();
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(launcher.shutdown_count(), 1);
    }
}
