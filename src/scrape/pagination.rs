//! Advancing a result listing to its next page.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use super::cascade::{first_found, Attempt};
use crate::browser::{BrowserError, BrowserSession, PageElement};
use crate::config::{settle, SiteProfile, TimingConfig};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Existing page-number query parameter (`page=` or `p=`).
static PAGE_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&])(page|p)=(\d+)").expect("valid page param regex"));

/// How the next page was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceStrategy {
    /// Any anchor that reads like a "next" control.
    AffordanceScan,
    /// Known pagination markup from the site profile.
    SelectorCascade,
    /// Direct navigation to the URL with the page number bumped.
    UrlRewrite,
}

const ADVANCE_CASCADE: [AdvanceStrategy; 3] = [
    AdvanceStrategy::AffordanceScan,
    AdvanceStrategy::SelectorCascade,
    AdvanceStrategy::UrlRewrite,
];

/// URL of the page after `current_page`.
///
/// An existing `page`/`p` parameter is incremented in place. Otherwise
/// `page=<current_page + 1>` is appended ahead of any fragment. Returns `None`
/// for non-HTTP addresses.
pub fn next_page_url(url: &str, current_page: u32) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    if let Some(caps) = PAGE_PARAM_RE.captures(url) {
        let whole = caps.get(0)?;
        let next = caps[3].parse::<u64>().ok()?.checked_add(1)?;
        return Some(format!(
            "{}{}{}={}{}",
            &url[..whole.start()],
            &caps[1],
            &caps[2],
            next,
            &url[whole.end()..]
        ));
    }

    let (base, fragment) = url.split_at(url.find('#').unwrap_or(url.len()));
    let separator = if base.ends_with('?') || base.ends_with('&') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };
    Some(format!(
        "{}{}page={}{}",
        base,
        separator,
        current_page.saturating_add(1),
        fragment
    ))
}

fn mentions_next(value: &str) -> bool {
    value.to_lowercase().contains("next")
}

fn is_disabled(class: Option<&str>) -> bool {
    class.is_some_and(|c| c.to_lowercase().contains("disabled"))
}

/// Walks the pagination cascade on one session.
pub struct Paginator<'a> {
    session: &'a dyn BrowserSession,
    profile: &'a SiteProfile,
    timing: &'a TimingConfig,
}

impl<'a> Paginator<'a> {
    pub fn new(
        session: &'a dyn BrowserSession,
        profile: &'a SiteProfile,
        timing: &'a TimingConfig,
    ) -> Self {
        Self {
            session,
            profile,
            timing,
        }
    }

    /// Move from `current_page` to the next one.
    ///
    /// `Ok(None)` means no strategy could find a next page. Only a failed
    /// direct navigation is an error; lookup and click failures in the
    /// scanning strategies just move on to the next candidate.
    pub async fn advance(&self, current_page: u32) -> Result<Option<AdvanceStrategy>, BrowserError> {
        if let Err(e) = self.session.execute_script(SCROLL_TO_BOTTOM).await {
            debug!("Scroll to bottom failed: {}", e);
        }
        settle(self.timing.scroll_settle_ms).await;

        let outcome = first_found(&ADVANCE_CASCADE, |strategy| async move {
            let attempt = match strategy {
                AdvanceStrategy::AffordanceScan => self.affordance_scan().await,
                AdvanceStrategy::SelectorCascade => self.selector_cascade().await,
                AdvanceStrategy::UrlRewrite => self.url_rewrite(current_page).await,
            };
            attempt.map_found(|()| *strategy)
        })
        .await;

        let strategy = match outcome {
            Attempt::Found(strategy) => strategy,
            Attempt::Missing => return Ok(None),
            Attempt::Failed(e) => return Err(e),
        };
        info!("Advanced past page {} via {:?}", current_page, strategy);

        settle(self.timing.advance_settle_ms).await;
        let ready = self
            .session
            .wait_for_any(&self.profile.next_page_ready, self.timing.next_page_wait())
            .await
            .unwrap_or(false);
        if !ready {
            warn!(
                "Timed out after {}s waiting for page {} results",
                self.timing.next_page_timeout,
                current_page + 1
            );
        }

        Ok(Some(strategy))
    }

    async fn affordance_scan(&self) -> Attempt<()> {
        let anchors = match self.session.find_all("a").await {
            Ok(anchors) => anchors,
            Err(e) => {
                debug!("Anchor scan failed: {}", e);
                return Attempt::Missing;
            }
        };

        for anchor in &anchors {
            let text = anchor.text().await.unwrap_or_default();
            let label = anchor
                .attribute("aria-label")
                .await
                .ok()
                .flatten()
                .unwrap_or_default();
            if !(mentions_next(&text) || text.contains('>') || mentions_next(&label)) {
                continue;
            }

            let class = anchor.attribute("class").await.ok().flatten();
            if is_disabled(class.as_deref()) {
                debug!("Skipping disabled next control '{}'", text.trim());
                continue;
            }

            if self.try_click(anchor.as_ref()).await {
                return Attempt::Found(());
            }
        }
        Attempt::Missing
    }

    async fn selector_cascade(&self) -> Attempt<()> {
        for selector in &self.profile.next_selectors {
            let candidates = match self.session.find_all(selector).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    debug!("Next selector {} failed: {}", selector, e);
                    continue;
                }
            };

            for candidate in &candidates {
                let class = candidate.attribute("class").await.ok().flatten();
                let parent_class = candidate.parent_attribute("class").await.ok().flatten();
                if is_disabled(class.as_deref()) || is_disabled(parent_class.as_deref()) {
                    debug!("Next control from {} is disabled", selector);
                    continue;
                }

                if self.try_click(candidate.as_ref()).await {
                    debug!("Clicked next control matched by {}", selector);
                    return Attempt::Found(());
                }
            }
        }
        Attempt::Missing
    }

    async fn url_rewrite(&self, current_page: u32) -> Attempt<()> {
        let current = match self.session.current_url().await {
            Ok(url) => url,
            Err(e) => return Attempt::Failed(e),
        };
        let Some(next) = next_page_url(&current, current_page) else {
            debug!("Cannot derive a next-page URL from {}", current);
            return Attempt::Missing;
        };

        debug!("Navigating directly to {}", next);
        match self.session.navigate(&next).await {
            Ok(()) => Attempt::Found(()),
            Err(e) => Attempt::Failed(e),
        }
    }

    /// Click a visible control, falling back to a DOM-level click.
    async fn try_click(&self, control: &dyn PageElement) -> bool {
        if !control.is_visible().await.unwrap_or(false) {
            return false;
        }

        if let Err(e) = control.scroll_into_view().await {
            debug!("Scroll into view failed: {}", e);
        }
        settle(self.timing.scroll_settle_ms).await;

        match control.click().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Click failed ({}), trying DOM click", e);
                match control.dom_click().await {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("DOM click failed: {}", e);
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserResult, Element, SessionLauncher, SnapshotLauncher};
    use async_trait::async_trait;
    use std::cell::Cell;
    use std::rc::Rc;

    const LISTING: &str = "https://shop.example.com/catalog/?q=soap";

    #[test]
    fn test_increments_existing_page_param() {
        assert_eq!(
            next_page_url("https://shop.example.com/catalog/?q=soap&page=3", 3).as_deref(),
            Some("https://shop.example.com/catalog/?q=soap&page=4")
        );
        assert_eq!(
            next_page_url("https://shop.example.com/catalog/?p=9&q=soap", 1).as_deref(),
            Some("https://shop.example.com/catalog/?p=10&q=soap")
        );
    }

    #[test]
    fn test_appends_page_param() {
        assert_eq!(
            next_page_url("https://shop.example.com/catalog/", 1).as_deref(),
            Some("https://shop.example.com/catalog/?page=2")
        );
        assert_eq!(
            next_page_url(LISTING, 1).as_deref(),
            Some("https://shop.example.com/catalog/?q=soap&page=2")
        );
    }

    #[test]
    fn test_page_param_inserted_before_fragment() {
        assert_eq!(
            next_page_url("https://shop.example.com/catalog/?q=soap#top", 2).as_deref(),
            Some("https://shop.example.com/catalog/?q=soap&page=3#top")
        );
    }

    #[test]
    fn test_similar_param_names_are_not_page_numbers() {
        assert_eq!(
            next_page_url("https://shop.example.com/c/?pagesize=40", 1).as_deref(),
            Some("https://shop.example.com/c/?pagesize=40&page=2")
        );
    }

    #[test]
    fn test_non_http_urls_have_no_next_page() {
        assert_eq!(next_page_url("about:blank", 1), None);
        assert_eq!(next_page_url("", 1), None);
    }

    async fn advance_from(html: &str) -> (SnapshotLauncher, Option<AdvanceStrategy>) {
        let launcher = SnapshotLauncher::new().with_page(LISTING, html);
        let session = launcher.launch().await.unwrap();
        session.navigate(LISTING).await.unwrap();

        let profile = SiteProfile::default();
        let timing = TimingConfig::immediate();
        let result = Paginator::new(session.as_ref(), &profile, &timing)
            .advance(1)
            .await
            .unwrap();
        (launcher, result)
    }

    #[tokio::test]
    async fn test_affordance_scan_clicks_next_link() {
        let (launcher, result) = advance_from(
            r#"<ul class="pager">
                 <li><a href="/catalog/?q=soap&page=1">1</a></li>
                 <li><a href="/catalog/?q=soap&page=2">Next Page</a></li>
               </ul>"#,
        )
        .await;

        assert_eq!(result, Some(AdvanceStrategy::AffordanceScan));
        assert_eq!(
            launcher.visited().last().map(String::as_str),
            Some("https://shop.example.com/catalog/?q=soap&page=2")
        );
    }

    #[tokio::test]
    async fn test_affordance_scan_matches_aria_label() {
        let (launcher, result) = advance_from(
            r#"<a href="/catalog/?q=soap&page=1">1</a>
               <a aria-label="Next" href="/catalog/?q=soap&page=2">›</a>"#,
        )
        .await;

        assert_eq!(result, Some(AdvanceStrategy::AffordanceScan));
        assert_eq!(
            launcher.visited().last().map(String::as_str),
            Some("https://shop.example.com/catalog/?q=soap&page=2")
        );
    }

    #[tokio::test]
    async fn test_affordance_scan_matches_chevron_text() {
        let (launcher, result) =
            advance_from(r#"<a href="/catalog/?q=soap&page=2">&gt;</a>"#).await;

        assert_eq!(result, Some(AdvanceStrategy::AffordanceScan));
        assert_eq!(
            launcher.visited().last().map(String::as_str),
            Some("https://shop.example.com/catalog/?q=soap&page=2")
        );
    }

    /// "Next" anchor whose simulated click is intercepted by an overlay.
    struct OverlaidNext {
        dom_clicked: Rc<Cell<bool>>,
    }

    #[async_trait(?Send)]
    impl PageElement for OverlaidNext {
        async fn text(&self) -> BrowserResult<String> {
            Ok("Next".to_string())
        }
        async fn attribute(&self, _name: &str) -> BrowserResult<Option<String>> {
            Ok(None)
        }
        async fn parent_attribute(&self, _name: &str) -> BrowserResult<Option<String>> {
            Ok(None)
        }
        async fn find_all(&self, _selector: &str) -> BrowserResult<Vec<Element>> {
            Ok(Vec::new())
        }
        async fn is_visible(&self) -> BrowserResult<bool> {
            Ok(true)
        }
        async fn scroll_into_view(&self) -> BrowserResult<()> {
            Ok(())
        }
        async fn click(&self) -> BrowserResult<()> {
            Err(BrowserError::Protocol("element is not clickable at point".into()))
        }
        async fn dom_click(&self) -> BrowserResult<()> {
            self.dom_clicked.set(true);
            Ok(())
        }
        async fn clear(&self) -> BrowserResult<()> {
            Ok(())
        }
        async fn type_text(&self, _text: &str) -> BrowserResult<()> {
            Ok(())
        }
        async fn press_enter(&self) -> BrowserResult<()> {
            Ok(())
        }
    }

    struct OverlaidSession {
        dom_clicked: Rc<Cell<bool>>,
        navigations: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl BrowserSession for OverlaidSession {
        async fn navigate(&self, _url: &str) -> BrowserResult<()> {
            self.navigations.set(self.navigations.get() + 1);
            Ok(())
        }
        async fn current_url(&self) -> BrowserResult<String> {
            Ok(LISTING.to_string())
        }
        async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Element>> {
            if selector != "a" {
                return Ok(Vec::new());
            }
            Ok(vec![Box::new(OverlaidNext {
                dom_clicked: Rc::clone(&self.dom_clicked),
            }) as Element])
        }
        async fn execute_script(&self, _script: &str) -> BrowserResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
        async fn shutdown(&mut self) -> BrowserResult<()> {
            Ok(())
        }
        fn abandon(&mut self) {}
    }

    #[tokio::test]
    async fn test_failed_click_falls_back_to_dom_click() {
        let dom_clicked = Rc::new(Cell::new(false));
        let session = OverlaidSession {
            dom_clicked: Rc::clone(&dom_clicked),
            navigations: Cell::new(0),
        };
        let profile = SiteProfile::default();
        let timing = TimingConfig::immediate();

        let result = Paginator::new(&session, &profile, &timing)
            .advance(1)
            .await
            .unwrap();

        assert_eq!(result, Some(AdvanceStrategy::AffordanceScan));
        assert!(dom_clicked.get());
        assert_eq!(session.navigations.get(), 0);
    }

    #[tokio::test]
    async fn test_hidden_next_link_is_ignored() {
        let (_, result) = advance_from(
            r#"<a href="/catalog/?q=soap&page=2" style="display:none">Next</a>"#,
        )
        .await;
        assert_eq!(result, Some(AdvanceStrategy::UrlRewrite));
    }

    #[tokio::test]
    async fn test_selector_cascade_finds_icon_only_control() {
        let (launcher, result) = advance_from(
            r#"<ul class="ant-pagination">
                 <li class="ant-pagination-next"><a href="/catalog/?q=soap&page=2"><i class="icon"></i></a></li>
               </ul>"#,
        )
        .await;

        assert_eq!(result, Some(AdvanceStrategy::SelectorCascade));
        assert_eq!(
            launcher.visited().last().map(String::as_str),
            Some("https://shop.example.com/catalog/?q=soap&page=2")
        );
    }

    #[tokio::test]
    async fn test_disabled_next_falls_through_to_url_rewrite() {
        let (launcher, result) = advance_from(
            r#"<ul class="ant-pagination">
                 <li><a class="ant-pagination-next ant-pagination-disabled"
                        aria-label="next" href="/catalog/?q=soap&page=2">Next</a></li>
                 <li class="ant-pagination-next ant-pagination-disabled"><a href="/catalog/?q=soap&page=2"></a></li>
               </ul>"#,
        )
        .await;

        assert_eq!(result, Some(AdvanceStrategy::UrlRewrite));
        assert_eq!(
            launcher.visited().last().map(String::as_str),
            Some("https://shop.example.com/catalog/?q=soap&page=2")
        );
        assert_eq!(launcher.visited().len(), 2);
    }

    #[tokio::test]
    async fn test_no_next_page_on_blank_session() {
        let launcher = SnapshotLauncher::new();
        let session = launcher.launch().await.unwrap();
        let profile = SiteProfile::default();
        let timing = TimingConfig::immediate();

        let result = Paginator::new(session.as_ref(), &profile, &timing)
            .advance(1)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_failed_direct_navigation_is_an_error() {
        let launcher = SnapshotLauncher::new().with_page(LISTING, "<p>end</p>").strict();
        let session = launcher.launch().await.unwrap();
        session.navigate(LISTING).await.unwrap();
        let profile = SiteProfile::default();
        let timing = TimingConfig::immediate();

        let err = Paginator::new(session.as_ref(), &profile, &timing)
            .advance(1)
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Navigation { .. }));
    }
}
