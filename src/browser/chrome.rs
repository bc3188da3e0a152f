//! Chrome session driven over the DevTools protocol (chromiumoxide).

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::binary::find_chrome;
use super::stealth::{LAUNCH_ARGS, STEALTH_SCRIPTS, WINDOW_SIZE};
use super::{BrowserError, BrowserResult, BrowserSession, Element, PageElement, SessionLauncher};
use crate::config::{BrowserEngineConfig, BrowserEngineType};

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        BrowserError::Protocol(e.to_string())
    }
}

const IS_VISIBLE_FN: &str = r#"function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return style.display !== 'none'
        && style.visibility !== 'hidden'
        && (rect.width > 0 || rect.height > 0);
}"#;

const DOM_CLICK_FN: &str = "function() { this.click(); return true; }";

const CLEAR_FN: &str = r#"function() {
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
    return true;
}"#;

/// Launches or attaches to Chrome according to [`BrowserEngineConfig`].
pub struct ChromeLauncher {
    config: BrowserEngineConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        })
    }

    async fn launch_local(&self) -> BrowserResult<(Browser, JoinHandle<()>)> {
        info!("Launching browser (headless={})", self.config.headless);

        let chrome_path = find_chrome(self.config.chrome_path.as_deref())?;
        let (width, height) = WINDOW_SIZE;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(width, height);

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        builder = builder.arg(format!("--window-size={},{}", width, height));

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        Ok((browser, Self::spawn_handler(handler)))
    }

    async fn connect_remote(&self, url: &str) -> BrowserResult<(Browser, JoinHandle<()>)> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, self.config.timeout
        );

        // DevTools advertises the browser socket at /json/version
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| BrowserError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| BrowserError::Launch(format!("bad version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BrowserError::Launch("No webSocketDebuggerUrl in response".into()))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.timeout),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        Ok((browser, Self::spawn_handler(handler)))
    }
}

#[async_trait(?Send)]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let (mut browser, handler) = match self.config.remote_url.as_deref() {
            Some(url) => self.connect_remote(url).await?,
            None => self.launch_local().await?,
        };

        let page = match open_page(&browser, &self.config.user_agent).await {
            Ok(page) => page,
            Err(e) => {
                if !self.config.is_remote() {
                    let _ = browser.close().await;
                }
                handler.abort();
                return Err(BrowserError::Launch(e.to_string()));
            }
        };

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            page,
            handler: Some(handler),
            remote: self.config.is_remote(),
            stealth: self.config.engine == BrowserEngineType::Stealth,
            page_load_timeout: Duration::from_secs(self.config.timeout),
        }))
    }
}

async fn open_page(browser: &Browser, user_agent: &str) -> Result<Page, CdpError> {
    let page = browser.new_page("about:blank").await?;
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await?;
    Ok(page)
}

/// One Chrome tab. Local sessions own the browser process.
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Page,
    /// `None` once released.
    handler: Option<JoinHandle<()>>,
    remote: bool,
    stealth: bool,
    page_load_timeout: Duration,
}

impl ChromeSession {
    async fn apply_stealth(&self) {
        for script in STEALTH_SCRIPTS {
            if let Err(e) = self.page.evaluate(script.to_string()).await {
                debug!("Stealth script injection skipped: {}", e);
            }
        }
    }
}

#[async_trait(?Send)]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        debug!("Navigating to {}", url);
        tokio::time::timeout(self.page_load_timeout, self.page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout {
                what: format!("page load of {}", url),
                secs: self.page_load_timeout.as_secs(),
            })?
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if self.stealth {
            self.apply_stealth().await;
        }
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        let found = self.page.find_elements(selector).await?;
        Ok(found
            .into_iter()
            .map(|inner| Box::new(ChromeElement { inner }) as Element)
            .collect())
    }

    async fn execute_script(&self, script: &str) -> BrowserResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn shutdown(&mut self) -> BrowserResult<()> {
        if let Err(e) = self.page.clone().close().await {
            debug!("Closing tab failed: {}", e);
        }

        let mut result = Ok(());
        if let Some(mut browser) = self.browser.take() {
            if !self.remote {
                if let Err(e) = browser.close().await {
                    warn!("Browser close failed: {}", e);
                    result = Err(BrowserError::from(e));
                }
                if let Err(e) = browser.wait().await {
                    debug!("Waiting for browser exit failed: {}", e);
                }
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        result
    }

    fn abandon(&mut self) {
        let Some(handler) = self.handler.take() else {
            return;
        };
        let page = self.page.clone();
        let browser = self.browser.take();
        let remote = self.remote;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!("Closing abandoned tab failed: {}", e);
                    }
                    if let Some(mut browser) = browser {
                        if !remote {
                            let _ = browser.close().await;
                            let _ = browser.wait().await;
                        }
                    }
                    handler.abort();
                });
            }
            Err(_) => {
                warn!("No runtime to close the abandoned tab; dropping the connection");
                handler.abort();
            }
        }
    }
}

struct ChromeElement {
    inner: chromiumoxide::Element,
}

impl ChromeElement {
    async fn call(&self, function: &str) -> BrowserResult<serde_json::Value> {
        let returns = self
            .inner
            .call_js_fn(function, false)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait(?Send)]
impl PageElement for ChromeElement {
    async fn text(&self) -> BrowserResult<String> {
        Ok(self.inner.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        Ok(self.inner.attribute(name).await?)
    }

    async fn parent_attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        let function = format!(
            "function() {{ const p = this.parentElement; return p ? p.getAttribute({}) : null; }}",
            serde_json::Value::String(name.to_string())
        );
        Ok(self.call(&function).await?.as_str().map(str::to_string))
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        let found = self.inner.find_elements(selector).await?;
        Ok(found
            .into_iter()
            .map(|inner| Box::new(ChromeElement { inner }) as Element)
            .collect())
    }

    async fn is_visible(&self) -> BrowserResult<bool> {
        Ok(self.call(IS_VISIBLE_FN).await?.as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(&self) -> BrowserResult<()> {
        self.inner.scroll_into_view().await?;
        Ok(())
    }

    async fn click(&self) -> BrowserResult<()> {
        self.inner.click().await?;
        Ok(())
    }

    async fn dom_click(&self) -> BrowserResult<()> {
        self.call(DOM_CLICK_FN).await?;
        Ok(())
    }

    async fn clear(&self) -> BrowserResult<()> {
        self.call(CLEAR_FN).await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> BrowserResult<()> {
        self.inner.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self) -> BrowserResult<()> {
        self.inner.press_key("Enter").await?;
        Ok(())
    }
}
