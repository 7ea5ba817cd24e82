//! Chromium over CDP.
//!
//! One [`Browser`] process serves the whole run; every [`BrowserPage`] lives
//! in its own incognito browser context so cookies and storage never leak
//! between cases.

use crate::config::SuiteConfig;
use crate::driver::{ElementInfo, PageDriver, PageFactory};
use crate::locator::{js_string, Selector};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Browser instance with a live CDP connection
#[derive(Debug)]
pub struct Browser {
    inner: Arc<Mutex<CdpBrowser>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Browser {
    /// Launch Chromium with the suite's browser settings
    pub async fn launch(config: &SuiteConfig) -> ProbeResult<Self> {
        let settings = &config.browser;
        let mut builder = CdpConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .request_timeout(config.timeouts.navigation());

        if !settings.headless {
            builder = builder.with_head();
        }
        if !settings.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = settings.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(|message| {
            if settings.chromium_path.is_none() {
                tracing::error!(%message, "no chromium executable found");
                ProbeError::BrowserNotFound
            } else {
                ProbeError::BrowserLaunchError { message }
            }
        })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "cdp handler stopped");
                    break;
                }
            }
        });

        tracing::info!(headless = settings.headless, "browser launched");
        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handle,
        })
    }

    /// Close the browser process
    pub async fn shutdown(self) -> ProbeResult<()> {
        {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| ProbeError::page(format!("close browser: {e}")))?;
            if let Err(e) = browser.wait().await {
                tracing::warn!(error = %e, "browser process did not exit cleanly");
            }
        }
        self.handle.abort();
        Ok(())
    }
}

#[async_trait]
impl PageFactory for Browser {
    type Page = BrowserPage;

    async fn open(&self) -> ProbeResult<Self::Page> {
        let mut browser = self.inner.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| ProbeError::page(format!("create browser context: {e}")))?;
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(ProbeError::page)?;
        let page = browser
            .new_page(params)
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;
        Ok(BrowserPage {
            page,
            context: Some(context),
        })
    }

    async fn close(&self, page: Self::Page) -> ProbeResult<()> {
        let BrowserPage { page, context } = page;
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "page already closed");
        }
        if let Some(context) = context {
            let browser = self.inner.lock().await;
            browser
                .dispose_browser_context(context)
                .await
                .map_err(|e| ProbeError::page(format!("dispose browser context: {e}")))?;
        }
        Ok(())
    }
}

/// A page in its own browser context
#[derive(Debug)]
pub struct BrowserPage {
    page: CdpPage,
    context: Option<BrowserContextId>,
}

impl BrowserPage {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> ProbeResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| ProbeError::page(e.to_string()))
    }

    async fn act(&self, selector: &Selector, body: &str) -> ProbeResult<()> {
        let _: bool = self.eval(selector.to_action_script(body)).await?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for BrowserPage {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(url, "navigated");
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn resolve(&self, selector: &Selector) -> ProbeResult<Vec<ElementInfo>> {
        self.eval(selector.to_describe_query()).await
    }

    async fn fill(&mut self, selector: &Selector, value: &str) -> ProbeResult<()> {
        let body = format!(
            "el.focus(); \
             const proto = el instanceof HTMLTextAreaElement \
               ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
             Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {}); \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            js_string(value)
        );
        self.act(selector, &body).await
    }

    async fn click(&mut self, selector: &Selector) -> ProbeResult<()> {
        self.act(
            selector,
            "el.scrollIntoView({ block: 'center' }); el.focus(); el.click();",
        )
        .await
    }

    async fn blur(&mut self, selector: &Selector) -> ProbeResult<()> {
        self.act(selector, "if (document.activeElement !== el) { el.focus(); } el.blur();")
            .await
    }
}
