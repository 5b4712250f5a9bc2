use crate::cdp::{CdpClient, LaunchOptions};
use crate::script::{self, PageState, READY_STATE};
use async_trait::async_trait;
use chromiumoxide::Page;
use std::time::Duration;
use storefront_engine::config::schema::StorefrontConfig;
use storefront_engine::driver::{Driver, DriverError, NavigationResult};
use storefront_engine::protocol::ElementSnapshot;
use tokio::time::Instant;
use tracing::{debug, info};

/// How long a click or `history.back()` gets to start a navigation before it
/// counts as an in-page action.
const NAVIGATION_START_GRACE: Duration = Duration::from_secs(2);

/// Chromium over the DevTools protocol.
pub struct HeadlessDriver {
    client: Option<CdpClient>,
    options: LaunchOptions,
    navigation_timeout: Duration,
    load_timeout: Duration,
    poll_interval: Duration,
    departures: u64,
    /// Token of a click or back navigation `wait_for_load` has not seen through.
    pending_departure: Option<u64>,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self::new_with_visibility(false)
    }

    pub fn new_with_visibility(visible: bool) -> Self {
        Self {
            client: None,
            options: LaunchOptions {
                visible,
                ..LaunchOptions::default()
            },
            navigation_timeout: Duration::from_secs(30),
            load_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            departures: 0,
            pending_departure: None,
        }
    }

    pub fn from_config(config: &StorefrontConfig) -> Self {
        let browser = &config.browser;
        let timeouts = &config.timeouts;
        Self {
            client: None,
            options: LaunchOptions {
                visible: !browser.headless,
                chrome_bin: browser.chrome_bin.clone(),
                window_size: (browser.viewport.width, browser.viewport.height),
            },
            navigation_timeout: Duration::from_millis(timeouts.navigation_ms),
            load_timeout: Duration::from_millis(timeouts.load_ms),
            poll_interval: Duration::from_millis(timeouts.poll_ms.max(1)),
            departures: 0,
            pending_departure: None,
        }
    }

    pub fn get_client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    fn page(&self) -> Result<&Page, DriverError> {
        let client = self.client.as_ref().ok_or(DriverError::NotReady)?;
        if !client.is_connected() {
            return Err(DriverError::ConnectionLost);
        }
        Ok(&client.page)
    }

    fn next_departure(&mut self) -> u64 {
        self.departures += 1;
        self.departures
    }

    /// Wait until the document tagged with `token` has been replaced. If no
    /// navigation starts within the grace period the action stayed in-page.
    async fn await_departure(
        page: &Page,
        token: u64,
        deadline: Instant,
        poll_interval: Duration,
    ) -> Result<(), DriverError> {
        let grace = (Instant::now() + NAVIGATION_START_GRACE).min(deadline);
        let expression = script::page_state_expression(token);
        let mut started = false;
        loop {
            match script::evaluate::<PageState>(page, &expression, None).await {
                Ok(state) if state.replaced => {
                    debug!("Document replaced, readyState is '{}'", state.ready_state);
                    return Ok(());
                }
                Ok(state) => started |= state.unloading,
                Err(e) => {
                    // Evaluation fails while the old context is torn down.
                    debug!("Page state unavailable: {}", e);
                    started = true;
                }
            }
            let now = Instant::now();
            if !started && now >= grace {
                debug!("No navigation followed departure {}", token);
                return Ok(());
            }
            if now >= deadline {
                return Err(DriverError::TimeoutWithContext {
                    operation: "wait_for_load".into(),
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn navigation_result(page: &Page) -> Result<NavigationResult, DriverError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult {
            url,
            title,
            status: 200,
        })
    }
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for HeadlessDriver {
    async fn launch(&mut self) -> Result<(), DriverError> {
        info!("Launching headless driver (Chromium)...");
        let client = CdpClient::launch(&self.options)
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DriverError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.is_connected())
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        let page = self.page()?;

        info!("Navigating to: {}", url);
        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Err(_) => {
                return Err(DriverError::TimeoutWithContext {
                    operation: format!("navigate to {}", url),
                });
            }
            Ok(Err(e)) => return Err(DriverError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }

        Self::navigation_result(page).await
    }

    async fn go_back(&mut self) -> Result<NavigationResult, DriverError> {
        let token = self.next_departure();
        let page = self.page()?;
        script::evaluate::<bool>(page, &script::history_back_expression(token), None)
            .await
            .map_err(|e| DriverError::Navigation(format!("go_back failed: {}", e)))?;
        self.pending_departure = Some(token);
        self.wait_for_load().await?;
        Self::navigation_result(self.page()?).await
    }

    async fn wait_for_load(&mut self) -> Result<(), DriverError> {
        let departure = self.pending_departure.take();
        let page = self.page()?;
        let deadline = Instant::now() + self.load_timeout;

        if let Some(token) = departure {
            Self::await_departure(page, token, deadline, self.poll_interval).await?;
        }

        loop {
            match script::evaluate::<String>(page, READY_STATE, None).await {
                Ok(state) if state == "complete" => return Ok(()),
                Ok(state) => debug!("readyState is {}, waiting", state),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("readyState unavailable: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(DriverError::TimeoutWithContext {
                    operation: "wait_for_load".into(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementSnapshot>, DriverError> {
        let page = self.page()?;
        let expression = script::query_expression(selector)?;
        script::evaluate(page, &expression, Some(selector)).await
    }

    async fn click(&mut self, selector: &str, index: usize) -> Result<(), DriverError> {
        let token = self.next_departure();
        let page = self.page()?;
        let expression = script::click_expression(selector, index, token)?;
        let clicked: bool = script::evaluate(page, &expression, Some(selector)).await?;
        if !clicked {
            return Err(DriverError::ElementNotFound {
                selector: selector.to_string(),
                index,
            });
        }
        self.pending_departure = Some(token);
        Ok(())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        let page = self.page()?;
        Ok(page
            .get_title()
            .await
            .map_err(|e| DriverError::ScriptError(e.to_string()))?
            .unwrap_or_default())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let page = self.page()?;
        Ok(page
            .url()
            .await
            .map_err(|e| DriverError::ScriptError(e.to_string()))?
            .unwrap_or_default())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let page = self.page()?;
        page.screenshot(chromiumoxide::page::ScreenshotParams::builder().build())
            .await
            .map_err(|e| DriverError::Other(format!("Screenshot failed: {}", e)))
    }
}
