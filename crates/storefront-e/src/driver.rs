use crate::webdriver::{WebDriverClient, browser_capabilities};
use async_trait::async_trait;
use fantoccini::Locator;
use fantoccini::error::CmdError;
use serde_json::json;
use std::time::Duration;
use storefront_engine::config::schema::StorefrontConfig;
use storefront_engine::driver::{Driver, DriverError, NavigationResult};
use storefront_engine::protocol::ElementSnapshot;
use tokio::time::Instant;
use tracing::{debug, info};

/// Same snapshot shape the headless driver produces, via `arguments[0]`.
const SNAPSHOT_SCRIPT: &str = r#"
    const selector = arguments[0];
    return Array.from(document.querySelectorAll(selector)).map((el, index) => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        const visible = rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
        const text = (el.textContent || '').trim();
        const link = el.matches('a[href]') ? el : (el.closest('a[href]') || el.querySelector('a[href]'));
        return {
            index,
            text: text.length ? text : null,
            href: link ? link.getAttribute('href') : null,
            visible,
        };
    });
"#;

const READY_STATE_SCRIPT: &str = "return document.readyState;";

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Any W3C WebDriver endpoint (chromedriver, geckodriver, Selenium grid).
pub struct WebDriverDriver {
    client: Option<WebDriverClient>,
    webdriver_url: String,
    headless: bool,
    window_size: (u32, u32),
    navigation_timeout: Duration,
    load_timeout: Duration,
    poll_interval: Duration,
}

impl WebDriverDriver {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_WEBDRIVER_URL.to_string())
    }

    pub fn with_url(webdriver_url: String) -> Self {
        Self {
            client: None,
            webdriver_url,
            headless: true,
            window_size: (1280, 720),
            navigation_timeout: Duration::from_secs(30),
            load_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn from_config(config: &StorefrontConfig) -> Self {
        let browser = &config.browser;
        let timeouts = &config.timeouts;
        Self {
            client: None,
            webdriver_url: browser.webdriver_url.clone(),
            headless: browser.headless,
            window_size: (browser.viewport.width, browser.viewport.height),
            navigation_timeout: Duration::from_millis(timeouts.navigation_ms),
            load_timeout: Duration::from_millis(timeouts.load_ms),
            poll_interval: Duration::from_millis(timeouts.poll_ms.max(1)),
        }
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    fn client(&self) -> Result<&WebDriverClient, DriverError> {
        self.client.as_ref().ok_or(DriverError::NotReady)
    }

    async fn navigation_result(client: &WebDriverClient) -> Result<NavigationResult, DriverError> {
        let title = client.client.title().await.unwrap_or_default();
        let url = client
            .client
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(|e| map_cmd_error(e, DriverError::Navigation))?;

        Ok(NavigationResult {
            url,
            title,
            status: 200,
        })
    }
}

impl Default for WebDriverDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// A dropped session is fatal; anything else maps through `other`.
fn map_cmd_error(err: CmdError, other: fn(String) -> DriverError) -> DriverError {
    match err {
        CmdError::Lost(_) => DriverError::ConnectionLost,
        e => {
            let message = e.to_string();
            if message.contains("invalid session id") {
                DriverError::ConnectionLost
            } else {
                other(message)
            }
        }
    }
}

#[async_trait]
impl Driver for WebDriverDriver {
    async fn launch(&mut self) -> Result<(), DriverError> {
        info!("Connecting to WebDriver at {}...", self.webdriver_url);
        let client = WebDriverClient::connect(
            &self.webdriver_url,
            browser_capabilities(self.headless, self.window_size),
        )
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
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        let client = self.client()?;

        info!("Navigating to: {}", url);
        match tokio::time::timeout(self.navigation_timeout, client.client.goto(url)).await {
            Err(_) => {
                return Err(DriverError::TimeoutWithContext {
                    operation: format!("navigate to {}", url),
                });
            }
            Ok(result) => result.map_err(|e| map_cmd_error(e, DriverError::Navigation))?,
        }

        Self::navigation_result(client).await
    }

    async fn go_back(&mut self) -> Result<NavigationResult, DriverError> {
        let client = self.client()?;
        client
            .client
            .back()
            .await
            .map_err(|e| map_cmd_error(e, |m| DriverError::Navigation(format!("go_back failed: {}", m))))?;
        self.wait_for_load().await?;
        Self::navigation_result(self.client()?).await
    }

    async fn wait_for_load(&mut self) -> Result<(), DriverError> {
        let client = self.client()?;
        let deadline = Instant::now() + self.load_timeout;
        loop {
            match client.client.execute(READY_STATE_SCRIPT, vec![]).await {
                Ok(state) if state.as_str() == Some("complete") => return Ok(()),
                Ok(state) => debug!("readyState is {}, waiting", state),
                Err(CmdError::Lost(_)) => return Err(DriverError::ConnectionLost),
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
        let client = self.client()?;
        let value = client
            .client
            .execute(SNAPSHOT_SCRIPT, vec![json!(selector)])
            .await
            .map_err(|e| {
                let mapped = map_cmd_error(e, DriverError::ScriptError);
                match mapped {
                    DriverError::ScriptError(m) if m.contains("is not a valid selector") => {
                        DriverError::SelectorInvalid {
                            selector: selector.to_string(),
                        }
                    }
                    other => other,
                }
            })?;
        Ok(serde_json::from_value(value)?)
    }

    async fn click(&mut self, selector: &str, index: usize) -> Result<(), DriverError> {
        let client = self.client()?;
        let elements = client
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| map_cmd_error(e, DriverError::ScriptError))?;
        let element = elements
            .into_iter()
            .nth(index)
            .ok_or_else(|| DriverError::ElementNotFound {
                selector: selector.to_string(),
                index,
            })?;
        element
            .click()
            .await
            .map_err(|e| map_cmd_error(e, DriverError::ScriptError))
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        let client = self.client()?;
        client
            .client
            .title()
            .await
            .map_err(|e| map_cmd_error(e, DriverError::ScriptError))
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let client = self.client()?;
        client
            .client
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(|e| map_cmd_error(e, DriverError::ScriptError))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let client = self.client()?;
        client
            .client
            .screenshot()
            .await
            .map_err(|e| DriverError::Other(format!("Screenshot failed: {}", e)))
    }
}
