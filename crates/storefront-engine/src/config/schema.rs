use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl StorefrontConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BASE_URL") {
            self.app.base_url = url;
        }
        if let Some(env) = lookup("STOREFRONT_ENV") {
            self.app.environment = env;
        }
        if let Some(headless) = lookup("HEADLESS") {
            self.browser.headless = is_truthy(&headless);
        }
        if let Some(width) = parse_var(&lookup, "VIEWPORT_WIDTH") {
            self.browser.viewport.width = width;
        }
        if let Some(height) = parse_var(&lookup, "VIEWPORT_HEIGHT") {
            self.browser.viewport.height = height;
        }
        if let Some(bin) = lookup("CHROME_BIN") {
            self.browser.chrome_bin = Some(bin);
        }
        if let Some(url) = lookup("WEBDRIVER_URL") {
            self.browser.webdriver_url = url;
        }
        if let Some(max) = parse_var(&lookup, "STOREFRONT_MAX_ATTEMPTS") {
            self.search.max_attempts = max;
        }
        if let Some(seed) = parse_var(&lookup, "STOREFRONT_SEED") {
            self.search.seed = Some(seed);
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            environment: default_environment(),
        }
    }
}

fn default_base_url() -> String {
    "https://automationteststore.com".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub chrome_bin: Option<String>,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            viewport: Viewport::default(),
            chrome_bin: None,
            webdriver_url: default_webdriver_url(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "default_load_ms")]
    pub load_ms: u64,
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            load_ms: default_load_ms(),
            poll_ms: default_poll_ms(),
        }
    }
}

fn default_navigation_ms() -> u64 {
    30000
}

fn default_load_ms() -> u64 {
    10000
}

fn default_poll_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Fixed seed for category/product choices. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            seed: None,
        }
    }
}

fn default_max_attempts() -> usize {
    10
}

/// A visible element under `selector` whose text contains `text` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub selector: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_categories")]
    pub categories: String,
    #[serde(default = "default_category_exclude")]
    pub category_exclude: Vec<String>,
    #[serde(default = "default_products")]
    pub products: String,
    #[serde(default = "default_product_title")]
    pub product_title: String,
    #[serde(default = "default_add_to_cart")]
    pub add_to_cart: String,
    #[serde(default = "default_out_of_stock")]
    pub out_of_stock: MarkerSpec,
    #[serde(default = "default_in_stock")]
    pub in_stock: MarkerSpec,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            category_exclude: default_category_exclude(),
            products: default_products(),
            product_title: default_product_title(),
            add_to_cart: default_add_to_cart(),
            out_of_stock: default_out_of_stock(),
            in_stock: default_in_stock(),
        }
    }
}

fn default_categories() -> String {
    "nav.subnav > ul > li > a".to_string()
}

fn default_category_exclude() -> Vec<String> {
    vec!["Home".to_string()]
}

fn default_products() -> String {
    // The storefront's own class name.
    ".thumbnails .prdocutname".to_string()
}

fn default_product_title() -> String {
    "h1".to_string()
}

fn default_add_to_cart() -> String {
    "a.cart".to_string()
}

fn default_out_of_stock() -> MarkerSpec {
    MarkerSpec {
        selector: ".nostock".to_string(),
        text: "Out of Stock".to_string(),
    }
}

fn default_in_stock() -> MarkerSpec {
    MarkerSpec {
        selector: ".product-stock".to_string(),
        text: "In Stock".to_string(),
    }
}
