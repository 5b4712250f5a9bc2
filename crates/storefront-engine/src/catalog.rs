//! Category and product enumeration over the live page.
//!
//! Handles are re-derived from the page on every call and never cached: the
//! listing structure is not assumed stable between loads.

use crate::config::schema::StorefrontConfig;
use crate::driver::{Driver, DriverError};
use crate::random::{RandomSource, SelectError, select_random};
use storefront_common::protocol::{CategoryHandle, ElementSnapshot, ProductHandle};
use tracing::{debug, warn};
use url::Url;

pub struct CategoryEnumerator {
    selector: String,
    exclude: Vec<String>,
    base_url: Option<Url>,
}

impl CategoryEnumerator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            exclude: Vec::new(),
            base_url: None,
        }
    }

    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self::new(config.selectors.categories.clone())
            .with_exclusions(config.selectors.category_exclude.clone())
            .with_base_url(&config.app.base_url)
    }

    /// Display names that never count as categories (compared case-insensitively).
    pub fn with_exclusions(mut self, names: Vec<String>) -> Self {
        self.exclude = names;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = parse_base(base_url);
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Every visible category link in scope. Empty when none qualify.
    pub async fn list_categories<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<Vec<CategoryHandle>, DriverError> {
        let snapshots = driver.query(&self.selector).await?;
        let categories: Vec<CategoryHandle> = named_entries(&snapshots, "category")
            .into_iter()
            .filter(|(name, _)| !self.is_excluded(name))
            .map(|(name, el)| CategoryHandle {
                name,
                target: resolve_href(self.base_url.as_ref(), el.href.as_deref()),
                index: el.index,
            })
            .collect();
        debug!("Found {} categories under '{}'", categories.len(), self.selector);
        Ok(categories)
    }

    pub fn select_random<'a>(
        categories: &'a [CategoryHandle],
        random: &mut dyn RandomSource,
    ) -> Result<&'a CategoryHandle, SelectError> {
        select_random(categories, random)
    }

    /// First category (in enumeration order) whose name contains `query`, ignoring case.
    pub fn select_by_name_contains<'a>(
        categories: &'a [CategoryHandle],
        query: &str,
    ) -> Option<&'a CategoryHandle> {
        let needle = query.trim().to_lowercase();
        categories
            .iter()
            .find(|c| c.name.to_lowercase().contains(&needle))
    }

    /// Open a category listing.
    pub async fn open<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        category: &CategoryHandle,
    ) -> Result<(), DriverError> {
        open_entry(driver, &self.selector, category.target.as_deref(), category.index).await
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e.eq_ignore_ascii_case(name))
    }
}

pub struct ProductEnumerator {
    selector: String,
    base_url: Option<Url>,
}

impl ProductEnumerator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            base_url: None,
        }
    }

    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self::new(config.selectors.products.clone()).with_base_url(&config.app.base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = parse_base(base_url);
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Every visible product entry on the current listing. Entries without a
    /// usable name are skipped with a warning.
    pub async fn list_products<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<Vec<ProductHandle>, DriverError> {
        let snapshots = driver.query(&self.selector).await?;
        let products: Vec<ProductHandle> = named_entries(&snapshots, "product")
            .into_iter()
            .map(|(name, el)| ProductHandle {
                name,
                target: resolve_href(self.base_url.as_ref(), el.href.as_deref()),
                index: el.index,
            })
            .collect();
        debug!("Found {} products under '{}'", products.len(), self.selector);
        Ok(products)
    }

    pub fn select_random<'a>(
        products: &'a [ProductHandle],
        random: &mut dyn RandomSource,
    ) -> Result<&'a ProductHandle, SelectError> {
        select_random(products, random)
    }

    /// Products in listing order, for exhaustive scans.
    pub fn iter_in_order(products: &[ProductHandle]) -> impl Iterator<Item = &ProductHandle> {
        let mut ordered: Vec<&ProductHandle> = products.iter().collect();
        ordered.sort_by_key(|p| p.index);
        ordered.into_iter()
    }

    /// Open a product detail view.
    pub async fn open<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        product: &ProductHandle,
    ) -> Result<(), DriverError> {
        open_entry(driver, &self.selector, product.target.as_deref(), product.index).await
    }
}

/// Visible entries paired with their display name.
fn named_entries<'a>(snapshots: &'a [ElementSnapshot], kind: &str) -> Vec<(String, &'a ElementSnapshot)> {
    snapshots
        .iter()
        .filter(|el| el.visible)
        .filter_map(|el| match el.display_text() {
            Some(name) => Some((name, el)),
            None => {
                warn!("Skipping {} entry {}: no display name", kind, el.index);
                None
            }
        })
        .collect()
}

async fn open_entry<D: Driver + ?Sized>(
    driver: &mut D,
    selector: &str,
    target: Option<&str>,
    index: usize,
) -> Result<(), DriverError> {
    match target {
        Some(url) => {
            driver.navigate(url).await?;
        }
        None => {
            driver.click(selector, index).await?;
            driver.wait_for_load().await?;
        }
    }
    Ok(())
}

fn parse_base(base_url: &str) -> Option<Url> {
    match Url::parse(base_url) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Invalid base URL {:?}: {}", base_url, e);
            None
        }
    }
}

/// Absolute navigation target for a link, or `None` when it must be clicked in place.
fn resolve_href(base: Option<&Url>, href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
        }
        Err(_) => None,
    }
}
