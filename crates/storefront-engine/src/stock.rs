//! Stock detection on a product detail view.
//!
//! Query errors degrade to `Indeterminate`, which the public `probe` resolves
//! to `InStock`. Only `probe_checked` lets a lost browser through as an error.

use crate::config::schema::{MarkerSpec, StorefrontConfig};
use crate::driver::{Driver, DriverError};
use storefront_common::protocol::{ElementSnapshot, ProductStockReport, StockStatus};
use tracing::{debug, info};

pub struct StockProber {
    out_of_stock: MarkerSpec,
    in_stock: MarkerSpec,
    product_title: String,
    add_to_cart: String,
}

impl StockProber {
    pub fn new(out_of_stock: MarkerSpec, in_stock: MarkerSpec) -> Self {
        Self {
            out_of_stock,
            in_stock,
            product_title: "h1".to_string(),
            add_to_cart: "a.cart".to_string(),
        }
    }

    pub fn from_config(config: &StorefrontConfig) -> Self {
        let selectors = &config.selectors;
        Self {
            out_of_stock: selectors.out_of_stock.clone(),
            in_stock: selectors.in_stock.clone(),
            product_title: selectors.product_title.clone(),
            add_to_cart: selectors.add_to_cart.clone(),
        }
    }

    /// Stock status with ambiguity preserved.
    pub async fn probe_raw<D: Driver + ?Sized>(&self, driver: &mut D) -> StockStatus {
        match self.classify(driver).await {
            Ok(status) => status,
            Err(e) => {
                debug!("Stock probe aborted: {}", e);
                StockStatus::Indeterminate
            }
        }
    }

    /// Stock status with the fail-open policy applied.
    // TODO: the fail-open default can hide broken marker selectors; log a
    // per-run count of Indeterminate probes so selector drift shows up.
    pub async fn probe<D: Driver + ?Sized>(&self, driver: &mut D) -> StockStatus {
        resolve(self.probe_raw(driver).await)
    }

    /// Like `probe`, but a fatal driver error (`is_fatal`) is returned instead
    /// of being read as a missing marker.
    pub async fn probe_checked<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<StockStatus, DriverError> {
        Ok(resolve(self.classify(driver).await?))
    }

    async fn classify<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<StockStatus, DriverError> {
        if marker_visible(driver, &self.out_of_stock).await? {
            return Ok(StockStatus::OutOfStock);
        }
        if marker_visible(driver, &self.in_stock).await? {
            return Ok(StockStatus::InStock);
        }
        Ok(StockStatus::Indeterminate)
    }

    /// Stock details of the product currently on screen.
    pub async fn report<D: Driver + ?Sized>(&self, driver: &mut D) -> ProductStockReport {
        let status = self.probe(driver).await;
        let product_name = match driver.query(&self.product_title).await {
            Ok(els) => els.iter().find_map(|el| el.display_text()),
            Err(e) => {
                debug!("Failed to read product title: {}", e);
                None
            }
        };
        let add_to_cart_enabled = !status.is_out_of_stock()
            && driver
                .is_visible(&self.add_to_cart)
                .await
                .unwrap_or(false);

        info!(
            "Product: {}, status: {}, add to cart enabled: {}",
            product_name.as_deref().unwrap_or("<unknown>"),
            status,
            add_to_cart_enabled
        );
        ProductStockReport {
            product_name,
            status,
            add_to_cart_enabled,
        }
    }
}

fn resolve(raw: StockStatus) -> StockStatus {
    if raw == StockStatus::Indeterminate {
        debug!("No stock marker visible; assuming in stock");
    }
    raw.fail_open()
}

/// Marker lookup that only errors when the driver itself is gone.
async fn marker_visible<D: Driver + ?Sized>(
    driver: &mut D,
    marker: &MarkerSpec,
) -> Result<bool, DriverError> {
    match query_marker(driver, marker).await {
        Ok(found) => Ok(found),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("Marker query '{}' failed: {}", marker.selector, e);
            Ok(false)
        }
    }
}

async fn query_marker<D: Driver + ?Sized>(
    driver: &mut D,
    marker: &MarkerSpec,
) -> Result<bool, DriverError> {
    let elements = driver.query(&marker.selector).await?;
    Ok(marker_matches(marker, &elements))
}

/// Whether any visible element carries the marker text.
pub fn marker_matches(marker: &MarkerSpec, elements: &[ElementSnapshot]) -> bool {
    let needle = marker.text.to_lowercase();
    elements.iter().filter(|el| el.visible).any(|el| {
        el.text
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&needle))
    })
}
