use async_trait::async_trait;
use storefront_common::protocol::ElementSnapshot;

pub use storefront_common::error::DriverError;
pub use storefront_common::protocol::NavigationResult;

/// The Driver trait is the unified interface every browser integration implements.
///
/// Each call suspends until the browser has finished the operation. A driver
/// owns exactly one page; callers must not interleave operations from two
/// tasks on the same driver.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Launch the driver (start browser, open a WebDriver session, etc.)
    async fn launch(&mut self) -> Result<(), DriverError>;

    /// Close the driver and cleanup resources.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Check if the driver is ready to accept commands.
    async fn is_ready(&self) -> bool;

    /// Navigate to a specific URL. Resolves after the load event.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError>;

    /// Navigate back in browser history.
    async fn go_back(&mut self) -> Result<NavigationResult, DriverError>;

    /// Suspend until the current document reports it is fully loaded.
    async fn wait_for_load(&mut self) -> Result<(), DriverError>;

    /// Snapshot every element matching a CSS selector, in document order.
    /// No matches is an empty vector, not an error.
    async fn query(&mut self, selector: &str) -> Result<Vec<ElementSnapshot>, DriverError>;

    /// Click the `index`-th element matching `selector`.
    async fn click(&mut self, selector: &str, index: usize) -> Result<(), DriverError>;

    /// Title of the current document.
    async fn title(&mut self) -> Result<String, DriverError>;

    /// URL of the current document.
    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Capture a screenshot of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::NotSupported("screenshot".into()))
    }

    /// Whether any element matching `selector` is visible.
    async fn is_visible(&mut self, selector: &str) -> Result<bool, DriverError> {
        Ok(self.query(selector).await?.iter().any(|el| el.visible))
    }

    /// Number of elements matching `selector`.
    async fn count(&mut self, selector: &str) -> Result<usize, DriverError> {
        Ok(self.query(selector).await?.len())
    }
}

/// Lets a driver chosen at runtime back a `StorefrontSession`.
#[async_trait]
impl<T: Driver + ?Sized> Driver for Box<T> {
    async fn launch(&mut self) -> Result<(), DriverError> {
        (**self).launch().await
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        (**self).close().await
    }

    async fn is_ready(&self) -> bool {
        (**self).is_ready().await
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        (**self).navigate(url).await
    }

    async fn go_back(&mut self) -> Result<NavigationResult, DriverError> {
        (**self).go_back().await
    }

    async fn wait_for_load(&mut self) -> Result<(), DriverError> {
        (**self).wait_for_load().await
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementSnapshot>, DriverError> {
        (**self).query(selector).await
    }

    async fn click(&mut self, selector: &str, index: usize) -> Result<(), DriverError> {
        (**self).click(selector, index).await
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        (**self).title().await
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        (**self).current_url().await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        (**self).screenshot().await
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool, DriverError> {
        (**self).is_visible(selector).await
    }

    async fn count(&mut self, selector: &str) -> Result<usize, DriverError> {
        (**self).count(selector).await
    }
}
