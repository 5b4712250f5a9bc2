use crate::catalog::{CategoryEnumerator, ProductEnumerator};
use crate::config::schema::StorefrontConfig;
use crate::driver::{Driver, DriverError, NavigationResult};
use crate::random::RandomSource;
use crate::search::SearchController;
use crate::stock::StockProber;
use storefront_common::protocol::ProductStockReport;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No categories found under '{0}'")]
    NoCategories(String),

    #[error("No products found under '{0}'")]
    NoProducts(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// A browsing session against one storefront page.
pub struct StorefrontSession<D: Driver> {
    driver: D,
    config: StorefrontConfig,
    categories: CategoryEnumerator,
    products: ProductEnumerator,
    prober: StockProber,
}

impl<D: Driver> StorefrontSession<D> {
    pub fn new(driver: D, config: StorefrontConfig) -> Self {
        Self {
            categories: CategoryEnumerator::from_config(&config),
            products: ProductEnumerator::from_config(&config),
            prober: StockProber::from_config(&config),
            driver,
            config,
        }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub async fn open_home(&mut self) -> Result<NavigationResult, SessionError> {
        let res = self.driver.navigate(&self.config.app.base_url).await?;
        info!("Opened storefront home: {}", res.url);
        Ok(res)
    }

    /// Open a product detail page directly.
    pub async fn open_product(&mut self, url: &str) -> Result<NavigationResult, SessionError> {
        Ok(self.driver.navigate(url).await?)
    }

    /// Open a random category from the category navigation and return its name.
    pub async fn navigate_to_random_category(
        &mut self,
        random: &mut dyn RandomSource,
    ) -> Result<String, SessionError> {
        let categories = self.categories.list_categories(&mut self.driver).await?;
        let category = CategoryEnumerator::select_random(&categories, random)
            .map_err(|_| SessionError::NoCategories(self.categories.selector().to_string()))?;
        self.categories.open(&mut self.driver, category).await?;
        info!("Navigated to category: {}", category.name);
        Ok(category.name.clone())
    }

    /// Open a random product from the current listing and return its name.
    pub async fn select_random_product(
        &mut self,
        random: &mut dyn RandomSource,
    ) -> Result<String, SessionError> {
        let products = self.products.list_products(&mut self.driver).await?;
        let product = ProductEnumerator::select_random(&products, random)
            .map_err(|_| SessionError::NoProducts(self.products.selector().to_string()))?;
        self.products.open(&mut self.driver, product).await?;
        info!("Opened product: {}", product.name);
        Ok(product.name.clone())
    }

    /// Stock details of the product currently on screen.
    pub async fn check_current_product_stock(&mut self) -> ProductStockReport {
        self.prober.report(&mut self.driver).await
    }

    /// A bounded search sharing this session's page.
    pub fn search<'a>(&'a mut self, random: &'a mut dyn RandomSource) -> SearchController<'a, D> {
        SearchController::new(&mut self.driver, &self.config, random)
    }
}
