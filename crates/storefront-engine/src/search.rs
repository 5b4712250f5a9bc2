//! Bounded search for a product whose stock status satisfies a predicate.
//!
//! The random search is an explicit state machine:
//!
//! ```text
//! Init -> SelectCategory -> ScanProducts -> Matched
//!              ^                 |
//!              |                 v
//!              +---------- NextAttempt
//!
//! SelectCategory -> Exhausted   (attempt budget spent)
//! ```
//!
//! Attempts run strictly one after another against the same page. Failures
//! inside an attempt are logged and end that attempt only; the caller always
//! receives a `SearchResult` unless the browser itself becomes unusable.

use crate::catalog::{CategoryEnumerator, ProductEnumerator};
use crate::config::schema::StorefrontConfig;
use crate::driver::{Driver, DriverError};
use crate::random::RandomSource;
use crate::stock::StockProber;
use storefront_common::protocol::{CategoryHandle, ProductHandle, SearchResult, StockStatus};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Browser unusable during search: {0}")]
    Fatal(DriverError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Found,
    NoMatch,
    NoCategories,
    NoProducts,
    Error(String),
}

/// What one attempt did. Kept only for the duration of a search call.
#[derive(Debug, Clone)]
pub struct SearchAttempt {
    pub number: usize,
    pub category: Option<String>,
    pub products_examined: usize,
    pub outcome: AttemptOutcome,
}

#[derive(Debug)]
enum SearchState {
    Init,
    SelectCategory,
    ScanProducts(CategoryHandle),
    NextAttempt(AttemptOutcome),
    Matched { product: String, category: String },
    Exhausted,
}

/// Bookkeeping for one `find_matching_product` call.
struct SearchRun {
    attempt: usize,
    max_attempts: usize,
    category: Option<String>,
    examined: usize,
    history: Vec<SearchAttempt>,
}

impl SearchRun {
    fn new(max_attempts: usize) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            category: None,
            examined: 0,
            history: Vec::new(),
        }
    }

    fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.category = None;
        self.examined = 0;
    }

    fn finish_attempt(&mut self, outcome: AttemptOutcome) {
        self.history.push(SearchAttempt {
            number: self.attempt,
            category: self.category.take(),
            products_examined: self.examined,
            outcome,
        });
    }

    fn log_summary(&self) {
        for a in &self.history {
            debug!(
                "attempt {}: category={} examined={} outcome={:?}",
                a.number,
                a.category.as_deref().unwrap_or("-"),
                a.products_examined,
                a.outcome
            );
        }
    }
}

pub struct SearchController<'d, D: Driver + ?Sized> {
    driver: &'d mut D,
    random: &'d mut dyn RandomSource,
    categories: CategoryEnumerator,
    products: ProductEnumerator,
    prober: StockProber,
    home_url: String,
    max_attempts: usize,
}

impl<'d, D: Driver + ?Sized> SearchController<'d, D> {
    pub fn new(
        driver: &'d mut D,
        config: &StorefrontConfig,
        random: &'d mut dyn RandomSource,
    ) -> Self {
        Self {
            driver,
            random,
            categories: CategoryEnumerator::from_config(config),
            products: ProductEnumerator::from_config(config),
            prober: StockProber::from_config(config),
            home_url: config.app.base_url.clone(),
            max_attempts: config.search.max_attempts,
        }
    }

    /// Search random categories until a product satisfies `predicate` or
    /// `max_attempts` (default from config) attempts have been spent.
    pub async fn find_matching_product<P>(
        &mut self,
        predicate: P,
        max_attempts: Option<usize>,
    ) -> Result<SearchResult, SearchError>
    where
        P: Fn(StockStatus) -> bool,
    {
        let max_attempts = max_attempts.unwrap_or(self.max_attempts).max(1);
        let mut run = SearchRun::new(max_attempts);
        let mut state = SearchState::Init;

        loop {
            state = match state {
                SearchState::Init => {
                    info!("Starting search (max {} attempts)", max_attempts);
                    SearchState::SelectCategory
                }
                SearchState::SelectCategory => self.select_category(&mut run).await?,
                SearchState::ScanProducts(category) => {
                    self.scan_products(&mut run, category, &predicate).await?
                }
                SearchState::NextAttempt(outcome) => {
                    run.finish_attempt(outcome);
                    SearchState::SelectCategory
                }
                SearchState::Matched { product, category } => {
                    run.finish_attempt(AttemptOutcome::Found);
                    run.log_summary();
                    info!(
                        "Found matching product: {} in category: {} (attempt {})",
                        product, category, run.attempt
                    );
                    return Ok(SearchResult::found(product, category));
                }
                SearchState::Exhausted => {
                    run.log_summary();
                    warn!("No matching product found after {} attempts", max_attempts);
                    return Ok(SearchResult::exhausted(max_attempts));
                }
            };
        }
    }

    /// Search exactly one category, chosen by case-insensitive name match.
    /// No retries: a missing category is reported immediately.
    pub async fn find_matching_product_in_category<P>(
        &mut self,
        category_name: &str,
        predicate: P,
    ) -> Result<SearchResult, SearchError>
    where
        P: Fn(StockStatus) -> bool,
    {
        info!("Searching for matching product in category: {}", category_name);

        let categories = match self.categories.list_categories(&mut *self.driver).await {
            Ok(c) => c,
            Err(e) => return self.targeted_failure(category_name, e),
        };
        let Some(category) =
            CategoryEnumerator::select_by_name_contains(&categories, category_name).cloned()
        else {
            warn!("Category \"{}\" not found", category_name);
            return Ok(SearchResult::not_found_in(
                category_name,
                format!("Category \"{}\" not found", category_name),
            ));
        };

        if let Err(e) = self.categories.open(&mut *self.driver, &category).await {
            return self.targeted_failure(category_name, e);
        }
        info!("Navigated to category: {}", category.name);

        let products = match self.products.list_products(&mut *self.driver).await {
            Ok(p) => p,
            Err(e) => return self.targeted_failure(category_name, e),
        };
        if products.is_empty() {
            info!("No products found in category: {}", category_name);
            return Ok(SearchResult::not_found_in(
                category_name,
                format!("No products found in category: {}", category_name),
            ));
        }

        let mut examined = 0;
        match self.scan_listing(&products, &predicate, &mut examined).await {
            Ok(Some(product)) => {
                info!(
                    "Found matching product: {} in category: {}",
                    product.name, category.name
                );
                Ok(SearchResult::found(product.name, category.name))
            }
            Ok(None) => {
                info!(
                    "No matching products found in category: {} ({} examined)",
                    category_name, examined
                );
                Ok(SearchResult::not_found_in(
                    category_name,
                    format!("No matching products found in category: {}", category_name),
                ))
            }
            Err(e) => self.targeted_failure(category_name, e),
        }
    }

    async fn select_category(&mut self, run: &mut SearchRun) -> Result<SearchState, SearchError> {
        run.begin_attempt();
        if run.attempt > run.max_attempts {
            return Ok(SearchState::Exhausted);
        }
        info!(
            "Attempt {}/{}: searching for matching product",
            run.attempt, run.max_attempts
        );

        let categories = match self.categories.list_categories(&mut *self.driver).await {
            Ok(c) => c,
            Err(e) => return self.attempt_failed(run, e).await,
        };
        let category = match CategoryEnumerator::select_random(&categories, &mut *self.random) {
            Ok(c) => c.clone(),
            Err(_) => {
                info!(
                    "No categories under '{}', trying again",
                    self.categories.selector()
                );
                return Ok(SearchState::NextAttempt(AttemptOutcome::NoCategories));
            }
        };
        run.category = Some(category.name.clone());

        if let Err(e) = self.categories.open(&mut *self.driver, &category).await {
            return self.attempt_failed(run, e).await;
        }
        info!("Searching in category: {}", category.name);
        Ok(SearchState::ScanProducts(category))
    }

    async fn scan_products<P>(
        &mut self,
        run: &mut SearchRun,
        category: CategoryHandle,
        predicate: &P,
    ) -> Result<SearchState, SearchError>
    where
        P: Fn(StockStatus) -> bool,
    {
        let products = match self.products.list_products(&mut *self.driver).await {
            Ok(p) => p,
            Err(e) => return self.attempt_failed(run, e).await,
        };
        if products.is_empty() {
            info!(
                "No products found in category: {}, trying another category",
                category.name
            );
            return Ok(SearchState::NextAttempt(AttemptOutcome::NoProducts));
        }

        match self.scan_listing(&products, predicate, &mut run.examined).await {
            Ok(Some(product)) => Ok(SearchState::Matched {
                product: product.name,
                category: category.name,
            }),
            Ok(None) => {
                info!("No matching products found in category: {}", category.name);
                Ok(SearchState::NextAttempt(AttemptOutcome::NoMatch))
            }
            Err(e) => self.attempt_failed(run, e).await,
        }
    }

    /// Open each product of a listing snapshot in order until one matches.
    /// Returns to the listing between products.
    async fn scan_listing<P>(
        &mut self,
        products: &[ProductHandle],
        predicate: &P,
        examined: &mut usize,
    ) -> Result<Option<ProductHandle>, DriverError>
    where
        P: Fn(StockStatus) -> bool,
    {
        for product in ProductEnumerator::iter_in_order(products) {
            self.products.open(&mut *self.driver, product).await?;
            let status = self.prober.probe_checked(&mut *self.driver).await?;
            *examined += 1;
            debug!("Product {} ({}): {}", product.index, product.name, status);

            if predicate(status) {
                return Ok(Some(product.clone()));
            }

            self.driver.go_back().await?;
            self.driver.wait_for_load().await?;
        }
        Ok(None)
    }

    /// End the current attempt after an error, or abort the whole search
    /// when the browser is gone.
    async fn attempt_failed(
        &mut self,
        run: &SearchRun,
        err: DriverError,
    ) -> Result<SearchState, SearchError> {
        if err.is_fatal() {
            error!("Aborting search at attempt {}: {}", run.attempt, err);
            return Err(SearchError::Fatal(err));
        }
        error!(
            "Error during attempt {} (category: {}): {}",
            run.attempt,
            run.category.as_deref().unwrap_or("<none>"),
            err
        );
        self.recover().await?;
        Ok(SearchState::NextAttempt(AttemptOutcome::Error(err.to_string())))
    }

    /// Return to the storefront home page so the next attempt starts from a known view.
    async fn recover(&mut self) -> Result<(), SearchError> {
        match self.driver.navigate(&self.home_url).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => Err(SearchError::Fatal(e)),
            Err(e) => {
                warn!("Failed to return to {}: {}", self.home_url, e);
                Ok(())
            }
        }
    }

    fn targeted_failure(
        &self,
        category_name: &str,
        err: DriverError,
    ) -> Result<SearchResult, SearchError> {
        if err.is_fatal() {
            return Err(SearchError::Fatal(err));
        }
        error!("Error searching in category {}: {}", category_name, err);
        Ok(SearchResult::not_found_in(
            category_name,
            format!("Error occurred: {}", err),
        ))
    }
}
