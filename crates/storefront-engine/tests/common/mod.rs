//! In-memory storefront used by the engine tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use storefront_engine::config::schema::StorefrontConfig;
use storefront_engine::driver::{Driver, DriverError, NavigationResult};
use storefront_engine::protocol::ElementSnapshot;

pub const BASE_URL: &str = "https://store.test/";

const CATEGORY_LINKS: &str = "nav.subnav > ul > li > a";
const PRODUCT_LINKS: &str = ".thumbnails .prdocutname";
const OUT_OF_STOCK: &str = ".nostock";
const IN_STOCK: &str = ".product-stock";
const TITLE: &str = "h1";
const ADD_TO_CART: &str = "a.cart";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stock {
    In,
    Out,
    Unmarked,
}

#[derive(Debug, Clone)]
pub struct MockProduct {
    pub name: String,
    pub stock: Stock,
}

#[derive(Debug, Clone)]
pub struct MockCategory {
    pub name: String,
    pub products: Vec<MockProduct>,
}

impl MockCategory {
    pub fn new(name: &str, products: &[(&str, Stock)]) -> Self {
        Self {
            name: name.to_string(),
            products: products
                .iter()
                .map(|(n, s)| MockProduct {
                    name: n.to_string(),
                    stock: *s,
                })
                .collect(),
        }
    }

    pub fn in_stock(name: &str, count: usize) -> Self {
        Self {
            name: name.to_string(),
            products: (1..=count)
                .map(|i| MockProduct {
                    name: format!("{} product {}", name, i),
                    stock: Stock::In,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Category(usize),
    Product(usize, usize),
}

#[derive(Debug)]
pub struct MockStorefront {
    pub categories: Vec<MockCategory>,
    pub page: Page,
    history: Vec<Page>,
    pub navigations: Vec<String>,
    pub queries: HashMap<String, usize>,
    pub failing_urls: HashSet<String>,
    pub failing_selectors: HashSet<String>,
    pub connection_lost: bool,
    /// Drop the connection as soon as a product page has loaded.
    pub lose_connection_on_product: bool,
}

impl MockStorefront {
    pub fn new(categories: Vec<MockCategory>) -> Self {
        Self {
            categories,
            page: Page::Home,
            history: Vec::new(),
            navigations: Vec::new(),
            queries: HashMap::new(),
            failing_urls: HashSet::new(),
            failing_selectors: HashSet::new(),
            connection_lost: false,
            lose_connection_on_product: false,
        }
    }

    pub fn on_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn fail_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn fail_selector(mut self, selector: &str) -> Self {
        self.failing_selectors.insert(selector.to_string());
        self
    }

    pub fn lose_connection_on_product(mut self) -> Self {
        self.lose_connection_on_product = true;
        self
    }

    pub fn category_url(c: usize) -> String {
        format!("{}category/{}", BASE_URL, c)
    }

    pub fn product_url(c: usize, p: usize) -> String {
        format!("{}product/{}/{}", BASE_URL, c, p)
    }

    pub fn category_queries(&self) -> usize {
        self.queries.get(CATEGORY_LINKS).copied().unwrap_or(0)
    }

    pub fn product_queries(&self) -> usize {
        self.queries.get(PRODUCT_LINKS).copied().unwrap_or(0)
    }

    pub fn product_visits(&self) -> Vec<String> {
        self.navigations
            .iter()
            .filter(|u| u.contains("/product/"))
            .cloned()
            .collect()
    }

    pub fn home_visits(&self) -> usize {
        self.navigations.iter().filter(|u| *u == BASE_URL).count()
    }

    fn parse(&self, url: &str) -> Option<Page> {
        let path = url.strip_prefix(BASE_URL)?;
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match parts.as_slice() {
            [] => Some(Page::Home),
            ["category", c] => {
                let c: usize = c.parse().ok()?;
                (c < self.categories.len()).then_some(Page::Category(c))
            }
            ["product", c, p] => {
                let c: usize = c.parse().ok()?;
                let p: usize = p.parse().ok()?;
                let category = self.categories.get(c)?;
                (p < category.products.len()).then_some(Page::Product(c, p))
            }
            _ => None,
        }
    }

    fn url_of(&self, page: Page) -> String {
        match page {
            Page::Home => BASE_URL.to_string(),
            Page::Category(c) => Self::category_url(c),
            Page::Product(c, p) => Self::product_url(c, p),
        }
    }

    fn title_of(&self, page: Page) -> String {
        match page {
            Page::Home => "A place to practice your automation skills!".to_string(),
            Page::Category(c) => self.categories[c].name.clone(),
            Page::Product(c, p) => self.categories[c].products[p].name.clone(),
        }
    }

    fn result(&self) -> NavigationResult {
        NavigationResult {
            url: self.url_of(self.page),
            title: self.title_of(self.page),
            status: 200,
        }
    }

    fn current_product(&self) -> Option<&MockProduct> {
        match self.page {
            Page::Product(c, p) => Some(&self.categories[c].products[p]),
            _ => None,
        }
    }

    fn snapshot(index: usize, text: &str, href: Option<String>) -> ElementSnapshot {
        ElementSnapshot {
            index,
            text: Some(text.to_string()),
            href,
            visible: true,
        }
    }
}

#[async_trait]
impl Driver for MockStorefront {
    async fn launch(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        !self.connection_lost
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        if self.connection_lost {
            return Err(DriverError::ConnectionLost);
        }
        self.navigations.push(url.to_string());
        if self.failing_urls.contains(url) {
            return Err(DriverError::Navigation(format!("net::ERR_FAILED at {}", url)));
        }
        let page = self
            .parse(url)
            .ok_or_else(|| DriverError::Navigation(format!("404 at {}", url)))?;
        self.history.push(self.page);
        self.page = page;
        if self.lose_connection_on_product && matches!(page, Page::Product(..)) {
            self.connection_lost = true;
        }
        Ok(self.result())
    }

    async fn go_back(&mut self) -> Result<NavigationResult, DriverError> {
        if self.connection_lost {
            return Err(DriverError::ConnectionLost);
        }
        if let Some(previous) = self.history.pop() {
            self.page = previous;
        }
        Ok(self.result())
    }

    async fn wait_for_load(&mut self) -> Result<(), DriverError> {
        if self.connection_lost {
            return Err(DriverError::ConnectionLost);
        }
        Ok(())
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementSnapshot>, DriverError> {
        *self.queries.entry(selector.to_string()).or_default() += 1;
        if self.connection_lost {
            return Err(DriverError::ConnectionLost);
        }
        if self.failing_selectors.contains(selector) {
            return Err(DriverError::ScriptError(format!("query '{}' failed", selector)));
        }

        let elements = match selector {
            CATEGORY_LINKS => {
                let mut links = vec![Self::snapshot(0, "Home", Some("/".to_string()))];
                links.extend(self.categories.iter().enumerate().map(|(i, c)| {
                    Self::snapshot(i + 1, &c.name, Some(format!("/category/{}", i)))
                }));
                links
            }
            PRODUCT_LINKS => match self.page {
                Page::Category(c) => self.categories[c]
                    .products
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Self::snapshot(i, &p.name, Some(format!("/product/{}/{}", c, i))))
                    .collect(),
                _ => vec![],
            },
            OUT_OF_STOCK => match self.current_product() {
                Some(p) if p.stock == Stock::Out => vec![Self::snapshot(0, "Out of Stock", None)],
                _ => vec![],
            },
            IN_STOCK => match self.current_product() {
                Some(p) if p.stock == Stock::In => vec![Self::snapshot(0, "In Stock", None)],
                _ => vec![],
            },
            TITLE => match self.current_product() {
                Some(p) => vec![Self::snapshot(0, &format!("  {}  ", p.name), None)],
                None => vec![],
            },
            ADD_TO_CART => match self.current_product() {
                Some(p) if p.stock != Stock::Out => vec![Self::snapshot(0, "Add to Cart", None)],
                _ => vec![],
            },
            _ => vec![],
        };
        Ok(elements)
    }

    async fn click(&mut self, selector: &str, index: usize) -> Result<(), DriverError> {
        let target = match (selector, self.page) {
            (CATEGORY_LINKS, _) if index == 0 => Some(Page::Home),
            (CATEGORY_LINKS, _) if index <= self.categories.len() => Some(Page::Category(index - 1)),
            (PRODUCT_LINKS, Page::Category(c)) if index < self.categories[c].products.len() => {
                Some(Page::Product(c, index))
            }
            _ => None,
        };
        let page = target.ok_or_else(|| DriverError::ElementNotFound {
            selector: selector.to_string(),
            index,
        })?;
        self.history.push(self.page);
        self.page = page;
        Ok(())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.title_of(self.page))
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.url_of(self.page))
    }
}

pub fn config() -> StorefrontConfig {
    let mut config = StorefrontConfig::default();
    config.app.base_url = BASE_URL.to_string();
    config
}

/// Four categories of three products each; only "category 3"'s second product is out of stock.
pub fn four_category_store() -> MockStorefront {
    let mut categories: Vec<MockCategory> = (1..=4)
        .map(|i| MockCategory::in_stock(&format!("category {}", i), 3))
        .collect();
    categories[2].products[1].stock = Stock::Out;
    MockStorefront::new(categories)
}
