mod common;

use async_trait::async_trait;
use common::{BASE_URL, MockCategory, MockStorefront, Page, config};
use storefront_engine::catalog::{CategoryEnumerator, ProductEnumerator};
use storefront_engine::driver::{Driver, DriverError, NavigationResult};
use storefront_engine::protocol::ElementSnapshot;
use storefront_engine::random::{ScriptedRandom, SelectError};

#[tokio::test]
async fn test_list_categories_excludes_home_and_resolves_targets() {
    let mut store = MockStorefront::new(vec![
        MockCategory::in_stock("Makeup", 1),
        MockCategory::in_stock("Skincare", 1),
    ]);
    let enumerator = CategoryEnumerator::from_config(&config());

    let categories = enumerator.list_categories(&mut store).await.unwrap();

    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Makeup", "Skincare"]);
    assert_eq!(
        categories[1].target.as_deref(),
        Some(MockStorefront::category_url(1).as_str())
    );
    assert_eq!(categories[1].index, 2);
}

#[tokio::test]
async fn test_empty_scopes_are_not_errors() {
    let mut store = MockStorefront::new(vec![]);
    let config = config();

    let categories = CategoryEnumerator::from_config(&config)
        .list_categories(&mut store)
        .await
        .unwrap();
    assert!(categories.is_empty());

    let products = ProductEnumerator::from_config(&config)
        .list_products(&mut store)
        .await
        .unwrap();
    assert!(products.is_empty());

    let mut random = ScriptedRandom::default();
    assert_eq!(
        CategoryEnumerator::select_random(&categories, &mut random),
        Err(SelectError::Empty)
    );
}

#[tokio::test]
async fn test_list_products_on_category_page() {
    let mut store = MockStorefront::new(vec![MockCategory::in_stock("Hair Care", 3)])
        .on_page(Page::Category(0));
    let enumerator = ProductEnumerator::from_config(&config());

    let products = enumerator.list_products(&mut store).await.unwrap();

    assert_eq!(products.len(), 3);
    assert_eq!(products[2].name, "Hair Care product 3");
    assert_eq!(
        products[0].target.as_deref(),
        Some(MockStorefront::product_url(0, 0).as_str())
    );
    let order: Vec<usize> = ProductEnumerator::iter_in_order(&products)
        .map(|p| p.index)
        .collect();
    assert_eq!(order, vec![0, 1, 2]);
}

/// Listing whose entries have malformed markup.
struct MalformedListing {
    clicked: Vec<usize>,
}

#[async_trait]
impl Driver for MalformedListing {
    async fn launch(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
    async fn is_ready(&self) -> bool {
        true
    }
    async fn navigate(&mut self, _url: &str) -> Result<NavigationResult, DriverError> {
        Err(DriverError::NotSupported("navigate".into()))
    }
    async fn go_back(&mut self) -> Result<NavigationResult, DriverError> {
        Err(DriverError::NotSupported("go_back".into()))
    }
    async fn wait_for_load(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
    async fn query(&mut self, _selector: &str) -> Result<Vec<ElementSnapshot>, DriverError> {
        Ok(vec![
            ElementSnapshot {
                index: 0,
                text: Some("\n    Benefit Bella Bamba\n  ".into()),
                href: Some("javascript:void(0)".into()),
                visible: true,
            },
            ElementSnapshot {
                index: 1,
                text: Some("   ".into()),
                href: Some("/product/1".into()),
                visible: true,
            },
            ElementSnapshot {
                index: 2,
                text: None,
                href: None,
                visible: true,
            },
            ElementSnapshot {
                index: 3,
                text: Some("Skinsheen Bronzer Stick".into()),
                href: Some("index.php?rt=product/product&product_id=50".into()),
                visible: true,
            },
        ])
    }
    async fn click(&mut self, _selector: &str, index: usize) -> Result<(), DriverError> {
        self.clicked.push(index);
        Ok(())
    }
    async fn title(&mut self) -> Result<String, DriverError> {
        Ok(String::new())
    }
    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(BASE_URL.to_string())
    }
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let mut driver = MalformedListing { clicked: vec![] };
    let enumerator = ProductEnumerator::new(".thumbnails .prdocutname").with_base_url(BASE_URL);

    let products = enumerator.list_products(&mut driver).await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Benefit Bella Bamba");
    assert_eq!(products[0].target, None);
    assert_eq!(products[1].name, "Skinsheen Bronzer Stick");
    assert_eq!(
        products[1].target.as_deref(),
        Some("https://store.test/index.php?rt=product/product&product_id=50")
    );

    // Entries without a navigable href are clicked in place.
    enumerator.open(&mut driver, &products[0]).await.unwrap();
    assert_eq!(driver.clicked, vec![0]);
}
