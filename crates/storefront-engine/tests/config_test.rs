use std::collections::HashMap;
use std::io::Write;
use storefront_engine::config::loader::{ConfigError, ConfigLoader};
use storefront_engine::config::schema::StorefrontConfig;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = StorefrontConfig::default();
    assert_eq!(config.app.base_url, "https://automationteststore.com");
    assert_eq!(config.search.max_attempts, 10);
    assert!(config.search.seed.is_none());
    assert!(config.browser.headless);
    assert_eq!(config.browser.viewport.width, 1280);
    assert_eq!(config.selectors.out_of_stock.text, "Out of Stock");
    assert_eq!(config.selectors.category_exclude, vec!["Home".to_string()]);
}

#[tokio::test]
async fn test_load_partial_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
app:
  base_url: "https://staging.store.test"
search:
  max_attempts: 3
  seed: 7
selectors:
  products: ".product-grid a.name"
"#
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path()).await.unwrap();

    assert_eq!(config.app.base_url, "https://staging.store.test");
    assert_eq!(config.app.environment, "development");
    assert_eq!(config.search.max_attempts, 3);
    assert_eq!(config.search.seed, Some(7));
    assert_eq!(config.selectors.products, ".product-grid a.name");
    assert_eq!(config.selectors.categories, "nav.subnav > ul > li > a");
    assert_eq!(config.timeouts.load_ms, 10000);
}

#[tokio::test]
async fn test_load_invalid_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "search: [not, a, map").unwrap();

    let err = ConfigLoader::load_from(file.path()).await.unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[tokio::test]
async fn test_load_missing_file() {
    let err = ConfigLoader::load_from(std::path::Path::new("/nonexistent/storefront.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_env_overrides() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("BASE_URL", "https://qa.store.test"),
        ("HEADLESS", "false"),
        ("VIEWPORT_WIDTH", "1920"),
        ("VIEWPORT_HEIGHT", "tall"),
        ("STOREFRONT_MAX_ATTEMPTS", "25"),
        ("STOREFRONT_SEED", "99"),
        ("WEBDRIVER_URL", "http://grid:4444"),
    ]);
    let mut config = StorefrontConfig::default();

    config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.app.base_url, "https://qa.store.test");
    assert!(!config.browser.headless);
    assert_eq!(config.browser.viewport.width, 1920);
    // Unparsable values leave the default in place.
    assert_eq!(config.browser.viewport.height, 720);
    assert_eq!(config.search.max_attempts, 25);
    assert_eq!(config.search.seed, Some(99));
    assert_eq!(config.browser.webdriver_url, "http://grid:4444");
}
