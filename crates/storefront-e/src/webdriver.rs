use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};

pub struct WebDriverClient {
    pub client: Client,
}

impl WebDriverClient {
    pub async fn connect(
        url: &str,
        capabilities: Map<String, Value>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(url)
            .await
            .map_err(|e| format!("Failed to connect to WebDriver at {}: {}", url, e))?;

        Ok(Self { client })
    }

    pub async fn close(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.client
            .close()
            .await
            .map_err(|e| format!("Failed to close session: {}", e))?;
        Ok(())
    }
}

/// W3C capabilities for a Chromium or Firefox session with the given window.
pub fn browser_capabilities(headless: bool, window_size: (u32, u32)) -> Map<String, Value> {
    let (width, height) = window_size;
    let mut chrome_args = vec![format!("--window-size={},{}", width, height)];
    let mut firefox_args = vec![
        format!("--width={}", width),
        format!("--height={}", height),
    ];
    if headless {
        chrome_args.push("--headless=new".to_string());
        firefox_args.push("-headless".to_string());
    }

    let mut caps = Map::new();
    caps.insert("goog:chromeOptions".into(), json!({ "args": chrome_args }));
    caps.insert("moz:firefoxOptions".into(), json!({ "args": firefox_args }));
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capabilities() {
        let caps = browser_capabilities(true, (1280, 720));
        let chrome_args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(chrome_args.contains(&json!("--headless=new")));
        assert!(chrome_args.contains(&json!("--window-size=1280,720")));
        let firefox_args = caps["moz:firefoxOptions"]["args"].as_array().unwrap();
        assert!(firefox_args.contains(&json!("-headless")));
    }

    #[test]
    fn test_visible_capabilities() {
        let caps = browser_capabilities(false, (800, 600));
        let chrome_args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert_eq!(chrome_args, &vec![json!("--window-size=800,600")]);
    }
}
