//! Page-side scripts and the evaluation loop that runs them.

use chromiumoxide::Page;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use storefront_engine::driver::DriverError;

/// Snapshots every match of a selector. Visibility follows the layout box and
/// computed style, the same test Playwright's `isVisible()` applies.
const QUERY_FN: &str = r#"(selector) => Array.from(document.querySelectorAll(selector)).map((el, index) => {
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
    const text = (el.textContent || '').trim();
    const link = el.matches('a[href]') ? el : (el.closest('a[href]') || el.querySelector('a[href]'));
    return {
        index,
        text: text.length ? text : null,
        href: link ? link.getAttribute('href') : null,
        visible,
    };
})"#;

const CLICK_FN: &str = r#"(selector, index, markDeparture) => {
    const el = document.querySelectorAll(selector)[index];
    if (!el) return false;
    markDeparture();
    el.scrollIntoView({ block: 'center' });
    el.click();
    return true;
}"#;

/// Tags the current document with a departure token. A later document either
/// lacks the tag or carries an older one. `beforeunload` records that the
/// navigation actually started.
const MARK_DEPARTURE_FN: &str = r#"(token) => {
    window.__storefrontDeparture = token;
    window.addEventListener('beforeunload', () => {
        window.__storefrontUnloading = token;
    }, { once: true });
}"#;

const PAGE_STATE_FN: &str = r#"(token) => ({
    replaced: window.__storefrontDeparture !== token,
    unloading: window.__storefrontUnloading === token,
    readyState: document.readyState,
})"#;

pub const READY_STATE: &str = "document.readyState";

/// Evaluation timeout. Keeps a blocked JS thread from hanging the driver.
pub const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries for context errors while the page is navigating.
const MAX_CONTEXT_RETRIES: u32 = 10;

const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub fn query_expression(selector: &str) -> Result<String, DriverError> {
    Ok(format!("({})({})", QUERY_FN, serde_json::to_string(selector)?))
}

pub fn click_expression(selector: &str, index: usize, token: u64) -> Result<String, DriverError> {
    Ok(format!(
        "({})({}, {}, () => ({})({}))",
        CLICK_FN,
        serde_json::to_string(selector)?,
        index,
        MARK_DEPARTURE_FN,
        token
    ))
}

pub fn history_back_expression(token: u64) -> String {
    format!("({})({}); history.back(); true", MARK_DEPARTURE_FN, token)
}

pub fn page_state_expression(token: u64) -> String {
    format!("({})({})", PAGE_STATE_FN, token)
}

/// Where the page stands relative to a departure token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// The tagged document is gone.
    pub replaced: bool,
    /// The tagged document has begun unloading.
    pub unloading: bool,
    pub ready_state: String,
}

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

fn is_selector_error(err: &str) -> bool {
    err.contains("is not a valid selector")
}

/// Evaluate `expression` and deserialize its value, retrying while the
/// execution context is being replaced by a navigation.
pub async fn evaluate<T: DeserializeOwned>(
    page: &Page,
    expression: &str,
    selector: Option<&str>,
) -> Result<T, DriverError> {
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        let result = match tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await {
            Err(_) => {
                return Err(DriverError::TimeoutWithContext {
                    operation: "evaluate".into(),
                });
            }
            Ok(result) => result,
        };

        match result {
            Ok(remote_object) => {
                return remote_object
                    .into_value::<T>()
                    .map_err(|e| DriverError::Serialization(e.to_string()));
            }
            Err(e) => {
                let err_str = e.to_string();
                if is_context_error(&err_str) {
                    tracing::debug!(
                        "Context error during evaluation (attempt {}/{}), retrying...",
                        attempt + 1,
                        MAX_CONTEXT_RETRIES
                    );
                    last_error = Some(err_str);
                    tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
                    continue;
                }
                if let Some(selector) = selector
                    && is_selector_error(&err_str)
                {
                    return Err(DriverError::SelectorInvalid {
                        selector: selector.to_string(),
                    });
                }
                return Err(DriverError::ScriptError(err_str));
            }
        }
    }

    Err(DriverError::ScriptError(last_error.unwrap_or_else(|| {
        "Evaluation failed after retries".to_string()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expressions_quote_selectors() {
        let expr = query_expression(r#"a[title="x"]"#).unwrap();
        assert!(expr.ends_with(r#"("a[title=\"x\"]")"#));

        let expr = click_expression(".thumbnails .prdocutname", 3, 7).unwrap();
        assert!(expr.contains(r#"(".thumbnails .prdocutname", 3, () =>"#));
        assert!(expr.ends_with("(7))"));
    }

    #[test]
    fn test_departure_expressions_carry_token() {
        assert!(history_back_expression(4).ends_with("(4); history.back(); true"));
        assert!(page_state_expression(4).ends_with("(4)"));
    }

    #[test]
    fn test_page_state_deserializes() {
        let state: PageState = serde_json::from_str(
            r#"{"replaced":false,"unloading":true,"readyState":"complete"}"#,
        )
        .unwrap();
        assert!(!state.replaced);
        assert!(state.unloading);
        assert_eq!(state.ready_state, "complete");
    }

    #[test]
    fn test_error_classification() {
        assert!(is_context_error("Execution context was destroyed."));
        assert!(is_context_error("error -32000: Cannot find context with specified id"));
        assert!(!is_context_error("TypeError: x is undefined"));
        assert!(is_selector_error(
            "SyntaxError: Failed to execute 'querySelectorAll' on 'Document': '##' is not a valid selector."
        ));
    }
}
