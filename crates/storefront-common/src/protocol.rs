use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
    pub status: u16, // generic status code (e.g. 200)
}

/// One element matched by a driver query, captured at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Position among the matches of the query that produced it.
    pub index: usize,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub visible: bool,
}

impl ElementSnapshot {
    /// Display text with surrounding whitespace removed and inner runs of
    /// whitespace collapsed. `None` when nothing printable remains.
    pub fn display_text(&self) -> Option<String> {
        let text = self.text.as_deref()?;
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed)
        }
    }
}

/// A navigable category on the storefront. Only valid until the next navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryHandle {
    pub name: String,
    /// Absolute URL to open the category, when the link carries one.
    pub target: Option<String>,
    pub index: usize,
}

/// A product entry within a category listing. Only valid until the next navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductHandle {
    pub name: String,
    pub target: Option<String>,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    Indeterminate,
}

impl StockStatus {
    pub fn is_out_of_stock(self) -> bool {
        self == StockStatus::OutOfStock
    }

    pub fn is_in_stock(self) -> bool {
        self == StockStatus::InStock
    }

    /// Resolve an ambiguous signal to "purchasable".
    pub fn fail_open(self) -> Self {
        match self {
            StockStatus::Indeterminate => StockStatus::InStock,
            other => other,
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StockStatus::InStock => "in stock",
            StockStatus::OutOfStock => "out of stock",
            StockStatus::Indeterminate => "indeterminate",
        };
        f.write_str(s)
    }
}

/// Terminal value of a bounded search.
///
/// `matched` results always carry both names; unmatched results always carry
/// a message. Use the constructors to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchResult {
    pub fn found(product_name: impl Into<String>, category_name: impl Into<String>) -> Self {
        Self {
            matched: true,
            product_name: Some(product_name.into()),
            category_name: Some(category_name.into()),
            message: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            matched: false,
            product_name: None,
            category_name: None,
            message: Some(message.into()),
        }
    }

    /// Unmatched result scoped to a named category.
    pub fn not_found_in(category_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category_name: Some(category_name.into()),
            ..Self::not_found(message)
        }
    }

    pub fn exhausted(attempts: usize) -> Self {
        Self::not_found(format!("No match found after {} attempts", attempts))
    }
}

/// Stock details read from the product currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStockReport {
    pub product_name: Option<String>,
    pub status: StockStatus,
    pub add_to_cart_enabled: bool,
}
