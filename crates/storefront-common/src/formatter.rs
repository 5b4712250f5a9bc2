use crate::protocol::{ProductStockReport, SearchResult};

pub fn format_search_result(result: &SearchResult) -> String {
    if result.matched {
        format!(
            "MATCH \"{}\" in \"{}\"",
            result.product_name.as_deref().unwrap_or_default(),
            result.category_name.as_deref().unwrap_or_default()
        )
    } else {
        let message = result.message.as_deref().unwrap_or("no match");
        match &result.category_name {
            Some(category) => format!("NO MATCH [{}] {}", category, message),
            None => format!("NO MATCH {}", message),
        }
    }
}

pub fn format_stock_report(report: &ProductStockReport) -> String {
    let name = report.product_name.as_deref().unwrap_or("<unknown product>");
    let cart = if report.add_to_cart_enabled {
        "add to cart enabled"
    } else {
        "add to cart disabled"
    };
    format!("\"{}\": {} ({})", name, report.status, cart)
}
