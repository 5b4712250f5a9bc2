pub mod catalog;
pub mod config;
pub mod driver;
pub mod random;
pub mod search;
pub mod session;
pub mod stock;

pub use storefront_common::formatter;
pub use storefront_common::protocol;
