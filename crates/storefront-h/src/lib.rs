pub mod cdp;
pub mod driver;
mod script;
