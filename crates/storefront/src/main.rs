use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use storefront_e::driver::WebDriverDriver;
use storefront_engine::config::loader::ConfigLoader;
use storefront_engine::driver::Driver;
use storefront_engine::formatter::{format_search_result, format_stock_report};
use storefront_engine::protocol::{ProductStockReport, SearchResult, StockStatus};
use storefront_engine::random::SeededRandom;
use storefront_engine::session::StorefrontSession;
use storefront_h::driver::HeadlessDriver;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storefront", version, about = "Bounded stock search over a storefront catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (default: ./storefront.yaml, then ~/.storefront/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Browser integration to drive
    #[arg(long, value_enum, default_value_t = DriverKind::Headless, global = true)]
    driver: DriverKind,

    /// Launch browser in visible mode (not headless)
    #[arg(long, global = true)]
    visible: bool,

    /// WebDriver endpoint (webdriver driver only)
    #[arg(long, global = true)]
    webdriver_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DriverKind {
    /// Chromium via the DevTools protocol
    Headless,
    /// Any W3C WebDriver endpoint
    Webdriver,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Search only the first category whose name contains this text
    #[arg(long)]
    category: Option<String>,

    /// Attempt budget for the random search
    #[arg(long)]
    max_attempts: Option<usize>,

    /// Seed for reproducible category picks
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Find a product that is out of stock
    FindOutOfStock(SearchArgs),
    /// Find a product that is in stock
    FindInStock(SearchArgs),
    /// Open a random product and report its stock
    RandomProduct {
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Report the stock of a product page
    CheckStock {
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ConfigLoader::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    if cli.visible {
        config.browser.headless = false;
    }
    if let Some(url) = &cli.webdriver_url {
        config.browser.webdriver_url = url.clone();
    }

    let mut driver: Box<dyn Driver> = match cli.driver {
        DriverKind::Headless => Box::new(HeadlessDriver::from_config(&config)),
        DriverKind::Webdriver => Box::new(WebDriverDriver::from_config(&config)),
    };

    if let Err(e) = driver.launch().await {
        eprintln!("Failed to launch driver: {}", e);
        return Err(e.into());
    }

    let mut session = StorefrontSession::new(driver, config);
    let outcome = run(&mut session, cli.command, cli.json).await;

    if let Err(e) = session.driver_mut().close().await {
        warn!("Failed to close driver: {}", e);
    }
    outcome
}

async fn run(
    session: &mut StorefrontSession<Box<dyn Driver>>,
    command: Command,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        Command::FindOutOfStock(args) => {
            let result = search(session, args, StockStatus::is_out_of_stock).await?;
            print_search_result(&result, json)
        }
        Command::FindInStock(args) => {
            let result = search(session, args, StockStatus::is_in_stock).await?;
            print_search_result(&result, json)
        }
        Command::RandomProduct { seed } => {
            let mut random = SeededRandom::from_settings(seed.or(session.config().search.seed));
            session.open_home().await?;
            session.navigate_to_random_category(&mut random).await?;
            session.select_random_product(&mut random).await?;
            let report = session.check_current_product_stock().await;
            print_stock_report(&report, json)
        }
        Command::CheckStock { url } => {
            session.open_product(&url).await?;
            let report = session.check_current_product_stock().await;
            print_stock_report(&report, json)
        }
    }
}

async fn search(
    session: &mut StorefrontSession<Box<dyn Driver>>,
    args: SearchArgs,
    predicate: fn(StockStatus) -> bool,
) -> anyhow::Result<SearchResult> {
    let seed = args.seed.or(session.config().search.seed);
    let mut random = SeededRandom::from_settings(seed);

    session.open_home().await?;
    let mut controller = session.search(&mut random);
    let result = match args.category {
        Some(category) => {
            controller
                .find_matching_product_in_category(&category, predicate)
                .await?
        }
        None => {
            controller
                .find_matching_product(predicate, args.max_attempts)
                .await?
        }
    };
    Ok(result)
}

fn print_search_result(result: &SearchResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", format_search_result(result));
    }
    Ok(())
}

fn print_stock_report(report: &ProductStockReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", format_stock_report(report));
    }
    Ok(())
}
