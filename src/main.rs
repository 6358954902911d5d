mod excel_writer;
mod models;
mod scrapers;

use excel_writer::ExcelExporter;
use scrapers::{
    best_items_page_url, token, Collector, CollectorConfig, KurlyApiScraper, KurlyBrowserScraper,
};
use tracing::{info, warn, Level};

const OUTPUT_FILE: &str = "output.xlsx";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🛒 Market Scout - Kurly best-items scraper");
    info!("===========================================");

    let args: Vec<String> = std::env::args().collect();
    let use_browser = args.iter().any(|arg| arg == "--browser");

    let config = CollectorConfig::default();

    let harvest = if use_browser {
        let scraper = KurlyBrowserScraper::new(config)?;
        info!("Collecting via {}", scraper.source_name());
        scraper.collect().await?
    } else {
        let token = token::acquire_token(&best_items_page_url(), config.token_wait)?;
        let scraper = KurlyApiScraper::new(&token, config)?;
        info!("Collecting via {}", scraper.source_name());
        scraper.collect().await?
    };

    info!(
        "\n✅ Collected {} items and {} reviews\n",
        harvest.items.len(),
        harvest.reviews.len()
    );

    let mut exporter = ExcelExporter::new();
    exporter.write_items(&harvest.items)?;
    exporter.write_reviews(&harvest.reviews)?;
    exporter.save(OUTPUT_FILE)?;
    info!("💾 Saved {}", OUTPUT_FILE);

    // Failures collected during the walk are reported once, at the end.
    for failure in &harvest.failures {
        warn!(
            "Item {} ({}) lost its reviews",
            failure.item_id, failure.item_name
        );
    }

    Ok(())
}
