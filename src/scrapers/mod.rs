pub mod api;
pub mod browser;
pub mod parse;
pub mod token;
pub mod traits;
pub mod types;

pub use api::KurlyApiScraper;
pub use browser::KurlyBrowserScraper;
pub use traits::Collector;
pub use types::{CollectorConfig, ReviewSort};

/// Base URLs for kurly.com
pub const SITE_URL: &str = "https://www.kurly.com";
pub const API_URL: &str = "https://api.kurly.com";

/// Curated best-sellers listing, the entry point for both paths
pub fn best_items_page_url() -> String {
    format!("{}/collections/market-best", SITE_URL)
}

/// Best-items collection endpoint
pub fn best_items_api_url(per_page: usize) -> String {
    format!(
        "{}/collection/v2/home/product-collections/market-best/products?sort_type=4&page=1&per_page={}",
        API_URL, per_page
    )
}

/// Per-product review count endpoint
pub fn review_count_url(product_no: u64) -> String {
    format!(
        "{}/product-review/v1/contents-products/{}/count",
        API_URL, product_no
    )
}

/// Per-product review listing endpoint
pub fn reviews_url(product_no: u64, sort: &str, size: usize, page: usize) -> String {
    format!(
        "{}/product-review/v1/contents-products/{}/reviews?sortType={}&size={}&page={}",
        API_URL, product_no, sort, size, page
    )
}
