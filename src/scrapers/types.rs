use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Review sort order accepted by the review endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ReviewSort {
    /// Most recent first (the site default).
    Recently,
    /// Most recommended first.
    Recommend,
}

impl ReviewSort {
    pub fn as_param(self) -> &'static str {
        match self {
            ReviewSort::Recently => "RECENTLY",
            ReviewSort::Recommend => "RECOMMEND",
        }
    }
}

/// Knobs for both collectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// How many listing items the browser path walks.
    pub item_limit: usize,
    /// Best-items page size for the API path (single page-1 call).
    pub per_page: usize,
    /// Review pages per item on the browser path; the site shows 10 reviews
    /// per page.
    pub review_page_limit: usize,
    /// Fixed wait after each browser navigation or pager click.
    #[serde(with = "duration_secs")]
    pub page_delay: Duration,
    /// Reviews requested per API call when paging through an item's reviews.
    pub review_page_size: usize,
    /// Delay between consecutive review pages on the API path.
    #[serde(with = "duration_secs")]
    pub review_page_backoff: Duration,
    /// Total reviews to request per item; `None` uses the server-reported
    /// count.
    pub review_size: Option<usize>,
    /// Reviews younger than this many days are dropped.
    pub min_review_age_days: i64,
    pub sort: ReviewSort,
    /// How long the token acquirer watches network traffic.
    #[serde(with = "duration_secs")]
    pub token_wait: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            item_limit: 10,
            per_page: 50,
            review_page_limit: 10,
            page_delay: Duration::from_secs(1),
            review_page_size: 50,
            review_page_backoff: Duration::from_secs(1),
            review_size: None,
            min_review_age_days: 14,
            sort: ReviewSort::Recently,
            token_wait: Duration::from_secs(5),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let config = CollectorConfig::default();
        assert_eq!(config.per_page, 50);
        assert_eq!(config.review_page_limit, 10);
        assert_eq!(config.min_review_age_days, 14);
        assert_eq!(config.page_delay, Duration::from_secs(1));
        assert_eq!(config.review_size, None);
        assert_eq!(config.sort.as_param(), "RECENTLY");
    }
}
