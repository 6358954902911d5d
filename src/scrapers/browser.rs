//! Browser-driven collection path using headless Chrome.
//!
//! The rendered listing is never trusted across navigations: entering a
//! detail page and coming back invalidates whatever was on screen before, so
//! every extraction works on a fresh HTML snapshot. Page movement runs
//! through an explicit Listing / ItemDetail / ReviewPage state machine.

use crate::models::{Harvest, ItemFailure, ReviewRecord};
use crate::scrapers::best_items_page_url;
use crate::scrapers::parse::{self, RawItem, RawReview};
use crate::scrapers::traits::Collector;
use crate::scrapers::types::CollectorConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Class names the site renders on the best-items listing and review widget.
const ITEM_CARD: &str = ".css-1xyd46f";
const ITEM_NAME: &str = ".css-rklo75";
const ITEM_SUMMARY: &str = ".css-13g46z0";
const COUPON_BADGE: &str = ".css-y4sfl6";
const DISCOUNT_BADGE: &str = ".discount-rate";
const ITEM_KEYWORDS: &str = ".css-1hrnl0u";
const REVIEW_CARD: &str = ".css-169773r";
const REVIEW_CONTENT: &str = ".css-i69j0n";
const REVIEW_PHOTOS: &str = ".css-1l7ac3a";
const REVIEW_HELPFUL: &str = ".css-g3a39p";
const REVIEW_DATE: &str = ".css-14kcwq8";
const REVIEW_PAGER: &str = ".css-jz9m4p";

/// Browser-based collector for the best-items listing
pub struct KurlyBrowserScraper {
    browser: Browser,
    config: CollectorConfig,
}

impl KurlyBrowserScraper {
    /// Launch headless Chrome with the given collection knobs
    pub fn new(config: CollectorConfig) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self { browser, config })
    }
}

#[async_trait]
impl Collector for KurlyBrowserScraper {
    async fn collect(&self) -> Result<Harvest> {
        let tab = self.browser.new_tab().context("Failed to open a tab")?;
        let mut flow = PageFlow {
            tab,
            config: &self.config,
            state: PageState::Listing,
        };
        flow.run()
    }

    fn source_name(&self) -> &'static str {
        "kurly-browser"
    }
}

/// Where the tab currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageState {
    Listing,
    ItemDetail { item: usize },
    ReviewPage { item: usize, page: usize },
}

/// One tab walking the listing. All movement goes through the transition
/// methods below, which keep `state` in step with the real page.
struct PageFlow<'a> {
    tab: Arc<Tab>,
    config: &'a CollectorConfig,
    state: PageState,
}

impl PageFlow<'_> {
    fn run(&mut self) -> Result<Harvest> {
        self.open_listing()?;

        let listing = self.snapshot()?;
        let available = listing.select(&sel(ITEM_CARD)).count();
        let walk = available.min(self.config.item_limit);
        info!("Listing shows {} item cards, walking {}", available, walk);

        let mut harvest = Harvest::default();
        let now = parse::now_kst();

        for ordinal in 0..walk {
            let item_id = ordinal + 1;

            // The snapshot taken before the previous detail visit is stale.
            let listing = self.snapshot()?;
            let raw = match extract_raw_item(&listing, ordinal) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Item {} extraction failed: {:#}", item_id, e);
                    harvest.failures.push(ItemFailure {
                        item_id: item_id.to_string(),
                        item_name: String::new(),
                    });
                    continue;
                }
            };
            harvest.items.push(parse::dom_item(&raw, item_id));

            if let Err(e) = self.open_item(ordinal) {
                warn!("Item {} detail page unreachable: {:#}", item_id, e);
                harvest.failures.push(ItemFailure {
                    item_id: item_id.to_string(),
                    item_name: raw.name.clone(),
                });
                continue;
            }

            match self.collect_reviews(item_id, now, &mut harvest.reviews) {
                Ok(kept) => debug!("Item {}: kept {} reviews", item_id, kept),
                Err(e) => {
                    // Partial failure: record it and keep walking the batch.
                    warn!("Item {} review extraction abandoned: {:#}", item_id, e);
                    harvest.failures.push(ItemFailure {
                        item_id: item_id.to_string(),
                        item_name: raw.name.clone(),
                    });
                }
            }

            self.back_to_listing()?;
        }

        info!(
            "Browser pass done: {} items, {} reviews, {} failures",
            harvest.items.len(),
            harvest.reviews.len(),
            harvest.failures.len()
        );
        Ok(harvest)
    }

    /// Walk review pages for the item on screen, normalizing as we go.
    fn collect_reviews(
        &mut self,
        item_id: usize,
        now: NaiveDateTime,
        out: &mut Vec<ReviewRecord>,
    ) -> Result<usize> {
        let mut kept = 0;
        for page in 1..=self.config.review_page_limit {
            let html = self.snapshot()?;
            for raw in extract_raw_reviews(&html)? {
                if let Some(record) =
                    parse::dom_review(&raw, item_id, now, self.config.min_review_age_days)?
                {
                    out.push(record);
                    kept += 1;
                }
            }
            if page == self.config.review_page_limit {
                break;
            }
            self.next_review_page()?;
        }
        Ok(kept)
    }

    fn open_listing(&mut self) -> Result<()> {
        let url = best_items_page_url();
        debug!("Opening {}", url);
        self.tab.navigate_to(&url)?;
        self.tab.wait_until_navigated()?;
        thread::sleep(self.config.page_delay);
        self.state = PageState::Listing;
        Ok(())
    }

    /// Click the nth listing card, landing on its detail page.
    fn open_item(&mut self, ordinal: usize) -> Result<()> {
        if self.state != PageState::Listing {
            bail!("item cards can only be opened from the listing");
        }
        if !self.click_nth(ITEM_CARD, ordinal)? {
            bail!("listing card {} is not on the page", ordinal + 1);
        }
        thread::sleep(self.config.page_delay);
        self.state = PageState::ItemDetail { item: ordinal };
        Ok(())
    }

    /// Click the pager's forward button and wait for the re-render.
    fn next_review_page(&mut self) -> Result<()> {
        let (item, page) = match self.state {
            PageState::ItemDetail { item } => (item, 1),
            PageState::ReviewPage { item, page } => (item, page),
            PageState::Listing => bail!("the review pager is only reachable from a detail view"),
        };
        let js = format!(
            "(() => {{ const buttons = document.querySelectorAll('{} button'); \
             if (buttons.length < 2) return false; \
             buttons[buttons.length - 1].click(); return true; }})()",
            REVIEW_PAGER
        );
        let result = self.tab.evaluate(&js, false)?;
        if !result.value.and_then(|v| v.as_bool()).unwrap_or(false) {
            bail!("review pager missing after page {}", page);
        }
        thread::sleep(self.config.page_delay);
        self.state = PageState::ReviewPage {
            item,
            page: page + 1,
        };
        Ok(())
    }

    fn back_to_listing(&mut self) -> Result<()> {
        self.tab.evaluate("window.history.go(-1)", false)?;
        thread::sleep(self.config.page_delay);
        self.state = PageState::Listing;
        Ok(())
    }

    /// Fresh parse of whatever the tab currently renders.
    fn snapshot(&self) -> Result<Html> {
        let result = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)?;
        let html = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .context("page HTML unavailable")?;
        Ok(Html::parse_document(html))
    }

    fn click_nth(&self, selector: &str, index: usize) -> Result<bool> {
        let js = format!(
            "(() => {{ const nodes = document.querySelectorAll('{selector}'); \
             if (nodes.length <= {index}) return false; \
             nodes[{index}].click(); return true; }})()"
        );
        let result = self.tab.evaluate(&js, false)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).unwrap()
}

/// Rendered-text approximation: trimmed non-empty text nodes, top to bottom.
fn text_lines(el: ElementRef) -> Vec<String> {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn text_of(el: ElementRef) -> String {
    text_lines(el).join("\n")
}

/// Read the nth listing card's display fields. The card, name and summary
/// must exist; badge and keyword blocks are optional.
fn extract_raw_item(listing: &Html, ordinal: usize) -> Result<RawItem> {
    let cards: Vec<_> = listing.select(&sel(ITEM_CARD)).collect();
    let card = cards
        .get(ordinal)
        .copied()
        .with_context(|| format!("listing card {} missing", ordinal + 1))?;

    let name = card
        .select(&sel(ITEM_NAME))
        .next()
        .context("item name missing")?;
    let summary = card
        .select(&sel(ITEM_SUMMARY))
        .next()
        .context("item summary missing")?;

    Ok(RawItem {
        name: text_of(name),
        description: text_of(summary),
        coupon_text: card.select(&sel(COUPON_BADGE)).next().map(text_of),
        discount_text: card.select(&sel(DISCOUNT_BADGE)).next().map(text_of),
        keywords_text: card.select(&sel(ITEM_KEYWORDS)).next().map(text_of),
    })
}

/// Read every review widget on the current page. Errors when the widgets are
/// gone, which is how walking past the last page surfaces.
fn extract_raw_reviews(html: &Html) -> Result<Vec<RawReview>> {
    let cards: Vec<_> = html.select(&sel(REVIEW_CARD)).collect();
    if cards.is_empty() {
        bail!("no review widgets on the page");
    }

    let mut raws = Vec::with_capacity(cards.len());
    for (idx, card) in cards.iter().enumerate() {
        let date_text = card
            .select(&sel(REVIEW_DATE))
            .next()
            .map(text_of)
            .context("review date missing")?;
        let contents = card
            .select(&sel(REVIEW_CONTENT))
            .next()
            .map(text_of)
            .context("review contents missing")?;
        let photo_count = card
            .select(&sel(REVIEW_PHOTOS))
            .next()
            .map(|strip| strip.select(&sel("button")).count());
        let helpful_text = card.select(&sel(REVIEW_HELPFUL)).next().map(text_of);

        raws.push(RawReview {
            reviewer_lines: reviewer_block_lines(html, idx)?,
            contents,
            date_text,
            photo_count,
            helpful_text,
        });
    }
    Ok(raws)
}

/// The reviewer block sits outside the widget markup and is addressed by
/// position: the first review's block is the 5th child of the review
/// section's second column.
fn reviewer_block_lines(html: &Html, idx: usize) -> Result<Vec<String>> {
    let selector = format!(
        "#review > section > div:nth-child(2) > div:nth-child({}) > div > div",
        idx + 5
    );
    let block = html
        .select(&sel(&selector))
        .next()
        .with_context(|| format!("reviewer block {} missing", idx + 1))?;
    Ok(text_lines(block))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<div class="css-1xyd46f">
  <span class="css-rklo75">[Brand] Product</span>
  <p class="css-13g46z0">오늘의 추천</p>
  <span class="css-y4sfl6">5% 쿠폰</span>
  <span class="discount-rate">23%</span>
  <div class="css-1hrnl0u"><span>신선식품</span><span>당일수확</span></div>
</div>
<div class="css-1xyd46f">
  <span class="css-rklo75">Plain Product</span>
  <p class="css-13g46z0">두번째 상품</p>
</div>
</body></html>"#;

    const REVIEW_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<div id="review">
  <section>
    <div>tabs</div>
    <div>
      <div>sort</div><div>filter</div><div>notice</div><div>header</div>
      <div><div><div><span>베스트</span><span>퍼플</span><span>김*리</span></div></div></div>
      <div><div><div><span>라벤더</span><span>박*수</span></div></div></div>
    </div>
  </section>
</div>
<div class="css-169773r">
  <span class="css-14kcwq8">2022.10.30</span>
  <p class="css-i69j0n">아주<br>신선해요</p>
  <div class="css-1l7ac3a"><button></button><button></button></div>
  <span class="css-g3a39p">도움돼요 12</span>
</div>
<div class="css-169773r">
  <span class="css-14kcwq8">2022.11.18</span>
  <p class="css-i69j0n">어제 작성한 후기</p>
</div>
</body></html>"#;

    #[test]
    fn listing_card_fields_are_extracted() {
        let listing = Html::parse_document(LISTING_HTML);

        let first = extract_raw_item(&listing, 0).unwrap();
        assert_eq!(first.name, "[Brand] Product");
        assert_eq!(first.description, "오늘의 추천");
        assert_eq!(first.coupon_text.as_deref(), Some("5% 쿠폰"));
        assert_eq!(first.discount_text.as_deref(), Some("23%"));
        assert_eq!(first.keywords_text.as_deref(), Some("신선식품\n당일수확"));

        let second = extract_raw_item(&listing, 1).unwrap();
        assert_eq!(second.name, "Plain Product");
        assert!(second.coupon_text.is_none());
        assert!(second.discount_text.is_none());
    }

    #[test]
    fn missing_listing_card_is_an_error() {
        let listing = Html::parse_document(LISTING_HTML);
        assert!(extract_raw_item(&listing, 2).is_err());
    }

    #[test]
    fn review_widgets_and_reviewer_blocks_line_up() {
        let page = Html::parse_document(REVIEW_PAGE_HTML);
        let raws = extract_raw_reviews(&page).unwrap();
        assert_eq!(raws.len(), 2);

        assert_eq!(raws[0].date_text, "2022.10.30");
        assert_eq!(raws[0].contents, "아주\n신선해요");
        assert_eq!(raws[0].photo_count, Some(2));
        assert_eq!(raws[0].helpful_text.as_deref(), Some("도움돼요 12"));
        assert_eq!(raws[0].reviewer_lines, vec!["베스트", "퍼플", "김*리"]);

        assert_eq!(raws[1].date_text, "2022.11.18");
        assert_eq!(raws[1].photo_count, None);
        assert_eq!(raws[1].reviewer_lines, vec!["라벤더", "박*수"]);
    }

    #[test]
    fn page_without_review_widgets_is_an_error() {
        let page = Html::parse_document(LISTING_HTML);
        assert!(extract_raw_reviews(&page).is_err());
    }
}
