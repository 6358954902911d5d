//! Record normalization for raw item/review payloads.
//!
//! Pure transformations, no I/O: decoded JSON from the API path or text
//! fields lifted off rendered pages on the browser path come in, flat
//! `ItemRecord` / `ReviewRecord` rows go out.

use crate::models::{ItemRecord, ReviewRecord};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Text fields read off one listing card on the browser path.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub name: String,
    pub description: String,
    pub coupon_text: Option<String>,
    pub discount_text: Option<String>,
    pub keywords_text: Option<String>,
}

/// Text fields read off one review widget on the browser path.
#[derive(Debug, Clone, Default)]
pub struct RawReview {
    /// Text lines of the fixed-position reviewer block beside the widget.
    pub reviewer_lines: Vec<String>,
    pub contents: String,
    pub date_text: String,
    /// Number of photo thumbnails, `None` when the photo strip is absent.
    pub photo_count: Option<usize>,
    pub helpful_text: Option<String>,
}

/// The reference clock: current UTC time shifted to KST.
pub fn now_kst() -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(9)
}

/// Whole days between registration and the reference clock.
pub fn elapsed_days(registered_at: NaiveDateTime, now_kst: NaiveDateTime) -> i64 {
    (now_kst - registered_at).num_days()
}

fn digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn stripped_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Coupon badge text to (applied flag, discount rate). Only a percent text
/// that actually carries digits counts as a coupon.
pub fn coupon_signal(text: Option<&str>) -> (u8, String) {
    match text {
        Some(text) if text.contains('%') => {
            let rate = digits(text);
            if rate.is_empty() {
                (0, "0".to_string())
            } else {
                (1, rate)
            }
        }
        _ => (0, "0".to_string()),
    }
}

/// Brand token from a display name shaped like `[Brand]rest`, empty when the
/// name carries no bracket token.
pub fn brand_name(name: &str) -> String {
    static BRAND_RE: OnceLock<Regex> = OnceLock::new();
    let re = BRAND_RE.get_or_init(|| Regex::new(r"^\[(.+)\](.+)").unwrap());
    re.captures(name)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// Normalize one best-items entry from the collection endpoint.
pub fn api_item(item: &Value, no: u64, review_count: i64) -> ItemRecord {
    let name = item["name"].as_str().unwrap_or_default();

    let mut is_applied_coupon = 0;
    let mut coupon_discount_rate = "0".to_string();
    if let Some(contents) = item.pointer("/sticker/content").and_then(Value::as_array) {
        for sticker in contents {
            if let Some(text) = sticker["text"].as_str() {
                if text.contains('%') {
                    (is_applied_coupon, coupon_discount_rate) = coupon_signal(Some(text));
                    break;
                }
            }
        }
    }

    let tags = item["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag["name"].as_str())
                .collect::<Vec<_>>()
                .join(";")
        })
        .unwrap_or_default();
    let delivery_types = item["delivery_type_names"]
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(";")
        })
        .unwrap_or_default();

    ItemRecord {
        id: no.to_string(),
        name: name.to_string(),
        name_length: stripped_len(name),
        brand_name: brand_name(name),
        sales_price: item["sales_price"].as_i64().unwrap_or(0),
        discounted_price: item["discounted_price"].as_i64().unwrap_or(0),
        discount_rate: item["discount_rate"].as_i64().unwrap_or(0),
        short_description: item["short_description"].as_str().unwrap_or_default().to_string(),
        is_applied_coupon,
        coupon_discount_rate,
        tags,
        delivery_types,
        review_count,
    }
}

/// Normalize one review entry from the review endpoint. Returns `Ok(None)`
/// for reviews younger than the age threshold.
pub fn api_review(
    entry: &Value,
    now_kst: NaiveDateTime,
    min_age_days: i64,
) -> Result<Option<ReviewRecord>> {
    let registered = entry["registeredAt"]
        .as_str()
        .context("review payload missing registeredAt")?;
    let registered_at = NaiveDateTime::parse_from_str(registered, "%Y-%m-%dT%H:%M:%S")
        .with_context(|| format!("unparsable registeredAt: {registered}"))?;
    let elapsed = elapsed_days(registered_at, now_kst);
    if elapsed < min_age_days {
        return Ok(None);
    }

    let (has_photos, photo_count) = match entry["images"].as_array() {
        Some(images) if !images.is_empty() => (1, images.len() as i64),
        _ => (0, 0),
    };
    let contents = entry["contents"].as_str().unwrap_or_default().replace('\n', "");

    Ok(Some(ReviewRecord {
        product_no: entry["contentsProductNo"]
            .as_i64()
            .map(|no| no.to_string())
            .unwrap_or_else(|| "0".to_string()),
        owner_grade: entry["ownerGrade"].as_str().unwrap_or_default().to_string(),
        is_best: (entry["type"].as_str() == Some("BEST")) as u8,
        contents_length: stripped_len(&contents),
        contents,
        has_photos,
        photo_count,
        like_count: entry["likeCount"].as_i64().unwrap_or(0),
        registered_at: registered.to_string(),
        elapsed_days: elapsed,
    }))
}

/// Normalize one listing card from the browser path. `item_id` is the
/// 1-based listing ordinal; the listing page exposes neither product number
/// nor prices, so those stay at their zero defaults.
pub fn dom_item(raw: &RawItem, item_id: usize) -> ItemRecord {
    let (is_applied_coupon, coupon_discount_rate) = coupon_signal(raw.coupon_text.as_deref());
    let discount_rate = raw
        .discount_text
        .as_deref()
        .map(|text| digits(text).parse().unwrap_or(0))
        .unwrap_or(0);
    let tags = raw
        .keywords_text
        .as_deref()
        .map(|text| text.split('\n').collect::<Vec<_>>().join(";"))
        .unwrap_or_default();

    ItemRecord {
        id: item_id.to_string(),
        name: raw.name.clone(),
        name_length: stripped_len(&raw.name),
        brand_name: brand_name(&raw.name),
        short_description: raw.description.clone(),
        is_applied_coupon,
        coupon_discount_rate,
        discount_rate,
        tags,
        ..ItemRecord::default()
    }
}

/// Normalize one review widget from the browser path. Dates on rendered
/// pages come as `YYYY.MM.DD`.
pub fn dom_review(
    raw: &RawReview,
    item_id: usize,
    now_kst: NaiveDateTime,
    min_age_days: i64,
) -> Result<Option<ReviewRecord>> {
    let date = NaiveDate::parse_from_str(raw.date_text.trim(), "%Y.%m.%d")
        .with_context(|| format!("unparsable review date: {}", raw.date_text))?;
    let elapsed = elapsed_days(date.and_time(NaiveTime::MIN), now_kst);
    if elapsed < min_age_days {
        return Ok(None);
    }

    // A three-line reviewer block means the top-rated badge occupies the
    // first line and pushes the grade down one.
    let (is_best, owner_grade) = if raw.reviewer_lines.len() == 3 {
        (1, raw.reviewer_lines[1].clone())
    } else {
        (0, raw.reviewer_lines.first().cloned().unwrap_or_default())
    };
    let contents = raw.contents.replace('\n', "");

    Ok(Some(ReviewRecord {
        product_no: item_id.to_string(),
        owner_grade,
        is_best,
        contents_length: stripped_len(&contents),
        contents,
        has_photos: raw.photo_count.is_some() as u8,
        photo_count: raw.photo_count.unwrap_or(0) as i64,
        like_count: raw
            .helpful_text
            .as_deref()
            .map(|text| digits(text).parse().unwrap_or(0))
            .unwrap_or(0),
        registered_at: raw.date_text.trim().to_string(),
        elapsed_days: elapsed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reference_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 11, 19)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn brand_from_bracket_token() {
        assert_eq!(brand_name("[Brand] Product Title"), "Brand");
        assert_eq!(brand_name("[상하목장] 유기농 우유"), "상하목장");
        assert_eq!(brand_name("Product Title"), "");
        assert_eq!(brand_name("[Brand]"), "");
    }

    #[test]
    fn coupon_requires_digits() {
        assert_eq!(coupon_signal(Some("10% 쿠폰")), (1, "10".to_string()));
        assert_eq!(coupon_signal(Some("% 할인")), (0, "0".to_string()));
        assert_eq!(coupon_signal(Some("신상품")), (0, "0".to_string()));
        assert_eq!(coupon_signal(None), (0, "0".to_string()));
    }

    #[test]
    fn sticker_percent_text_sets_coupon() {
        let item = json!({
            "name": "[Brand] Product",
            "sticker": { "content": [
                { "text": "New" },
                { "text": "10% off" },
            ]},
        });
        let record = api_item(&item, 1024, 0);
        assert_eq!(record.is_applied_coupon, 1);
        assert_eq!(record.coupon_discount_rate, "10");
    }

    #[test]
    fn missing_signals_default_to_zero() {
        let item = json!({ "name": "맛있는 사과 1kg" });
        let record = api_item(&item, 7, 3);
        assert_eq!(record.is_applied_coupon, 0);
        assert_eq!(record.coupon_discount_rate, "0");
        assert_eq!(record.sales_price, 0);
        assert_eq!(record.discounted_price, 0);
        assert_eq!(record.discount_rate, 0);
        assert_eq!(record.brand_name, "");
        assert_eq!(record.tags, "");
        assert_eq!(record.review_count, 3);
    }

    #[test]
    fn name_length_strips_whitespace() {
        let item = json!({ "name": "[컬리] 동물복지 우유 900ml" });
        let record = api_item(&item, 1, 0);
        assert_eq!(record.name_length, "[컬리]동물복지우유900ml".chars().count());
    }

    #[test]
    fn tags_and_delivery_types_join_with_semicolons() {
        let item = json!({
            "name": "x",
            "tags": [ { "name": "Kurly Only" }, { "name": "한정수량" } ],
            "delivery_type_names": [ "샛별배송", "택배배송" ],
        });
        let record = api_item(&item, 1, 0);
        assert_eq!(record.tags, "Kurly Only;한정수량");
        assert_eq!(record.delivery_types, "샛별배송;택배배송");
    }

    #[test]
    fn recent_reviews_are_excluded() {
        let young = json!({
            "contentsProductNo": 1024,
            "registeredAt": "2022-11-14T09:30:00",
            "contents": "five days old",
        });
        let result = api_review(&young, reference_now(), 14).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn old_reviews_keep_their_elapsed_days() {
        let entry = json!({
            "contentsProductNo": 1024,
            "ownerGrade": "퍼플",
            "type": "BEST",
            "contents": "아주 신선해요\n재구매 의사 있어요",
            "images": [ { "id": 1 }, { "id": 2 } ],
            "likeCount": 7,
            "registeredAt": "2022-10-30T00:00:00",
        });
        let record = api_review(&entry, reference_now(), 14).unwrap().unwrap();
        assert_eq!(record.elapsed_days, 20);
        assert_eq!(record.product_no, "1024");
        assert_eq!(record.is_best, 1);
        assert_eq!(record.contents, "아주 신선해요재구매 의사 있어요");
        assert_eq!(record.contents_length, "아주신선해요재구매의사있어요".chars().count());
        assert_eq!(record.has_photos, 1);
        assert_eq!(record.photo_count, 2);
        assert_eq!(record.like_count, 7);
    }

    #[test]
    fn review_without_registration_date_is_an_error() {
        let entry = json!({ "contents": "no date" });
        assert!(api_review(&entry, reference_now(), 14).is_err());
    }

    #[test]
    fn normalization_is_idempotent() {
        let item = json!({
            "name": "[Brand] Product",
            "sales_price": 12900,
            "sticker": { "content": [ { "text": "5%" } ] },
        });
        assert_eq!(api_item(&item, 3, 10), api_item(&item, 3, 10));

        let entry = json!({
            "contentsProductNo": 3,
            "registeredAt": "2022-10-01T12:00:00",
            "contents": "same in, same out",
        });
        assert_eq!(
            api_review(&entry, reference_now(), 14).unwrap(),
            api_review(&entry, reference_now(), 14).unwrap()
        );
    }

    #[test]
    fn dom_item_fills_listing_gaps_with_zero_defaults() {
        let raw = RawItem {
            name: "[Brand] Product".to_string(),
            description: "오늘의 추천".to_string(),
            coupon_text: None,
            discount_text: Some("23%".to_string()),
            keywords_text: Some("신선식품\n당일수확".to_string()),
        };
        let record = dom_item(&raw, 4);
        assert_eq!(record.id, "4");
        assert_eq!(record.brand_name, "Brand");
        assert_eq!(record.discount_rate, 23);
        assert_eq!(record.tags, "신선식품;당일수확");
        assert_eq!(record.sales_price, 0);
        assert_eq!(record.review_count, 0);
        assert_eq!(record.coupon_discount_rate, "0");
    }

    #[test]
    fn dom_review_reads_the_reviewer_block() {
        let best = RawReview {
            reviewer_lines: vec![
                "베스트".to_string(),
                "퍼플".to_string(),
                "김*리".to_string(),
            ],
            contents: "줄바꿈이\n있는 후기".to_string(),
            date_text: "2022.10.30".to_string(),
            photo_count: Some(3),
            helpful_text: Some("도움돼요 12".to_string()),
        };
        let record = dom_review(&best, 1, reference_now(), 14).unwrap().unwrap();
        assert_eq!(record.is_best, 1);
        assert_eq!(record.owner_grade, "퍼플");
        assert_eq!(record.contents, "줄바꿈이있는 후기");
        assert_eq!(record.has_photos, 1);
        assert_eq!(record.photo_count, 3);
        assert_eq!(record.like_count, 12);
        assert_eq!(record.elapsed_days, 20);

        let plain = RawReview {
            reviewer_lines: vec!["라벤더".to_string(), "박*수".to_string()],
            date_text: "2022.01.01".to_string(),
            helpful_text: Some("도움돼요".to_string()),
            ..RawReview::default()
        };
        let record = dom_review(&plain, 2, reference_now(), 14).unwrap().unwrap();
        assert_eq!(record.is_best, 0);
        assert_eq!(record.owner_grade, "라벤더");
        assert_eq!(record.like_count, 0);
    }

    #[test]
    fn dom_review_age_filter_uses_dotted_dates() {
        let raw = RawReview {
            reviewer_lines: vec!["라벤더".to_string()],
            date_text: "2022.11.14".to_string(),
            ..RawReview::default()
        };
        assert!(dom_review(&raw, 1, reference_now(), 14).unwrap().is_none());
    }
}
