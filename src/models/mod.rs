use serde::{Deserialize, Serialize};

/// One row of the "Items" sheet. Both collection paths produce this shape;
/// fields the DOM listing page cannot provide default to zero-equivalents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    /// Character count of the name with whitespace stripped.
    pub name_length: usize,
    /// Text inside a leading `[...]` token of the name, empty when absent.
    pub brand_name: String,
    pub sales_price: i64,
    pub discounted_price: i64,
    pub discount_rate: i64,
    pub short_description: String,
    pub is_applied_coupon: u8,
    /// Digits of the coupon badge text, "0" when no coupon signal.
    pub coupon_discount_rate: String,
    /// Semicolon-joined tag names.
    pub tags: String,
    /// Semicolon-joined delivery type names.
    pub delivery_types: String,
    pub review_count: i64,
}

/// One row of the "Reviews" sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewRecord {
    pub product_no: String,
    pub owner_grade: String,
    pub is_best: u8,
    /// Review text with newlines removed.
    pub contents: String,
    /// Character count of the contents with whitespace stripped.
    pub contents_length: usize,
    pub has_photos: u8,
    pub photo_count: i64,
    pub like_count: i64,
    pub registered_at: String,
    /// Whole days between the UTC+9 reference clock and registration.
    pub elapsed_days: i64,
}

/// An item whose review extraction was abandoned mid-crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub item_name: String,
}

/// Everything one collection pass produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Harvest {
    pub items: Vec<ItemRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub failures: Vec<ItemFailure>,
}

impl Default for ItemRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            name_length: 0,
            brand_name: String::new(),
            sales_price: 0,
            discounted_price: 0,
            discount_rate: 0,
            short_description: String::new(),
            is_applied_coupon: 0,
            coupon_discount_rate: "0".to_string(),
            tags: String::new(),
            delivery_types: String::new(),
            review_count: 0,
        }
    }
}
