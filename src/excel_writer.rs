//! Two-sheet spreadsheet export.
//!
//! Rows are written with a leading index column that counts from 1, headers
//! on row 0. Column lists are fixed; row shape is the caller's problem.

use crate::models::{ItemRecord, ReviewRecord};
use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

/// Headers of the "Items" sheet, after the leading index column.
pub const ITEM_COLUMNS: [&str; 13] = [
    "상품코드",
    "상품명",
    "상품명 글자수",
    "브랜드명",
    "판매가",
    "할인가",
    "할인율",
    "소구문구",
    "쿠폰여부",
    "쿠폰할인율",
    "상품특징",
    "배송형태",
    "총 후기 개수",
];

/// Headers of the "Reviews" sheet, after the leading index column.
pub const REVIEW_COLUMNS: [&str; 10] = [
    "상품코드",
    "구매자 등급",
    "후기 베스트 여부",
    "리뷰 내용",
    "리뷰 글자 수",
    "사진 포함 여부",
    "사진 개수",
    "도움돼요 개수",
    "리뷰등록날짜",
    "리뷰등록경과일",
];

/// Spreadsheet sink for one collection pass.
pub struct ExcelExporter {
    workbook: Workbook,
}

impl ExcelExporter {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
        }
    }

    /// Write the "Items" sheet.
    pub fn write_items(&mut self, items: &[ItemRecord]) -> Result<()> {
        let sheet = self.workbook.add_worksheet();
        sheet.set_name("Items")?;
        write_header(sheet, &ITEM_COLUMNS)?;

        for (i, item) in items.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_number(row, 0, (i + 1) as f64)?;
            sheet.write_string(row, 1, item.id.as_str())?;
            sheet.write_string(row, 2, item.name.as_str())?;
            sheet.write_number(row, 3, item.name_length as f64)?;
            sheet.write_string(row, 4, item.brand_name.as_str())?;
            sheet.write_number(row, 5, item.sales_price as f64)?;
            sheet.write_number(row, 6, item.discounted_price as f64)?;
            sheet.write_number(row, 7, item.discount_rate as f64)?;
            sheet.write_string(row, 8, item.short_description.as_str())?;
            sheet.write_number(row, 9, item.is_applied_coupon as f64)?;
            sheet.write_string(row, 10, item.coupon_discount_rate.as_str())?;
            sheet.write_string(row, 11, item.tags.as_str())?;
            sheet.write_string(row, 12, item.delivery_types.as_str())?;
            sheet.write_number(row, 13, item.review_count as f64)?;
        }
        Ok(())
    }

    /// Write the "Reviews" sheet.
    pub fn write_reviews(&mut self, reviews: &[ReviewRecord]) -> Result<()> {
        let sheet = self.workbook.add_worksheet();
        sheet.set_name("Reviews")?;
        write_header(sheet, &REVIEW_COLUMNS)?;

        for (i, review) in reviews.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_number(row, 0, (i + 1) as f64)?;
            sheet.write_string(row, 1, review.product_no.as_str())?;
            sheet.write_string(row, 2, review.owner_grade.as_str())?;
            sheet.write_number(row, 3, review.is_best as f64)?;
            sheet.write_string(row, 4, review.contents.as_str())?;
            sheet.write_number(row, 5, review.contents_length as f64)?;
            sheet.write_number(row, 6, review.has_photos as f64)?;
            sheet.write_number(row, 7, review.photo_count as f64)?;
            sheet.write_number(row, 8, review.like_count as f64)?;
            sheet.write_string(row, 9, review.registered_at.as_str())?;
            sheet.write_number(row, 10, review.elapsed_days as f64)?;
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.workbook
            .save(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        Ok(())
    }
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Index column header stays blank; names start in column 1.
fn write_header(sheet: &mut Worksheet, columns: &[&str]) -> Result<()> {
    for (i, name) in columns.iter().enumerate() {
        sheet.write_string(0, (i + 1) as u16, *name)?;
    }
    Ok(())
}
