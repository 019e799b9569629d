// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `autospares import-products`: load catalog rows from a CSV file.
//!
//! Rows are validated up front; nothing is written when any row is invalid.
//! Existing products with the same id are replaced.

use std::path::Path;

use autospares_config::StoreConfig;
use autospares_core::StoreError;
use autospares_core::types::Product;
use serde::Deserialize;
use tracing::{debug, info};

use crate::serve::open_storage;

/// One CSV row. Header names match the field names.
#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(default)]
    id: Option<String>,
    sku: String,
    name: String,
    price: f64,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    part_number: Option<String>,
    #[serde(default)]
    sale_price: Option<f64>,
    #[serde(default)]
    stock_quantity: Option<i64>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    image_url: Option<String>,
}

impl ProductRow {
    fn into_product(self, line: u64) -> Result<Product, StoreError> {
        let invalid = |message: String| StoreError::Validation(format!("line {line}: {message}"));

        let sku = self.sku.trim().to_string();
        let name = self.name.trim().to_string();
        if sku.is_empty() {
            return Err(invalid("sku must not be empty".into()));
        }
        if name.is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(invalid(format!("price must be non-negative, got {}", self.price)));
        }
        if let Some(sale) = self.sale_price
            && (!sale.is_finite() || sale < 0.0 || sale > self.price)
        {
            return Err(invalid(format!(
                "sale_price {sale} must be between 0 and price {}",
                self.price
            )));
        }
        let stock_quantity = self.stock_quantity.unwrap_or(0);
        if stock_quantity < 0 {
            return Err(invalid(format!(
                "stock_quantity must be non-negative, got {stock_quantity}"
            )));
        }

        Ok(Product {
            id: non_blank(self.id).unwrap_or_else(|| sku.clone()),
            sku,
            name,
            brand: non_blank(self.brand),
            description: non_blank(self.description),
            category: non_blank(self.category),
            part_number: non_blank(self.part_number),
            price: self.price,
            sale_price: self.sale_price,
            stock_quantity,
            is_active: self.is_active.unwrap_or(true),
            image_url: non_blank(self.image_url),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse and validate every row of a products CSV.
pub fn read_products(path: &Path) -> Result<Vec<Product>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StoreError::Validation(format!("cannot read {}: {e}", path.display())))?;

    let mut products = Vec::new();
    for record in reader.deserialize::<ProductRow>() {
        let row =
            record.map_err(|e| StoreError::Validation(format!("{}: {e}", path.display())))?;
        // Header is line 1.
        let line = products.len() as u64 + 2;
        products.push(row.into_product(line)?);
    }
    debug!(rows = products.len(), path = %path.display(), "products parsed");
    Ok(products)
}

/// Runs the `autospares import-products` command. Returns the number of rows written.
pub async fn run_import(config: &StoreConfig, path: &Path) -> Result<usize, StoreError> {
    let products = read_products(path)?;
    let storage = open_storage(config).await?;

    for product in &products {
        storage.upsert_product(product).await?;
    }
    storage.close().await?;

    info!(count = products.len(), path = %path.display(), "products imported");
    Ok(products.len())
}
