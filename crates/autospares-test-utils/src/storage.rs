// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-database storage fixtures.

use std::sync::Arc;

use autospares_config::model::StorageConfig;
use autospares_core::types::{ChatSession, Product};
use autospares_core::StorageAdapter;
use autospares_storage::SqliteStorage;
use tempfile::TempDir;

/// An initialized SQLite adapter in a fresh temp directory.
///
/// Keep the `TempDir` alive for as long as the storage is used.
pub async fn temp_storage() -> (Arc<dyn StorageAdapter>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("test.db");
    let storage = SqliteStorage::new(StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        wal_mode: true,
    });
    storage.initialize().await.expect("storage initializes");
    (Arc::new(storage), dir)
}

/// Inserts a session row with a fixed id and token.
pub async fn seed_session(storage: &dyn StorageAdapter, id: &str, token: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    storage
        .create_session(&ChatSession {
            id: id.to_string(),
            user_token: token.to_string(),
            title: Some("Test Chat".to_string()),
            email: None,
            phone: None,
            created_at: now.clone(),
            updated_at: now,
        })
        .await
        .expect("seed session");
}

/// An active, in-stock catalog product.
pub fn sample_product(id: &str, name: &str, price: f64) -> Product {
    Product {
        id: id.to_string(),
        sku: format!("SKU-{id}"),
        name: name.to_string(),
        brand: Some("Bosch".to_string()),
        description: Some(format!("{name} for Japanese imports")),
        category: Some("general".to_string()),
        part_number: None,
        price,
        sale_price: None,
        stock_quantity: 10,
        is_active: true,
        image_url: None,
    }
}

/// Upserts each product, panicking on failure.
pub async fn seed_products(storage: &dyn StorageAdapter, products: &[Product]) {
    for product in products {
        storage.upsert_product(product).await.expect("seed product");
    }
}
