// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shopper's cart, kept in memory and mirrored to per-client storage.
//!
//! Every mutation writes the whole cart through a [`CartPersistence`]. Storage
//! failures are logged and never surface to the caller; a cart that cannot be
//! read back starts empty.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use autospares_core::StoreError;
use autospares_core::money::parse_ksh;
use autospares_core::types::{CartLine, CartSummary};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Storage key (and file stem) for the persisted cart.
pub const CART_STORAGE_KEY: &str = "autospares_cart";

/// Where a cart lives between restarts.
pub trait CartPersistence: Send + Sync {
    /// The saved cart, or `None` when nothing was saved.
    fn load(&self) -> Result<Option<Vec<CartLine>>, StoreError>;
    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError>;
    fn remove(&self) -> Result<(), StoreError>;
}

/// Stores the cart as `<dir>/autospares_cart.json`.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{CART_STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(e: std::io::Error) -> StoreError {
    StoreError::Storage { source: e.into() }
}

impl CartPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<Vec<CartLine>>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(e)),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string(lines)?;
        // Write-then-rename so a crash never leaves half a cart behind.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_error)?;
        std::fs::rename(&tmp, &self.path).map_err(io_error)
    }

    fn remove(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}

/// In-process storage holding the serialized cart, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored JSON, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// Overwrite the stored JSON, e.g. with something unparseable.
    pub fn set_raw(&self, raw: impl Into<String>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(raw.into());
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Internal("cart storage lock poisoned".into())
}

impl CartPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<Vec<CartLine>>, StoreError> {
        let slot = self.slot.lock().map_err(|_| poisoned())?;
        match slot.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        let json = serde_json::to_string(lines)?;
        *self.slot.lock().map_err(|_| poisoned())? = Some(json);
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        *self.slot.lock().map_err(|_| poisoned())? = None;
        Ok(())
    }
}

/// A product as shown on a listing, ready to be added to the cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    /// Display price such as `KSh 5,000`.
    #[serde(default)]
    pub price: String,
    /// Numeric price; preferred over parsing `price` when positive.
    #[serde(default)]
    pub price_value: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductCard {
    /// Numeric price, falling back to the display price, then zero.
    pub fn unit_price(&self) -> f64 {
        self.price_value
            .filter(|p| p.is_finite() && *p > 0.0)
            .or_else(|| parse_ksh(&self.price))
            .unwrap_or(0.0)
    }
}

/// The shopper's cart.
pub struct CartStore {
    lines: Vec<CartLine>,
    persistence: Box<dyn CartPersistence>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").field("lines", &self.lines).finish()
    }
}

impl CartStore {
    /// Restore the cart saved in `persistence`, or start empty.
    pub fn load(persistence: impl CartPersistence + 'static) -> Self {
        let lines = match persistence.load() {
            Ok(Some(lines)) => lines,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "saved cart is unreadable, starting empty");
                Vec::new()
            }
        };
        Self {
            lines,
            persistence: Box::new(persistence),
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add one unit of `product`.
    pub fn add(&mut self, product: &ProductCard) {
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLine {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                brand: product.brand.clone(),
                quantity: 1,
                unit_price: product.unit_price(),
                image_url: product.image_url.clone(),
            }),
        }
        self.persist();
    }

    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
        self.persist();
    }

    /// Set a line's quantity; zero removes the line. Unknown ids are ignored.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
        self.persist();
    }

    /// Empty the cart and drop the persisted copy.
    pub fn clear(&mut self) {
        self.lines.clear();
        if let Err(e) = self.persistence.remove() {
            warn!(error = %e, "failed to remove saved cart");
        }
    }

    /// Replace the cart with a server snapshot. Returns `false` when nothing changed.
    pub fn apply_remote(&mut self, lines: Vec<CartLine>) -> bool {
        if lines == self.lines {
            return false;
        }
        self.lines = lines;
        self.persist();
        true
    }

    /// Σ unit_price × quantity.
    pub fn total_price(&self) -> f64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Σ quantity.
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary::from_lines(self.lines.clone())
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.lines) {
            warn!(error = %e, "failed to save cart");
        }
    }
}
