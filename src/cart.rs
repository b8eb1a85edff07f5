//! In-memory cart and its mutation rules.
//!
//! [`Cart`] is a plain ordered list of [`CartItem`]s, logically partitioned
//! into active and saved-for-later lines. It has no I/O: the session layer
//! wraps every mutation with persistence and sync scheduling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart_item::{CartItem, ItemDescriptor, ItemId};

/// What an [`Cart::add`] did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New active line with quantity 1
    Added,
    /// Existing active line bumped to `quantity`
    Incremented { quantity: u32 },
    /// Saved line moved back into the cart with quantity 1
    Reactivated,
}

/// Ordered cart contents.
///
/// Invariants: every line has `quantity >= 1`, and there is at most one
/// active line per item id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from stored lines, dropping any with quantity 0.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self {
            items: items.into_iter().filter(|item| item.quantity > 0).collect(),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// True when neither active nor saved lines remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn active_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|item| item.is_active())
    }

    #[must_use]
    pub fn saved_items(&self) -> Vec<CartItem> {
        self.items.iter().filter(|item| item.saved_for_later).cloned().collect()
    }

    /// Sum of quantities over active lines, saturating at `u32::MAX`.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.active_items()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    /// Sum of price x quantity over active lines.
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.active_items().map(CartItem::line_total).sum()
    }

    /// Active lines added less than `window` before `now`.
    #[must_use]
    pub fn recently_added(&self, window: chrono::Duration, now: DateTime<Utc>) -> Vec<CartItem> {
        self.active_items()
            .filter(|item| item.added_within(window, now))
            .cloned()
            .collect()
    }

    /// Add one unit of a product.
    ///
    /// An active line is incremented, a saved line is reactivated at quantity 1,
    /// otherwise a new line is appended. `added_at` is refreshed in every case.
    pub fn add(&mut self, descriptor: ItemDescriptor, now: DateTime<Utc>) -> AddOutcome {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.id == descriptor.id && item.is_active())
        {
            item.quantity = item.quantity.saturating_add(1);
            item.added_at = now;
            return AddOutcome::Incremented { quantity: item.quantity };
        }

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.id == descriptor.id && item.saved_for_later)
        {
            item.saved_for_later = false;
            item.quantity = 1;
            item.added_at = now;
            return AddOutcome::Reactivated;
        }

        let mut item = CartItem::from_descriptor(descriptor);
        item.added_at = now;
        self.items.push(item);
        AddOutcome::Added
    }

    /// Remove a line outright, active or saved.
    pub fn remove(&mut self, id: ItemId) -> Option<CartItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Set a line's quantity. Returns `false` if the item is not in the cart.
    ///
    /// Quantities below 1 are the caller's job (they mean removal).
    pub fn set_quantity(&mut self, id: ItemId, quantity: u32) -> bool {
        debug_assert!(quantity >= 1);
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Flag a line as saved for later. Returns `false` if the item is not in the cart.
    pub fn save_for_later(&mut self, id: ItemId) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.saved_for_later = true;
                true
            }
            None => false,
        }
    }

    /// Move a saved line back into the cart, counting as a fresh addition.
    pub fn move_to_cart(&mut self, id: ItemId, now: DateTime<Utc>) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.saved_for_later = false;
                item.added_at = now;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
