//! Cart item data structure.
//!
//! The [`CartItem`] is the unit that flows through every tier: the in-memory
//! cart, both local tiers and the remote gateway. It serializes with the
//! storefront's camelCase keys and ISO-8601 `addedAt` timestamps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product identifier. Unique per product, so at most one entry per id.
pub type ItemId = u64;

/// Authenticated user a remote cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    pub name: String,
    pub verified: bool,
}

/// What the UI hands to `add_item`: a product listing without cart state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub id: ItemId,
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub image: String,
    pub seller: Seller,
}

/// A line in the cart.
///
/// # Example
///
/// ```
/// use cart_sync::{CartItem, ItemDescriptor, Seller};
///
/// let item = CartItem::from_descriptor(ItemDescriptor {
///     id: 7,
///     title: "Charizard holo".into(),
///     price: 120.0,
///     currency: "USD".into(),
///     image: "/cards/charizard.png".into(),
///     seller: Seller { name: "PokéVault".into(), verified: true },
/// });
///
/// assert_eq!(item.quantity, 1);
/// assert!(!item.saved_for_later);
/// assert_eq!(item.line_total(), 120.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ItemId,
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub image: String,
    /// Always >= 1 while the item is in a cart
    pub quantity: u32,
    pub seller: Seller,
    #[serde(default)]
    pub saved_for_later: bool,
    /// Refreshed on every addition or reactivation; absent payload values read as "now"
    #[serde(default = "chrono::Utc::now")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Fresh active line with quantity 1.
    #[must_use]
    pub fn from_descriptor(descriptor: ItemDescriptor) -> Self {
        Self {
            id: descriptor.id,
            title: descriptor.title,
            price: descriptor.price,
            currency: descriptor.currency,
            image: descriptor.image,
            quantity: 1,
            seller: descriptor.seller,
            saved_for_later: false,
            added_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.saved_for_later
    }

    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    /// Whether the item was added less than `window` before `now`.
    #[must_use]
    pub fn added_within(&self, window: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.added_at) < window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(id: ItemId) -> ItemDescriptor {
        ItemDescriptor {
            id,
            title: format!("Card {}", id),
            price: 2.5,
            currency: "USD".into(),
            image: format!("/img/{}.png", id),
            seller: Seller { name: "shop".into(), verified: false },
        }
    }

    #[test]
    fn test_serializes_camel_case_with_iso_timestamp() {
        let mut item = CartItem::from_descriptor(descriptor(1));
        item.added_at = "2024-05-01T10:00:00Z".parse().unwrap();

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["savedForLater"], json!(false));
        assert_eq!(value["addedAt"], json!("2024-05-01T10:00:00Z"));
        assert!(value.get("saved_for_later").is_none());
    }

    #[test]
    fn test_missing_optional_fields_get_defaults() {
        let before = Utc::now();
        let item: CartItem = serde_json::from_value(json!({
            "id": 3,
            "title": "Pikachu",
            "price": 1.0,
            "currency": "USD",
            "image": "",
            "quantity": 2,
            "seller": {"name": "s", "verified": true}
        }))
        .unwrap();

        assert!(!item.saved_for_later);
        assert!(item.added_at >= before);
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_added_within_window() {
        let mut item = CartItem::from_descriptor(descriptor(1));
        let now = Utc::now();
        item.added_at = now - chrono::Duration::minutes(4);
        assert!(item.added_within(chrono::Duration::minutes(5), now));

        item.added_at = now - chrono::Duration::minutes(6);
        assert!(!item.added_within(chrono::Duration::minutes(5), now));
    }

    #[test]
    fn test_line_total() {
        let mut item = CartItem::from_descriptor(descriptor(1));
        item.quantity = 4;
        assert_eq!(item.line_total(), 10.0);
    }
}
