// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local/remote cart reconciliation.
//!
//! Runs once per login or reconnect, never on ordinary syncs. The remote
//! snapshot is the base (it is the cross-device source of truth); local
//! lines are folded into it:
//!
//! | Field            | Rule                                   |
//! |------------------|----------------------------------------|
//! | quantity         | max(remote, local)                     |
//! | `addedAt`        | later of the two                       |
//! | `savedForLater`  | local value wins                       |
//! | local-only line  | appended unchanged (pending addition)  |
//!
//! Lines keep remote order, followed by local-only lines in local order.

use std::collections::HashMap;

use crate::cart_item::{CartItem, ItemId};

/// Result of a merge, with counts for logging and metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub items: Vec<CartItem>,
    /// Lines that only existed remotely
    pub remote_only: usize,
    /// Lines that only existed locally
    pub local_only: usize,
    /// Lines present on both sides
    pub combined: usize,
    /// Whether the merged cart differs from what the remote holds
    pub differs_from_remote: bool,
}

/// Stateless merge of a local and a remote cart snapshot.
pub struct MergeEngine;

impl MergeEngine {
    #[must_use]
    pub fn merge(local: &[CartItem], remote: &[CartItem]) -> MergeReport {
        let mut merged: Vec<CartItem> = Vec::with_capacity(remote.len() + local.len());
        let mut index: HashMap<ItemId, usize> = HashMap::with_capacity(remote.len());
        let mut differs = false;

        // Malformed remote payloads may repeat an id; fold repeats into the first line.
        for item in remote {
            match index.get(&item.id) {
                Some(&i) => {
                    Self::fold(&mut merged[i], item.quantity, item.added_at, None);
                    differs = true;
                }
                None => {
                    index.insert(item.id, merged.len());
                    merged.push(item.clone());
                }
            }
        }
        let remote_lines = merged.len();

        let mut combined = 0;
        let mut local_only = 0;
        for item in local {
            match index.get(&item.id) {
                Some(&i) if i < remote_lines => {
                    combined += 1;
                    differs |= Self::fold(
                        &mut merged[i],
                        item.quantity,
                        item.added_at,
                        Some(item.saved_for_later),
                    );
                }
                Some(&i) => {
                    Self::fold(&mut merged[i], item.quantity, item.added_at, Some(item.saved_for_later));
                }
                None => {
                    local_only += 1;
                    differs = true;
                    index.insert(item.id, merged.len());
                    merged.push(item.clone());
                }
            }
        }

        MergeReport {
            items: merged,
            remote_only: remote_lines - combined,
            local_only,
            combined,
            differs_from_remote: differs,
        }
    }

    /// Apply the tie-break rules to `base`. Returns whether `base` changed.
    fn fold(
        base: &mut CartItem,
        quantity: u32,
        added_at: chrono::DateTime<chrono::Utc>,
        saved_for_later: Option<bool>,
    ) -> bool {
        let mut changed = false;
        if quantity > base.quantity {
            base.quantity = quantity;
            changed = true;
        }
        if added_at > base.added_at {
            base.added_at = added_at;
            changed = true;
        }
        // Open question for product: local save/unsave intent always wins.
        // Likewise open: a cart emptied while offline skips its remote clear, and
        // the reconnect merge (remote as base) brings the remote lines back.
        if let Some(saved) = saved_for_later {
            if saved != base.saved_for_later {
                base.saved_for_later = saved;
                changed = true;
            }
        }
        changed
    }
}
