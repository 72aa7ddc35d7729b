//! Injectable record stores
//!
//! Purpose:
//!     Keep the core logic independent of storage. The engine only needs
//!     get/put/list-by-owner; the in-memory maps are one conforming
//!     implementation (and the test double). A horizontally-scaled
//!     deployment would swap in an external store with per-key
//!     compare-and-swap on status transitions.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use crate::bundle::BundleRecord;
use crate::types::SwapRecord;
use alloy::primitives::Address;
use dashmap::DashMap;

pub trait SwapStore: Send + Sync {
    fn get(&self, swap_id: &str) -> Option<SwapRecord>;
    fn put(&self, record: SwapRecord);
    fn list_by_owner(&self, owner: Address) -> Vec<SwapRecord>;
}

pub trait BundleStore: Send + Sync {
    fn get(&self, bundle_id: &str) -> Option<BundleRecord>;
    fn put(&self, record: BundleRecord);
    fn list_by_owner(&self, owner: Address) -> Vec<BundleRecord>;
}

/// Process-local swap history. Records are soft-retained for the lifetime
/// of the process; nothing is ever deleted.
#[derive(Default)]
pub struct InMemorySwapStore {
    records: DashMap<String, SwapRecord>,
}

impl InMemorySwapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SwapStore for InMemorySwapStore {
    fn get(&self, swap_id: &str) -> Option<SwapRecord> {
        self.records.get(swap_id).map(|r| r.clone())
    }

    fn put(&self, record: SwapRecord) {
        self.records.insert(record.swap_id.clone(), record);
    }

    fn list_by_owner(&self, owner: Address) -> Vec<SwapRecord> {
        let mut out: Vec<SwapRecord> = self
            .records
            .iter()
            .filter(|r| r.request.user_address == owner)
            .map(|r| r.clone())
            .collect();
        out.sort_by_key(|r| r.created_at);
        out
    }
}

#[derive(Default)]
pub struct InMemoryBundleStore {
    records: DashMap<String, BundleRecord>,
}

impl InMemoryBundleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BundleStore for InMemoryBundleStore {
    fn get(&self, bundle_id: &str) -> Option<BundleRecord> {
        self.records.get(bundle_id).map(|r| r.clone())
    }

    fn put(&self, record: BundleRecord) {
        self.records.insert(record.bundle_id.clone(), record);
    }

    fn list_by_owner(&self, owner: Address) -> Vec<BundleRecord> {
        let mut out: Vec<BundleRecord> = self
            .records
            .iter()
            .filter(|r| r.owner == owner)
            .map(|r| r.clone())
            .collect();
        out.sort_by_key(|r| r.created_at);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Quote, SwapRequest};
    use alloy::primitives::U256;
    use chrono::Utc;

    fn record(owner_byte: u8) -> SwapRecord {
        let request = SwapRequest::new(
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            U256::from(1_000_000u64),
            1,
            Address::repeat_byte(owner_byte),
        );
        let quote = Quote {
            to_amount: U256::from(999_000u64),
            estimated_gas: 210_000,
            route: vec![],
        };
        SwapRecord::new(request, quote, Utc::now() + chrono::Duration::seconds(300))
    }

    #[test]
    fn test_get_after_put_round_trips() {
        let store = InMemorySwapStore::new();
        let rec = record(0xaa);
        let id = rec.swap_id.clone();
        store.put(rec);
        assert_eq!(store.get(&id).unwrap().swap_id, id);
        assert!(store.get("swap_unknown").is_none());
    }

    #[test]
    fn test_list_by_owner_filters() {
        let store = InMemorySwapStore::new();
        store.put(record(0xaa));
        store.put(record(0xaa));
        store.put(record(0xbb));
        assert_eq!(store.list_by_owner(Address::repeat_byte(0xaa)).len(), 2);
        assert_eq!(store.list_by_owner(Address::repeat_byte(0xbb)).len(), 1);
        assert!(store.list_by_owner(Address::repeat_byte(0xcc)).is_empty());
    }
}
