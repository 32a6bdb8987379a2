//! Per-address critical sections for transaction building
//!
//! Between fetching the UTXO set and recording the broadcast transaction as
//! pending, a second build from the same address would not yet see the first
//! one's lock and could pick the same outputs. [`AddressLocks`] serialises
//! "select, assemble, sign, record pending" per source address: hold the
//! [`AddressGuard`] until the new transaction is in the pending store.

use crate::logging::{self, sanitize_for_logging, LogLevel};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive build slot for one address; released on drop
#[derive(Debug)]
pub struct AddressGuard {
    address: String,
    _guard: OwnedMutexGuard<()>,
}

impl AddressGuard {
    /// Address this guard serialises
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Registry of per-address async mutexes, created on first use
#[derive(Debug, Clone, Default)]
pub struct AddressLocks {
    slots: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl AddressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, address: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Drop slots nobody holds or waits on so the map does not grow forever.
        slots.retain(|key, slot| key == address || Arc::strong_count(slot) > 1);
        slots
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `address`
    pub async fn acquire(&self, address: &str) -> AddressGuard {
        let slot = self.slot(address);
        let guard = slot.lock_owned().await;

        logging::log_locks(
            LogLevel::Trace,
            "address build lock acquired",
            Some(json!({ "address": sanitize_for_logging(address) })),
        );

        AddressGuard {
            address: address.to_string(),
            _guard: guard,
        }
    }

    /// Take exclusive access to `address` only if nobody holds it
    pub fn try_acquire(&self, address: &str) -> Option<AddressGuard> {
        let slot = self.slot(address);
        let guard = slot.try_lock_owned().ok()?;
        Some(AddressGuard {
            address: address.to_string(),
            _guard: guard,
        })
    }

    /// Number of addresses with a live slot
    pub fn tracked_addresses(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_address_is_exclusive() {
        let locks = AddressLocks::new();
        let guard = locks.acquire("bc1qalice").await;
        assert_eq!(guard.address(), "bc1qalice");

        assert!(locks.try_acquire("bc1qalice").is_none());
        assert!(locks.try_acquire("bc1qbob").is_some());

        drop(guard);
        assert!(locks.try_acquire("bc1qalice").is_some());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let locks = AddressLocks::new();
        let guard = locks.acquire("bc1qalice").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("bc1qalice").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_slots_are_pruned() {
        let locks = AddressLocks::new();
        drop(locks.acquire("bc1qalice").await);
        drop(locks.acquire("bc1qbob").await);
        drop(locks.acquire("bc1qcarol").await);
        assert_eq!(locks.tracked_addresses(), 1);
    }
}
