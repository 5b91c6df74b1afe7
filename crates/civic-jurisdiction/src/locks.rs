//! Per-seat locks serializing leader assignment.
//!
//! A seat is a (role, location) pair. Assignments to different seats run in
//! parallel; two assignments to the same seat queue behind each other so the
//! "is there already a leader" check and the write see a consistent store.

use std::collections::HashMap;
use std::sync::Arc;

use civic_core::LocationId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::Role;

/// Key identifying one leader seat.
pub type SeatKey = (Role, LocationId);

#[derive(Debug, Default)]
pub struct LeaderLocks {
    seats: Mutex<HashMap<SeatKey, Arc<Mutex<()>>>>,
}

impl LeaderLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of a seat. Released when the guard drops.
    pub async fn acquire(&self, role: Role, location_id: LocationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut seats = self.seats.lock().await;
            // Drop seats nobody is holding or waiting on.
            seats.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                seats
                    .entry((role, location_id))
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of seats currently tracked.
    pub async fn tracked(&self) -> usize {
        self.seats.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_seat_is_exclusive() {
        let locks = Arc::new(LeaderLocks::new());
        let village = LocationId::new();

        let guard = locks.acquire(Role::Chairman, village).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.acquire(Role::Chairman, village).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_seats_do_not_block() {
        let locks = LeaderLocks::new();
        let village = LocationId::new();

        let _chairman = locks.acquire(Role::Chairman, village).await;
        let other = tokio::time::timeout(
            Duration::from_secs(1),
            locks.acquire(Role::Chairman, LocationId::new()),
        )
        .await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_released_seats_are_pruned() {
        let locks = LeaderLocks::new();
        for _ in 0..3 {
            let _g = locks.acquire(Role::Mayor, LocationId::new()).await;
        }
        // The last acquire pruned the two released seats before adding its own.
        assert_eq!(locks.tracked().await, 1);
    }
}
