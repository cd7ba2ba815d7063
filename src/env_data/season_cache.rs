//! In-memory cache of season tables.
//!
//! Entries are evicted least-recently-used once `capacity` seasons are held. Each
//! season id owns a [`OnceCell`], so concurrent requests for a season that is not
//! cached yet share a single fetch instead of racing.

use log::debug;
use polars::prelude::DataFrame;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

type Slot = Arc<OnceCell<DataFrame>>;

pub struct SeasonCache {
    capacity: usize,
    state: Mutex<LruState>,
}

#[derive(Default)]
struct LruState {
    slots: HashMap<i64, Slot>,
    // Front = least recently used.
    order: VecDeque<i64>,
}

impl LruState {
    fn touch(&mut self, season_id: i64) {
        if let Some(pos) = self.order.iter().position(|id| *id == season_id) {
            self.order.remove(pos);
        }
        self.order.push_back(season_id);
    }

    fn remove(&mut self, season_id: i64) {
        self.slots.remove(&season_id);
        self.order.retain(|id| *id != season_id);
    }

    fn slot(&mut self, season_id: i64, capacity: usize) -> Slot {
        if let Some(slot) = self.slots.get(&season_id).cloned() {
            self.touch(season_id);
            return slot;
        }
        while self.slots.len() >= capacity {
            let Some(evicted) = self.order.pop_front() else {
                break;
            };
            debug!("Evicting season {} from cache", evicted);
            self.slots.remove(&evicted);
        }
        let slot = Slot::default();
        self.slots.insert(season_id, slot.clone());
        self.order.push_back(season_id);
        slot
    }
}

impl SeasonCache {
    /// Creates a cache holding at most `capacity` seasons (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the cached table for `season_id`, running `fetch` to populate it
    /// when absent. Only one `fetch` runs per season at a time; a failed fetch
    /// leaves the season uncached.
    pub async fn get_or_try_fetch<F, Fut, E>(&self, season_id: i64, fetch: F) -> Result<DataFrame, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DataFrame, E>>,
    {
        let slot = {
            let mut state = self.state.lock().await;
            state.slot(season_id, self.capacity)
        };

        match slot.get_or_try_init(fetch).await {
            Ok(frame) => Ok(frame.clone()),
            Err(e) => {
                let mut state = self.state.lock().await;
                let stale = state
                    .slots
                    .get(&season_id)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot) && !current.initialized());
                if stale {
                    state.remove(season_id);
                }
                Err(e)
            }
        }
    }

    /// Cached table for `season_id`, if populated. Counts as a use for eviction.
    pub async fn get(&self, season_id: i64) -> Option<DataFrame> {
        let mut state = self.state.lock().await;
        let frame = state.slots.get(&season_id)?.get().cloned()?;
        state.touch(season_id);
        Some(frame)
    }

    /// Season ids with a populated table, least recently used first.
    pub async fn cached_ids(&self) -> Vec<i64> {
        let state = self.state.lock().await;
        state
            .order
            .iter()
            .copied()
            .filter(|id| state.slots.get(id).is_some_and(|slot| slot.initialized()))
            .collect()
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.slots.clear();
        state.order.clear();
    }
}
