// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The counter wide-row surface.
//!
//! A [`CounterMap`] gives keyed access to the counter columns of one wide
//! row: point reads, atomic relative increments, bounded range reads in
//! either direction, and lazy paged iteration. The counter surface is
//! narrow: columns cannot be removed, cannot expire, and do not accept
//! per-call consistency overrides. Those calls fail through the
//! [`ConsistencyGate`] after clearing the shared flush context.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use log::trace;

use crate::bounds::point_boundary;
use crate::bounds::range_boundaries;
use crate::bounds::BoundingMode;
use crate::bounds::OrderingMode;
use crate::codec::KeyCodec;
use crate::consistency::ConsistencyConfig;
use crate::consistency::ConsistencyLevel;
use crate::consistency::FlushContext;
use crate::error::WideRowError;
use crate::executor::fetch_slice;
use crate::gate::ConsistencyGate;
use crate::gate::CounterOp;
use crate::gate::OpScope;
use crate::paging::PagedIter;
use crate::project::to_keys;
use crate::project::to_pairs;
use crate::project::to_values;
use crate::project::CounterValue;
use crate::store::CounterStore;
use crate::store::RowId;

/// Keyed counter columns of one wide row.
///
/// - `K`: column key type, totally ordered.
/// - `C`: order-preserving codec for `K`.
/// - `S`: storage client.
pub struct CounterMap<K, C, S> {
    row: RowId,
    codec: C,
    store: S,
    gate: ConsistencyGate,
    config: ConsistencyConfig,
    _key: PhantomData<fn() -> K>,
}

impl<K, C, S> CounterMap<K, C, S>
where
    K: Ord + Clone + fmt::Debug + Send + Sync,
    C: KeyCodec<K>,
    S: CounterStore,
{
    /// Bind a counter surface to a row.
    ///
    /// `ctx` is the flush context of the surrounding unit of work, shared
    /// with every other operation dispatched in that scope. `config` is the
    /// read/write consistency carried by the counter value type.
    pub fn new(
        row: RowId,
        codec: C,
        store: S,
        ctx: Arc<Mutex<FlushContext>>,
        config: ConsistencyConfig,
    ) -> Self {
        Self {
            row,
            codec,
            store,
            gate: ConsistencyGate::new(ctx),
            config,
            _key: PhantomData,
        }
    }

    /// Read one counter column. A column that was never incremented is
    /// `None`.
    pub async fn get(&self, key: &K) -> Result<Option<CounterValue>, WideRowError> {
        self.gate.admit(CounterOp::Get, OpScope::Default)?;
        trace!(
            "get counter row={:?} key={:?} level={:?}",
            self.row,
            key,
            self.read_level()
        );

        // A point lookup is a zero-width slice on the equal boundary.
        let point = point_boundary(&self.codec, key);
        let columns = fetch_slice(&self.store, &self.row, &point, &point, 1, false).await?;
        Ok(columns.first().map(|col| CounterValue::new(col.value)))
    }

    /// Read one counter column, ignoring the requested consistency level.
    ///
    /// Reading a counter always happens at the level configured on the
    /// counter value itself; the override is accepted and dropped, with no
    /// error and no flush-context mutation. Behaves identically to
    /// [`get`](Self::get).
    pub async fn get_with_level(
        &self,
        key: &K,
        _level: ConsistencyLevel,
    ) -> Result<Option<CounterValue>, WideRowError> {
        self.gate.admit(CounterOp::Get, OpScope::PerCall)?;
        self.get(key).await
    }

    /// Atomically add `delta` to the counter column at `key`.
    ///
    /// Either fully applies the delta or fails with `StorageUnavailable`;
    /// on failure the flush context is cleared before the error is returned.
    pub async fn increment(&self, key: &K, delta: i64) -> Result<(), WideRowError> {
        self.gate
            .admit(CounterOp::Increment { with_ttl: false }, OpScope::Default)?;
        trace!(
            "increment counter row={:?} key={:?} delta={} level={:?}",
            self.row,
            key,
            delta,
            self.write_level()
        );

        let name = self.codec.encode(key);
        match self.store.atomic_increment(&self.row, &name, delta).await {
            Ok(()) => Ok(()),
            Err(err) => {
                trace!("increment failed, clearing flush context");
                self.gate.clear_flush_context();
                Err(WideRowError::storage(err))
            }
        }
    }

    /// Counter columns cannot expire; this always fails.
    pub async fn increment_with_ttl(
        &self,
        _key: &K,
        _delta: i64,
        _ttl: Duration,
    ) -> Result<(), WideRowError> {
        self.gate
            .admit(CounterOp::Increment { with_ttl: true }, OpScope::Default)
    }

    /// Counter writes do not accept per-call consistency; this always fails.
    pub async fn increment_with_level(
        &self,
        _key: &K,
        _delta: i64,
        _level: ConsistencyLevel,
    ) -> Result<(), WideRowError> {
        self.gate
            .admit(CounterOp::Increment { with_ttl: false }, OpScope::PerCall)
    }

    /// Fetch up to `limit` columns of `[start, end]` as key/counter pairs,
    /// in the requested order.
    pub async fn find(
        &self,
        start: &K,
        end: &K,
        limit: usize,
        bounds: BoundingMode,
        ordering: OrderingMode,
    ) -> Result<Vec<(K, CounterValue)>, WideRowError> {
        self.gate.admit(CounterOp::Find, OpScope::Default)?;
        let columns = self.fetch_range(start, end, limit, bounds, ordering).await?;
        to_pairs(&self.codec, columns)
    }

    /// Same range contract as [`find`](Self::find), counter values only.
    pub async fn find_values(
        &self,
        start: &K,
        end: &K,
        limit: usize,
        bounds: BoundingMode,
        ordering: OrderingMode,
    ) -> Result<Vec<CounterValue>, WideRowError> {
        self.gate.admit(CounterOp::FindValues, OpScope::Default)?;
        let columns = self.fetch_range(start, end, limit, bounds, ordering).await?;
        Ok(to_values(columns))
    }

    /// Same range contract as [`find`](Self::find), keys only.
    pub async fn find_keys(
        &self,
        start: &K,
        end: &K,
        limit: usize,
        bounds: BoundingMode,
        ordering: OrderingMode,
    ) -> Result<Vec<K>, WideRowError> {
        self.gate.admit(CounterOp::FindKeys, OpScope::Default)?;
        let columns = self.fetch_range(start, end, limit, bounds, ordering).await?;
        to_keys(&self.codec, columns)
    }

    /// Lazily iterate `[start, end]`, fetching `page_size` columns per batch.
    ///
    /// Bounds are validated here, before any storage call. The returned
    /// iterator is single-consumer and not restartable after a failure.
    pub fn iter(
        &self,
        start: &K,
        end: &K,
        page_size: usize,
        bounds: BoundingMode,
        ordering: OrderingMode,
    ) -> Result<PagedIter<'_, K, C, S>, WideRowError> {
        self.gate.admit(CounterOp::Iterate, OpScope::Default)?;
        trace!(
            "iterate counter row={:?} range={:?}/{:?} bounds={:?} ordering={:?} page={}",
            self.row,
            start,
            end,
            bounds,
            ordering,
            page_size
        );
        PagedIter::new(
            &self.store,
            &self.codec,
            &self.row,
            start,
            end,
            page_size,
            bounds,
            ordering,
        )
    }

    /// Counter range reads do not accept per-call consistency; always fails.
    pub async fn find_with_level(
        &self,
        _start: &K,
        _end: &K,
        _limit: usize,
        _bounds: BoundingMode,
        _ordering: OrderingMode,
        _level: ConsistencyLevel,
    ) -> Result<Vec<(K, CounterValue)>, WideRowError> {
        self.gate.admit(CounterOp::Find, OpScope::PerCall)?;
        unreachable!("per-call consistency is never admitted for find")
    }

    /// Counter range reads do not accept per-call consistency; always fails.
    pub async fn find_values_with_level(
        &self,
        _start: &K,
        _end: &K,
        _limit: usize,
        _bounds: BoundingMode,
        _ordering: OrderingMode,
        _level: ConsistencyLevel,
    ) -> Result<Vec<CounterValue>, WideRowError> {
        self.gate.admit(CounterOp::FindValues, OpScope::PerCall)?;
        unreachable!("per-call consistency is never admitted for find_values")
    }

    /// Counter range reads do not accept per-call consistency; always fails.
    pub async fn find_keys_with_level(
        &self,
        _start: &K,
        _end: &K,
        _limit: usize,
        _bounds: BoundingMode,
        _ordering: OrderingMode,
        _level: ConsistencyLevel,
    ) -> Result<Vec<K>, WideRowError> {
        self.gate.admit(CounterOp::FindKeys, OpScope::PerCall)?;
        unreachable!("per-call consistency is never admitted for find_keys")
    }

    /// Counter iteration does not accept per-call consistency; always fails.
    pub fn iter_with_level(
        &self,
        _start: &K,
        _end: &K,
        _page_size: usize,
        _bounds: BoundingMode,
        _ordering: OrderingMode,
        _level: ConsistencyLevel,
    ) -> Result<PagedIter<'_, K, C, S>, WideRowError> {
        self.gate.admit(CounterOp::Iterate, OpScope::PerCall)?;
        unreachable!("per-call consistency is never admitted for iter")
    }

    /// Counter columns cannot be removed; this always fails.
    pub async fn remove(&self, _key: &K) -> Result<(), WideRowError> {
        self.gate.admit(CounterOp::Remove, OpScope::Default)
    }

    /// Counter columns cannot be removed; this always fails.
    pub async fn remove_range(
        &self,
        _start: &K,
        _end: &K,
        _bounds: BoundingMode,
    ) -> Result<(), WideRowError> {
        self.gate.admit(CounterOp::RemoveRange, OpScope::Default)
    }

    /// Counter columns cannot be removed; this always fails.
    pub async fn remove_first(&self, _count: usize) -> Result<(), WideRowError> {
        self.gate.admit(CounterOp::RemoveFirst, OpScope::Default)
    }

    /// Counter columns cannot be removed; this always fails.
    pub async fn remove_last(&self, _count: usize) -> Result<(), WideRowError> {
        self.gate.admit(CounterOp::RemoveLast, OpScope::Default)
    }

    /// Counter columns cannot be removed; this always fails.
    pub async fn remove_with_level(
        &self,
        _key: &K,
        _level: ConsistencyLevel,
    ) -> Result<(), WideRowError> {
        self.gate.admit(CounterOp::Remove, OpScope::PerCall)
    }

    async fn fetch_range(
        &self,
        start: &K,
        end: &K,
        limit: usize,
        bounds: BoundingMode,
        ordering: OrderingMode,
    ) -> Result<Vec<crate::store::RawColumn>, WideRowError> {
        let (low, high) = range_boundaries(&self.codec, start, end, bounds, ordering)?;
        trace!(
            "find counter range row={:?} range={:?}/{:?} bounds={:?} ordering={:?} limit={} level={:?}",
            self.row,
            start,
            end,
            bounds,
            ordering,
            limit,
            self.read_level()
        );
        fetch_slice(
            &self.store,
            &self.row,
            &low,
            &high,
            limit,
            ordering.is_reverse(),
        )
        .await
    }

    fn read_level(&self) -> ConsistencyLevel {
        self.lock_ctx().current_read_level(&self.config)
    }

    fn write_level(&self) -> ConsistencyLevel {
        self.lock_ctx().current_write_level(&self.config)
    }

    fn lock_ctx(&self) -> std::sync::MutexGuard<'_, FlushContext> {
        self.gate
            .flush_context()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
