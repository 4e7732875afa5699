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

//! Lazy paged iteration over a column range.
//!
//! [`PagedIter`] fetches the range in batches of `page_size` columns. The
//! first fetch honors the caller's bounding mode; every continuation fetch
//! starts exclusively after the last-seen key, so no column is emitted twice.
//! The sequence is finite, forward-only and non-restartable.
//!
//! A `PagedIter` is a single-consumer object. Pulling from one instance from
//! two tasks concurrently is not supported; share it only behind external
//! synchronization.

use std::collections::VecDeque;
use std::fmt;

use futures_util::StreamExt;

use crate::bounds::check_bounds;
use crate::bounds::range_boundaries;
use crate::bounds::BoundingMode;
use crate::bounds::OrderingMode;
use crate::codec::KeyCodec;
use crate::error::WideRowError;
use crate::executor::fetch_slice;
use crate::project::to_pairs;
use crate::project::CounterValue;
use crate::store::CounterStore;
use crate::store::RowId;
use crate::CounterResultStream;

#[derive(Debug, Clone, PartialEq, Eq)]
enum IterState {
    /// More pages may exist.
    Active,
    /// The range is exhausted; drain the buffer and stop.
    Exhausted,
    /// A fetch failed. Every subsequent pull re-raises the same error.
    Failed(WideRowError),
}

/// Lazy batch-prefetching view of a column range.
pub struct PagedIter<'a, K, C, S>
where C: ?Sized, S: ?Sized
{
    store: &'a S,
    codec: &'a C,
    row: &'a RowId,
    ordering: OrderingMode,
    page_size: usize,

    /// Logical far end of the range and whether it is part of it.
    end: K,
    end_inclusive: bool,

    /// Logical start of the next fetch. Inclusive only for the first page;
    /// afterwards it is the last-seen key, exclusive.
    cursor: K,
    cursor_inclusive: bool,

    buf: VecDeque<(K, CounterValue)>,
    state: IterState,
}

impl<'a, K, C, S> PagedIter<'a, K, C, S>
where
    K: Ord + Clone,
    C: KeyCodec<K> + ?Sized,
    S: CounterStore + ?Sized,
{
    /// Set up iteration over `[start, end]` under `bounds` and `ordering`.
    ///
    /// Endpoint validation happens here, before any storage call; a
    /// `page_size` of zero is treated as one.
    pub(crate) fn new(
        store: &'a S,
        codec: &'a C,
        row: &'a RowId,
        start: &K,
        end: &K,
        page_size: usize,
        bounds: BoundingMode,
        ordering: OrderingMode,
    ) -> Result<Self, WideRowError> {
        check_bounds(start, end, ordering)?;

        let (start_inclusive, end_inclusive) = bounds.flags();
        Ok(Self {
            store,
            codec,
            row,
            ordering,
            page_size: page_size.max(1),
            end: end.clone(),
            end_inclusive,
            cursor: start.clone(),
            cursor_inclusive: start_inclusive,
            buf: VecDeque::new(),
            state: IterState::Active,
        })
    }

    /// Pull the next projected column, fetching a new page when the current
    /// one is drained.
    pub async fn try_next(&mut self) -> Result<Option<(K, CounterValue)>, WideRowError> {
        loop {
            if let Some(item) = self.buf.pop_front() {
                return Ok(Some(item));
            }
            match &self.state {
                IterState::Failed(err) => return Err(err.clone()),
                IterState::Exhausted => return Ok(None),
                IterState::Active => self.fetch_page().await?,
            }
        }
    }

    /// Drain the remaining sequence into a vec.
    pub async fn try_collect(mut self) -> Result<Vec<(K, CounterValue)>, WideRowError> {
        let mut out = Vec::new();
        while let Some(item) = self.try_next().await? {
            out.push(item);
        }
        Ok(out)
    }

    /// Adapt into a stream of projected columns.
    pub fn into_stream(self) -> CounterResultStream<'a, K>
    where
        K: Send + Sync + 'a,
        C: Sync,
        S: Sync,
    {
        futures::stream::try_unfold(self, |mut iter| async move {
            let item = iter.try_next().await?;
            Ok(item.map(|kv| (kv, iter)))
        })
        .boxed()
    }

    async fn fetch_page(&mut self) -> Result<(), WideRowError> {
        let bounds = mode_from_flags(self.cursor_inclusive, self.end_inclusive);
        let page = self.fetch_one_batch(bounds).await;

        let pairs = match page {
            Ok(pairs) => pairs,
            Err(err) => {
                self.state = IterState::Failed(err.clone());
                return Err(err);
            }
        };

        let short_page = pairs.len() < self.page_size;
        if let Some((last_key, _)) = pairs.last() {
            // Continuation restarts just past the last-seen key.
            let reached_end = *last_key == self.end;
            self.cursor = last_key.clone();
            self.cursor_inclusive = false;
            if reached_end {
                self.state = IterState::Exhausted;
            }
        }
        if short_page {
            self.state = IterState::Exhausted;
        }

        self.buf.extend(pairs);
        Ok(())
    }

    async fn fetch_one_batch(
        &self,
        bounds: BoundingMode,
    ) -> Result<Vec<(K, CounterValue)>, WideRowError> {
        let (low, high) =
            range_boundaries(self.codec, &self.cursor, &self.end, bounds, self.ordering)?;
        let columns = fetch_slice(
            self.store,
            self.row,
            &low,
            &high,
            self.page_size,
            self.ordering.is_reverse(),
        )
        .await?;
        to_pairs(self.codec, columns)
    }
}

impl<K, C, S> fmt::Debug for PagedIter<'_, K, C, S>
where
    K: fmt::Debug,
    C: ?Sized,
    S: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedIter")
            .field("row", self.row)
            .field("cursor", &self.cursor)
            .field("end", &self.end)
            .field("page_size", &self.page_size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn mode_from_flags(start_inclusive: bool, end_inclusive: bool) -> BoundingMode {
    match (start_inclusive, end_inclusive) {
        (true, true) => BoundingMode::InclusiveBoth,
        (false, false) => BoundingMode::ExclusiveBoth,
        (true, false) => BoundingMode::InclusiveStartOnly,
        (false, true) => BoundingMode::InclusiveEndOnly,
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering as AtomicOrdering;

    use futures_util::StreamExt;

    use super::*;
    use crate::bounds::Boundary;
    use crate::codec::Utf8KeyCodec;
    use crate::impls::mem::MemStore;
    use crate::store::RawColumn;

    fn s(x: impl ToString) -> String {
        x.to_string()
    }

    async fn seeded(n: usize) -> MemStore {
        let store = MemStore::new();
        let row = RowId::from("r1");
        for i in 0..n {
            let name = format!("k{i:03}");
            store
                .atomic_increment(&row, name.as_bytes(), i as i64)
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_pages_cover_range_without_duplicates() {
        let store = seeded(10).await;
        let row = RowId::from("r1");

        // Page size smaller than the range, and not a divisor of it.
        let iter = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k000"),
            &s("k009"),
            3,
            BoundingMode::InclusiveBoth,
            OrderingMode::Ascending,
        )
        .unwrap();
        let got = iter.try_collect().await.unwrap();

        let keys: Vec<String> = got.iter().map(|(k, _)| k.clone()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("k{i:03}")).collect();
        assert_eq!(keys, expected);

        let values: Vec<i64> = got.iter().map(|(_, v)| v.get()).collect();
        assert_eq!(values, (0..10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_page_size_equal_to_range_stops_cleanly() {
        let store = seeded(4).await;
        let row = RowId::from("r1");

        let iter = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k000"),
            &s("k003"),
            4,
            BoundingMode::InclusiveBoth,
            OrderingMode::Ascending,
        )
        .unwrap();
        let got = iter.try_collect().await.unwrap();
        assert_eq!(got.len(), 4);
    }

    #[tokio::test]
    async fn test_descending_pages() {
        let store = seeded(5).await;
        let row = RowId::from("r1");

        let iter = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k004"),
            &s("k000"),
            2,
            BoundingMode::InclusiveBoth,
            OrderingMode::Descending,
        )
        .unwrap();
        let got = iter.try_collect().await.unwrap();

        let keys: Vec<String> = got.into_iter().map(|(k, _)| k).collect();
        let expected: Vec<String> = (0..5).rev().map(|i| format!("k{i:03}")).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_exclusive_bounds_drop_endpoints() {
        let store = seeded(5).await;
        let row = RowId::from("r1");

        let iter = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k000"),
            &s("k004"),
            2,
            BoundingMode::ExclusiveBoth,
            OrderingMode::Ascending,
        )
        .unwrap();
        let got = iter.try_collect().await.unwrap();

        let keys: Vec<String> = got.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![s("k001"), s("k002"), s("k003")]);
    }

    #[tokio::test]
    async fn test_bad_bounds_fail_before_any_fetch() {
        let store = seeded(3).await;
        let row = RowId::from("r1");

        let res = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k002"),
            &s("k000"),
            2,
            BoundingMode::InclusiveBoth,
            OrderingMode::Ascending,
        );
        assert!(matches!(res, Err(WideRowError::RangeBounds { .. })));
    }

    #[tokio::test]
    async fn test_zero_page_size_is_clamped() {
        let store = seeded(2).await;
        let row = RowId::from("r1");

        let iter = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k000"),
            &s("k001"),
            0,
            BoundingMode::InclusiveBoth,
            OrderingMode::Ascending,
        )
        .unwrap();
        let got = iter.try_collect().await.unwrap();
        assert_eq!(got.len(), 2);
    }

    #[tokio::test]
    async fn test_stream_adapter_yields_same_sequence() {
        let store = seeded(6).await;
        let row = RowId::from("r1");

        let iter = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k000"),
            &s("k005"),
            2,
            BoundingMode::InclusiveBoth,
            OrderingMode::Ascending,
        )
        .unwrap();

        let mut stream = iter.into_stream();
        let mut keys = Vec::new();
        while let Some(item) = stream.next().await {
            keys.push(item.unwrap().0);
        }
        let expected: Vec<String> = (0..6).map(|i| format!("k{i:03}")).collect();
        assert_eq!(keys, expected);
    }

    /// Serves one good page, then fails every later fetch.
    struct FlakyStore {
        inner: MemStore,
        fetches: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CounterStore for FlakyStore {
        async fn slice_fetch(
            &self,
            row: &RowId,
            low: &Boundary,
            high: &Boundary,
            limit: usize,
            reversed: bool,
        ) -> Result<Vec<RawColumn>, io::Error> {
            if self.fetches.fetch_add(1, AtomicOrdering::SeqCst) >= 1 {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "slice timeout"));
            }
            self.inner.slice_fetch(row, low, high, limit, reversed).await
        }

        async fn atomic_increment(
            &self,
            row: &RowId,
            name: &[u8],
            delta: i64,
        ) -> Result<(), io::Error> {
            self.inner.atomic_increment(row, name, delta).await
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_terminal_and_replayed() {
        let store = FlakyStore {
            inner: seeded(6).await,
            fetches: AtomicUsize::new(0),
        };
        let row = RowId::from("r1");

        let mut iter = PagedIter::new(
            &store,
            &Utf8KeyCodec,
            &row,
            &s("k000"),
            &s("k005"),
            2,
            BoundingMode::InclusiveBoth,
            OrderingMode::Ascending,
        )
        .unwrap();

        // First page is served.
        assert_eq!(iter.try_next().await.unwrap().unwrap().0, s("k000"));
        assert_eq!(iter.try_next().await.unwrap().unwrap().0, s("k001"));

        // Second page fails and the iterator latches.
        let err = iter.try_next().await.unwrap_err();
        assert_eq!(err, WideRowError::StorageUnavailable {
            reason: "slice timeout".to_string()
        });

        let replay = iter.try_next().await.unwrap_err();
        assert_eq!(replay, err);

        // The failed fetch was attempted once; the replay issued no new call.
        assert_eq!(store.fetches.load(AtomicOrdering::SeqCst), 2);
    }
}
