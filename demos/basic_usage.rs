use std::sync::Arc;
use std::sync::Mutex;

use futures_util::StreamExt;
use widerow::impls::mem::MemStore;
use widerow::BoundingMode;
use widerow::ConsistencyConfig;
use widerow::CounterMap;
use widerow::FlushContext;
use widerow::OrderingMode;
use widerow::RowId;
use widerow::Utf8KeyCodec;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Counter columns of one wide row, stored in memory
    let ctx = Arc::new(Mutex::new(FlushContext::new()));
    let map = CounterMap::new(
        RowId::from("user:42"),
        Utf8KeyCodec,
        MemStore::new(),
        ctx,
        ConsistencyConfig::default(),
    );

    // Bump a few counters
    map.increment(&"page:home".to_string(), 3).await?;
    map.increment(&"page:about".to_string(), 1).await?;
    map.increment(&"page:home".to_string(), 2).await?;

    // Read one back
    if let Some(total) = map.get(&"page:home".to_string()).await? {
        println!("page:home = {}", total.get());
    }

    // Range scan, descending
    let page = map
        .find(
            &"page:z".to_string(),
            &"page:a".to_string(),
            100,
            BoundingMode::InclusiveBoth,
            OrderingMode::Descending,
        )
        .await?;
    for (key, value) in page {
        println!("{} = {}", key, value.get());
    }

    // Paged lazy iteration as a stream
    let iter = map.iter(
        &"page:a".to_string(),
        &"page:z".to_string(),
        1,
        BoundingMode::InclusiveBoth,
        OrderingMode::Ascending,
    )?;
    let mut stream = iter.into_stream();
    while let Some(result) = stream.next().await {
        let (key, value) = result?;
        println!("paged: {} = {}", key, value.get());
    }

    // Counter columns cannot be removed
    let err = map.remove(&"page:home".to_string()).await.unwrap_err();
    println!("remove rejected: {}", err);

    Ok(())
}
