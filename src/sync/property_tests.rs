//! Property-Based Tests for the Sync Queue
//!
//! Uses proptest to check the queue against its persisted snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use crate::cache::{CacheStorage, PartitionManager, PartitionNames};
use crate::config::Config;
use crate::net::testing::ScriptedFetcher;
use crate::net::InterceptedRequest;
use crate::sync::{SnapshotLog, SyncQueue, SyncQueueItem, SYNC_QUEUE_KEY};

// == Strategies ==
/// Small URL pool so removes regularly hit queued items
fn url_strategy() -> impl Strategy<Value = String> {
    (0..6u8).prop_map(|n| format!("https://api.test/item/{}", n))
}

#[derive(Debug, Clone)]
enum QueueOp {
    Enqueue(String),
    Remove(String),
}

fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => url_strategy().prop_map(QueueOp::Enqueue),
        1 => url_strategy().prop_map(QueueOp::Remove),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn fresh_queue() -> (SyncQueue, SnapshotLog<SyncQueueItem>) {
    let manager = PartitionManager::new(
        Arc::new(CacheStorage::in_memory()),
        Arc::new(ScriptedFetcher::new()),
        PartitionNames::from_config(&Config::default()),
    );
    let data = manager.ensure_all().await.unwrap().data;
    let log = SnapshotLog::new(data, SYNC_QUEUE_KEY);
    (SyncQueue::new(log.clone()), log)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Sequential enqueue/remove calls keep the persisted snapshot identical
    // to the in-memory list, in order.
    #[test]
    fn prop_snapshot_mirrors_memory(ops in prop::collection::vec(queue_op_strategy(), 1..40)) {
        runtime().block_on(async {
            let (queue, log) = fresh_queue().await;
            let mut expected: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    QueueOp::Enqueue(url) => {
                        queue.enqueue(&InterceptedRequest::get(&url).unwrap()).await;
                        expected.push(url);
                    }
                    QueueOp::Remove(url) => {
                        queue.remove(&url).await;
                        expected.retain(|u| u != &url);
                    }
                }
            }

            let memory: Vec<String> = queue.items().await.into_iter().map(|i| i.url).collect();
            let persisted: Vec<String> =
                log.read_all().await.unwrap().into_iter().map(|i| i.url).collect();
            assert_eq!(&memory, &expected);
            assert_eq!(&persisted, &expected);
        });
    }

    // Whatever subset of replays succeeds, a drain attempts each item exactly
    // once and leaves an empty snapshot behind.
    #[test]
    fn prop_drain_always_clears(
        urls in prop::collection::vec(url_strategy(), 0..20),
        reachable in prop::collection::hash_set(url_strategy(), 0..6)
    ) {
        runtime().block_on(async {
            let (queue, log) = fresh_queue().await;
            let mut fetcher = ScriptedFetcher::new();
            for url in &reachable {
                fetcher = fetcher.ok(url, "{}");
            }
            for url in &urls {
                queue.enqueue(&InterceptedRequest::get(url).unwrap()).await;
            }

            let report = queue.drain(&fetcher).await;

            let reachable: HashSet<&String> = reachable.iter().collect();
            let expected_ok = urls.iter().filter(|u| reachable.contains(u)).count();
            assert_eq!(report.attempted, urls.len());
            assert_eq!(report.replayed, expected_ok);
            assert_eq!(report.failed, urls.len() - expected_ok);
            assert_eq!(fetcher.total_calls(), urls.len());
            assert!(log.read_all().await.unwrap().is_empty());
            assert!(queue.is_empty().await);
        });
    }
}
