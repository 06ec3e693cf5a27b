//! End-to-end pipeline tests against an in-memory database and fake
//! embedding/index services.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use stayscout_core::{CheckpointFile, Database, Listing};
use stayscout_etl::{
    EmbeddingClient, EtlError, EtlResult, IndexPoint, Indexer, IndexerOpts, RunOutcome, VectorIndex,
};
use tempfile::TempDir;

fn listing(id: i64) -> Listing {
    Listing {
        listing_id: id,
        name: format!("Flat {id}"),
        host_since: "2020-06-01".to_string(),
        host_location: "Lisbon, Portugal".to_string(),
        host_response_time: "within a day".to_string(),
        host_response_rate: 0.9,
        host_acceptance_rate: 0.8,
        host_is_superhost: false,
        host_total_listings_count: 1,
        host_has_profile_pic: true,
        host_identity_verified: true,
        district: "Alfama".to_string(),
        city: "Lisbon".to_string(),
        property_type: "Apartment".to_string(),
        room_type: "Entire place".to_string(),
        accommodates: 2,
        bedrooms: 1,
        price: 75.0,
        minimum_nights: 1,
        maximum_nights: 60,
        text_reviews: "Overall Ratings: 4.5".to_string(),
    }
}

fn seeded_db(ids: &[i64]) -> Database {
    let db = Database::open_in_memory().unwrap();
    for id in ids {
        db.insert_listing(&listing(*id)).unwrap();
    }
    db
}

/// Deterministic fake embedder: the vector is a stable function of the
/// text, so re-embedding the same listing yields the same vector.
#[derive(Default)]
struct FakeEmbedder {
    batch_sizes: Mutex<Vec<usize>>,
    fail_on_batch: Mutex<Option<usize>>,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> EtlResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());
        if *self.fail_on_batch.lock().unwrap() == Some(call) {
            return Err(EtlError::Embed {
                message: "service unavailable".to_string(),
            });
        }
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32, f32::from(t.as_bytes()[0])])
            .collect())
    }
}

/// Fake index: a map from point id to (vector, payload), with
/// replace-on-upsert semantics like the real thing.
#[derive(Default)]
struct FakeIndex {
    points: Mutex<BTreeMap<i64, (Vec<f32>, Value)>>,
    ensured_sizes: Mutex<Vec<usize>>,
    upsert_chunks: Mutex<Vec<usize>>,
    fail_upserts: AtomicBool,
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn ensure_collection(&self, vector_size: usize) -> EtlResult<()> {
        self.ensured_sizes.lock().unwrap().push(vector_size);
        Ok(())
    }

    async fn upsert(&self, points: &[IndexPoint]) -> EtlResult<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(EtlError::Index {
                operation: "upsert",
                message: "unreachable".to_string(),
            });
        }
        self.upsert_chunks.lock().unwrap().push(points.len());
        let mut map = self.points.lock().unwrap();
        for p in points {
            map.insert(p.id, (p.vector.clone(), p.payload.clone()));
        }
        Ok(())
    }
}

fn checkpoint(dir: &TempDir) -> CheckpointFile {
    CheckpointFile::new(dir.path().join(".progress.json"))
}

#[tokio::test]
async fn test_first_run_processes_all_and_advances_watermark() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&[5, 7, 9]);
    let cp = checkpoint(&dir);
    let embedder = FakeEmbedder::default();
    let index = FakeIndex::default();

    let indexer = Indexer::new(&db, &cp, &embedder, &index, IndexerOpts::default());
    let outcome = indexer.run_once().await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Processed {
            rows: 3,
            last_seen_id: 9
        }
    );
    assert_eq!(cp.load(), Some(9));

    let points = index.points.lock().unwrap();
    let ids: Vec<i64> = points.keys().copied().collect();
    assert_eq!(ids, vec![5, 7, 9]);
    // All vectors share the dimensionality the collection was created with.
    assert_eq!(*index.ensured_sizes.lock().unwrap(), vec![2]);
    assert!(points.values().all(|(v, _)| v.len() == 2));
}

#[tokio::test]
async fn test_drained_backlog_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&[5, 7, 9]);
    let cp = checkpoint(&dir);
    cp.save(9).unwrap();
    let embedder = FakeEmbedder::default();
    let index = FakeIndex::default();

    let indexer = Indexer::new(&db, &cp, &embedder, &index, IndexerOpts::default());
    let outcome = indexer.run_once().await.unwrap();

    assert_eq!(outcome, RunOutcome::Drained);
    assert_eq!(cp.load(), Some(9));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(index.points.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_embed_failure_leaves_watermark_and_skips_upsert() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&[5, 7, 9, 11]);
    let cp = checkpoint(&dir);
    let embedder = FakeEmbedder::default();
    // Second of two sub-batches fails.
    *embedder.fail_on_batch.lock().unwrap() = Some(1);
    let index = FakeIndex::default();

    let opts = IndexerOpts {
        embed_batch_size: 2,
        ..IndexerOpts::default()
    };
    let indexer = Indexer::new(&db, &cp, &embedder, &index, opts);
    let err = indexer.run_once().await.unwrap_err();

    assert!(err.is_transient());
    assert!(err.to_string().contains("embedding"));
    assert_eq!(cp.load(), None);
    assert!(index.points.lock().unwrap().is_empty());
    assert!(index.ensured_sizes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upsert_failure_leaves_watermark_and_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&[5, 7, 9]);
    let cp = checkpoint(&dir);
    let embedder = FakeEmbedder::default();
    let index = FakeIndex::default();
    index.fail_upserts.store(true, Ordering::SeqCst);

    let indexer = Indexer::new(&db, &cp, &embedder, &index, IndexerOpts::default());
    let err = indexer.run_once().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(cp.load(), None);

    // Service recovers; the retry reprocesses the very same page.
    index.fail_upserts.store(false, Ordering::SeqCst);
    let outcome = indexer.run_once().await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Processed {
            rows: 3,
            last_seen_id: 9
        }
    );

    let after_retry = index.points.lock().unwrap().clone();

    // Running again over the same page (watermark reset) must leave
    // the index byte-identical: upsert replaces, never merges.
    cp.save(0).unwrap();
    indexer.run_once().await.unwrap();
    assert_eq!(*index.points.lock().unwrap(), after_retry);
}

#[tokio::test]
async fn test_run_to_completion_drains_page_by_page() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&[5, 7, 9, 11, 13]);
    let cp = checkpoint(&dir);
    let embedder = FakeEmbedder::default();
    let index = FakeIndex::default();

    let opts = IndexerOpts {
        page_size: 2,
        ..IndexerOpts::default()
    };
    let indexer = Indexer::new(&db, &cp, &embedder, &index, opts);
    let total = indexer.run_to_completion().await.unwrap();

    assert_eq!(total, 5);
    assert_eq!(cp.load(), Some(13));
    assert_eq!(index.points.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn test_watermark_is_monotonic_across_runs() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&[2, 4, 6, 8]);
    let cp = checkpoint(&dir);
    let embedder = FakeEmbedder::default();
    let index = FakeIndex::default();

    let opts = IndexerOpts {
        page_size: 3,
        ..IndexerOpts::default()
    };
    let indexer = Indexer::new(&db, &cp, &embedder, &index, opts);

    let mut seen = Vec::new();
    loop {
        match indexer.run_once().await.unwrap() {
            RunOutcome::Processed { last_seen_id, .. } => {
                seen.push(last_seen_id);
            }
            RunOutcome::Drained => break,
        }
    }
    assert_eq!(seen, vec![6, 8]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_upsert_batches_independently_of_embed_batches() {
    let dir = TempDir::new().unwrap();
    let ids: Vec<i64> = (1..=10).collect();
    let db = seeded_db(&ids);
    let cp = checkpoint(&dir);
    let embedder = FakeEmbedder::default();
    let index = FakeIndex::default();

    let opts = IndexerOpts {
        page_size: 100,
        embed_batch_size: 4,
        upsert_batch_size: 3,
    };
    let indexer = Indexer::new(&db, &cp, &embedder, &index, opts);
    indexer.run_once().await.unwrap();

    assert_eq!(*embedder.batch_sizes.lock().unwrap(), vec![4, 4, 2]);
    assert_eq!(*index.upsert_chunks.lock().unwrap(), vec![3, 3, 3, 1]);
}

#[tokio::test]
async fn test_payload_carries_full_row_and_embedding_text() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&[5]);
    let cp = checkpoint(&dir);
    let embedder = FakeEmbedder::default();
    let index = FakeIndex::default();

    let indexer = Indexer::new(&db, &cp, &embedder, &index, IndexerOpts::default());
    indexer.run_once().await.unwrap();

    let points = index.points.lock().unwrap();
    let (_, payload) = &points[&5];
    assert_eq!(payload["listing_id"], 5);
    assert_eq!(payload["city"], "Lisbon");
    let text = payload["embedding_text"].as_str().unwrap();
    assert!(text.starts_with("Listing name: Flat 5 | "));
    assert!(text.contains("Reviews: Overall Ratings: 4.5"));
}
