mod helpers;

use std::sync::Arc;

use engram::memory::search::{search, search_by_embedding};
use engram::memory::store::list_by_user;
use helpers::*;

#[test]
fn store_then_retrieve_by_vector() {
    let mut conn = test_db();
    let id_hiking = insert_memory(
        &mut conn,
        "alice",
        "User enjoys hiking in the mountains",
        5,
        Some(&test_embedding(0)),
    );
    insert_memory(
        &mut conn,
        "alice",
        "User works as a software engineer",
        7,
        Some(&test_embedding(2)),
    );

    let results = search_by_embedding(&conn, "alice", &near_embedding(0), 5, 4).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].memory.id, id_hiking);
}

#[test]
fn results_are_capped_and_ordered_by_similarity() {
    let mut conn = test_db();
    for i in 0..DIMS {
        insert_memory(
            &mut conn,
            "alice",
            &format!("memory about topic {i}"),
            5,
            Some(&test_embedding(i)),
        );
    }

    let limit = 3;
    let results = search_by_embedding(&conn, "alice", &test_embedding(0), limit, 4).unwrap();
    assert!(results.len() <= limit);
    for pair in results.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "similarity must be non-increasing"
        );
    }
}

#[test]
fn importance_breaks_similarity_ties() {
    let mut conn = test_db();
    let emb = test_embedding(3);
    insert_memory(&mut conn, "alice", "minor detail", 2, Some(&emb));
    let id_major = insert_memory(&mut conn, "alice", "major fact", 9, Some(&emb));

    let results = search_by_embedding(&conn, "alice", &emb, 5, 4).unwrap();
    assert_eq!(results[0].memory.id, id_major);
}

#[tokio::test]
async fn related_query_surfaces_semantically_close_memory() {
    let db = shared_db();
    let provider = Arc::new(TopicStubProvider);

    // store through the embedding the provider would have produced
    {
        let mut conn = db.lock().unwrap();
        let emb = test_embedding(0); // hiking topic bucket
        insert_memory(
            &mut conn,
            "alice",
            "User enjoys hiking in the mountains",
            5,
            Some(&emb),
        );
        insert_memory(
            &mut conn,
            "alice",
            "User works as a software engineer",
            7,
            Some(&test_embedding(2)),
        );
    }

    let response = search(db, provider, "outdoor activities", "alice", 5, 4)
        .await
        .unwrap();

    assert!(!response.degraded);
    let top_contents: Vec<&str> = response
        .results
        .iter()
        .map(|r| r.memory.content.as_str())
        .collect();
    assert_eq!(top_contents[0], "User enjoys hiking in the mountains");
}

#[tokio::test]
async fn offline_provider_degrades_to_keyword_search() {
    let db = shared_db();
    {
        let mut conn = db.lock().unwrap();
        insert_memory(&mut conn, "alice", "User enjoys hiking", 5, Some(&test_embedding(0)));
    }

    let response = search(db, Arc::new(OfflineProvider), "hiking", "alice", 5, 4)
        .await
        .unwrap();

    assert!(response.degraded, "fallback must be signaled, not silent");
    assert_eq!(response.results.len(), 1);
}

#[test]
fn list_is_newest_first_and_capped() {
    let mut conn = test_db();
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(insert_memory(&mut conn, "alice", &format!("note {i}"), 5, None));
    }

    let listed = list_by_user(&conn, "alice", 3).unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].id, ids[4]);
    assert_eq!(listed[1].id, ids[3]);
}
