mod common;

use std::sync::Arc;
use std::time::Duration;

use knotcache::domain::ports::{BookkeepingStore, ResultStore};
use knotcache::services::{ReadOutcome, RetrievalService};

use common::{commits_query, setup_stack, TestStack};

fn retrieval_for(stack: &TestStack) -> RetrievalService {
    RetrievalService::new(
        Arc::clone(&stack.bookkeeping) as Arc<dyn BookkeepingStore>,
        Arc::clone(&stack.results) as Arc<dyn ResultStore>,
    )
}

#[tokio::test]
async fn test_read_before_fill_reports_missing_repos() {
    let stack = setup_stack().await;
    let retrieval = retrieval_for(&stack);

    let outcome = retrieval
        .try_read("commits_query", &[101, 102])
        .await
        .expect("try_read failed");
    let ReadOutcome::NotReady { missing } = outcome else {
        panic!("expected NotReady before any fill");
    };
    assert_eq!(missing, vec![101, 102]);
}

#[tokio::test]
async fn test_empty_request_is_ready_without_a_result_table() {
    let stack = setup_stack().await;
    let retrieval = retrieval_for(&stack);

    // No fill has run, so the query's result table does not exist yet; an
    // empty request still reads as trivially ready.
    let outcome = retrieval
        .try_read("commits_query", &[])
        .await
        .expect("try_read failed");
    let ReadOutcome::Ready(table) = outcome else {
        panic!("expected Ready for an empty request");
    };
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_zero_row_repo_reads_ready_and_empty() {
    let stack = setup_stack().await;
    let retrieval = retrieval_for(&stack);

    // Repo 103 has no commits; its cached answer is legitimately empty.
    stack
        .coordinator
        .ensure_cached(&commits_query(), &[103])
        .await
        .expect("fill failed");

    let outcome = retrieval
        .try_read("commits_query", &[103])
        .await
        .expect("try_read failed");
    let ReadOutcome::Ready(table) = outcome else {
        panic!("expected Ready for the cached zero-row repo");
    };
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_read_after_fill_returns_union() {
    let stack = setup_stack().await;
    let retrieval = retrieval_for(&stack);
    let query = commits_query();

    stack
        .coordinator
        .ensure_cached(&query, &[101, 102])
        .await
        .expect("fill failed");

    let outcome = retrieval
        .try_read("commits_query", &[101, 102])
        .await
        .expect("try_read failed");
    let ReadOutcome::Ready(table) = outcome else {
        panic!("expected Ready after fill");
    };
    assert_eq!(table.len(), 5);
    let ids = table.distinct_repo_ids().expect("repo_id column missing");
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![101, 102]);
}

#[tokio::test]
async fn test_read_subset_filters_to_requested_repos() {
    let stack = setup_stack().await;
    let retrieval = retrieval_for(&stack);
    let query = commits_query();

    stack
        .coordinator
        .ensure_cached(&query, &[101, 102])
        .await
        .expect("fill failed");

    let outcome = retrieval
        .try_read("commits_query", &[102])
        .await
        .expect("try_read failed");
    let ReadOutcome::Ready(table) = outcome else {
        panic!("expected Ready for cached subset");
    };
    assert_eq!(table.len(), 2);
}

#[tokio::test]
async fn test_wait_ready_times_out_without_a_fill() {
    let stack = setup_stack().await;
    let retrieval = retrieval_for(&stack);

    let outcome = retrieval
        .wait_ready("commits_query", &[101], Duration::from_millis(250))
        .await
        .expect("wait_ready failed");
    assert!(!outcome.is_ready());
}

#[tokio::test]
async fn test_wait_ready_observes_a_concurrent_fill() {
    let stack = Arc::new(setup_stack().await);
    let retrieval = retrieval_for(&stack);

    let filler = Arc::clone(&stack);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        filler
            .coordinator
            .ensure_cached(&commits_query(), &[101])
            .await
            .expect("fill failed");
    });

    let outcome = retrieval
        .wait_ready("commits_query", &[101], Duration::from_secs(5))
        .await
        .expect("wait_ready failed");
    assert!(outcome.is_ready());
    handle.await.expect("fill task panicked");
}

#[tokio::test]
async fn test_marked_but_rowless_repo_still_reads_ready() {
    let stack = setup_stack().await;
    let retrieval = retrieval_for(&stack);
    let query = commits_query();

    stack
        .coordinator
        .ensure_cached(&query, &[101])
        .await
        .expect("fill failed");
    // A bookkeeping row without data: the read path warns but still serves
    // what it has.
    stack
        .bookkeeping
        .record_cached("commits_query", &[999])
        .await
        .expect("record_cached failed");

    let outcome = retrieval
        .try_read("commits_query", &[101, 999])
        .await
        .expect("try_read failed");
    let ReadOutcome::Ready(table) = outcome else {
        panic!("expected Ready despite the rowless repo");
    };
    assert_eq!(table.len(), 3);
}
