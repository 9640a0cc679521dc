use std::time::Duration;

use shared::domain::{Facet, ItemStatus};

use super::*;
use crate::{
    filters::FilterState,
    test_support::{certificate, instruction, FakeSource},
};

fn status_params(status: ItemStatus) -> QueryParams {
    FilterState {
        status: Facet::Only(status),
        ..FilterState::default()
    }
    .to_query_params()
}

#[tokio::test]
async fn fetches_once_per_distinct_params() {
    let source = FakeSource::new();
    source.put(
        EntityType::SiteInstruction,
        vec![instruction(ItemStatus::Issued, None)],
    );
    let query = RemoteQuery::new(source.clone(), vec![EntityType::SiteInstruction], Page::default());

    assert!(matches!(query.snapshot(), QueryState::Idle));
    assert!(query.set_params(QueryParams::new()));
    assert_eq!(query.settled().await.items().len(), 1);

    assert!(!query.set_params(QueryParams::new()));
    assert!(!query.set_params(FilterState::default().to_query_params()));
    assert_eq!(source.calls().len(), 1);

    assert!(query.set_params(status_params(ItemStatus::Void)));
    assert!(query.settled().await.items().is_empty());
    assert_eq!(source.calls().len(), 2);
}

#[tokio::test]
async fn only_the_latest_request_is_applied() {
    let source = FakeSource::new();
    source.put(
        EntityType::SiteInstruction,
        vec![
            instruction(ItemStatus::Issued, None),
            instruction(ItemStatus::Completed, None),
        ],
    );
    source.delay_calls(vec![Duration::from_millis(150), Duration::ZERO]);
    let query = RemoteQuery::new(source.clone(), vec![EntityType::SiteInstruction], Page::default());

    query.set_params(status_params(ItemStatus::Issued));
    tokio::time::sleep(Duration::from_millis(20)).await;
    query.set_params(status_params(ItemStatus::Completed));

    let state = query.settled().await;
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].status(), ItemStatus::Completed);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let state = query.snapshot();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].status(), ItemStatus::Completed);
    assert_eq!(query.params(), Some(status_params(ItemStatus::Completed)));
}

#[tokio::test]
async fn errors_surface_and_retry_refetches_same_params() {
    let source = FakeSource::new();
    source.put(
        EntityType::Document,
        vec![],
    );
    source.fail(EntityType::Document, ClientError::Network("connection reset".into()));
    let query = RemoteQuery::new(source.clone(), vec![EntityType::Document], Page::default());

    assert!(!query.retry(), "nothing to retry before the first request");

    query.set_params(QueryParams::new());
    let state = query.settled().await;
    assert!(matches!(state.error(), Some(ClientError::Network(_))));

    assert!(!query.set_params(QueryParams::new()), "same params do not refetch on their own");

    source.heal(EntityType::Document);
    assert!(query.retry());
    assert!(matches!(query.settled().await, QueryState::Success(_)));

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, calls[1].1);
}

#[tokio::test]
async fn scoped_fetch_merges_kinds_and_honours_entity_type() {
    let source = FakeSource::new();
    source.put(
        EntityType::SiteInstruction,
        vec![instruction(ItemStatus::Issued, None)],
    );
    source.put(
        EntityType::InsuranceCertificate,
        vec![certificate(ItemStatus::Approved, None)],
    );
    let scope = [EntityType::SiteInstruction, EntityType::InsuranceCertificate];

    let all = fetch_scoped(source.as_ref(), &scope, &QueryParams::new(), Page::default())
        .await
        .expect("fetch");
    assert_eq!(all.len(), 2);

    let only_certs = FilterState {
        entity_type: Facet::Only(EntityType::InsuranceCertificate),
        ..FilterState::default()
    }
    .to_query_params();
    let certs = fetch_scoped(source.as_ref(), &scope, &only_certs, Page::default())
        .await
        .expect("fetch");
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0].entity_type(), EntityType::InsuranceCertificate);
    assert_eq!(source.calls().len(), 3);
}

#[tokio::test]
async fn one_failing_kind_fails_the_scoped_fetch() {
    let source = FakeSource::new();
    source.put(
        EntityType::SiteInstruction,
        vec![instruction(ItemStatus::Issued, None)],
    );
    source.fail(
        EntityType::Submittal,
        ClientError::Backend {
            status: 503,
            message: "unavailable".into(),
        },
    );

    let err = fetch_scoped(
        source.as_ref(),
        &[EntityType::SiteInstruction, EntityType::Submittal],
        &QueryParams::new(),
        Page::default(),
    )
    .await
    .expect_err("submittals unavailable");
    assert!(matches!(err, ClientError::Backend { status: 503, .. }));
}

fn created_at(mut item: ResultItem, at: chrono::DateTime<chrono::Utc>) -> ResultItem {
    match &mut item {
        ResultItem::SiteInstruction(row) => row.created_at = at,
        ResultItem::InsuranceCertificate(row) => row.created_at = at,
        _ => {}
    }
    item
}

#[tokio::test]
async fn scoped_fetch_keeps_the_newest_rows_within_the_page_limit() {
    let now = chrono::Utc::now();
    let source = FakeSource::new();
    source.put(
        EntityType::SiteInstruction,
        vec![created_at(
            instruction(ItemStatus::Issued, None),
            now - chrono::Duration::hours(2),
        )],
    );
    source.put(
        EntityType::InsuranceCertificate,
        vec![created_at(
            certificate(ItemStatus::Approved, None),
            now - chrono::Duration::hours(1),
        )],
    );

    let rows = fetch_scoped(
        source.as_ref(),
        &[EntityType::SiteInstruction, EntityType::InsuranceCertificate],
        &QueryParams::new(),
        Page::first(1),
    )
    .await
    .expect("fetch");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity_type(), EntityType::InsuranceCertificate);
}

#[tokio::test]
async fn dropping_the_query_abandons_the_inflight_fetch() {
    let source = FakeSource::new();
    source.put(
        EntityType::SiteInstruction,
        vec![instruction(ItemStatus::Issued, None)],
    );
    source.delay_calls(vec![Duration::from_millis(100)]);
    let query = RemoteQuery::new(source.clone(), vec![EntityType::SiteInstruction], Page::default());
    let mut states = query.subscribe();

    assert!(query.set_params(QueryParams::new()));
    assert!(states.borrow_and_update().is_loading());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.calls().len(), 1, "fetch is in flight");
    drop(query);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(states.borrow_and_update().is_loading());
    assert!(
        states.changed().await.is_err(),
        "no state may be published once the query is gone"
    );
    assert_eq!(source.calls().len(), 1);
}
