use shared::domain::ItemStatus;
use storage::{KeyValueStore, MemoryStore};

use super::*;
use crate::test_support::{certificate, instruction, FakeSource};

#[tokio::test]
async fn short_queries_issue_no_requests() {
    let source = FakeSource::new();
    let search = CrossFeatureSearch::new(source.clone());

    let results = search.search(" s ").await;
    assert!(results.is_empty());
    assert_eq!(results.query, "s");
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn groups_hits_per_entity_type_and_records_recent() {
    let source = FakeSource::new();
    source.put(
        EntityType::SiteInstruction,
        vec![
            instruction(ItemStatus::Issued, None),
            instruction(ItemStatus::Draft, None),
            instruction(ItemStatus::Pending, None),
        ],
    );
    source.put(
        EntityType::InsuranceCertificate,
        vec![certificate(ItemStatus::Approved, None)],
    );
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let recent = RecentSearches::new(Arc::clone(&store));
    let search = CrossFeatureSearch::new(source.clone())
        .with_recent(recent.clone())
        .with_per_type_limit(2);

    let results = search.search("  steel ").await;

    assert_eq!(results.groups.len(), 2);
    assert_eq!(results.total(), 3);
    let instructions = results
        .groups
        .iter()
        .find(|group| group.entity_type == EntityType::SiteInstruction)
        .expect("instruction group");
    assert_eq!(instructions.items.len(), 2);
    assert!(results.failures.is_empty());

    let calls = source.calls();
    assert_eq!(calls.len(), EntityType::ALL.len());
    assert!(calls
        .iter()
        .all(|(_, params)| params.search() == Some("steel") && params.len() == 1));

    assert_eq!(recent.list(), vec!["steel"]);
}

#[tokio::test]
async fn failing_entity_type_does_not_sink_the_search() {
    let source = FakeSource::new();
    source.put(
        EntityType::Document,
        vec![instruction(ItemStatus::Approved, None)],
    );
    source.fail(
        EntityType::Submittal,
        ClientError::Network("timeout".into()),
    );
    let search = CrossFeatureSearch::new(source)
        .with_entity_types(vec![EntityType::Document, EntityType::Submittal]);

    let results = search.search("drawings").await;
    assert_eq!(results.total(), 1);
    assert_eq!(results.failures.len(), 1);
    assert_eq!(results.failures[0].0, EntityType::Submittal);
}
