//! Reconciliation service end to end, over both transports

mod helpers;

use grok_topics::accessor::DataAccessor;
use grok_topics::client::ApiClient;
use grok_topics::markdown::HttpMarkdownSource;
use grok_topics::provider::TopicDataProvider;
use grok_topics::resolve::AliasTable;
use grok_topics::snapshot::SnapshotStore;
use grok_topics::store::HttpStore;
use grok_topics::TopicDataService;
use grok_common::config::SNAPSHOT_KEY;
use grok_common::TopicTree;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use helpers::{spawn_server, Fixture};

const HOUR: Duration = Duration::from_secs(3600);

fn direct_service(fixture: &Fixture) -> TopicDataService {
    let accessor = Arc::new(DataAccessor::new(Arc::new(fixture.store.clone()), HOUR));
    TopicDataService::new(
        accessor,
        Arc::new(fixture.markdown()),
        AliasTable::builtin(),
        HOUR,
    )
}

fn http_service(base_url: &str) -> TopicDataService {
    let client = ApiClient::new(base_url, Duration::from_secs(5)).unwrap();
    let store = HttpStore::from_client(client.clone(), vec!["ml".to_string()]);
    let accessor = Arc::new(DataAccessor::new(Arc::new(store), HOUR));
    TopicDataService::new(
        accessor,
        Arc::new(HttpMarkdownSource::new(client)),
        AliasTable::builtin(),
        HOUR,
    )
}

fn assert_unified(tree: &TopicTree) {
    let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
    assert_eq!(keys, ["ai", "dsa", "ml"]);

    let ml = &tree["ml"];
    assert_eq!(ml.label, "Machine Learning");
    assert!(ml.topic_id.is_some());
    assert_eq!(ml.content.as_deref(), Some("Core machine learning topics."));

    // Markdown content lands on the database category with the same label
    let supervised = ml
        .subtopics
        .values()
        .find(|n| n.label == "Supervised Learning")
        .unwrap();
    assert_eq!(supervised.content.as_deref(), Some("Learning from labelled data."));
    assert!(supervised.category_id.is_some());
    assert_eq!(
        ml.subtopics
            .values()
            .filter(|n| n.label == "Supervised Learning")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_direct_service_builds_unified_tree() {
    let fixture = Fixture::new().await;
    let service = direct_service(&fixture);

    let tree = service.get_all_topic_data().await;
    assert_unified(&tree);
    // Database-only category and markdown-only section both survive
    assert!(tree["ml"].subtopics.contains_key("ml-unsupervised"));
    assert!(tree["ml"].subtopics.contains_key("ml-data-preprocessing"));
}

#[tokio::test]
async fn test_http_service_builds_unified_tree() {
    let server = spawn_server().await;
    let service = http_service(&server.base_url);

    let tree = service.get_all_topic_data().await;
    assert_unified(&tree);
}

#[tokio::test]
async fn test_category_details_carry_database_questions() {
    let fixture = Fixture::new().await;
    let service = direct_service(&fixture);

    let detail = service
        .get_category_details("ml", "ml-supervised")
        .await
        .unwrap();
    assert_eq!(detail.label, "Supervised Learning");

    let synthesized: Vec<&str> = detail
        .subtopics
        .values()
        .filter(|n| n.synthesized)
        .map(|n| n.label.as_str())
        .collect();
    assert_eq!(synthesized.len(), 2);
    assert!(synthesized.contains(&"What is linear regression?"));
    // Markdown sections stay next to the questions
    assert!(detail.subtopics.values().any(|n| n.label == "Regression"));
}

#[tokio::test]
async fn test_category_details_over_http() {
    let server = spawn_server().await;
    let service = http_service(&server.base_url);

    let detail = service
        .get_category_details("ml", "naive-bayes")
        .await
        .unwrap();
    assert_eq!(detail.label, "Classification");

    assert!(service
        .get_category_details("ml", "quantum-chemistry")
        .await
        .is_none());
    assert!(service
        .get_category_details("dsa", "ml-supervised")
        .await
        .is_none());
}

#[tokio::test]
async fn test_topic_categories_prefer_database() {
    let fixture = Fixture::new().await;
    let service = direct_service(&fixture);

    let ml: Vec<String> = service
        .get_topic_categories("ml")
        .await
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ml, ["ml-supervised", "ml-unsupervised"]);

    // Markdown-only topic lists its sections
    let ai = service.get_topic_categories("ai").await;
    assert_eq!(ai.len(), 1);
    assert_eq!(ai[0].label, "Search Algorithms");
}

#[tokio::test]
async fn test_provider_mirrors_snapshot_over_http() {
    let server = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let snapshot = SnapshotStore::new(dir.path().join(format!("{}.json", SNAPSHOT_KEY)));
    let service = Arc::new(http_service(&server.base_url).with_snapshot(snapshot.clone()));

    let provider = TopicDataProvider::new(service, TopicTree::new());
    provider.mount().await;
    assert!(!provider.is_loading());
    assert_eq!(provider.error(), None);
    assert_unified(&provider.topic_data());

    let stored = snapshot.load().await.unwrap();
    assert_eq!(stored, provider.topic_data());
}
