//! Shared fixtures: seeded in-memory database, markdown library, running API server

#![allow(dead_code)]

use axum::Router;
use grok_common::db::{init_memory_database, seed, SeedData};
use grok_topics::api::{build_router, AppState};
use grok_topics::markdown::LocalMarkdownSource;
use grok_topics::resolve::AliasTable;
use grok_topics::store::SqlStore;
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const ML_MARKDOWN: &str = "\
# Machine Learning

Core machine learning topics.

## Supervised Learning

Learning from labelled data.

### Regression
- Linear regression
- Polynomial regression

### Classification

#### Naive Bayes
Probabilistic classifier based on Bayes theorem.

## Data Preprocessing

Cleaning, scaling and encoding features.
";

pub const AI_MARKDOWN: &str = "\
# Artificial Intelligence

## Search Algorithms
- Breadth-first search
- A* search
";

/// Markdown library plus seeded store
pub struct Fixture {
    pub dir: TempDir,
    pub store: SqlStore,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ml.md"), ML_MARKDOWN).unwrap();
        std::fs::write(dir.path().join("ai.md"), AI_MARKDOWN).unwrap();

        let pool = init_memory_database().await.unwrap();
        let data: SeedData = serde_json::from_value(json!({
            "topics": [
                { "slug": "ml", "name": "Machine Learning", "domain": "ml", "categories": [
                    { "slug": "ml-supervised", "name": "Supervised Learning", "questions": [
                        { "question_text": "What is linear regression?", "difficulty": "easy" },
                        { "question_text": "Explain the bias-variance tradeoff",
                          "answer_text": "Error decomposition", "difficulty": "medium" }
                    ]},
                    { "slug": "ml-unsupervised", "name": "Unsupervised Learning", "questions": [
                        { "question_text": "What is k-means clustering?", "difficulty": "hard" }
                    ]}
                ]},
                { "slug": "dsa", "name": "Data Structures", "domain": "dsa", "categories": [
                    { "slug": "dsa-arrays", "name": "Arrays", "questions": [
                        { "question_text": "How do you reverse an array?", "difficulty": "easy" }
                    ]}
                ]}
            ]
        }))
        .unwrap();
        seed(&pool, &data).await.unwrap();

        Self {
            dir,
            store: SqlStore::new(pool),
        }
    }

    pub fn markdown(&self) -> LocalMarkdownSource {
        LocalMarkdownSource::new(self.dir.path())
    }

    pub fn router(&self) -> Router {
        build_router(AppState::new(
            self.store.clone(),
            self.markdown(),
            AliasTable::builtin(),
        ))
    }
}

/// API server on an ephemeral local port
pub struct TestServer {
    pub base_url: String,
    pub fixture: Fixture,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server() -> TestServer {
    let fixture = Fixture::new().await;
    let app = fixture.router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        fixture,
        handle,
    }
}
