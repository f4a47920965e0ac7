//! Routing tests for the legacy topics API

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use helpers::Fixture;

async fn call(fixture: &Fixture, request: Request<Body>) -> (StatusCode, Value) {
    let response = fixture.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(fixture: &Fixture, uri: &str) -> (StatusCode, Value) {
    call(fixture, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(fixture: &Fixture, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    call(fixture, request).await
}

#[tokio::test]
async fn test_health() {
    let fixture = Fixture::new().await;
    let (status, body) = get(&fixture, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "grok-topics");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_list_topics_combines_markdown_and_database() {
    let fixture = Fixture::new().await;
    let (status, body) = get(&fixture, "/api/topics").await;
    assert_eq!(status, StatusCode::OK);

    let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["ai", "dsa", "ml"]);
    assert_eq!(body["ml"]["label"], "Machine Learning");
    assert!(body["ml"]["topicId"].is_i64());
    // Database-only topic carries its name and id
    assert_eq!(body["dsa"]["label"], "Data Structures");
    assert!(body["ai"].get("topicId").is_none());
}

#[tokio::test]
async fn test_list_topics_domain_filter() {
    let fixture = Fixture::new().await;
    let (status, body) = get(&fixture, "/api/topics?domain=ml").await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["ml"]);
}

#[tokio::test]
async fn test_post_topic() {
    let fixture = Fixture::new().await;

    let (status, body) = post(&fixture, "/api/topics", json!({ "topicId": "ml" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["ml"]["subtopics"]["ml-supervised-learning"].is_object());

    let (status, body) = post(&fixture, "/api/topics", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Topic ID is required");

    let (status, _) = post(&fixture, "/api/topics", json!({ "topicId": "nope" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_topic_falls_back_to_database() {
    let fixture = Fixture::new().await;

    let (status, body) = get(&fixture, "/api/topics/dsa").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dsa"]["label"], "Data Structures");
    assert_eq!(body["dsa"]["subtopics"]["dsa-arrays"]["label"], "Arrays");

    let (status, body) = get(&fixture, "/api/topics/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_topic_categories_listing() {
    let fixture = Fixture::new().await;

    let (status, body) = get(&fixture, "/api/topics/categories?topicId=ml").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "ml": [
            { "id": "ml-data-preprocessing", "label": "Data Preprocessing" },
            { "id": "ml-supervised-learning", "label": "Supervised Learning" }
        ]})
    );

    // No markdown file: database categories
    let (_, body) = get(&fixture, "/api/topics/categories?topicId=dsa").await;
    assert_eq!(body, json!({ "dsa": [ { "id": "dsa-arrays", "label": "Arrays" } ] }));

    let (status, body) = get(&fixture, "/api/topics/categories?topicId=nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "nope": [] }));

    let (status, _) = get(&fixture, "/api/topics/categories").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_category_lookup_across_topics() {
    let fixture = Fixture::new().await;

    let (status, body) =
        get(&fixture, "/api/topics/categories?categoryId=naive-bayes&topicId=any").await;
    assert_eq!(status, StatusCode::OK);
    // Alias path lands on the section holding the match
    assert_eq!(body["label"], "Classification");

    let (status, body) =
        get(&fixture, "/api/topics/categories?categoryId=quantum-chemistry&topicId=any").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("quantum-chemistry"));
}

#[tokio::test]
async fn test_category_details() {
    let fixture = Fixture::new().await;

    let (status, body) = get(
        &fixture,
        "/api/topics/category-details?topicId=ml&categoryId=ml-supervised",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "ml-supervised-learning");
    assert_eq!(body["label"], "Supervised Learning");
    assert_eq!(body["content"], "Learning from labelled data.");

    // Children are listed one level deep
    let classification = &body["subtopics"]["ml-supervised-learning-classification"];
    assert_eq!(classification["label"], "Classification");
    assert!(classification.get("subtopics").is_none());

    // topicId defaults to ml
    let (status, body) =
        get(&fixture, "/api/topics/category-details?categoryId=data-preprocessing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "Data Preprocessing");

    let (status, body) = get(&fixture, "/api/topics/category-details?topicId=ml").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Category ID is required");

    let (status, _) = get(
        &fixture,
        "/api/topics/category-details?topicId=ml&categoryId=quantum-chemistry",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_questions_by_category() {
    let fixture = Fixture::new().await;

    let (status, body) = get(&fixture, "/api/questions?categoryId=ml-supervised").await;
    assert_eq!(status, StatusCode::OK);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["difficulty"], "easy");

    let (status, _) = get(&fixture, "/api/questions?categoryId=999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        get(&fixture, "/api/questions?categoryId=ml-supervised&topicId=ml").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    assert_eq!(body["category"]["name"], "Supervised Learning");

    // The category exists, but under another topic
    let (status, body) =
        get(&fixture, "/api/questions?categoryId=ml-supervised&topicId=dsa").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found in topic dsa"));

    let (status, body) = get(&fixture, "/api/questions").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Missing required parameters"));
}

#[tokio::test]
async fn test_question_search_filters() {
    let fixture = Fixture::new().await;

    let (status, body) = get(&fixture, "/api/questions?query=REGRESSION").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"].as_array().unwrap().len(), 1);

    let (_, body) = get(&fixture, "/api/questions?query=what&difficulty=hard").await;
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["question_text"], "What is k-means clustering?");

    let (_, body) = get(&fixture, "/api/questions?query=what&topicId=dsa").await;
    assert_eq!(body["questions"].as_array().unwrap().len(), 0);

    // Bare topic filter lists the topic's questions
    let (_, body) = get(&fixture, "/api/questions?topicId=ml").await;
    assert_eq!(body["questions"].as_array().unwrap().len(), 3);

    let (_, body) = get(&fixture, "/api/questions?query=what&topicId=unknown-topic").await;
    assert_eq!(body["questions"], json!([]));

    let (status, _) = get(&fixture, "/api/questions?query=what&difficulty=impossible").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
