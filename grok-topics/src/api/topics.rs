//! Topic tree endpoints
//!
//! Served from the markdown library, with the content database filling in topics and
//! category listings that have no markdown.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use grok_common::{CategoryItem, TopicItem, TopicTree};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::{ApiError, ApiResult, AppState};
use crate::markdown::MarkdownSource;
use crate::merge;
use crate::resolve;
use crate::store::{CategoryRef, ContentStore, TopicRef};

/// Topic id used by category-details when the caller gives none
const DEFAULT_TOPIC: &str = "ml";

#[derive(Debug, Deserialize)]
pub struct DomainQuery {
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "topicId")]
    pub topic_id: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<String>,
}

/// GET /api/topics[?domain=]
pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> ApiResult<Json<TopicTree>> {
    let domain = query.domain.as_deref().filter(|d| !d.is_empty());

    let mut tree = state.markdown.fetch_all().await?;
    if let Some(domain) = domain {
        tree.retain(|key, _| key == domain);
    }

    for topic in state.store.topics(domain).await? {
        let node = tree
            .entry(topic.slug.clone())
            .or_insert_with(|| TopicItem::new(topic.name.clone()).with_id(topic.slug.clone()));
        node.topic_id = Some(topic.id);
    }

    debug!(domain = ?domain, topics = tree.len(), "Listed topics");
    Ok(Json(tree))
}

/// POST /api/topics `{ "topicId": ... }`
pub async fn topic_by_body(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<TopicTree>> {
    let topic_id = match body.get("topicId") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ApiError::BadRequest("Topic ID is required".to_string())),
    };
    single_topic(&state, &topic_id).await
}

/// GET /api/topics/:topic_id
pub async fn get_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<String>,
) -> ApiResult<Json<TopicTree>> {
    single_topic(&state, &topic_id).await
}

async fn single_topic(state: &AppState, topic_id: &str) -> ApiResult<Json<TopicTree>> {
    let node = match state.markdown.fetch_topic(topic_id).await {
        Ok(node) => node,
        Err(e) if e.is_not_found() => {
            let found = state
                .store
                .topic_with_categories(&TopicRef::parse(topic_id))
                .await?
                .ok_or_else(|| ApiError::NotFound("Topic not found".to_string()))?;
            merge::topic_node(&found.topic, &found.categories)
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Json(TopicTree::from([(topic_id.to_string(), node)])))
}

/// GET /api/topics/categories?topicId=[&categoryId=]
///
/// With `categoryId` the matching section is returned (`topicId=any` searches every
/// topic); without it, `{ topicId: [ { id, label } ] }`.
pub async fn categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Value>> {
    if let Some(category_id) = query.category_id.as_deref() {
        let topic_id = query.topic_id.as_deref().unwrap_or("any");
        let node = find_category(&state, topic_id, category_id).await?;
        return Ok(Json(serde_json::to_value(node).map_err(|e| ApiError::Internal(e.to_string()))?));
    }

    let topic_id = query
        .topic_id
        .ok_or_else(|| ApiError::BadRequest("topicId or categoryId is required".to_string()))?;

    let listing = topic_listing(&state, &topic_id).await?;
    let body = HashMap::from([(topic_id, listing)]);
    Ok(Json(serde_json::to_value(body).map_err(|e| ApiError::Internal(e.to_string()))?))
}

async fn topic_listing(state: &AppState, topic_id: &str) -> ApiResult<Vec<CategoryItem>> {
    match state.markdown.topic_categories(topic_id).await {
        Ok(listing) => return Ok(listing),
        Err(e) if !e.is_not_found() => return Err(e.into()),
        Err(_) => debug!(topic = topic_id, "No markdown topic, listing database categories"),
    }

    match state.store.categories_by_topic(&TopicRef::parse(topic_id)).await {
        Ok(categories) => Ok(categories
            .into_iter()
            .map(|c| CategoryItem {
                id: c.slug,
                label: c.name,
            })
            .collect()),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

async fn find_category(state: &AppState, topic_id: &str, category_id: &str) -> ApiResult<TopicItem> {
    let topics: Vec<String> = if topic_id == "any" {
        state.markdown.topic_ids().await.map_err(ApiError::from)?
    } else {
        vec![topic_id.to_string()]
    };

    for id in &topics {
        let topic = match state.markdown.fetch_topic(id).await {
            Ok(topic) => topic,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e.into()),
        };
        if let Some(hit) = resolve::resolve(&topic, category_id, None, &state.aliases) {
            return Ok(shallow(hit.key, hit.node));
        }
    }

    if let Some(category) = state
        .store
        .resolve_category(&CategoryRef::parse(category_id))
        .await?
    {
        let owner_matches = match topic_id {
            "any" => true,
            other => state
                .store
                .resolve_topic(&TopicRef::parse(other))
                .await?
                .is_some_and(|t| t.id == category.topic_id),
        };
        if owner_matches {
            debug!(category = category_id, "Category found in database only");
            return Ok(merge::category_node(&category));
        }
    }

    Err(ApiError::NotFound(format!(
        "Category {} not found in topic {}",
        category_id, topic_id
    )))
}

/// GET /api/topics/category-details?topicId=&categoryId=
pub async fn category_details(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<TopicItem>> {
    let category_id = query
        .category_id
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Category ID is required".to_string()))?;
    let topic_id = query
        .topic_id
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());

    let topic = state.markdown.fetch_topic(&topic_id).await?;
    let hit = resolve::resolve(&topic, &category_id, None, &state.aliases).ok_or_else(|| {
        ApiError::NotFound(format!(
            "Category {} not found in topic {}",
            category_id, topic_id
        ))
    })?;
    Ok(Json(shallow(hit.key, hit.node)))
}

/// Section with its direct children only
fn shallow(key: &str, node: &TopicItem) -> TopicItem {
    let mut out = TopicItem::new(node.label.clone()).with_id(key);
    out.content = Some(node.content.clone().unwrap_or_default());
    out.subtopics = node
        .subtopics
        .iter()
        .map(|(child_key, child)| {
            let mut leaf = TopicItem::new(child.label.clone()).with_id(child_key.clone());
            leaf.content = child.content.clone();
            (child_key.clone(), leaf)
        })
        .collect();
    out
}

pub fn topic_routes() -> Router<AppState> {
    Router::new()
        .route("/api/topics", get(list_topics).post(topic_by_body))
        .route("/api/topics/categories", get(categories))
        .route("/api/topics/category-details", get(category_details))
        .route("/api/topics/:topic_id", get(get_topic))
}
