//! Question endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use grok_common::db::{Category, Difficulty, Question};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, ApiResult, AppState};
use crate::store::{CategoryRef, ContentStore, SearchFilters, TopicRef};

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    #[serde(rename = "categoryId")]
    pub category_id: Option<String>,
    #[serde(rename = "topicId")]
    pub topic_id: Option<String>,
    pub query: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
    /// The resolved category, on `categoryId` + `topicId` lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// GET /api/questions
///
/// `query` (or a bare `topicId`) searches, narrowed by `difficulty`, `topicId` and
/// `categoryId`. `categoryId` with `topicId` lists the category's questions only when it
/// belongs to that topic; `categoryId` alone lists them unconditionally.
pub async fn questions(
    State(state): State<AppState>,
    Query(params): Query<QuestionQuery>,
) -> ApiResult<Json<QuestionsResponse>> {
    let query = params.query.as_deref().map(str::trim).filter(|q| !q.is_empty());

    if query.is_some() || (params.topic_id.is_some() && params.category_id.is_none()) {
        let questions = search(&state, query.unwrap_or(""), &params).await?;
        return Ok(Json(QuestionsResponse {
            questions,
            category: None,
        }));
    }

    let Some(category_id) = params.category_id.as_deref() else {
        return Err(ApiError::BadRequest(
            "Missing required parameters. Please provide categoryId, topicId, or query."
                .to_string(),
        ));
    };

    if let Some(topic_id) = params.topic_id.as_deref() {
        let found = state
            .store
            .topic_category(&TopicRef::parse(topic_id), &CategoryRef::parse(category_id))
            .await?;
        return match found {
            Some(found) => Ok(Json(QuestionsResponse {
                questions: found.questions,
                category: Some(found.category),
            })),
            None => Err(ApiError::NotFound(format!(
                "Category {} not found in topic {}",
                category_id, topic_id
            ))),
        };
    }

    let questions = state
        .store
        .questions_by_category(&CategoryRef::parse(category_id))
        .await?;
    Ok(Json(QuestionsResponse {
        questions,
        category: None,
    }))
}

async fn search(state: &AppState, query: &str, params: &QuestionQuery) -> ApiResult<Vec<Question>> {
    let mut filters = SearchFilters::default();

    if let Some(raw) = params.difficulty.as_deref().filter(|d| !d.is_empty()) {
        let difficulty: Difficulty = raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Unknown difficulty: {}", raw)))?;
        filters.difficulty = Some(difficulty);
    }

    if let Some(raw) = params.topic_id.as_deref() {
        match state.store.resolve_topic(&TopicRef::parse(raw)).await? {
            Some(topic) => filters.topic_id = Some(topic.id),
            None => {
                debug!(topic = raw, "Search topic filter does not resolve");
                return Ok(Vec::new());
            }
        }
    }

    if let Some(raw) = params.category_id.as_deref() {
        match state.store.resolve_category(&CategoryRef::parse(raw)).await? {
            Some(category) => filters.category_id = Some(category.id),
            None => {
                debug!(category = raw, "Search category filter does not resolve");
                return Ok(Vec::new());
            }
        }
    }

    Ok(state.store.search_questions(query, &filters).await?)
}

pub fn question_routes() -> Router<AppState> {
    Router::new().route("/api/questions", get(questions))
}
