//! HTTP transport over the legacy topics API
//!
//! Used where no database credentials are available. The legacy endpoints answer in
//! markdown-tree shapes, so records are synthesized from them here.

use async_trait::async_trait;
use grok_common::db::{
    Category, CategoryWithQuestions, Difficulty, Question, Topic, TopicWithCategories,
};
use grok_common::{time, CategoryItem, TopicItem, TopicTree};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CategoryRef, ContentStore, SearchFilters, TopicRef, SEARCH_LIMIT};
use crate::client::ApiClient;
use crate::{Result, TopicsError};

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    questions: Vec<Question>,
    /// Present on topic-scoped category lookups
    #[serde(default)]
    category: Option<Category>,
}

/// Single-category answer of `/api/topics/categories?categoryId=`
#[derive(Debug, Deserialize)]
struct CategoryLookup {
    label: Option<String>,
    error: Option<String>,
}

/// Content store that proxies every operation through the legacy API
#[derive(Clone)]
pub struct HttpStore {
    client: ApiClient,
    domain_guesses: Vec<String>,
}

impl HttpStore {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        domain_guesses: Vec<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(base_url, timeout)?,
            domain_guesses,
        })
    }

    pub fn from_client(client: ApiClient, domain_guesses: Vec<String>) -> Self {
        Self {
            client,
            domain_guesses,
        }
    }

    async fn category_details(&self, domain: &str, category: &CategoryRef) -> Result<TopicItem> {
        self.client
            .get_json(
                "/api/topics/category-details",
                &[
                    ("topicId", domain.to_string()),
                    ("categoryId", category.to_string()),
                ],
            )
            .await
    }

    async fn questions(&self, query: &[(&str, String)]) -> Result<Vec<Question>> {
        let response: QuestionsResponse = self.client.get_json("/api/questions", query).await?;
        Ok(response.questions)
    }
}

#[async_trait]
impl ContentStore for HttpStore {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn topics(&self, domain: Option<&str>) -> Result<Vec<Topic>> {
        let query: Vec<(&str, String)> = domain
            .map(|d| vec![("domain", d.to_string())])
            .unwrap_or_default();
        let tree: TopicTree = self.client.get_json("/api/topics", &query).await?;

        let mut topics: Vec<Topic> = tree
            .iter()
            .map(|(slug, item)| topic_from_legacy(slug, item, domain.unwrap_or("unknown")))
            .collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topics)
    }

    async fn categories_by_topic(&self, topic: &TopicRef) -> Result<Vec<Category>> {
        let key = topic.to_string();
        let mut listing: HashMap<String, Vec<CategoryItem>> = self
            .client
            .get_json("/api/topics/categories", &[("topicId", key.clone())])
            .await?;

        let topic_id = match topic {
            TopicRef::Id(id) => *id,
            TopicRef::Slug(slug) => synthesize_id(slug),
        };
        let items = listing.remove(&key).unwrap_or_default();
        debug!(topic = %key, count = items.len(), "Categories from API");

        Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Category {
                id: index as i64 + 1,
                slug: item.id,
                name: item.label,
                topic_id,
                created_at: time::now(),
            })
            .collect())
    }

    async fn questions_by_category(&self, category: &CategoryRef) -> Result<Vec<Question>> {
        self.questions(&[("categoryId", category.to_string())]).await
    }

    async fn topic_with_categories(&self, topic: &TopicRef) -> Result<Option<TopicWithCategories>> {
        let tree: TopicTree = match self
            .client
            .post_json("/api/topics", &json!({ "topicId": topic.to_string() }))
            .await
        {
            Ok(tree) => tree,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some((slug, item)) = tree.iter().next() else {
            return Ok(None);
        };
        let topic_record = topic_from_legacy(slug, item, "unknown");
        let categories = self.categories_by_topic(&TopicRef::parse(slug)).await?;

        Ok(Some(TopicWithCategories {
            topic: topic_record,
            categories,
        }))
    }

    async fn category_with_questions(
        &self,
        category: &CategoryRef,
        domain: Option<&str>,
    ) -> Result<Option<CategoryWithQuestions>> {
        let domains: Vec<&str> = match domain {
            Some(d) => vec![d],
            None => self.domain_guesses.iter().map(String::as_str).collect(),
        };

        for candidate in domains {
            match self.category_details(candidate, category).await {
                Ok(detail) => {
                    debug!(category = %category, domain = candidate, "Category details found");
                    return Ok(Some(category_from_detail(&detail, category)));
                }
                Err(e) => {
                    warn!(category = %category, domain = candidate, error = %e, "Category details lookup failed");
                }
            }
        }

        let lookup: CategoryLookup = match self
            .client
            .get_json(
                "/api/topics/categories",
                &[
                    ("categoryId", category.to_string()),
                    ("topicId", "any".to_string()),
                ],
            )
            .await
        {
            Ok(lookup) => lookup,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if let Some(error) = lookup.error {
            return Err(TopicsError::Shape(error));
        }

        let questions = self.questions_by_category(category).await?;
        Ok(Some(CategoryWithQuestions {
            category: placeholder_category(category, lookup.label),
            questions,
        }))
    }

    async fn topic_category(
        &self,
        topic: &TopicRef,
        category: &CategoryRef,
    ) -> Result<Option<CategoryWithQuestions>> {
        let response: QuestionsResponse = match self
            .client
            .get_json(
                "/api/questions",
                &[
                    ("categoryId", category.to_string()),
                    ("topicId", topic.to_string()),
                ],
            )
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let category_record = response
            .category
            .unwrap_or_else(|| placeholder_category(category, None));
        Ok(Some(CategoryWithQuestions {
            category: category_record,
            questions: response.questions,
        }))
    }

    async fn search_questions(&self, query: &str, filters: &SearchFilters) -> Result<Vec<Question>> {
        let mut params = vec![("query", query.to_string())];
        if let Some(difficulty) = filters.difficulty {
            params.push(("difficulty", difficulty.to_string()));
        }
        if let Some(topic_id) = filters.topic_id {
            params.push(("topicId", topic_id.to_string()));
        }
        if let Some(category_id) = filters.category_id {
            params.push(("categoryId", category_id.to_string()));
        }

        let mut questions = self.questions(&params).await?;
        questions.truncate(SEARCH_LIMIT as usize);
        Ok(questions)
    }
}

/// Numeric id for a slug without one: the sum of its character codes
pub(crate) fn synthesize_id(slug: &str) -> i64 {
    slug.chars().map(|c| c as i64).sum()
}

fn topic_from_legacy(slug: &str, item: &TopicItem, domain: &str) -> Topic {
    let id = slug
        .parse::<i64>()
        .ok()
        .or(item.topic_id)
        .unwrap_or_else(|| synthesize_id(slug));
    Topic {
        id,
        slug: slug.to_string(),
        name: item.label.clone(),
        domain: domain.to_string(),
        created_at: time::now(),
    }
}

fn placeholder_category(category: &CategoryRef, label: Option<String>) -> Category {
    let (id, slug) = match category {
        CategoryRef::Id(id) => (*id, "unknown".to_string()),
        CategoryRef::Slug(slug) => (0, slug.clone()),
    };
    Category {
        id,
        slug,
        name: label.unwrap_or_else(|| "Unknown Category".to_string()),
        topic_id: 0,
        created_at: time::now(),
    }
}

/// Markdown detail node → category whose questions are its direct subsections
fn category_from_detail(detail: &TopicItem, category: &CategoryRef) -> CategoryWithQuestions {
    let category_record = placeholder_category(category, Some(detail.label.clone()));
    let questions = detail
        .subtopics
        .values()
        .enumerate()
        .map(|(index, sub)| Question {
            id: index as i64 + 1,
            category_id: category_record.id,
            question_text: if sub.label.is_empty() {
                format!("Question {}", index + 1)
            } else {
                sub.label.clone()
            },
            answer_text: sub.content.clone(),
            keywords: Vec::new(),
            difficulty: Some(Difficulty::Medium),
            created_at: time::now(),
        })
        .collect();

    CategoryWithQuestions {
        category: category_record,
        questions,
    }
}
