//! Relational Data Accessor
//!
//! Typed access to topics, categories and questions over whichever [`ContentStore`]
//! transport was chosen at construction. Three cache tiers (topics, per-topic categories,
//! per-category questions) share one TTL.
//!
//! The plain methods never fail: every failure is logged once with the originating
//! reference and degrades to an empty list or `None`. Callers that need to tell
//! "nothing there" from "lookup failed" use the `try_*` variants.

use grok_common::db::{Category, CategoryWithQuestions, Question, Topic, TopicWithCategories};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::cache::TtlCache;
use crate::store::{CategoryRef, ContentStore, SearchFilters, TopicRef};
use crate::Result;

pub struct DataAccessor {
    store: Arc<dyn ContentStore>,
    topics: TtlCache<(), Vec<Topic>>,
    categories: TtlCache<String, Vec<Category>>,
    questions: TtlCache<String, Vec<Question>>,
}

impl DataAccessor {
    pub fn new(store: Arc<dyn ContentStore>, ttl: Duration) -> Self {
        debug!(transport = store.name(), ttl_secs = ttl.as_secs(), "Data accessor created");
        Self {
            store,
            topics: TtlCache::new("topics", ttl),
            categories: TtlCache::new("categories", ttl),
            questions: TtlCache::new("questions", ttl),
        }
    }

    /// Transport in use
    pub fn transport(&self) -> &'static str {
        self.store.name()
    }

    // ---- Fallible variants ----

    /// Topics, optionally restricted to a domain
    ///
    /// Only the unfiltered list is cached; domain-filtered calls always hit the store.
    pub async fn try_get_topics(&self, domain: Option<&str>) -> Result<Vec<Topic>> {
        if let Some(domain) = domain {
            return self.store.topics(Some(domain)).await;
        }
        self.topics
            .get_or_fetch((), || self.store.topics(None))
            .await
    }

    pub async fn try_get_categories_by_topic(&self, topic: &TopicRef) -> Result<Vec<Category>> {
        self.categories
            .get_or_fetch(topic.cache_key(), || self.store.categories_by_topic(topic))
            .await
    }

    pub async fn try_get_questions_by_category(
        &self,
        category: &CategoryRef,
    ) -> Result<Vec<Question>> {
        self.questions
            .get_or_fetch(category.cache_key(), || {
                self.store.questions_by_category(category)
            })
            .await
    }

    pub async fn try_get_topic_with_categories(
        &self,
        topic: &TopicRef,
    ) -> Result<Option<TopicWithCategories>> {
        self.store.topic_with_categories(topic).await
    }

    pub async fn try_get_category_with_questions(
        &self,
        category: &CategoryRef,
        domain: Option<&str>,
    ) -> Result<Option<CategoryWithQuestions>> {
        self.store.category_with_questions(category, domain).await
    }

    /// Category with its questions when it belongs to `topic`; uncached
    pub async fn try_get_topic_category(
        &self,
        topic: &TopicRef,
        category: &CategoryRef,
    ) -> Result<Option<CategoryWithQuestions>> {
        self.store.topic_category(topic, category).await
    }

    pub async fn try_search_questions(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Question>> {
        self.store.search_questions(query, filters).await
    }

    // ---- Degrading variants ----

    pub async fn get_topics(&self, domain: Option<&str>) -> Vec<Topic> {
        self.try_get_topics(domain).await.unwrap_or_else(|e| {
            error!(domain = ?domain, error = %e, "Failed to fetch topics");
            Vec::new()
        })
    }

    pub async fn get_categories_by_topic(&self, topic: &TopicRef) -> Vec<Category> {
        self.try_get_categories_by_topic(topic)
            .await
            .unwrap_or_else(|e| {
                error!(topic = %topic, error = %e, "Failed to fetch categories");
                Vec::new()
            })
    }

    pub async fn get_questions_by_category(&self, category: &CategoryRef) -> Vec<Question> {
        self.try_get_questions_by_category(category)
            .await
            .unwrap_or_else(|e| {
                error!(category = %category, error = %e, "Failed to fetch questions");
                Vec::new()
            })
    }

    pub async fn get_topic_with_categories(&self, topic: &TopicRef) -> Option<TopicWithCategories> {
        self.try_get_topic_with_categories(topic)
            .await
            .unwrap_or_else(|e| {
                error!(topic = %topic, error = %e, "Failed to fetch topic with categories");
                None
            })
    }

    pub async fn get_category_with_questions(
        &self,
        category: &CategoryRef,
        domain: Option<&str>,
    ) -> Option<CategoryWithQuestions> {
        self.try_get_category_with_questions(category, domain)
            .await
            .unwrap_or_else(|e| {
                error!(category = %category, error = %e, "Failed to fetch category with questions");
                None
            })
    }

    pub async fn search_questions(&self, query: &str, filters: &SearchFilters) -> Vec<Question> {
        self.try_search_questions(query, filters)
            .await
            .unwrap_or_else(|e| {
                error!(query = %query, error = %e, "Question search failed");
                Vec::new()
            })
    }

    /// Drop all three cache tiers
    pub fn clear_cache(&self) {
        self.topics.clear();
        self.categories.clear();
        self.questions.clear();
        debug!("Accessor caches cleared");
    }
}
