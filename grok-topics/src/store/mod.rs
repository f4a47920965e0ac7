//! Content store transports
//!
//! The same logical operations have two transports, selected once when the accessor is
//! built: [`SqlStore`] talks to the content database directly, [`HttpStore`] goes through
//! the legacy topics API (for untrusted/client contexts without database credentials).
//!
//! Transports report failures as [`TopicsError`](crate::TopicsError) and do not log at
//! error level; the accessor owns the log-and-degrade policy.

use async_trait::async_trait;
use grok_common::db::{Category, CategoryWithQuestions, Difficulty, Question, Topic, TopicWithCategories};
use std::fmt;

use crate::Result;

mod http;
mod sql;

pub use http::HttpStore;
pub use sql::SqlStore;

/// Maximum number of rows returned by a question search
pub const SEARCH_LIMIT: i64 = 50;

/// Topic reference as given by callers: numeric id or slug/name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicRef {
    Id(i64),
    Slug(String),
}

impl TopicRef {
    /// Parse a caller-supplied string; all-digit strings are ids
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(id) => TopicRef::Id(id),
            Err(_) => TopicRef::Slug(raw.to_string()),
        }
    }

    /// Cache key for this reference
    pub fn cache_key(&self) -> String {
        format!("topic_{}", self)
    }
}

impl fmt::Display for TopicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicRef::Id(id) => write!(f, "{}", id),
            TopicRef::Slug(slug) => f.write_str(slug),
        }
    }
}

impl From<i64> for TopicRef {
    fn from(id: i64) -> Self {
        TopicRef::Id(id)
    }
}

impl From<&str> for TopicRef {
    fn from(raw: &str) -> Self {
        TopicRef::parse(raw)
    }
}

/// Category reference as given by callers: numeric id or slug/name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryRef {
    Id(i64),
    Slug(String),
}

impl CategoryRef {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(id) => CategoryRef::Id(id),
            Err(_) => CategoryRef::Slug(raw.to_string()),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("category_{}", self)
    }
}

impl fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryRef::Id(id) => write!(f, "{}", id),
            CategoryRef::Slug(slug) => f.write_str(slug),
        }
    }
}

impl From<i64> for CategoryRef {
    fn from(id: i64) -> Self {
        CategoryRef::Id(id)
    }
}

impl From<&str> for CategoryRef {
    fn from(raw: &str) -> Self {
        CategoryRef::parse(raw)
    }
}

/// Optional narrowing for question search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub difficulty: Option<Difficulty>,
    pub topic_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// One transport to the relational content
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Transport name for log output
    fn name(&self) -> &'static str;

    /// All topics, optionally limited to one domain, ordered by name
    async fn topics(&self, domain: Option<&str>) -> Result<Vec<Topic>>;

    /// Categories of a topic resolved by id, slug, then name
    async fn categories_by_topic(&self, topic: &TopicRef) -> Result<Vec<Category>>;

    /// Questions of a category resolved by id, exact name, then name substring
    async fn questions_by_category(&self, category: &CategoryRef) -> Result<Vec<Question>>;

    /// Topic with its categories, `None` when the topic does not exist
    async fn topic_with_categories(&self, topic: &TopicRef) -> Result<Option<TopicWithCategories>>;

    /// Category with its questions, `None` when the category does not exist
    ///
    /// `domain` names the owning domain when the caller knows it.
    async fn category_with_questions(
        &self,
        category: &CategoryRef,
        domain: Option<&str>,
    ) -> Result<Option<CategoryWithQuestions>>;

    /// Category with its questions, `None` unless the category resolves inside `topic`
    async fn topic_category(
        &self,
        topic: &TopicRef,
        category: &CategoryRef,
    ) -> Result<Option<CategoryWithQuestions>>;

    /// Case-insensitive substring search over question text, at most [`SEARCH_LIMIT`] rows
    async fn search_questions(&self, query: &str, filters: &SearchFilters) -> Result<Vec<Question>>;
}

/// Replace hyphens with spaces for name lookups ("supervised-learning" → "supervised learning")
pub(crate) fn dehyphenate(raw: &str) -> String {
    raw.replace('-', " ")
}
