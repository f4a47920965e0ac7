//! Direct SQL transport over the content database

use async_trait::async_trait;
use grok_common::db::{
    Category, CategoryWithQuestions, Difficulty, Question, Topic, TopicWithCategories,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{dehyphenate, CategoryRef, ContentStore, SearchFilters, TopicRef, SEARCH_LIMIT};
use crate::{Result, TopicsError};

const TOPIC_COLUMNS: &str = "id, slug, name, domain, created_at";
const CATEGORY_COLUMNS: &str = "id, slug, name, topic_id, created_at";
const QUESTION_COLUMNS: &str =
    "q.id AS id, q.category_id AS category_id, q.question_text AS question_text, \
     q.answer_text AS answer_text, q.keywords AS keywords, q.difficulty AS difficulty, \
     q.created_at AS created_at";

/// Questions are listed easy → medium → hard, unrated last
const DIFFICULTY_ORDER: &str = "CASE q.difficulty WHEN 'easy' THEN 0 WHEN 'medium' THEN 1 WHEN 'hard' THEN 2 ELSE 3 END, q.id";

/// Content store backed by a SQLite pool
#[derive(Clone)]
pub struct SqlStore {
    db: SqlitePool,
}

impl SqlStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Resolve a topic reference: numeric id, then slug, then case-insensitive name
    pub async fn resolve_topic(&self, topic: &TopicRef) -> Result<Option<Topic>> {
        let sql = format!("SELECT {} FROM topics WHERE id = ?", TOPIC_COLUMNS);
        match topic {
            TopicRef::Id(id) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(&self.db).await?;
                row.as_ref().map(topic_from_row).transpose()
            }
            TopicRef::Slug(raw) => {
                let by_slug = format!("SELECT {} FROM topics WHERE slug = ?", TOPIC_COLUMNS);
                if let Some(row) = sqlx::query(&by_slug)
                    .bind(raw)
                    .fetch_optional(&self.db)
                    .await?
                {
                    return topic_from_row(&row).map(Some);
                }

                debug!(topic = %raw, "Topic slug not found, trying name");
                let by_name = format!(
                    "SELECT {} FROM topics WHERE LOWER(name) = LOWER(?) ORDER BY id LIMIT 1",
                    TOPIC_COLUMNS
                );
                let row = sqlx::query(&by_name)
                    .bind(dehyphenate(raw))
                    .fetch_optional(&self.db)
                    .await?;
                row.as_ref().map(topic_from_row).transpose()
            }
        }
    }

    /// Resolve a category reference: numeric id, then slug or exact name, then name substring
    pub async fn resolve_category(&self, category: &CategoryRef) -> Result<Option<Category>> {
        self.resolve_category_in(category, None).await
    }

    /// Same lookup order as [`resolve_category`](Self::resolve_category), limited to one
    /// topic's categories when `topic_id` is given
    async fn resolve_category_in(
        &self,
        category: &CategoryRef,
        topic_id: Option<i64>,
    ) -> Result<Option<Category>> {
        match category {
            CategoryRef::Id(id) => {
                let sql = format!(
                    "SELECT {} FROM categories WHERE id = ?1 AND (?2 IS NULL OR topic_id = ?2)",
                    CATEGORY_COLUMNS
                );
                let row = sqlx::query(&sql)
                    .bind(id)
                    .bind(topic_id)
                    .fetch_optional(&self.db)
                    .await?;
                row.as_ref().map(category_from_row).transpose()
            }
            CategoryRef::Slug(raw) => {
                let name = dehyphenate(raw);

                let exact = format!(
                    "SELECT {} FROM categories
                     WHERE (slug = ?1 OR LOWER(name) = LOWER(?2)) AND (?3 IS NULL OR topic_id = ?3)
                     ORDER BY id LIMIT 1",
                    CATEGORY_COLUMNS
                );
                if let Some(row) = sqlx::query(&exact)
                    .bind(raw)
                    .bind(&name)
                    .bind(topic_id)
                    .fetch_optional(&self.db)
                    .await?
                {
                    return category_from_row(&row).map(Some);
                }

                debug!(category = %raw, "No exact category match, trying substring");
                let partial = format!(
                    "SELECT {} FROM categories
                     WHERE LOWER(name) LIKE ?1 ESCAPE '\\' AND (?2 IS NULL OR topic_id = ?2)
                     ORDER BY id LIMIT 1",
                    CATEGORY_COLUMNS
                );
                let row = sqlx::query(&partial)
                    .bind(like_pattern(&name))
                    .bind(topic_id)
                    .fetch_optional(&self.db)
                    .await?;
                row.as_ref().map(category_from_row).transpose()
            }
        }
    }

    async fn categories_for_topic_id(&self, topic_id: i64) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE topic_id = ? ORDER BY name",
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(topic_id).fetch_all(&self.db).await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn questions_for_category_id(&self, category_id: i64) -> Result<Vec<Question>> {
        let sql = format!(
            "SELECT {} FROM questions q WHERE q.category_id = ? ORDER BY {}",
            QUESTION_COLUMNS, DIFFICULTY_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(category_id)
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(question_from_row).collect()
    }
}

#[async_trait]
impl ContentStore for SqlStore {
    fn name(&self) -> &'static str {
        "sql"
    }

    async fn topics(&self, domain: Option<&str>) -> Result<Vec<Topic>> {
        let sql = format!(
            "SELECT {} FROM topics WHERE (?1 IS NULL OR domain = ?1) ORDER BY name",
            TOPIC_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(domain).fetch_all(&self.db).await?;
        rows.iter().map(topic_from_row).collect()
    }

    async fn categories_by_topic(&self, topic: &TopicRef) -> Result<Vec<Category>> {
        let resolved = self
            .resolve_topic(topic)
            .await?
            .ok_or_else(|| TopicsError::NotFound(format!("Topic with ID or slug {} not found", topic)))?;
        self.categories_for_topic_id(resolved.id).await
    }

    async fn questions_by_category(&self, category: &CategoryRef) -> Result<Vec<Question>> {
        let resolved = self.resolve_category(category).await?.ok_or_else(|| {
            TopicsError::NotFound(format!("Category with ID or name {} not found", category))
        })?;
        self.questions_for_category_id(resolved.id).await
    }

    async fn topic_with_categories(&self, topic: &TopicRef) -> Result<Option<TopicWithCategories>> {
        let Some(topic) = self.resolve_topic(topic).await? else {
            return Ok(None);
        };
        let categories = self.categories_for_topic_id(topic.id).await?;
        Ok(Some(TopicWithCategories { topic, categories }))
    }

    async fn category_with_questions(
        &self,
        category: &CategoryRef,
        _domain: Option<&str>,
    ) -> Result<Option<CategoryWithQuestions>> {
        let Some(category) = self.resolve_category(category).await? else {
            return Ok(None);
        };
        let questions = self.questions_for_category_id(category.id).await?;
        Ok(Some(CategoryWithQuestions {
            category,
            questions,
        }))
    }

    async fn topic_category(
        &self,
        topic: &TopicRef,
        category: &CategoryRef,
    ) -> Result<Option<CategoryWithQuestions>> {
        let Some(owner) = self.resolve_topic(topic).await? else {
            return Ok(None);
        };
        let Some(category_record) = self.resolve_category_in(category, Some(owner.id)).await? else {
            debug!(topic = %topic, category = %category, "Category not under topic");
            return Ok(None);
        };
        let questions = self.questions_for_category_id(category_record.id).await?;
        Ok(Some(CategoryWithQuestions {
            category: category_record,
            questions,
        }))
    }

    async fn search_questions(&self, query: &str, filters: &SearchFilters) -> Result<Vec<Question>> {
        let sql = format!(
            "SELECT {} FROM questions q JOIN categories c ON c.id = q.category_id
             WHERE LOWER(q.question_text) LIKE ?1 ESCAPE '\\'
               AND (?2 IS NULL OR q.difficulty = ?2)
               AND (?3 IS NULL OR c.topic_id = ?3)
               AND (?4 IS NULL OR q.category_id = ?4)
             ORDER BY q.id
             LIMIT ?5",
            QUESTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(like_pattern(query))
            .bind(filters.difficulty.map(|d| d.as_str()))
            .bind(filters.topic_id)
            .bind(filters.category_id)
            .bind(SEARCH_LIMIT)
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(question_from_row).collect()
    }
}

/// `%needle%` in lowercase with LIKE metacharacters escaped
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn topic_from_row(row: &SqliteRow) -> Result<Topic> {
    Ok(Topic {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        created_at: row.try_get("created_at")?,
    })
}

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        topic_id: row.try_get("topic_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn question_from_row(row: &SqliteRow) -> Result<Question> {
    let keywords: String = row.try_get("keywords")?;
    let keywords: Vec<String> = serde_json::from_str(&keywords)
        .map_err(|e| TopicsError::Shape(format!("Invalid keywords column: {}", e)))?;
    let difficulty: Option<String> = row.try_get("difficulty")?;
    let difficulty = difficulty
        .map(|d| d.parse::<Difficulty>())
        .transpose()
        .map_err(|e| TopicsError::Shape(e.to_string()))?;

    Ok(Question {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        question_text: row.try_get("question_text")?,
        answer_text: row.try_get("answer_text")?,
        keywords,
        difficulty,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("Bias"), "%bias%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
