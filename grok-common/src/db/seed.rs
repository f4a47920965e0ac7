//! Content seeding from a nested JSON fixture
//!
//! ```json
//! { "topics": [ { "slug": "ml", "name": "Machine Learning", "domain": "ml",
//!     "categories": [ { "slug": "ml-supervised", "name": "Supervised Learning",
//!         "questions": [ { "question_text": "...", "difficulty": "easy" } ] } ] } ] }
//! ```

use crate::db::models::Difficulty;
use crate::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub topics: Vec<SeedTopic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTopic {
    pub slug: String,
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCategory {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub questions: Vec<SeedQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedQuestion {
    pub question_text: String,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Row counts inserted by a seed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub topics: usize,
    pub categories: usize,
    pub questions: usize,
}

/// Read a fixture file and insert its contents
pub async fn seed_from_file(pool: &SqlitePool, path: &Path) -> Result<SeedSummary> {
    let text = std::fs::read_to_string(path)?;
    let data: SeedData = serde_json::from_str(&text)?;
    seed(pool, &data).await
}

/// Insert all topics, categories and questions in a single transaction
pub async fn seed(pool: &SqlitePool, data: &SeedData) -> Result<SeedSummary> {
    validate(data)?;
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for topic in &data.topics {
        let topic_id: i64 = sqlx::query_scalar(
            "INSERT INTO topics (slug, name, domain) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&topic.slug)
        .bind(&topic.name)
        .bind(&topic.domain)
        .fetch_one(&mut *tx)
        .await?;
        summary.topics += 1;

        for category in &topic.categories {
            let category_id: i64 = sqlx::query_scalar(
                "INSERT INTO categories (slug, name, topic_id) VALUES (?, ?, ?) RETURNING id",
            )
            .bind(&category.slug)
            .bind(&category.name)
            .bind(topic_id)
            .fetch_one(&mut *tx)
            .await?;
            summary.categories += 1;

            for question in &category.questions {
                let keywords = serde_json::to_string(&question.keywords)?;
                sqlx::query(
                    "INSERT INTO questions (category_id, question_text, answer_text, keywords, difficulty)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(category_id)
                .bind(&question.question_text)
                .bind(&question.answer_text)
                .bind(keywords)
                .bind(question.difficulty.map(|d| d.as_str()))
                .execute(&mut *tx)
                .await?;
                summary.questions += 1;
            }
        }
    }

    tx.commit().await?;
    info!(
        topics = summary.topics,
        categories = summary.categories,
        questions = summary.questions,
        "Seeded content database"
    );
    Ok(summary)
}

/// Reject records the schema would accept but lookups could never reach
fn validate(data: &SeedData) -> Result<()> {
    for topic in &data.topics {
        if topic.slug.trim().is_empty() {
            return Err(Error::Seed(format!("topic \"{}\" has an empty slug", topic.name)));
        }
        for category in &topic.categories {
            if category.slug.trim().is_empty() {
                return Err(Error::Seed(format!(
                    "category \"{}\" in topic {} has an empty slug",
                    category.name, topic.slug
                )));
            }
            if category.questions.iter().any(|q| q.question_text.trim().is_empty()) {
                return Err(Error::Seed(format!(
                    "category {} has a question without text",
                    category.slug
                )));
            }
        }
    }
    Ok(())
}
