//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Top-level subject area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub slug: String,
    pub name: String,
    /// Subject grouping tag (e.g. "ml")
    pub domain: String,
    #[serde(default = "crate::time::now")]
    pub created_at: DateTime<Utc>,
}

/// Subdivision of a topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub topic_id: i64,
    #[serde(default = "crate::time::now")]
    pub created_at: DateTime<Utc>,
}

/// Question difficulty (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::InvalidInput(format!("Unknown difficulty: {}", other))),
        }
    }
}

/// Leaf content unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub category_id: i64,
    pub question_text: String,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default = "crate::time::now")]
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// True when the answer has to be produced by the answer-generation service
    pub fn needs_generation(&self) -> bool {
        self.answer_text
            .as_deref()
            .map_or(true, |a| a.trim().is_empty())
    }
}

/// Topic with its categories attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicWithCategories {
    #[serde(flatten)]
    pub topic: Topic,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Category with its questions attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithQuestions {
    #[serde(flatten)]
    pub category: Category,
    #[serde(default)]
    pub questions: Vec<Question>,
}
