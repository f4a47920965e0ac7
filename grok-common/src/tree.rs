//! TopicTree types
//!
//! The unified, UI-facing tree. Serialized in the legacy JSON shape served by the
//! topics API: `{ "<slug>": { "label": ..., "content": ..., "subtopics": { ... } } }`.
//! Unknown fields on input (e.g. `level`) are ignored; empty optional fields are
//! omitted on output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slug-keyed collection of nodes, one level of a TopicTree
pub type TopicTree = BTreeMap<String, TopicItem>;

/// One node of the unified tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicItem {
    /// Node key as known by the source that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub label: String,

    /// Free-text content (markdown source only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subtopics: TopicTree,

    /// Originating relational topic id
    #[serde(default, rename = "topicId", skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i64>,

    /// Originating relational category id
    #[serde(default, rename = "categoryId", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,

    /// Set on nodes derived by this layer rather than read from a source
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
}

impl TopicItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Depth-first search of a tree level (each node before its children, keys in order)
pub fn find_entry<'a, F>(tree: &'a TopicTree, pred: &F) -> Option<(&'a String, &'a TopicItem)>
where
    F: Fn(&TopicItem) -> bool,
{
    tree.iter().find_map(|(key, node)| {
        if pred(node) {
            Some((key, node))
        } else {
            find_entry(&node.subtopics, pred)
        }
    })
}

/// Legacy category listing entry (`{ "id": ..., "label": ... }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub id: String,
    pub label: String,
}

/// Convert a display label to a URL-safe slug
///
/// Lowercases, drops everything except word characters, whitespace and hyphens,
/// then collapses whitespace runs into single hyphens.
pub fn slugify(label: &str) -> String {
    let cleaned: String = label
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}
