//! Two-way merge of the database-derived tree and the markdown tree
//!
//! Precedence:
//! - database wins identity and metadata: `id`, `label`, `topic_id`, `category_id`
//! - markdown wins `content`; children from both sides are merged recursively
//!
//! Children correspond by exact key first, then by case-insensitive label. Nodes without
//! a counterpart are kept from either side, so nothing is dropped. Merged nodes keep the
//! database key.

use grok_common::db::{Category, Topic};
use grok_common::{TopicItem, TopicTree};
use std::collections::BTreeSet;

/// Merge two slug-keyed levels
pub fn merge_trees(db: &TopicTree, md: &TopicTree) -> TopicTree {
    let mut merged = TopicTree::new();
    let mut consumed: BTreeSet<&str> = BTreeSet::new();

    for (key, db_node) in db {
        let counterpart = md
            .get_key_value(key.as_str())
            .filter(|(k, _)| !consumed.contains(k.as_str()))
            .or_else(|| {
                let label = db_node.label.to_lowercase();
                md.iter().find(|(k, node)| {
                    !consumed.contains(k.as_str())
                        && !db.contains_key(k.as_str())
                        && !label.is_empty()
                        && node.label.to_lowercase() == label
                })
            });

        let node = match counterpart {
            Some((md_key, md_node)) => {
                consumed.insert(md_key.as_str());
                merge_node(db_node, md_node)
            }
            None => db_node.clone(),
        };
        merged.insert(key.clone(), node);
    }

    for (key, md_node) in md {
        if !consumed.contains(key.as_str()) {
            merged.insert(key.clone(), md_node.clone());
        }
    }

    merged
}

/// Merge one pair of corresponding nodes
pub fn merge_node(db: &TopicItem, md: &TopicItem) -> TopicItem {
    TopicItem {
        id: db.id.clone().or_else(|| md.id.clone()),
        label: if db.label.is_empty() {
            md.label.clone()
        } else {
            db.label.clone()
        },
        content: md.content.clone().or_else(|| db.content.clone()),
        subtopics: merge_trees(&db.subtopics, &md.subtopics),
        topic_id: db.topic_id.or(md.topic_id),
        category_id: db.category_id.or(md.category_id),
        synthesized: db.synthesized && md.synthesized,
    }
}

/// Database-derived node for a topic and its categories
pub fn topic_node(topic: &Topic, categories: &[Category]) -> TopicItem {
    let mut node = TopicItem::new(topic.name.clone()).with_id(topic.slug.clone());
    node.topic_id = Some(topic.id);
    for category in categories {
        node.subtopics
            .insert(category.slug.clone(), category_node(category));
    }
    node
}

pub fn category_node(category: &Category) -> TopicItem {
    let mut node = TopicItem::new(category.name.clone()).with_id(category.slug.clone());
    node.topic_id = Some(category.topic_id);
    node.category_id = Some(category.id);
    node
}
