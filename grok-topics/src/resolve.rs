//! Category key resolution against the markdown tree
//!
//! Category keys drift between the database and the markdown authoring side. A requested
//! key is resolved against the sections of a topic node in a fixed order, first match
//! wins:
//!
//! 1. alias table entry (data, versioned, loadable from config)
//! 2. exact key
//! 3. key containment in either direction
//! 4. at least half of the hyphen-delimited parts shared
//! 5. label containment against a label hint (or the dehyphenated key)
//! 6. normalized edit-distance similarity above [`SIMILARITY_THRESHOLD`]
//!
//! [`simplified_match`] is the looser containment check used after a fresh reload.

use grok_common::config::{AliasEntry, TomlConfig};
use grok_common::tree::{find_entry, slugify};
use grok_common::{TopicItem, TopicTree};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Minimum `strsim::normalized_levenshtein` score accepted by the similarity stage
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Which stage produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Direct,
    Alias,
    ExactKey,
    KeyContainment,
    SharedParts,
    LabelContainment,
    Similarity,
    Reload,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStrategy::Direct => "direct",
            MatchStrategy::Alias => "alias",
            MatchStrategy::ExactKey => "exact-key",
            MatchStrategy::KeyContainment => "key-containment",
            MatchStrategy::SharedParts => "shared-parts",
            MatchStrategy::LabelContainment => "label-containment",
            MatchStrategy::Similarity => "similarity",
            MatchStrategy::Reload => "reload",
        };
        f.write_str(s)
    }
}

/// A resolved section
#[derive(Debug, Clone, Copy)]
pub struct Match<'t> {
    pub key: &'t str,
    pub node: &'t TopicItem,
    pub strategy: MatchStrategy,
}

/// Key → target mapping for categories whose keys are known to drift
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    version: u32,
    entries: HashMap<String, AliasEntry>,
}

impl AliasTable {
    pub fn new(version: u32, entries: impl IntoIterator<Item = AliasEntry>) -> Self {
        Self {
            version,
            entries: entries.into_iter().map(|e| (e.key.clone(), e)).collect(),
        }
    }

    /// Built-in entries for the known drifting keys
    pub fn builtin() -> Self {
        Self::new(
            1,
            [
                AliasEntry {
                    key: "data-preprocessing-and-exploration".to_string(),
                    canonical: None,
                    label: Some("data preprocessing".to_string()),
                    path: Vec::new(),
                },
                AliasEntry {
                    key: "naive-bayes".to_string(),
                    canonical: None,
                    label: Some("naive bayes".to_string()),
                    path: vec!["supervised learning".to_string(), "classification".to_string()],
                },
            ],
        )
    }

    /// Built-in entries overlaid with the configured ones (same key replaces)
    pub fn from_config(config: &TomlConfig) -> Self {
        let mut table = Self::builtin();
        table.version = config.alias_version;
        for entry in &config.aliases {
            table.entries.insert(entry.key.clone(), entry.clone());
        }
        table
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&AliasEntry> {
        self.entries.get(key)
    }
}

/// Resolve `category_id` among the sections of `topic`
///
/// `label_hint` is the category label known from a listing, if any.
pub fn resolve<'t>(
    topic: &'t TopicItem,
    category_id: &str,
    label_hint: Option<&str>,
    aliases: &AliasTable,
) -> Option<Match<'t>> {
    let category_id = category_id.trim();
    if category_id.is_empty() {
        return None;
    }
    let sections = &topic.subtopics;

    if let Some(entry) = aliases.get(category_id) {
        if let Some((key, node)) = follow_alias(topic, entry) {
            return Some(found(key, node, MatchStrategy::Alias, category_id));
        }
        debug!(category = category_id, "Alias entry did not match any section");
    }

    if let Some((key, node)) = sections.get_key_value(category_id) {
        return Some(found(key, node, MatchStrategy::ExactKey, category_id));
    }

    if let Some((key, node)) = sections
        .iter()
        .find(|(key, _)| key.contains(category_id) || category_id.contains(key.as_str()))
    {
        return Some(found(key, node, MatchStrategy::KeyContainment, category_id));
    }

    let parts: Vec<&str> = category_id.split('-').filter(|p| !p.is_empty()).collect();
    if let Some((key, node)) = sections.iter().find(|(key, _)| {
        let key_parts: Vec<&str> = key.split('-').collect();
        let shared = parts.iter().filter(|p| key_parts.contains(*p)).count();
        shared > 0 && shared * 2 >= parts.len()
    }) {
        return Some(found(key, node, MatchStrategy::SharedParts, category_id));
    }

    let wanted = label_hint
        .map(str::to_lowercase)
        .unwrap_or_else(|| category_id.replace('-', " ").to_lowercase());
    if let Some((key, node)) = sections.iter().find(|(_, node)| {
        let label = node.label.to_lowercase();
        !label.is_empty() && (label.contains(&wanted) || wanted.contains(&label))
    }) {
        return Some(found(key, node, MatchStrategy::LabelContainment, category_id));
    }

    best_similar(sections, category_id)
        .map(|(key, node)| found(key, node, MatchStrategy::Similarity, category_id))
}

/// Containment after stripping everything but `[a-z0-9-]` from both sides
pub fn simplified_match<'t>(topic: &'t TopicItem, category_id: &str) -> Option<Match<'t>> {
    let wanted = simplify(category_id);
    if wanted.is_empty() {
        return None;
    }
    topic
        .subtopics
        .iter()
        .find(|(key, _)| {
            let key = simplify(key);
            key.contains(&wanted) || wanted.contains(&key)
        })
        .map(|(key, node)| found(key, node, MatchStrategy::Reload, category_id))
}

/// Similarity score of a requested key against a section key and label
pub fn similarity(category_id: &str, key: &str, label: &str) -> f64 {
    let wanted = normalize(category_id);
    let by_key = strsim::normalized_levenshtein(&wanted, &normalize(key));
    let by_label = strsim::normalized_levenshtein(&wanted, &normalize(&slugify(label)));
    by_key.max(by_label)
}

fn best_similar<'t>(sections: &'t TopicTree, category_id: &str) -> Option<(&'t String, &'t TopicItem)> {
    let mut best: Option<(f64, &String, &TopicItem)> = None;
    for (key, node) in sections {
        let score = similarity(category_id, key, &node.label);
        if score >= SIMILARITY_THRESHOLD && best.map_or(true, |(s, _, _)| score > s) {
            best = Some((score, key, node));
        }
    }
    best.map(|(score, key, node)| {
        debug!(category = category_id, key = %key, score, "Similarity candidate");
        (key, node)
    })
}

/// Alias lookup order: canonical key, top-level label, label inside `path`, label anywhere
fn follow_alias<'t>(topic: &'t TopicItem, entry: &AliasEntry) -> Option<(&'t String, &'t TopicItem)> {
    if let Some(canonical) = &entry.canonical {
        if let Some(hit) = topic.subtopics.get_key_value(canonical.as_str()) {
            return Some(hit);
        }
    }

    let label = entry.label.as_deref()?.to_lowercase();
    let labelled = |node: &TopicItem| node.label.to_lowercase().contains(&label);

    if let Some(hit) = topic.subtopics.iter().find(|(_, node)| labelled(*node)) {
        return Some(hit);
    }

    // Descend through the path; the section holding the label is the match
    if !entry.path.is_empty() {
        if let Some(container) = descend(topic, &entry.path) {
            if container.1.subtopics.values().any(|child| labelled(child)) {
                return Some(container);
            }
        }
    }

    find_entry(&topic.subtopics, &labelled)
}

fn descend<'t>(topic: &'t TopicItem, path: &[String]) -> Option<(&'t String, &'t TopicItem)> {
    let mut current: Option<(&String, &TopicItem)> = None;
    let mut children = &topic.subtopics;
    for step in path {
        let step = step.to_lowercase();
        let (key, node) = children
            .iter()
            .find(|(_, node)| node.label.to_lowercase().contains(&step))?;
        current = Some((key, node));
        children = &node.subtopics;
    }
    current
}

fn found<'t>(key: &'t str, node: &'t TopicItem, strategy: MatchStrategy, category_id: &str) -> Match<'t> {
    debug!(category = category_id, key, strategy = %strategy, "Resolved category section");
    Match {
        key,
        node,
        strategy,
    }
}

fn simplify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Lowercase, hyphens and underscores to spaces, collapse whitespace
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
