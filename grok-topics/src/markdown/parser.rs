//! Markdown → topic node
//!
//! - `# Title` sets the topic label
//! - `##` to `######` open nested sections
//! - `-`, `*` and `+` bullets nest under the current section, two spaces per level
//! - any other non-blank line is appended to the current section's content
//!
//! Keys are `{parent_key}-{slug(label)}`; a repeated key under the same parent gets a
//! numeric suffix. Fenced code blocks are kept verbatim as content.

use grok_common::tree::slugify;
use grok_common::{CategoryItem, TopicItem};

/// Parse one topic document into its root node (keyed `topic_id`)
pub fn parse_topic(topic_id: &str, text: &str) -> TopicItem {
    let mut root = TopicItem::new(default_label(topic_id)).with_id(topic_id);

    // Keys from the root's children down to the current section, with heading levels
    let mut sections: Vec<(usize, String)> = Vec::new();
    // Keys from the current section down to the current bullet, with indent levels
    let mut bullets: Vec<(usize, String)> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            append_content(current(&mut root, &sections), line);
            continue;
        }
        if in_fence {
            append_content(current(&mut root, &sections), line);
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }

        if let Some((level, title)) = heading(trimmed) {
            bullets.clear();
            if level == 1 {
                root.label = title.to_string();
                sections.clear();
                continue;
            }

            while sections.last().is_some_and(|(l, _)| *l >= level) {
                sections.pop();
            }
            let parent = current(&mut root, &sections);
            let key = insert_child(parent, title);
            sections.push((level, key));
            continue;
        }

        if let Some((indent, text)) = bullet(line) {
            while bullets.last().is_some_and(|(l, _)| *l >= indent) {
                bullets.pop();
            }
            let section = current(&mut root, &sections);
            let parent = descend(section, &bullets);
            let key = insert_child(parent, text);
            bullets.push((indent, key));
            continue;
        }

        append_content(current(&mut root, &sections), trimmed);
    }

    root
}

/// Top-level sections of a topic as a category listing
pub fn main_categories(topic: &TopicItem) -> Vec<CategoryItem> {
    topic
        .subtopics
        .iter()
        .map(|(key, node)| CategoryItem {
            id: key.clone(),
            label: node.label.clone(),
        })
        .collect()
}

/// Topic id with its first letter capitalized
fn default_label(topic_id: &str) -> String {
    let mut chars = topic_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim();
    (!title.is_empty()).then_some((level, title))
}

fn bullet(line: &str) -> Option<(usize, &str)> {
    let spaces: usize = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    let rest = line.trim_start();
    let text = rest
        .strip_prefix("- ")
        .or_else(|| rest.strip_prefix("* "))
        .or_else(|| rest.strip_prefix("+ "))?
        .trim();
    (!text.is_empty()).then_some((spaces / 2, text))
}

/// Section node at the end of `path`
fn current<'a>(root: &'a mut TopicItem, path: &[(usize, String)]) -> &'a mut TopicItem {
    descend(root, path)
}

fn descend<'a>(mut node: &'a mut TopicItem, path: &[(usize, String)]) -> &'a mut TopicItem {
    for (_, key) in path {
        node = node.subtopics.entry(key.clone()).or_default();
    }
    node
}

fn insert_child(parent: &mut TopicItem, label: &str) -> String {
    let parent_key = parent.id.clone().unwrap_or_default();
    let slug = slugify(label);
    let base = if parent_key.is_empty() {
        slug
    } else {
        format!("{}-{}", parent_key, slug)
    };

    let mut key = base.clone();
    let mut n = 2;
    while parent.subtopics.contains_key(&key) {
        key = format!("{}-{}", base, n);
        n += 1;
    }

    parent
        .subtopics
        .insert(key.clone(), TopicItem::new(label).with_id(key.clone()));
    key
}

fn append_content(node: &mut TopicItem, line: &str) {
    match &mut node.content {
        Some(content) => {
            content.push('\n');
            content.push_str(line);
        }
        None => node.content = Some(line.to_string()),
    }
}
