//! Markdown library on the local filesystem

use async_trait::async_trait;
use grok_common::{CategoryItem, TopicItem, TopicTree};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{parse_topic, parser, MarkdownSource};
use crate::resolve::{self, AliasTable};
use crate::{Result, TopicsError};

/// Directory of `<topic>.md` files
#[derive(Debug, Clone)]
pub struct LocalMarkdownSource {
    dir: PathBuf,
    aliases: AliasTable,
}

impl LocalMarkdownSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            aliases: AliasTable::builtin(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Topic ids with a markdown file, sorted
    pub async fn topic_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if valid_topic_id(stem) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn topic_path(&self, topic_id: &str) -> Result<PathBuf> {
        if !valid_topic_id(topic_id) {
            return Err(TopicsError::NotFound(format!(
                "No markdown file found for topic {}",
                topic_id
            )));
        }
        Ok(self.dir.join(format!("{}.md", topic_id)))
    }
}

#[async_trait]
impl MarkdownSource for LocalMarkdownSource {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn fetch_all(&self) -> Result<TopicTree> {
        let mut tree = TopicTree::new();
        for id in self.topic_ids().await? {
            match self.fetch_topic(&id).await {
                Ok(topic) => {
                    tree.insert(id, topic);
                }
                Err(e) => warn!(topic = %id, error = %e, "Skipping unreadable markdown topic"),
            }
        }
        debug!(dir = %self.dir.display(), topics = tree.len(), "Loaded markdown library");
        Ok(tree)
    }

    async fn fetch_topic(&self, topic_id: &str) -> Result<TopicItem> {
        let path = self.topic_path(topic_id)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TopicsError::NotFound(format!(
                    "No markdown file found for topic {}",
                    topic_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(parse_topic(topic_id, &text))
    }

    async fn topic_categories(&self, topic_id: &str) -> Result<Vec<CategoryItem>> {
        let topic = self.fetch_topic(topic_id).await?;
        Ok(parser::main_categories(&topic))
    }

    async fn category_detail(&self, topic_id: &str, category_id: &str) -> Result<Option<TopicItem>> {
        let topic = self.fetch_topic(topic_id).await?;
        Ok(resolve::resolve(&topic, category_id, None, &self.aliases).map(|hit| {
            let mut node = hit.node.clone();
            node.id.get_or_insert_with(|| hit.key.to_string());
            node
        }))
    }
}

/// Topic ids map to file names: ASCII alphanumerics, `-` and `_` only
fn valid_topic_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library() -> (TempDir, LocalMarkdownSource) {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("ml.md"),
            "# Machine Learning\n## Supervised Learning\n- Regression\n## Deep Learning\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("dsa.md"), "# Data Structures\n## Graphs\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let source = LocalMarkdownSource::new(dir.path());
        (dir, source)
    }

    #[tokio::test]
    async fn test_fetch_all_reads_every_topic() {
        let (_dir, source) = library();
        let tree = source.fetch_all().await.unwrap();
        assert_eq!(tree.keys().collect::<Vec<_>>(), ["dsa", "ml"]);
        assert_eq!(tree["ml"].label, "Machine Learning");
    }

    #[tokio::test]
    async fn test_missing_topic_is_not_found() {
        let (_dir, source) = library();
        let err = source.fetch_topic("webdev").await.unwrap_err();
        assert!(err.is_not_found());
        let err = source.fetch_topic("../etc/passwd").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_categories_and_detail() {
        let (_dir, source) = library();
        let categories = source.topic_categories("ml").await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, "ml-deep-learning");

        let detail = source
            .category_detail("ml", "supervised-learning")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.label, "Supervised Learning");
        assert_eq!(detail.id.as_deref(), Some("ml-supervised-learning"));
        assert_eq!(detail.subtopics.len(), 1);

        assert!(source
            .category_detail("ml", "quantum-physics")
            .await
            .unwrap()
            .is_none());
    }
}
