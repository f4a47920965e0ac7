//! Tree Reconciliation Service
//!
//! Produces the unified TopicTree from the relational accessor and a markdown source.
//! Four cache tiers share one TTL: the full tree, per-topic nodes, per-topic category
//! listings and per-category details. Every tier coalesces concurrent misses and never
//! caches a failure.
//!
//! Public operations degrade to `{}`/`None`/`[]` on failure; nothing is retried
//! automatically.

use futures::future::join_all;
use grok_common::db::CategoryWithQuestions;
use grok_common::{CategoryItem, TopicItem, TopicTree};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::accessor::DataAccessor;
use crate::cache::TtlCache;
use crate::markdown::MarkdownSource;
use crate::merge::{self, merge_node, merge_trees};
use crate::resolve::{self, AliasTable, MatchStrategy};
use crate::snapshot::SnapshotStore;
use crate::store::{CategoryRef, TopicRef};
use crate::{Result, TopicsError};

pub struct TopicDataService {
    accessor: Arc<DataAccessor>,
    markdown: Arc<dyn MarkdownSource>,
    aliases: AliasTable,
    snapshot: Option<SnapshotStore>,
    all_topics: TtlCache<(), TopicTree>,
    topics: TtlCache<String, TopicItem>,
    categories: TtlCache<String, Vec<CategoryItem>>,
    details: TtlCache<(String, String), TopicItem>,
}

impl TopicDataService {
    pub fn new(
        accessor: Arc<DataAccessor>,
        markdown: Arc<dyn MarkdownSource>,
        aliases: AliasTable,
        ttl: Duration,
    ) -> Self {
        info!(
            transport = accessor.transport(),
            markdown = markdown.name(),
            alias_version = aliases.version(),
            aliases = aliases.len(),
            "Topic data service created"
        );
        Self {
            accessor,
            markdown,
            aliases,
            snapshot: None,
            all_topics: TtlCache::new("all_topics", ttl),
            topics: TtlCache::new("topic", ttl),
            categories: TtlCache::new("topic_categories", ttl),
            details: TtlCache::new("category_details", ttl),
        }
    }

    /// Mirror every freshly merged full tree to `snapshot`
    pub fn with_snapshot(mut self, snapshot: SnapshotStore) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn snapshot(&self) -> Option<&SnapshotStore> {
        self.snapshot.as_ref()
    }

    pub fn accessor(&self) -> &DataAccessor {
        &self.accessor
    }

    // ---- Full tree ----

    /// Merged tree of every topic; `{}` when both sources fail
    pub async fn get_all_topic_data(&self) -> TopicTree {
        self.try_get_all_topic_data().await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to load topic data");
            TopicTree::new()
        })
    }

    pub async fn try_get_all_topic_data(&self) -> Result<TopicTree> {
        self.all_topics
            .get_or_fetch((), || self.fetch_all_topic_data())
            .await
    }

    async fn fetch_all_topic_data(&self) -> Result<TopicTree> {
        let (db, md) = tokio::join!(self.database_tree(), self.markdown.fetch_all());

        let tree = match (db, md) {
            (Ok(db), Ok(md)) => {
                debug!(db_topics = db.len(), md_topics = md.len(), "Merging topic trees");
                merge_trees(&db, &md)
            }
            (Ok(db), Err(e)) => {
                warn!(error = %e, "Markdown source failed, using database tree only");
                db
            }
            (Err(e), Ok(md)) => {
                warn!(error = %e, "Database tree failed, using markdown tree only");
                md
            }
            (Err(db_err), Err(md_err)) => {
                error!(markdown_error = %md_err, "Both topic sources failed");
                return Err(db_err);
            }
        };

        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(&tree).await {
                warn!(path = %snapshot.path().display(), error = %e, "Failed to write snapshot");
            }
        }

        info!(topics = tree.len(), "Topic data loaded");
        Ok(tree)
    }

    /// Every topic with its categories as tree nodes keyed by slug
    async fn database_tree(&self) -> Result<TopicTree> {
        let topics = self.accessor.try_get_topics(None).await?;

        let refs: Vec<TopicRef> = topics.iter().map(|t| TopicRef::Id(t.id)).collect();
        let listings = join_all(
            refs.iter()
                .map(|topic| self.accessor.try_get_categories_by_topic(topic)),
        )
        .await;

        let mut tree = TopicTree::new();
        for (topic, categories) in topics.iter().zip(listings) {
            let categories = categories.unwrap_or_else(|e| {
                warn!(topic = %topic.slug, error = %e, "Categories unavailable, topic kept without them");
                Vec::new()
            });
            tree.insert(topic.slug.clone(), merge::topic_node(topic, &categories));
        }
        Ok(tree)
    }

    // ---- One topic ----

    /// `{topic_id: node}` for one topic, `None` when neither source has it
    pub async fn get_topic_data(&self, topic_id: &str) -> Option<TopicTree> {
        match self.topic_node(topic_id).await {
            Ok(node) => Some(TopicTree::from([(topic_id.to_string(), node)])),
            Err(e) => {
                error!(topic = topic_id, error = %e, "Failed to load topic data");
                None
            }
        }
    }

    /// Merged node for a topic, from the full tree when it is cached
    async fn topic_node(&self, topic_id: &str) -> Result<TopicItem> {
        if let Some(node) = self
            .all_topics
            .get(&())
            .and_then(|mut tree| tree.remove(topic_id))
        {
            debug!(topic = topic_id, "Topic served from full tree cache");
            return Ok(node);
        }
        self.topics
            .get_or_fetch(topic_id.to_string(), || self.fetch_topic(topic_id))
            .await
    }

    async fn fetch_topic(&self, topic_id: &str) -> Result<TopicItem> {
        let topic = TopicRef::parse(topic_id);
        let (db, md) = tokio::join!(
            self.accessor.try_get_topic_with_categories(&topic),
            self.markdown.fetch_topic(topic_id)
        );

        let db = match db {
            Ok(found) => found.map(|t| merge::topic_node(&t.topic, &t.categories)),
            Err(e) => {
                warn!(topic = topic_id, error = %e, "Database topic unavailable");
                None
            }
        };
        let md = match md {
            Ok(node) => Some(node),
            Err(e) => {
                if e.is_not_found() {
                    debug!(topic = topic_id, "No markdown for topic");
                } else {
                    warn!(topic = topic_id, error = %e, "Markdown topic unavailable");
                }
                None
            }
        };

        match (db, md) {
            (Some(db), Some(md)) => Ok(merge_node(&db, &md)),
            (Some(node), None) | (None, Some(node)) => Ok(node),
            (None, None) => Err(TopicsError::NotFound(format!(
                "Topic {} not found in any source",
                topic_id
            ))),
        }
    }

    // ---- Category listing ----

    /// Categories of a topic; relational listing first, markdown sections otherwise
    pub async fn get_topic_categories(&self, topic_id: &str) -> Vec<CategoryItem> {
        self.categories
            .get_or_fetch(topic_id.to_string(), || self.fetch_topic_categories(topic_id))
            .await
            .unwrap_or_else(|e| {
                error!(topic = topic_id, error = %e, "Failed to load topic categories");
                Vec::new()
            })
    }

    async fn fetch_topic_categories(&self, topic_id: &str) -> Result<Vec<CategoryItem>> {
        match self
            .accessor
            .try_get_categories_by_topic(&TopicRef::parse(topic_id))
            .await
        {
            Ok(categories) if !categories.is_empty() => {
                return Ok(categories
                    .into_iter()
                    .map(|c| CategoryItem {
                        id: c.slug,
                        label: c.name,
                    })
                    .collect());
            }
            Ok(_) => debug!(topic = topic_id, "No relational categories, using markdown"),
            Err(e) => debug!(topic = topic_id, error = %e, "Relational categories failed, using markdown"),
        }
        self.markdown.topic_categories(topic_id).await
    }

    // ---- Category details ----

    /// Detail node for a category within a topic, `None` when no stage resolves it
    pub async fn get_category_details(&self, topic_id: &str, category_id: &str) -> Option<TopicItem> {
        let key = (topic_id.to_string(), category_id.to_string());
        let result = self
            .details
            .get_or_fetch(key, || async {
                self.resolve_category_details(topic_id, category_id)
                    .await?
                    .ok_or_else(|| {
                        TopicsError::NotFound(format!(
                            "Category {} not found in topic {}",
                            category_id, topic_id
                        ))
                    })
            })
            .await;

        match result {
            Ok(node) => Some(node),
            Err(e) if e.is_not_found() => {
                info!(topic = topic_id, category = category_id, "No matching category section");
                None
            }
            Err(e) => {
                error!(topic = topic_id, category = category_id, error = %e, "Failed to load category details");
                None
            }
        }
    }

    async fn resolve_category_details(
        &self,
        topic_id: &str,
        category_id: &str,
    ) -> Result<Option<TopicItem>> {
        if let Some(node) = self.direct_details(topic_id, category_id).await {
            info!(topic = topic_id, category = category_id, strategy = %MatchStrategy::Direct, "Category resolved");
            return Ok(Some(node));
        }

        match self.topic_node(topic_id).await {
            Ok(topic) => {
                let hint = self.category_label(topic_id, category_id).await;
                if let Some(hit) = resolve::resolve(&topic, category_id, hint.as_deref(), &self.aliases) {
                    info!(topic = topic_id, category = category_id, key = hit.key, strategy = %hit.strategy, "Category resolved");
                    return Ok(Some(with_key(hit.node, hit.key)));
                }
                debug!(topic = topic_id, category = category_id, "No cached section matched, reloading topic");
            }
            Err(e) => debug!(topic = topic_id, error = %e, "Topic unavailable for fallback search"),
        }

        let fresh = self.markdown.fetch_topic(topic_id).await?;
        Ok(resolve::simplified_match(&fresh, category_id).map(|hit| {
            info!(topic = topic_id, category = category_id, key = hit.key, strategy = %hit.strategy, "Category resolved");
            with_key(hit.node, hit.key)
        }))
    }

    /// Database questions as synthesized children, merged with the markdown detail
    ///
    /// Only a category owned by `topic_id` contributes questions.
    async fn direct_details(&self, topic_id: &str, category_id: &str) -> Option<TopicItem> {
        let topic = TopicRef::parse(topic_id);
        let category = CategoryRef::parse(category_id);
        let (owned, detail) = tokio::join!(
            self.accessor.try_get_topic_category(&topic, &category),
            self.markdown.category_detail(topic_id, category_id)
        );

        let owned = owned.unwrap_or_else(|e| {
            debug!(topic = topic_id, category = category_id, error = %e, "No database questions for category");
            None
        });
        let detail = detail.unwrap_or_else(|e| {
            debug!(topic = topic_id, category = category_id, error = %e, "No markdown detail for category");
            None
        });

        let Some(CategoryWithQuestions {
            category: record,
            questions,
        }) = owned.filter(|found| !found.questions.is_empty())
        else {
            return detail;
        };

        let mut db_node = TopicItem::default();
        db_node.category_id = Some(record.id);
        for question in &questions {
            let key = format!("{}-q{}", category_id, question.id);
            let mut node = TopicItem::new(question.question_text.clone()).with_id(key.clone());
            node.content = question.answer_text.clone();
            node.category_id = Some(question.category_id);
            node.synthesized = true;
            db_node.subtopics.insert(key, node);
        }

        Some(match detail {
            Some(md) => merge_node(&db_node, &md),
            None => {
                db_node.label = if record.name.trim().is_empty() {
                    category_id.replace('-', " ")
                } else {
                    record.name
                };
                db_node.id = Some(category_id.to_string());
                db_node.synthesized = true;
                db_node
            }
        })
    }

    /// Label of a category from the topic's listing
    async fn category_label(&self, topic_id: &str, category_id: &str) -> Option<String> {
        self.get_topic_categories(topic_id)
            .await
            .into_iter()
            .find(|c| c.id == category_id)
            .map(|c| c.label)
    }

    /// Drop every in-memory tier, including the accessor's; the snapshot is untouched
    pub fn clear_cache(&self) {
        self.all_topics.clear();
        self.topics.clear();
        self.categories.clear();
        self.details.clear();
        self.accessor.clear_cache();
        info!("Topic data caches cleared");
    }
}

fn with_key(node: &TopicItem, key: &str) -> TopicItem {
    let mut node = node.clone();
    if node.id.is_none() {
        node.id = Some(key.to_string());
    }
    node
}
