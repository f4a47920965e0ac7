//! Markdown trees through the legacy topics API

use async_trait::async_trait;
use grok_common::{CategoryItem, TopicItem, TopicTree};
use std::collections::HashMap;

use super::MarkdownSource;
use crate::client::ApiClient;
use crate::{Result, TopicsError};

#[derive(Clone)]
pub struct HttpMarkdownSource {
    client: ApiClient,
}

impl HttpMarkdownSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarkdownSource for HttpMarkdownSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_all(&self) -> Result<TopicTree> {
        self.client.get_json("/api/topics", &[]).await
    }

    async fn fetch_topic(&self, topic_id: &str) -> Result<TopicItem> {
        let path = format!("/api/topics/{}", topic_id);
        let mut tree: TopicTree = self.client.get_json(&path, &[]).await?;
        tree.remove(topic_id).ok_or_else(|| {
            TopicsError::Shape(format!("Response for topic {} has no entry for it", topic_id))
        })
    }

    async fn topic_categories(&self, topic_id: &str) -> Result<Vec<CategoryItem>> {
        let mut listing: HashMap<String, Vec<CategoryItem>> = self
            .client
            .get_json("/api/topics/categories", &[("topicId", topic_id.to_string())])
            .await?;
        Ok(listing.remove(topic_id).unwrap_or_default())
    }

    async fn category_detail(&self, topic_id: &str, category_id: &str) -> Result<Option<TopicItem>> {
        let detail = self
            .client
            .get_json::<TopicItem>(
                "/api/topics/category-details",
                &[
                    ("topicId", topic_id.to_string()),
                    ("categoryId", category_id.to_string()),
                ],
            )
            .await;
        match detail {
            Ok(item) => Ok(Some(item)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
