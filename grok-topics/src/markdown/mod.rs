//! Markdown-authored topic trees
//!
//! The second, independently keyed representation of the content. [`LocalMarkdownSource`]
//! reads `<topic>.md` files from a directory; [`HttpMarkdownSource`] reads the same trees
//! through the legacy topics API.

use async_trait::async_trait;
use grok_common::{CategoryItem, TopicItem, TopicTree};

use crate::Result;

mod http;
mod local;
pub mod parser;

pub use http::HttpMarkdownSource;
pub use local::LocalMarkdownSource;
pub use parser::{main_categories, parse_topic};

#[async_trait]
pub trait MarkdownSource: Send + Sync {
    /// Source name for log output
    fn name(&self) -> &'static str;

    /// Every topic tree the source knows, keyed by topic id
    async fn fetch_all(&self) -> Result<TopicTree>;

    /// One topic tree; `TopicsError::NotFound` when the topic does not exist
    async fn fetch_topic(&self, topic_id: &str) -> Result<TopicItem>;

    /// Top-level sections of a topic as a category listing
    async fn topic_categories(&self, topic_id: &str) -> Result<Vec<CategoryItem>>;

    /// Section matching `category_id` within a topic, `None` when nothing matches
    async fn category_detail(&self, topic_id: &str, category_id: &str) -> Result<Option<TopicItem>>;
}
