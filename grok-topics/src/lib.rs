//! grok-topics library interface
//!
//! Reconciles the relational content store with the markdown topic library into one
//! TopicTree, and serves both over the legacy topics API.

pub mod accessor;
pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod markdown;
pub mod merge;
pub mod provider;
pub mod resolve;
pub mod service;
pub mod snapshot;
pub mod store;

pub use crate::error::{Result, TopicsError};
pub use crate::service::TopicDataService;
