//! # Grok Common Library
//!
//! Shared code for the grok-topics services including:
//! - Database models, schema initialization and seeding
//! - TopicTree types shared by the merge and API layers
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod tree;

pub use error::{Error, Result};
pub use tree::{CategoryItem, TopicItem, TopicTree};
