//! Database models, schema initialization and seeding

pub mod init;
pub mod models;
pub mod seed;

pub use init::*;
pub use models::*;
pub use seed::{seed, seed_from_file, SeedData, SeedSummary};
