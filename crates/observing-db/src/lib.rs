pub mod comments;
pub mod community_ids;
pub mod feeds;
pub mod identifications;
pub mod interactions;
pub mod likes;
pub mod migrate;
pub mod oauth;
pub mod observers;
pub mod occurrences;
pub mod private_data;
#[cfg(feature = "processing")]
pub mod processing;
pub mod types;

pub use sqlx::postgres::PgPool;
pub use types::*;
