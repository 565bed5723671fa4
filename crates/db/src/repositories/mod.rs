//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument. Methods that must compose inside a
//! caller-owned transaction take `&mut PgConnection` instead.

pub mod catalog_repo;
pub mod like_repo;
pub mod moderation_repo;
pub mod post_repo;
pub mod subscription_repo;
pub mod user_repo;

pub use catalog_repo::CatalogRepo;
pub use like_repo::LikeRepo;
pub use moderation_repo::ModerationRepo;
pub use post_repo::PostRepo;
pub use subscription_repo::SubscriptionRepo;
pub use user_repo::UserRepo;
