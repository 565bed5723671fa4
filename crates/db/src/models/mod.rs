pub mod catalog;
pub mod like;
pub mod moderation;
pub mod post;
pub mod status;
pub mod subscription;
pub mod user;
