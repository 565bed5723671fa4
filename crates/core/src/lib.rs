pub mod controls;
pub mod error;
pub mod lifecycle;
pub mod moderation;
pub mod pagination;
pub mod submission;
pub mod types;
pub mod wizard;
