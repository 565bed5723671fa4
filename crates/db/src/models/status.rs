//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` database table.

use eventcast_core::error::CoreError;
use eventcast_core::lifecycle::PostState;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Post lifecycle status (`post_statuses`).
    PostStatus {
        Draft = 1,
        PendingModeration = 2,
        Approved = 3,
        Rejected = 4,
        ChangesRequested = 5,
        Published = 6,
        Expired = 7,
        Deleted = 8,
    }
}

impl From<PostState> for PostStatus {
    fn from(state: PostState) -> Self {
        match state {
            PostState::Draft => PostStatus::Draft,
            PostState::PendingModeration => PostStatus::PendingModeration,
            PostState::Approved => PostStatus::Approved,
            PostState::Rejected => PostStatus::Rejected,
            PostState::ChangesRequested => PostStatus::ChangesRequested,
            PostState::Published => PostStatus::Published,
            PostState::Expired => PostStatus::Expired,
            PostState::Deleted => PostStatus::Deleted,
        }
    }
}

impl From<PostStatus> for PostState {
    fn from(status: PostStatus) -> Self {
        match status {
            PostStatus::Draft => PostState::Draft,
            PostStatus::PendingModeration => PostState::PendingModeration,
            PostStatus::Approved => PostState::Approved,
            PostStatus::Rejected => PostState::Rejected,
            PostStatus::ChangesRequested => PostState::ChangesRequested,
            PostStatus::Published => PostState::Published,
            PostStatus::Expired => PostState::Expired,
            PostStatus::Deleted => PostState::Deleted,
        }
    }
}

/// Map a persisted status id onto the lifecycle state.
pub fn post_state(status_id: StatusId) -> Result<PostState, CoreError> {
    PostStatus::from_id(status_id)
        .map(PostState::from)
        .ok_or_else(|| CoreError::ConsistencyViolation(format!("Unknown post status id {status_id}")))
}
