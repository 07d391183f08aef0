#![cfg_attr(not(test), forbid(unsafe_code))]

//! Shared models and configuration for the Plaza feed platform.

pub mod config;
pub mod models;

pub use models::event::FeedEvent;
pub use models::feed::{FeedFilter, FeedFragment, FeedItem, FeedPage, HashtagEntry};
pub use models::message::Message;
pub use models::notification::{NotificationIntent, NotificationKind};
pub use models::timestamp::Timestamp;
pub use models::user::Identity;
