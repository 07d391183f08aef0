//! Wire and domain models shared between the server and its clients.

pub mod event;
pub mod feed;
pub mod message;
pub mod notification;
pub mod timestamp;
pub mod user;

pub use event::FeedEvent;
pub use feed::{FeedFilter, FeedFragment, FeedItem, FeedPage, HashtagEntry};
pub use message::Message;
pub use notification::{NotificationIntent, NotificationKind};
pub use timestamp::Timestamp;
pub use user::Identity;
