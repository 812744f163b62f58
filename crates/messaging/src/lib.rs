//! Buyer/seller messaging.
//!
//! Messages are plain entities; the query helpers here work over any slice of
//! them so storage stays an infra concern.

pub mod conversation;
pub mod message;

pub use conversation::{conversation_between, latest_per_counterpart, unread_for};
pub use message::{Message, MessageId};
