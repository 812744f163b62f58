//! Queries over a set of messages.

use std::collections::HashMap;

use agromarket_core::UserId;
use agromarket_products::ProductId;

use crate::message::Message;

/// Messages exchanged between `a` and `b`, oldest first.
///
/// With `product` set, only messages about that product are returned.
pub fn conversation_between<'a, I>(
    messages: I,
    a: UserId,
    b: UserId,
    product: Option<ProductId>,
) -> Vec<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut found: Vec<&Message> = messages
        .into_iter()
        .filter(|m| m.is_between(a, b))
        .filter(|m| product.is_none() || m.product() == product)
        .collect();
    found.sort_by_key(|m| (m.sent_at(), m.id_typed()));
    found
}

/// Unread messages addressed to `user`, oldest first.
pub fn unread_for<'a, I>(messages: I, user: UserId) -> Vec<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut found: Vec<&Message> = messages
        .into_iter()
        .filter(|m| m.recipient() == user && !m.is_read())
        .collect();
    found.sort_by_key(|m| (m.sent_at(), m.id_typed()));
    found
}

/// The newest message with each counterpart of `user`, newest first.
pub fn latest_per_counterpart<'a, I>(messages: I, user: UserId) -> Vec<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut latest: HashMap<UserId, &Message> = HashMap::new();

    for message in messages {
        let Some(other) = message.counterpart(user) else {
            continue;
        };
        let key = (message.sent_at(), message.id_typed());
        latest
            .entry(other)
            .and_modify(|current| {
                if key > (current.sent_at(), current.id_typed()) {
                    *current = message;
                }
            })
            .or_insert(message);
    }

    let mut found: Vec<&Message> = latest.into_values().collect();
    found.sort_by_key(|m| std::cmp::Reverse((m.sent_at(), m.id_typed())));
    found
}
