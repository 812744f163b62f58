use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agromarket_core::{DomainError, DomainResult, Entity, UserId};
use agromarket_products::ProductId;

/// Message identifier (UUIDv7, so ids sort by send time).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MessageId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A message from one user to another, optionally about a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    sender: UserId,
    recipient: UserId,
    product: Option<ProductId>,
    body: String,
    sent_at: DateTime<Utc>,
    read: bool,
}

impl Entity for Message {
    type Id = MessageId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Message {
    pub fn new(
        sender: UserId,
        recipient: UserId,
        body: impl Into<String>,
        product: Option<ProductId>,
        sent_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::validation("message body cannot be empty"));
        }
        if sender == recipient {
            return Err(DomainError::validation("cannot send a message to yourself"));
        }

        Ok(Self {
            id: MessageId::new(),
            sender,
            recipient,
            product,
            body,
            sent_at,
            read: false,
        })
    }

    pub fn id_typed(&self) -> MessageId {
        self.id
    }

    pub fn sender(&self) -> UserId {
        self.sender
    }

    pub fn recipient(&self) -> UserId {
        self.recipient
    }

    pub fn product(&self) -> Option<ProductId> {
        self.product
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.sender == user || self.recipient == user
    }

    /// The other participant, if `user` takes part in this message.
    pub fn counterpart(&self, user: UserId) -> Option<UserId> {
        if self.sender == user {
            Some(self.recipient)
        } else if self.recipient == user {
            Some(self.sender)
        } else {
            None
        }
    }

    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender == a && self.recipient == b) || (self.sender == b && self.recipient == a)
    }
}
