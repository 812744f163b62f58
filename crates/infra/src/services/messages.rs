//! Buyer/seller messaging.

use chrono::Utc;
use thiserror::Error;

use agromarket_core::{DomainError, UserId};
use agromarket_messaging::{
    Message, MessageId, conversation_between, latest_per_counterpart, unread_for,
};
use agromarket_products::ProductId;

use crate::repository::{Repository, RepositoryError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("message {0} not found")]
    NotFound(MessageId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

#[derive(Debug)]
pub struct MessageService<M> {
    messages: M,
}

impl<M> MessageService<M>
where
    M: Repository<MessageId, Message>,
{
    pub fn new(messages: M) -> Self {
        Self { messages }
    }

    /// Store a message and notify the recipient.
    pub fn send(
        &self,
        sender: UserId,
        recipient: UserId,
        body: impl Into<String>,
        product: Option<ProductId>,
    ) -> Result<Message, MessagingError> {
        let message = Message::new(sender, recipient, body, product, Utc::now())?;
        self.messages.insert(message.id_typed(), message.clone())?;

        // Email delivery is not wired up; the notification is only logged.
        tracing::info!(
            message_id = %message.id_typed(),
            %recipient,
            "new message notification sent"
        );
        Ok(message)
    }

    /// Messages between two users, oldest first, optionally about one product.
    pub fn conversation(
        &self,
        a: UserId,
        b: UserId,
        product: Option<ProductId>,
    ) -> Result<Vec<Message>, MessagingError> {
        let all = self.messages.list()?;
        Ok(conversation_between(&all, a, b, product).into_iter().cloned().collect())
    }

    pub fn mark_read(&self, message_id: MessageId) -> Result<Message, MessagingError> {
        let mut message = self
            .messages
            .get(&message_id)?
            .ok_or(MessagingError::NotFound(message_id))?;
        message.mark_read();
        self.messages.update(message_id, message.clone())?;
        Ok(message)
    }

    pub fn unread_for(&self, user: UserId) -> Result<Vec<Message>, MessagingError> {
        let all = self.messages.list()?;
        Ok(unread_for(&all, user).into_iter().cloned().collect())
    }

    pub fn delete(&self, message_id: MessageId) -> Result<Message, MessagingError> {
        self.messages
            .remove(&message_id)?
            .ok_or(MessagingError::NotFound(message_id))
    }

    /// Newest message with each counterpart of `user`, newest first.
    pub fn latest_conversations(&self, user: UserId) -> Result<Vec<Message>, MessagingError> {
        let all = self.messages.list()?;
        Ok(latest_per_counterpart(&all, user).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    fn service() -> MessageService<InMemoryRepository<MessageId, Message>> {
        MessageService::new(InMemoryRepository::new())
    }

    #[test]
    fn send_read_and_delete() {
        let inbox = service();
        let buyer = UserId::new();
        let seller = UserId::new();

        let question = inbox.send(buyer, seller, "¿Envían a Medellín?", None).unwrap();
        inbox.send(seller, buyer, "Sí, por tierra", None).unwrap();

        assert_eq!(inbox.unread_for(seller).unwrap().len(), 1);
        inbox.mark_read(question.id_typed()).unwrap();
        assert!(inbox.unread_for(seller).unwrap().is_empty());

        let thread = inbox.conversation(seller, buyer, None).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].id_typed(), question.id_typed());

        inbox.delete(question.id_typed()).unwrap();
        assert_eq!(
            inbox.delete(question.id_typed()).unwrap_err(),
            MessagingError::NotFound(question.id_typed())
        );
        assert_eq!(inbox.conversation(buyer, seller, None).unwrap().len(), 1);
    }

    #[test]
    fn invalid_messages_are_not_stored() {
        let inbox = service();
        let user = UserId::new();

        assert!(matches!(
            inbox.send(user, user, "hola", None),
            Err(MessagingError::Domain(DomainError::Validation(_)))
        ));
        assert!(inbox.latest_conversations(user).unwrap().is_empty());
    }

    #[test]
    fn latest_conversations_one_per_counterpart() {
        let inbox = service();
        let me = UserId::new();
        let a = UserId::new();
        let b = UserId::new();

        inbox.send(a, me, "first from a", None).unwrap();
        inbox.send(b, me, "from b", None).unwrap();
        let newest = inbox.send(me, a, "reply to a", None).unwrap();

        let latest = inbox.latest_conversations(me).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].id_typed(), newest.id_typed());
    }
}
