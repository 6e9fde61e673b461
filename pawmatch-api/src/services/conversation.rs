//! Messages exchanged inside a match.

use uuid::Uuid;

use pawmatch_shared::errors::{AppError, AppResult};

use crate::models::Message;
use crate::services::access;
use crate::store::Store;

pub const MAX_MESSAGE_CHARS: usize = 1000;

fn message_body(content: &str) -> AppResult<&str> {
    let body = content.trim();
    if body.is_empty() {
        return Err(AppError::validation("message content cannot be empty"));
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::validation(format!(
            "message content must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(body)
}

/// Appends an unread message from `sender_pet_id`, which must be the caller's pet and a member.
/// Membership is settled before the content is looked at.
pub fn post_message<S: Store>(
    store: &S,
    user_id: Uuid,
    match_id: Uuid,
    sender_pet_id: Uuid,
    content: &str,
) -> AppResult<Message> {
    let message = store.transaction(|repo| {
        let record = access::existing_match(repo, match_id)?;
        let sender = access::owned_pet(repo, user_id, sender_pet_id)?;
        if !record.has_pet(sender.id) {
            return Err(AppError::forbidden("sender pet is not part of this match"));
        }
        let body = message_body(content)?;

        repo.insert_message(Message::new(record.id, sender.id, body))
    })?;

    metrics::counter!("pawmatch_messages_total").increment(1);
    Ok(message)
}

/// Marks everything the other pet sent as read. Returns how many messages flipped.
pub fn mark_read<S: Store>(store: &S, user_id: Uuid, match_id: Uuid) -> AppResult<usize> {
    store.transaction(|repo| {
        let (record, _mine, other) = access::member_match(repo, user_id, match_id)?;
        repo.mark_read_from(record.id, other.id)
    })
}

/// The whole conversation, oldest first.
pub fn list_messages<S: Store>(store: &S, user_id: Uuid, match_id: Uuid) -> AppResult<Vec<Message>> {
    store.transaction(|repo| {
        let (record, _, _) = access::member_match(repo, user_id, match_id)?;
        repo.messages_for_match(record.id)
    })
}
