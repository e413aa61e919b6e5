use uuid::Uuid;

use crate::contract::model::Post;
use crate::domain::error::DomainError;

/// The user a mutation is performed on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

pub fn require_actor(actor: Option<Actor>) -> Result<Actor, DomainError> {
    actor.ok_or_else(|| DomainError::forbidden("an acting user is required"))
}

/// Only the author may change or remove a post.
pub fn ensure_author(actor: Option<Actor>, post: &Post) -> Result<(), DomainError> {
    let actor = require_actor(actor)?;
    if actor.user_id != post.author_id {
        tracing::warn!(post_id = %post.id, actor = %actor.user_id, "rejecting mutation by non-author");
        return Err(DomainError::forbidden("only the author may modify this post"));
    }
    Ok(())
}
