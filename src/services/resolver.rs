//! Polymorphic lookup of report and enforcement targets.
//!
//! Each [`TargetKind`] has one [`TargetSource`] implementation. Callers go
//! through [`resolve`] and [`resolve_author`], which dispatch on the kind, so
//! no consumer branches on target type itself.

use crate::{
    error::{AppError, AppResult},
    models::{
        snapshot::excerpt, Comment, Conversation, Message, Post, TargetKind, TargetSnapshot, User,
    },
};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};
use std::future::Future;

pub(crate) trait TargetSource {
    const KIND: TargetKind;

    fn snapshot<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> impl Future<Output = Result<Option<TargetSnapshot>, DbErr>> + Send;
}

pub(crate) struct UserTarget;
pub(crate) struct PostTarget;
pub(crate) struct CommentTarget;
pub(crate) struct MessageTarget;
pub(crate) struct ConversationTarget;

impl TargetSource for UserTarget {
    const KIND: TargetKind = TargetKind::User;

    async fn snapshot<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<TargetSnapshot>, DbErr> {
        Ok(User::find_by_id(id)
            .one(db)
            .await?
            .map(|user| TargetSnapshot::User {
                id: user.id,
                username: user.username,
                role: user.role,
            }))
    }
}

impl TargetSource for PostTarget {
    const KIND: TargetKind = TargetKind::Post;

    async fn snapshot<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<TargetSnapshot>, DbErr> {
        Ok(Post::find_by_id(id)
            .one(db)
            .await?
            .map(|post| TargetSnapshot::Post {
                id: post.id,
                author_id: post.user_id,
                excerpt: excerpt(&post.content),
                title: post.title,
                is_removed: post.is_removed,
            }))
    }
}

impl TargetSource for CommentTarget {
    const KIND: TargetKind = TargetKind::Comment;

    async fn snapshot<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<TargetSnapshot>, DbErr> {
        Ok(Comment::find_by_id(id)
            .one(db)
            .await?
            .map(|comment| TargetSnapshot::Comment {
                id: comment.id,
                post_id: comment.post_id,
                author_id: comment.user_id,
                excerpt: excerpt(&comment.content),
                is_removed: comment.is_removed,
            }))
    }
}

impl TargetSource for MessageTarget {
    const KIND: TargetKind = TargetKind::Message;

    async fn snapshot<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<TargetSnapshot>, DbErr> {
        Ok(Message::find_by_id(id)
            .one(db)
            .await?
            .map(|message| TargetSnapshot::Message {
                id: message.id,
                conversation_id: message.conversation_id,
                author_id: message.sender_id,
                excerpt: excerpt(&message.content),
            }))
    }
}

impl TargetSource for ConversationTarget {
    const KIND: TargetKind = TargetKind::Conversation;

    async fn snapshot<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<TargetSnapshot>, DbErr> {
        Ok(Conversation::find_by_id(id)
            .one(db)
            .await?
            .map(|conversation| TargetSnapshot::Conversation {
                id: conversation.id,
                author_id: conversation.created_by,
                title: conversation.title,
            }))
    }
}

async fn lookup<S: TargetSource, C: ConnectionTrait>(db: &C, id: i32) -> AppResult<TargetSnapshot> {
    S::snapshot(db, id)
        .await?
        .ok_or(AppError::TargetNotFound { kind: S::KIND, id })
}

/// Load a snapshot of the target, or `TargetNotFound`.
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    kind: TargetKind,
    id: i32,
) -> AppResult<TargetSnapshot> {
    match kind {
        TargetKind::User => lookup::<UserTarget, _>(db, id).await,
        TargetKind::Post => lookup::<PostTarget, _>(db, id).await,
        TargetKind::Comment => lookup::<CommentTarget, _>(db, id).await,
        TargetKind::Message => lookup::<MessageTarget, _>(db, id).await,
        TargetKind::Conversation => lookup::<ConversationTarget, _>(db, id).await,
    }
}

/// The accountable user for a target. `Ok(None)` means the target exists but
/// its author no longer does.
pub async fn resolve_author<C: ConnectionTrait>(
    db: &C,
    kind: TargetKind,
    id: i32,
) -> AppResult<Option<i32>> {
    Ok(resolve(db, kind, id).await?.author_id())
}
