//! Request-layer contracts the store and the reaction engine are built on.
//!
//! Implementations are thin: one backend call per method, no caching, no
//! retries. The browser crate implements them over HTTP; tests use
//! in-memory fakes.

use async_trait::async_trait;
use memeshare_shared::{
    Comment, CommentDraft, CommentId, CommentPage, CommentPatch, EntityRef, PostId,
    ReactionCounts, SortOrder,
};

use crate::Result;

/// Parameters of one list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentQuery {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    /// `None` lists top-level comments, `Some` lists replies of that comment.
    pub parent_id: Option<CommentId>,
    pub sort: SortOrder,
}

#[async_trait(?Send)]
pub trait CommentRepository: Send + Sync {
    async fn fetch_comments(&self, post_id: PostId, query: CommentQuery) -> Result<CommentPage>;

    async fn create_comment(&self, post_id: PostId, draft: &CommentDraft) -> Result<Comment>;

    async fn update_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        patch: &CommentPatch,
    ) -> Result<Comment>;

    async fn delete_comment(&self, post_id: PostId, comment_id: CommentId) -> Result<()>;
}

#[async_trait(?Send)]
pub trait ReactionRepository: Send + Sync {
    async fn fetch_reaction(&self, entity: EntityRef) -> Result<ReactionCounts>;

    async fn like(&self, entity: EntityRef) -> Result<ReactionCounts>;

    async fn unlike(&self, entity: EntityRef) -> Result<ReactionCounts>;
}
