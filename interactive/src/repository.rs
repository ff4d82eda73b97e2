//! HTTP implementations of the repository traits.

use async_trait::async_trait;
use memeshare_shared::{
    Comment, CommentDraft, CommentId, CommentPage, CommentPatch, EntityRef, ImageChange, PostId,
    ReactionCounts,
};
use memeshare_sync::{CommentQuery, CommentRepository, ReactionRepository, Result};

use crate::api::{self, Form};

fn comments_path(post_id: PostId) -> String {
    format!("/api/posts/{}/comments", post_id)
}

fn likes_path(entity: EntityRef) -> String {
    format!("/api/{}s/{}/likes", entity.kind.as_str(), entity.id)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HttpComments;

#[async_trait(?Send)]
impl CommentRepository for HttpComments {
    async fn fetch_comments(&self, post_id: PostId, query: CommentQuery) -> Result<CommentPage> {
        let mut path = format!(
            "{}?page={}&perPage={}&sort={}",
            comments_path(post_id),
            query.page,
            query.per_page,
            query.sort.as_query()
        );
        if let Some(parent) = query.parent_id {
            path.push_str(&format!("&parentId={}", parent));
        }
        api::fetch(api::get_request(&path)).await
    }

    async fn create_comment(&self, post_id: PostId, draft: &CommentDraft) -> Result<Comment> {
        let form = Form::new()?;
        if let Some(text) = &draft.text {
            form.text("text", text)?;
        }
        if let Some(parent) = draft.parent_id {
            form.text("parentId", &parent.to_string())?;
        }
        if let Some(image) = &draft.image {
            form.file("image", image)?;
        }
        api::submit(api::post_request(&comments_path(post_id)), form).await
    }

    async fn update_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        patch: &CommentPatch,
    ) -> Result<Comment> {
        let form = Form::new()?;
        form.text("text", patch.text.as_deref().unwrap_or_default())?;
        match &patch.image {
            ImageChange::Unchanged => {}
            ImageChange::Replace(image) => form.file("image", image)?,
            ImageChange::Remove => form.text("removeImage", "true")?,
        }
        let path = format!("{}/{}", comments_path(post_id), comment_id);
        api::submit(api::put_request(&path), form).await
    }

    async fn delete_comment(&self, post_id: PostId, comment_id: CommentId) -> Result<()> {
        let path = format!("{}/{}", comments_path(post_id), comment_id);
        api::execute(api::delete_request(&path)).await
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HttpReactions;

#[async_trait(?Send)]
impl ReactionRepository for HttpReactions {
    async fn fetch_reaction(&self, entity: EntityRef) -> Result<ReactionCounts> {
        api::fetch(api::get_request(&likes_path(entity))).await
    }

    async fn like(&self, entity: EntityRef) -> Result<ReactionCounts> {
        api::fetch(api::post_request(&likes_path(entity))).await
    }

    async fn unlike(&self, entity: EntityRef) -> Result<ReactionCounts> {
        api::fetch(api::delete_request(&likes_path(entity))).await
    }
}
