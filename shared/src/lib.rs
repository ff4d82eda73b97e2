use std::fmt;

use serde::{Deserialize, Serialize};

pub type CommentId = i64;
pub type PostId = i64;

// ── Users ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub avatar_url: String,
}

// ── Reactions ──

/// Reaction state embedded in every reactable entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub has_reacted: bool,
    #[serde(default)]
    pub reaction_kind: Option<String>,
    pub count: u64,
}

impl ReactionSummary {
    /// Builds a summary from a server reply, tagging it with `kind` when the
    /// user has reacted.
    pub fn from_counts(counts: &ReactionCounts, kind: &str) -> Self {
        Self {
            has_reacted: counts.user_has_liked,
            reaction_kind: counts.user_has_liked.then(|| kind.to_string()),
            count: counts.like_count,
        }
    }
}

/// Body returned by the fetch/like/unlike endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCounts {
    pub like_count: u64,
    pub user_has_liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Post,
    Comment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Post => "post",
            EntityKind::Comment => "comment",
        }
    }
}

/// Identifies one reactable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn post(id: PostId) -> Self {
        Self {
            kind: EntityKind::Post,
            id,
        }
    }

    pub fn comment(id: CommentId) -> Self {
        Self {
            kind: EntityKind::Comment,
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

// ── Comments ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    pub user: User,
    #[serde(default)]
    pub text: Option<String>,
    /// URL of the attached image, if any.
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub reaction: ReactionSummary,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Oldest,
    Newest,
}

impl SortOrder {
    pub fn as_query(&self) -> &'static str {
        match self {
            SortOrder::Oldest => "asc",
            SortOrder::Newest => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub has_more: bool,
    #[serde(default)]
    pub total_with_replies: u64,
}

/// One page of comments as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentPage {
    pub data: Vec<Comment>,
    pub pagination: Pagination,
}

// ── Writes ──

/// Raw image bytes picked by the user, sent as a multipart part.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentDraft {
    pub text: Option<String>,
    pub image: Option<ImageUpload>,
    pub parent_id: Option<CommentId>,
}

impl CommentDraft {
    pub fn new(text: &str, image: Option<ImageUpload>) -> Self {
        let text = text.trim();
        Self {
            text: (!text.is_empty()).then(|| text.to_string()),
            image,
            parent_id: None,
        }
    }

    pub fn reply_to(mut self, parent_id: CommentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// A draft with neither text nor image is never sent.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image.is_none()
    }
}

/// What an update does to the attached image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageChange {
    #[default]
    Unchanged,
    Replace(ImageUpload),
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentPatch {
    pub text: Option<String>,
    pub image: ImageChange,
}
