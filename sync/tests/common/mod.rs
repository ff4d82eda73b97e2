//! In-memory backend fakes. Every call yields once before answering so
//! overlapping operations can be driven with `futures::join!`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use memeshare_shared::{
    Comment, CommentDraft, CommentId, CommentPage, CommentPatch, EntityRef, ImageChange,
    Pagination, PostId, ReactionCounts, ReactionSummary, User,
};
use memeshare_sync::{
    CommentQuery, CommentRepository, Error, MemoryStore, ReactionCache, ReactionConfig,
    ReactionEngine, ReactionRepository, Result, ThreadConfig, ThreadStore,
};

pub const POST_ID: PostId = 1;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn comment(id: CommentId, parent_id: Option<CommentId>) -> Comment {
    Comment {
        id,
        post_id: POST_ID,
        parent_id,
        user: User {
            id: 1,
            username: "pepe".into(),
            avatar_url: String::new(),
        },
        text: Some(format!("comment {id}")),
        image: None,
        created_at: "2024-01-01T00:00:00Z".into(),
        reaction: ReactionSummary::default(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(CommentQuery),
    Create(CommentDraft),
    Update(CommentId, CommentPatch),
    Delete(CommentId),
}

#[derive(Debug, Default)]
struct Backend {
    top_level: Vec<Comment>,
    replies: HashMap<CommentId, Vec<Comment>>,
}

impl Backend {
    fn total(&self) -> u64 {
        (self.top_level.len() + self.replies.values().map(Vec::len).sum::<usize>()) as u64
    }

    fn find_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.top_level
            .iter_mut()
            .chain(self.replies.values_mut().flatten())
            .find(|comment| comment.id == id)
    }
}

/// Comment backend holding top-level comments and replies in server order.
#[derive(Debug)]
pub struct FakeComments {
    backend: Mutex<Backend>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    pub fail_reads: AtomicBool,
    /// Fails only top-level page 1, i.e. reloads.
    pub fail_first_page: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FakeComments {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            backend: Mutex::new(Backend::default()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(10_000),
            fail_reads: AtomicBool::new(false),
            fail_first_page: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        })
    }

    /// Seeds `count` top-level comments with ids `first..first + count`.
    pub fn with_top_level(self: Arc<Self>, first: CommentId, count: i64) -> Arc<Self> {
        {
            let mut backend = self.backend.lock().unwrap();
            for id in first..first + count {
                backend.top_level.push(comment(id, None));
            }
        }
        self
    }

    /// Seeds `count` replies of `parent` with ids `first..first + count`.
    pub fn with_replies(self: Arc<Self>, parent: CommentId, first: CommentId, count: i64) -> Arc<Self> {
        {
            let mut backend = self.backend.lock().unwrap();
            let replies = backend.replies.entry(parent).or_default();
            for id in first..first + count {
                replies.push(comment(id, Some(parent)));
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fetches(&self) -> Vec<CommentQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Fetch(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Fetch(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::status(500));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl CommentRepository for FakeComments {
    async fn fetch_comments(&self, post_id: PostId, query: CommentQuery) -> Result<CommentPage> {
        assert_eq!(post_id, POST_ID);
        self.record(Call::Fetch(query));
        tokio::task::yield_now().await;

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection reset".into()));
        }
        if query.parent_id.is_none()
            && query.page == 1
            && self.fail_first_page.load(Ordering::SeqCst)
        {
            return Err(Error::Transport("down".into()));
        }

        let backend = self.backend.lock().unwrap();
        let all = match query.parent_id {
            None => backend.top_level.as_slice(),
            Some(parent) => backend
                .replies
                .get(&parent)
                .map(Vec::as_slice)
                .unwrap_or_default(),
        };
        let start = ((query.page - 1) * query.per_page) as usize;
        let end = (start + query.per_page as usize).min(all.len());
        let data = all.get(start..end).map(<[Comment]>::to_vec).unwrap_or_default();

        Ok(CommentPage {
            data,
            pagination: Pagination {
                has_more: end < all.len(),
                total_with_replies: backend.total(),
            },
        })
    }

    async fn create_comment(&self, post_id: PostId, draft: &CommentDraft) -> Result<Comment> {
        assert_eq!(post_id, POST_ID);
        self.record(Call::Create(draft.clone()));
        tokio::task::yield_now().await;
        self.check_write()?;

        let mut created = comment(self.next_id.fetch_add(1, Ordering::SeqCst), draft.parent_id);
        created.text = draft.text.clone();
        created.image = draft.image.as_ref().map(|image| format!("https://cdn/{}", image.file_name));

        let mut backend = self.backend.lock().unwrap();
        match draft.parent_id {
            None => backend.top_level.push(created.clone()),
            Some(parent) => backend.replies.entry(parent).or_default().push(created.clone()),
        }
        Ok(created)
    }

    async fn update_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        patch: &CommentPatch,
    ) -> Result<Comment> {
        assert_eq!(post_id, POST_ID);
        self.record(Call::Update(comment_id, patch.clone()));
        tokio::task::yield_now().await;
        self.check_write()?;

        let mut backend = self.backend.lock().unwrap();
        let comment = backend.find_mut(comment_id).ok_or(Error::status(404))?;
        comment.text = patch.text.clone().filter(|text| !text.is_empty());
        match &patch.image {
            ImageChange::Unchanged => {}
            ImageChange::Replace(image) => {
                comment.image = Some(format!("https://cdn/{}", image.file_name));
            }
            ImageChange::Remove => comment.image = None,
        }
        Ok(comment.clone())
    }

    async fn delete_comment(&self, post_id: PostId, comment_id: CommentId) -> Result<()> {
        assert_eq!(post_id, POST_ID);
        self.record(Call::Delete(comment_id));
        tokio::task::yield_now().await;
        self.check_write()?;

        let mut backend = self.backend.lock().unwrap();
        backend.top_level.retain(|comment| comment.id != comment_id);
        backend.replies.remove(&comment_id);
        for replies in backend.replies.values_mut() {
            replies.retain(|comment| comment.id != comment_id);
        }
        Ok(())
    }
}

pub fn store(repo: &Arc<FakeComments>, config: ThreadConfig) -> ThreadStore {
    init_tracing();
    ThreadStore::new(POST_ID, repo.clone(), config)
}

/// Reaction backend; the current user's state and the total per entity.
#[derive(Debug, Default)]
pub struct FakeReactions {
    counts: Mutex<HashMap<EntityRef, ReactionCounts>>,
    calls: Mutex<Vec<(&'static str, EntityRef)>>,
    pub fail_reads: AtomicBool,
    /// Reads answer 404, as for a deleted entity.
    pub gone: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FakeReactions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, entity: EntityRef, like_count: u64, user_has_liked: bool) {
        self.counts.lock().unwrap().insert(
            entity,
            ReactionCounts {
                like_count,
                user_has_liked,
            },
        );
    }

    /// Simulates other users reacting.
    pub fn bump(&self, entity: EntityRef, by: u64) {
        let mut counts = self.counts.lock().unwrap();
        let entry = counts.entry(entity).or_insert(ReactionCounts {
            like_count: 0,
            user_has_liked: false,
        });
        entry.like_count += by;
    }

    pub fn get(&self, entity: EntityRef) -> ReactionCounts {
        self.counts
            .lock()
            .unwrap()
            .get(&entity)
            .copied()
            .unwrap_or(ReactionCounts {
                like_count: 0,
                user_has_liked: false,
            })
    }

    pub fn calls(&self) -> Vec<(&'static str, EntityRef)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> usize {
        self.calls()
            .iter()
            .filter(|(name, _)| *name != "fetch")
            .count()
    }

    async fn answer(&self, name: &'static str, entity: EntityRef, liked: Option<bool>) -> Result<ReactionCounts> {
        self.calls.lock().unwrap().push((name, entity));
        tokio::task::yield_now().await;

        let failing = match liked {
            None => &self.fail_reads,
            Some(_) => &self.fail_writes,
        };
        if failing.load(Ordering::SeqCst) {
            return Err(Error::Transport("offline".into()));
        }
        if liked.is_none() && self.gone.load(Ordering::SeqCst) {
            return Err(Error::status(404));
        }

        let mut counts = self.counts.lock().unwrap();
        let entry = counts.entry(entity).or_insert(ReactionCounts {
            like_count: 0,
            user_has_liked: false,
        });
        match liked {
            Some(true) if !entry.user_has_liked => {
                entry.like_count += 1;
                entry.user_has_liked = true;
            }
            Some(false) if entry.user_has_liked => {
                entry.like_count = entry.like_count.saturating_sub(1);
                entry.user_has_liked = false;
            }
            _ => {}
        }
        Ok(*entry)
    }
}

#[async_trait(?Send)]
impl ReactionRepository for FakeReactions {
    async fn fetch_reaction(&self, entity: EntityRef) -> Result<ReactionCounts> {
        self.answer("fetch", entity, None).await
    }

    async fn like(&self, entity: EntityRef) -> Result<ReactionCounts> {
        self.answer("like", entity, Some(true)).await
    }

    async fn unlike(&self, entity: EntityRef) -> Result<ReactionCounts> {
        self.answer("unlike", entity, Some(false)).await
    }
}

pub fn cache() -> (Arc<MemoryStore>, ReactionCache) {
    let store = Arc::new(MemoryStore::new());
    let cache = ReactionCache::new(store.clone(), ReactionConfig::default().cache_prefix);
    (store, cache)
}

pub fn engine(repo: &Arc<FakeReactions>, cache: &ReactionCache, entity: EntityRef) -> ReactionEngine {
    init_tracing();
    ReactionEngine::new(entity, repo.clone(), cache.clone(), &ReactionConfig::default())
}

pub fn laughed(count: u64) -> ReactionSummary {
    ReactionSummary {
        has_reacted: true,
        reaction_kind: Some("laugh".into()),
        count,
    }
}

pub fn not_laughed(count: u64) -> ReactionSummary {
    ReactionSummary {
        has_reacted: false,
        reaction_kind: None,
        count,
    }
}
