//! Comment thread store.
//!
//! Owns the comment tree of one post: top-level comments paginated by
//! accumulation, a windowed reply page per parent, edit and delete staging.
//! Writes are confirm-then-refresh: nothing is inserted locally, the
//! affected scope is refetched once the backend accepts the change. The only
//! local patch is [`ThreadStore::set_reaction_summary`].
//!
//! Operations take `&self` and may overlap. Every page response is tagged
//! with the generation of the tree it was requested for and dropped if a
//! full reload replaced that tree in the meantime. Overlapping reloads are
//! latest-wins; a failed reload replaces nothing and invalidates nothing.

mod staging;
mod tree;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use memeshare_shared::{
    Comment, CommentDraft, CommentId, CommentPage, ImageUpload, PostId, ReactionSummary,
    SortOrder,
};

pub use self::staging::EditStaging;
pub use self::tree::CommentNode;
use self::tree::CommentArena;
use crate::pagination::{InFlight, PageState, Scope};
use crate::repository::{CommentQuery, CommentRepository};
use crate::{Outcome, Result, Skip, ThreadConfig};

pub const TRACING_TARGET: &str = "memeshare_sync::thread";

/// Render-ready copy of the store state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadSnapshot {
    pub comments: Vec<CommentNode>,
    pub is_loading: bool,
    /// Last top-level page appended.
    pub page: u32,
    pub has_more: bool,
    pub total_with_replies: u64,
    /// Reply cursor per parent whose replies have been fetched.
    pub reply_pages: HashMap<CommentId, PageState>,
    pub edit: Option<EditStaging>,
    pub pending_delete: Option<CommentId>,
}

impl ThreadSnapshot {
    pub fn reply_page(&self, parent: CommentId) -> Option<PageState> {
        self.reply_pages.get(&parent).copied()
    }
}

#[derive(Debug, Default)]
struct ThreadState {
    arena: CommentArena,
    top_page: PageState,
    reply_pages: HashMap<CommentId, PageState>,
    total_with_replies: u64,
    in_flight: InFlight,
    pending: usize,
    /// Bumped each time the tree is actually replaced.
    generation: u64,
    /// Bumped by every reload request; only the newest may replace the tree.
    reload_seq: u64,
    edit: Option<EditStaging>,
    pending_delete: Option<CommentId>,
}

impl ThreadState {
    fn apply_reply_pages(&mut self, pages: Vec<(CommentId, Result<CommentPage>)>) {
        for (parent, result) in pages {
            let Ok(page) = result else { continue };
            if self.arena.replace_replies(parent, page.data) {
                self.reply_pages
                    .insert(parent, PageState::new(1, page.pagination.has_more));
            }
        }
    }
}

/// Keeps `is_loading` raised, and optionally a scope busy, until dropped.
struct Activity<'a> {
    store: &'a ThreadStore,
    scope: Option<Scope>,
}

impl Drop for Activity<'_> {
    fn drop(&mut self) {
        let mut state = self.store.lock();
        state.pending = state.pending.saturating_sub(1);
        if let Some(scope) = self.scope {
            state.in_flight.leave(scope);
        }
    }
}

pub struct ThreadStore {
    post_id: PostId,
    config: ThreadConfig,
    repo: Arc<dyn CommentRepository>,
    state: Mutex<ThreadState>,
}

impl fmt::Debug for ThreadStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadStore")
            .field("post_id", &self.post_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ThreadStore {
    pub fn new(post_id: PostId, repo: Arc<dyn CommentRepository>, config: ThreadConfig) -> Self {
        Self {
            post_id,
            config,
            repo,
            state: Mutex::new(ThreadState::default()),
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn config(&self) -> &ThreadConfig {
        &self.config
    }

    pub fn is_loading(&self) -> bool {
        self.lock().pending > 0
    }

    pub fn snapshot(&self) -> ThreadSnapshot {
        let state = self.lock();
        ThreadSnapshot {
            comments: state.arena.tree(),
            is_loading: state.pending > 0,
            page: state.top_page.page(),
            has_more: state.top_page.has_more(),
            total_with_replies: state.total_with_replies,
            reply_pages: state.reply_pages.clone(),
            edit: state.edit.clone(),
            pending_delete: state.pending_delete,
        }
    }

    /// Looks up a loaded comment.
    pub fn comment(&self, id: CommentId) -> Option<Comment> {
        self.lock().arena.get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Activity<'_> {
        self.lock().pending += 1;
        Activity {
            store: self,
            scope: None,
        }
    }

    fn begin_scope(&self, scope: Scope) -> Option<Activity<'_>> {
        let mut state = self.lock();
        if !state.in_flight.enter(scope) {
            tracing::debug!(
                target: TRACING_TARGET,
                post_id = self.post_id,
                scope = ?scope,
                "Scope busy, dropping request"
            );
            return None;
        }
        state.pending += 1;
        Some(Activity {
            store: self,
            scope: Some(scope),
        })
    }

    fn top_query(&self, page: u32) -> CommentQuery {
        CommentQuery {
            page,
            per_page: self.config.per_page,
            parent_id: None,
            sort: self.config.sort,
        }
    }

    fn reply_query(&self, parent: CommentId, page: u32) -> CommentQuery {
        CommentQuery {
            page,
            per_page: self.config.reply_per_page,
            parent_id: Some(parent),
            sort: SortOrder::Oldest,
        }
    }

    async fn fetch(&self, query: CommentQuery) -> Result<CommentPage> {
        tracing::debug!(
            target: TRACING_TARGET,
            post_id = self.post_id,
            parent_id = ?query.parent_id,
            page = query.page,
            "Fetching comments"
        );

        let result = self.repo.fetch_comments(self.post_id, query).await;
        if let Err(error) = &result {
            tracing::error!(
                target: TRACING_TARGET,
                post_id = self.post_id,
                parent_id = ?query.parent_id,
                page = query.page,
                error = %error,
                "Failed to fetch comments"
            );
        }
        result
    }

    async fn fetch_reply_pages(
        &self,
        parents: Vec<CommentId>,
    ) -> Vec<(CommentId, Result<CommentPage>)> {
        let requests = parents.into_iter().map(move |parent| async move {
            (parent, self.fetch(self.reply_query(parent, 1)).await)
        });
        join_all(requests).await
    }

    fn stale(&self, scope: Scope) -> Outcome {
        tracing::warn!(
            target: TRACING_TARGET,
            post_id = self.post_id,
            scope = ?scope,
            "Discarding response for replaced tree"
        );
        Skip::Stale.into()
    }

    // ── Reads ──

    /// Replaces the whole tree with page 1 of top-level comments and, when
    /// configured, page 1 of replies for each of them.
    pub async fn load_first_page(&self) -> Outcome {
        let _activity = self.begin();
        let seq = {
            let mut state = self.lock();
            state.reload_seq += 1;
            state.reload_seq
        };

        let page = match self.fetch(self.top_query(1)).await {
            Ok(page) => page,
            Err(error) => return error.into(),
        };

        let parents = if self.config.eager_replies {
            page.data
                .iter()
                .filter(|comment| comment.is_top_level())
                .map(|comment| comment.id)
                .collect()
        } else {
            Vec::new()
        };
        let replies = self.fetch_reply_pages(parents).await;

        let mut state = self.lock();
        if state.reload_seq != seq {
            return self.stale(Scope::TopLevel);
        }

        state.generation += 1;
        state.arena.clear();
        state.reply_pages.clear();
        state.arena.append_top_level(page.data);
        state.top_page = PageState::new(1, page.pagination.has_more);
        state.total_with_replies = page.pagination.total_with_replies;
        state.apply_reply_pages(replies);

        tracing::debug!(
            target: TRACING_TARGET,
            post_id = self.post_id,
            top_level = state.arena.top_level_len(),
            has_more = state.top_page.has_more(),
            "Loaded first page"
        );
        Outcome::Done
    }

    /// Appends the next top-level page.
    pub async fn load_more_top_level(&self) -> Outcome {
        let Some(_activity) = self.begin_scope(Scope::TopLevel) else {
            return Skip::Busy.into();
        };

        let (next, generation) = {
            let state = self.lock();
            match state.top_page.next() {
                Some(next) => (next, state.generation),
                None => return Skip::Exhausted.into(),
            }
        };

        let page = match self.fetch(self.top_query(next)).await {
            Ok(page) => page,
            Err(error) => return error.into(),
        };

        let added = {
            let mut state = self.lock();
            if state.generation != generation {
                return self.stale(Scope::TopLevel);
            }
            let added = state.arena.append_top_level(page.data);
            state.top_page = PageState::new(next, page.pagination.has_more);
            state.total_with_replies = page.pagination.total_with_replies;

            tracing::debug!(
                target: TRACING_TARGET,
                post_id = self.post_id,
                page = next,
                added = added.len(),
                has_more = page.pagination.has_more,
                "Appended top-level page"
            );
            added
        };

        if self.config.eager_replies && !added.is_empty() {
            let replies = self.fetch_reply_pages(added).await;
            let mut state = self.lock();
            if state.generation == generation {
                state.apply_reply_pages(replies);
            }
        }
        Outcome::Done
    }

    /// Shows the next reply page of `parent`, or page 1 if its replies were
    /// never fetched.
    pub async fn load_more_replies(&self, parent: CommentId) -> Outcome {
        self.move_reply_window(parent, |current| match current {
            None => Ok(1),
            Some(state) => state.next().ok_or(Skip::Exhausted),
        })
        .await
    }

    /// Shows the previous reply page of `parent`.
    pub async fn load_back_replies(&self, parent: CommentId) -> Outcome {
        self.move_reply_window(parent, |current| {
            current
                .and_then(|state| state.previous())
                .ok_or(Skip::AtFirstPage)
        })
        .await
    }

    /// Refetches page 1 of the replies of `parent`.
    pub async fn refresh_replies(&self, parent: CommentId) -> Outcome {
        self.move_reply_window(parent, |_| Ok(1)).await
    }

    async fn move_reply_window<F>(&self, parent: CommentId, target: F) -> Outcome
    where
        F: FnOnce(Option<PageState>) -> std::result::Result<u32, Skip>,
    {
        if !self.lock().arena.contains(parent) {
            return Skip::UnknownComment.into();
        }
        let Some(_activity) = self.begin_scope(Scope::Replies(parent)) else {
            return Skip::Busy.into();
        };

        let current = self.lock().reply_pages.get(&parent).copied();
        match target(current) {
            Ok(page) => self.fetch_reply_window(parent, page).await,
            Err(skip) => skip.into(),
        }
    }

    async fn fetch_reply_window(&self, parent: CommentId, page: u32) -> Outcome {
        let generation = self.lock().generation;
        let response = match self.fetch(self.reply_query(parent, page)).await {
            Ok(response) => response,
            Err(error) => return error.into(),
        };

        let mut state = self.lock();
        if state.generation != generation || !state.arena.replace_replies(parent, response.data) {
            return self.stale(Scope::Replies(parent));
        }
        state
            .reply_pages
            .insert(parent, PageState::new(page, response.pagination.has_more));

        tracing::debug!(
            target: TRACING_TARGET,
            post_id = self.post_id,
            parent_id = parent,
            page,
            replies = state.arena.reply_ids(parent).len(),
            "Replaced reply window"
        );
        Outcome::Done
    }

    /// Refetches whatever a confirmed write may have shifted.
    async fn refresh_after_write(&self, parent: Option<CommentId>, page: u32) {
        let Some(parent) = parent else {
            let _ = self.load_first_page().await;
            return;
        };

        let _ = self.fetch_reply_window(parent, page).await;
        let emptied = self.lock().arena.reply_ids(parent).is_empty();
        if emptied && page > 1 {
            let _ = self.fetch_reply_window(parent, page - 1).await;
        }
    }

    /// Parent of `id` and the reply page it is shown on.
    fn location(&self, id: CommentId) -> (Option<CommentId>, u32) {
        let state = self.lock();
        let parent = state.arena.get(id).and_then(|comment| comment.parent_id);
        let page = parent
            .and_then(|parent| state.reply_pages.get(&parent))
            .map(PageState::page)
            .unwrap_or(1);
        (parent, page)
    }

    // ── Creates ──

    pub async fn add_comment(&self, text: &str, image: Option<ImageUpload>) -> Outcome {
        let draft = CommentDraft::new(text, image);
        if draft.is_empty() {
            return Skip::EmptySubmission.into();
        }

        let _activity = self.begin();
        if let Err(error) = self.create(&draft).await {
            return error.into();
        }
        self.refresh_after_write(None, 1).await;
        Outcome::Done
    }

    pub async fn add_reply(
        &self,
        parent: CommentId,
        text: &str,
        image: Option<ImageUpload>,
    ) -> Outcome {
        let draft = CommentDraft::new(text, image).reply_to(parent);
        if draft.is_empty() {
            return Skip::EmptySubmission.into();
        }
        if !self.lock().arena.contains(parent) {
            return Skip::UnknownComment.into();
        }

        let _activity = self.begin();
        if let Err(error) = self.create(&draft).await {
            return error.into();
        }
        self.refresh_after_write(Some(parent), 1).await;
        Outcome::Done
    }

    async fn create(&self, draft: &CommentDraft) -> Result<Comment> {
        tracing::debug!(
            target: TRACING_TARGET,
            post_id = self.post_id,
            parent_id = ?draft.parent_id,
            has_image = draft.image.is_some(),
            "Creating comment"
        );

        let result = self.repo.create_comment(self.post_id, draft).await;
        if let Err(error) = &result {
            tracing::error!(
                target: TRACING_TARGET,
                post_id = self.post_id,
                parent_id = ?draft.parent_id,
                error = %error,
                "Failed to create comment"
            );
        }
        result
    }

    // ── Deletes ──

    /// Stages `id` for deletion pending confirmation.
    pub fn request_delete(&self, id: CommentId) -> Outcome {
        let mut state = self.lock();
        if !state.arena.contains(id) {
            return Skip::UnknownComment.into();
        }
        state.pending_delete = Some(id);
        Outcome::Done
    }

    pub fn cancel_delete(&self) -> Outcome {
        match self.lock().pending_delete.take() {
            Some(_) => Outcome::Done,
            None => Skip::NothingStaged.into(),
        }
    }

    /// Deletes the staged comment. The target stays staged if the request
    /// fails.
    pub async fn confirm_delete(&self) -> Outcome {
        let Some(target) = self.lock().pending_delete else {
            return Skip::NothingStaged.into();
        };
        let (parent, page) = self.location(target);

        let _activity = self.begin();
        tracing::debug!(
            target: TRACING_TARGET,
            post_id = self.post_id,
            comment_id = target,
            "Deleting comment"
        );
        if let Err(error) = self.repo.delete_comment(self.post_id, target).await {
            tracing::error!(
                target: TRACING_TARGET,
                post_id = self.post_id,
                comment_id = target,
                error = %error,
                "Failed to delete comment"
            );
            return error.into();
        }

        {
            let mut state = self.lock();
            if state.pending_delete == Some(target) {
                state.pending_delete = None;
            }
            if state.edit.as_ref().is_some_and(|edit| edit.target == target) {
                state.edit = None;
            }
        }
        self.refresh_after_write(parent, page).await;
        Outcome::Done
    }

    // ── Edits ──

    /// Stages an edit of `id`, discarding any other unsaved edit.
    pub fn begin_edit(&self, id: CommentId) -> Outcome {
        let mut state = self.lock();
        let Some(comment) = state.arena.get(id) else {
            return Skip::UnknownComment.into();
        };
        let staging = EditStaging::begin(comment);

        if let Some(previous) = state.edit.replace(staging) {
            if previous.target != id {
                tracing::debug!(
                    target: TRACING_TARGET,
                    post_id = self.post_id,
                    comment_id = previous.target,
                    "Discarding unsaved edit"
                );
            }
        }
        Outcome::Done
    }

    pub fn update_edit_draft(&self, text: &str) -> Outcome {
        match self.lock().edit.as_mut() {
            Some(edit) => {
                edit.draft_text = text.to_string();
                Outcome::Done
            }
            None => Skip::NothingStaged.into(),
        }
    }

    /// `Some` stages a replacement image, `None` stages removal.
    pub fn stage_edit_image(&self, image: Option<ImageUpload>) -> Outcome {
        match self.lock().edit.as_mut() {
            Some(edit) => {
                edit.stage_image(image);
                Outcome::Done
            }
            None => Skip::NothingStaged.into(),
        }
    }

    pub fn cancel_edit(&self) -> Outcome {
        match self.lock().edit.take() {
            Some(_) => Outcome::Done,
            None => Skip::NothingStaged.into(),
        }
    }

    /// Submits the staged edit. Staging survives a failed request.
    pub async fn commit_edit(&self) -> Outcome {
        let Some(staging) = self.lock().edit.clone() else {
            return Skip::NothingStaged.into();
        };
        if staging.is_empty() {
            return Skip::EmptySubmission.into();
        }
        let (parent, page) = self.location(staging.target);

        let _activity = self.begin();
        let patch = staging.to_patch();
        tracing::debug!(
            target: TRACING_TARGET,
            post_id = self.post_id,
            comment_id = staging.target,
            image = ?patch.image,
            "Updating comment"
        );
        if let Err(error) = self
            .repo
            .update_comment(self.post_id, staging.target, &patch)
            .await
        {
            tracing::error!(
                target: TRACING_TARGET,
                post_id = self.post_id,
                comment_id = staging.target,
                error = %error,
                "Failed to update comment"
            );
            return error.into();
        }

        {
            let mut state = self.lock();
            if state.edit.as_ref() == Some(&staging) {
                state.edit = None;
            }
        }
        self.refresh_after_write(parent, page).await;
        Outcome::Done
    }

    // ── Reactions ──

    /// Patches the embedded reaction of one loaded comment without touching
    /// pagination.
    pub fn set_reaction_summary(&self, id: CommentId, summary: ReactionSummary) -> Outcome {
        if self.lock().arena.set_reaction(id, summary) {
            Outcome::Done
        } else {
            Skip::UnknownComment.into()
        }
    }
}
