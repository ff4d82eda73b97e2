//! Flat comment arena and the nested view computed from it.

use std::collections::{HashMap, HashSet};

use memeshare_shared::{Comment, CommentId, ReactionSummary};

/// A comment with the replies currently loaded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Every loaded comment keyed by id, plus ordered child lists.
///
/// Top-level order follows fetch order; a parent's child list is exactly
/// the reply window last fetched for it.
#[derive(Debug, Default)]
pub(crate) struct CommentArena {
    comments: HashMap<CommentId, Comment>,
    top_level: Vec<CommentId>,
    children: HashMap<CommentId, Vec<CommentId>>,
}

impl CommentArena {
    pub(crate) fn clear(&mut self) {
        self.comments.clear();
        self.top_level.clear();
        self.children.clear();
    }

    pub(crate) fn get(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    pub(crate) fn contains(&self, id: CommentId) -> bool {
        self.comments.contains_key(&id)
    }

    pub(crate) fn top_level_len(&self) -> usize {
        self.top_level.len()
    }

    #[cfg(test)]
    pub(crate) fn top_level_ids(&self) -> &[CommentId] {
        &self.top_level
    }

    pub(crate) fn reply_ids(&self, parent: CommentId) -> &[CommentId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or_default()
    }

    /// Appends top-level comments, skipping replies and ids already present.
    /// Returns the ids actually added.
    pub(crate) fn append_top_level(&mut self, comments: Vec<Comment>) -> Vec<CommentId> {
        let mut added = Vec::with_capacity(comments.len());
        for comment in comments {
            if !comment.is_top_level() || self.comments.contains_key(&comment.id) {
                continue;
            }
            added.push(comment.id);
            self.top_level.push(comment.id);
            self.comments.insert(comment.id, comment);
        }
        added
    }

    /// Swaps the reply window of `parent`. The previous window and anything
    /// loaded beneath it is dropped. Comments not replying to `parent` are
    /// ignored. `false` when `parent` is not loaded.
    pub(crate) fn replace_replies(&mut self, parent: CommentId, replies: Vec<Comment>) -> bool {
        if !self.comments.contains_key(&parent) {
            return false;
        }

        for old in self.children.remove(&parent).unwrap_or_default() {
            self.remove_subtree(old);
        }

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(replies.len());
        for reply in replies {
            if reply.parent_id != Some(parent) || reply.id == parent || !seen.insert(reply.id) {
                continue;
            }
            ids.push(reply.id);
            self.comments.insert(reply.id, reply);
        }
        self.children.insert(parent, ids);
        true
    }

    fn remove_subtree(&mut self, id: CommentId) {
        self.comments.remove(&id);
        for child in self.children.remove(&id).unwrap_or_default() {
            self.remove_subtree(child);
        }
    }

    pub(crate) fn set_reaction(&mut self, id: CommentId, summary: ReactionSummary) -> bool {
        match self.comments.get_mut(&id) {
            Some(comment) => {
                comment.reaction = summary;
                true
            }
            None => false,
        }
    }

    pub(crate) fn tree(&self) -> Vec<CommentNode> {
        self.top_level
            .iter()
            .filter_map(|id| self.node(*id))
            .collect()
    }

    fn node(&self, id: CommentId) -> Option<CommentNode> {
        let comment = self.comments.get(&id)?.clone();
        let replies = self
            .reply_ids(id)
            .iter()
            .filter_map(|child| self.node(*child))
            .collect();
        Some(CommentNode { comment, replies })
    }
}
